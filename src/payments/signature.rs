use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `message`.
pub fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn verify(secret: &str, message: &[u8], signature_hex: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

/// Checkout callback signature: HMAC over `order_id|payment_id` keyed by the API secret.
pub fn verify_payment_signature(key_secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let message = format!("{order_id}|{payment_id}");
    verify(key_secret, message.as_bytes(), signature)
}

/// Webhook signature: HMAC over the raw request body keyed by the webhook secret.
pub fn verify_webhook_signature(webhook_secret: &str, body: &[u8], signature: &str) -> bool {
    verify(webhook_secret, body, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_payment_signature() {
        let sig = sign("secret", b"order_1|pay_1");
        assert!(verify_payment_signature("secret", "order_1", "pay_1", &sig));
    }

    #[test]
    fn rejects_tampered_payment_signature() {
        let sig = sign("secret", b"order_1|pay_1");
        assert!(!verify_payment_signature("secret", "order_1", "pay_2", &sig));
        assert!(!verify_payment_signature("other", "order_1", "pay_1", &sig));
        assert!(!verify_payment_signature("secret", "order_1", "pay_1", "not-hex"));
    }

    #[test]
    fn empty_secret_never_verifies() {
        let sig = sign("", b"order_1|pay_1");
        assert!(!verify_payment_signature("", "order_1", "pay_1", &sig));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign("Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn webhook_signature_over_raw_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign("whsec", body);
        assert!(verify_webhook_signature("whsec", body, &sig));
        assert!(!verify_webhook_signature("whsec", b"{}", &sig));
    }
}
