//! Variant lookup, canonical attribute ordering, palette matching and slugs.

use std::collections::BTreeSet;

pub const SIZE_ORDER: [&str; 4] = ["M", "L", "XL", "XXL"];
pub const COLOR_ORDER: [&str; 5] = ["Red", "Black", "Navy Blue", "White", "Grey"];

pub const PALETTE: [(&str, [u8; 3]); 5] = [
    ("Red", [239, 68, 68]),
    ("Black", [17, 24, 39]),
    ("Navy Blue", [30, 58, 138]),
    ("White", [250, 250, 250]),
    ("Grey", [107, 114, 128]),
];

/// Anything exposing a size and a color can be matched.
pub trait VariantAttrs {
    fn size(&self) -> &str;
    fn color(&self) -> &str;
}

pub fn resolve_variant<'a, V: VariantAttrs>(variants: &'a [V], size: &str, color: &str) -> Option<&'a V> {
    variants
        .iter()
        .find(|v| v.size() == size && v.color() == color)
}

pub fn is_known_size(size: &str) -> bool {
    SIZE_ORDER.contains(&size)
}

pub fn is_known_color(color: &str) -> bool {
    COLOR_ORDER.contains(&color)
}

pub fn ordered_sizes<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    ordered_by(values, &SIZE_ORDER)
}

pub fn ordered_colors<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    ordered_by(values, &COLOR_ORDER)
}

fn ordered_by<'a>(values: impl IntoIterator<Item = &'a str>, canonical: &[&str]) -> Vec<String> {
    let distinct: BTreeSet<&str> = values.into_iter().collect();
    let mut out: Vec<&str> = distinct.into_iter().collect();
    // unknown values sort after the canonical ones, alphabetically
    out.sort_by_key(|v| {
        (
            canonical.iter().position(|c| c == v).unwrap_or(usize::MAX),
            v.to_string(),
        )
    });
    out.into_iter().map(str::to_string).collect()
}

pub fn nearest_color(rgb: [u8; 3]) -> &'static str {
    let distance = |p: &[u8; 3]| -> u32 {
        p.iter()
            .zip(rgb.iter())
            .map(|(a, b)| {
                let d = i32::from(*a) - i32::from(*b);
                (d * d) as u32
            })
            .sum()
    };

    PALETTE
        .iter()
        .min_by_key(|(_, p)| distance(p))
        .map(|(name, _)| *name)
        .unwrap_or(PALETTE[0].0)
}

pub fn average_rgb(pixels: &[[u8; 3]]) -> Option<[u8; 3]> {
    if pixels.is_empty() {
        return None;
    }
    let mut sums = [0u64; 3];
    for px in pixels {
        for (sum, channel) in sums.iter_mut().zip(px.iter()) {
            *sum += u64::from(*channel);
        }
    }
    let n = pixels.len() as u64;
    Some(sums.map(|s| (s / n) as u8))
}

/// Parse `#rrggbb` or `rrggbb`.
pub fn parse_hex_color(input: &str) -> Option<[u8; 3]> {
    let hex = input.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let bytes = hex::decode(hex).ok()?;
    Some([bytes[0], bytes[1], bytes[2]])
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    struct V(&'static str, &'static str);

    impl VariantAttrs for V {
        fn size(&self) -> &str {
            self.0
        }
        fn color(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn resolves_exact_pair_only() {
        let variants = [V("M", "Red"), V("L", "Red"), V("M", "Black")];
        assert_eq!(resolve_variant(&variants, "L", "Red").map(|v| v.0), Some("L"));
        assert!(resolve_variant(&variants, "XL", "Red").is_none());
        assert!(resolve_variant(&variants, "m", "Red").is_none());
    }

    #[test]
    fn sizes_follow_canonical_order_with_unknowns_last() {
        let sizes = ordered_sizes(["XXL", "S", "M", "XL", "M", "A"]);
        assert_eq!(sizes, vec!["M", "XL", "XXL", "A", "S"]);
    }

    #[test]
    fn colors_follow_canonical_order() {
        let colors = ordered_colors(["Grey", "Red", "Navy Blue"]);
        assert_eq!(colors, vec!["Red", "Navy Blue", "Grey"]);
    }

    #[test]
    fn nearest_palette_entry() {
        assert_eq!(nearest_color([250, 0, 0]), "Red");
        assert_eq!(nearest_color([0, 0, 0]), "Black");
        assert_eq!(nearest_color([20, 50, 150]), "Navy Blue");
        assert_eq!(nearest_color([255, 255, 255]), "White");
        assert_eq!(nearest_color([120, 120, 120]), "Grey");
    }

    #[test]
    fn averages_pixels() {
        assert_eq!(average_rgb(&[[0, 0, 0], [10, 20, 30]]), Some([5, 10, 15]));
        assert_eq!(average_rgb(&[]), None);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ef4444"), Some([239, 68, 68]));
        assert_eq!(parse_hex_color("ffffff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("#fff"), None);
    }

    #[test]
    fn slugifies_names() {
        assert_eq!(slugify("Classic Tee  (Navy)"), "classic-tee-navy");
        assert_eq!(slugify("--Hello, World--"), "hello-world");
        assert_eq!(slugify("!!!"), "");
    }
}
