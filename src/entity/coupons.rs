use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub description: String,
    pub discount_percent: i32,
    pub active: bool,
    pub notify_users: bool,
    pub valid_from: Option<DateTimeWithTimeZone>,
    pub valid_to: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Active and inside whichever window bounds are set.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return false;
        }
        if self.valid_to.is_some_and(|to| now > to) {
            return false;
        }
        true
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(active: bool, from: Option<i64>, to: Option<i64>) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            code: "SAVE10".into(),
            description: String::new(),
            discount_percent: 10,
            active,
            notify_users: false,
            valid_from: from.map(|h| (now + Duration::hours(h)).into()),
            valid_to: to.map(|h| (now + Duration::hours(h)).into()),
            created_at: now.into(),
        }
    }

    #[test]
    fn open_window_is_valid() {
        assert!(coupon(true, None, None).is_valid(Utc::now()));
    }

    #[test]
    fn inactive_is_invalid() {
        assert!(!coupon(false, None, None).is_valid(Utc::now()));
    }

    #[test]
    fn respects_window_bounds() {
        assert!(coupon(true, Some(-1), Some(1)).is_valid(Utc::now()));
        assert!(!coupon(true, Some(1), None).is_valid(Utc::now()));
        assert!(!coupon(true, None, Some(-1)).is_valid(Utc::now()));
    }
}
