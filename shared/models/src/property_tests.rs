//! Property-based tests for the FoodX domain models.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use validator::Validate;

use crate::{BriefStatus, EmailThread, NewProductBrief, ProductBrief};

prop_compose! {
    fn arb_brief_input()(
        name in "[A-Za-z][A-Za-z ]{0,60}",
        category in "[A-Za-z][A-Za-z &]{0,40}",
        kosher in any::<bool>(),
        org in proptest::option::of("[A-Z]{2,5}"),
        notes in proptest::option::of("[a-z ]{0,200}"),
    ) -> NewProductBrief {
        NewProductBrief {
            product_name: name,
            category,
            is_kosher_certified: kosher,
            kosher_organization: org,
            additional_notes: notes,
            ..Default::default()
        }
    }
}

proptest! {
    #[test]
    fn kosher_rule_decides_validity(input in arb_brief_input()) {
        let expected = !input.is_kosher_certified || input.kosher_organization.is_some();
        prop_assert_eq!(input.validate().is_ok(), expected);
    }

    #[test]
    fn new_brief_copies_input(input in arb_brief_input(), secs in 0i64..2_000_000_000i64) {
        let now = Utc.timestamp_opt(secs, 0).unwrap();
        let brief = ProductBrief::new(input.clone(), "buyer", None, now);
        prop_assert_eq!(brief.product_name, input.product_name.trim().to_string());
        prop_assert_eq!(brief.is_kosher_certified, input.is_kosher_certified);
        prop_assert_eq!(brief.status, BriefStatus::Draft);
        prop_assert_eq!(brief.created_at, now);
    }

    #[test]
    fn brief_status_text_is_stable(index in 0usize..5) {
        let status = BriefStatus::ALL[index];
        prop_assert_eq!(BriefStatus::from_str(status.as_str()), Some(status));
    }

    #[test]
    fn thread_participants_are_normalized(a in "[a-z]{1,8}@[a-z]{1,8}\\.com", b in "[a-z]{1,8}@[a-z]{1,8}\\.com") {
        let upper = a.to_uppercase();
        let thread = EmailThread::new("Quote", &[&upper, &b, &a], Utc::now());
        prop_assert!(thread.participant_emails.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(thread.participant_emails.contains(&a));
    }
}
