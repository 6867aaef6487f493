//! Property tests for fingerprinting and comparison

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use watchpost::{compare, fingerprint, ChangeReason, Fingerprint, Snapshot};

proptest! {
    #[test]
    fn prop_fingerprint_is_deterministic(content in prop::collection::vec(any::<u8>(), 0..2048)) {
        let first = fingerprint(&content);
        let second = fingerprint(&content);
        prop_assert_eq!(first, second);

        let hex = first.to_hex();
        prop_assert_eq!(hex.len(), 64);
        prop_assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        prop_assert_eq!(hex.parse::<Fingerprint>().unwrap(), first);
    }

    #[test]
    fn prop_distinct_content_distinct_fingerprint(a in ".{0,256}", b in ".{0,256}") {
        prop_assume!(a != b);
        prop_assert_ne!(fingerprint(a.as_bytes()), fingerprint(b.as_bytes()));
    }

    #[test]
    fn prop_first_run_always_changed(content in ".{0,512}") {
        let result = compare(content.as_bytes(), None);
        prop_assert!(result.changed);
        prop_assert_eq!(result.reason, ChangeReason::FirstRun);
        prop_assert!(result.previous.is_none());
    }

    #[test]
    fn prop_changed_iff_content_differs(old in ".{0,256}", new in ".{0,256}", secs in 0i64..4_000_000_000) {
        let captured_at = Utc.timestamp_opt(secs, 0).unwrap();
        let previous = Snapshot::capture(old.clone(), captured_at);
        let result = compare(new.as_bytes(), Some(&previous));

        prop_assert_eq!(result.changed, old != new);
        let expected = if old != new {
            ChangeReason::Changed { since: captured_at }
        } else {
            ChangeReason::Unchanged { since: captured_at }
        };
        prop_assert_eq!(result.reason, expected);
    }
}
