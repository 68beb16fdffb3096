use proptest::prelude::*;

use sharecenter_types::{
    AccessLevel, ErrorKind, Expiry, GroupId, Lifetime, ShareId, Timestamp, Uri, MAX_URI_LENGTH,
};

proptest! {
    /// GroupId key bytes preserve ordering.
    #[test]
    fn group_id_keys_preserve_order(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ka = GroupId::new(a).to_key();
        let kb = GroupId::new(b).to_key();
        prop_assert_eq!(ka < kb, a < b);
        prop_assert_eq!(GroupId::from_key(&ka), Some(GroupId::new(a)));
    }

    /// ShareId bincode serialization roundtrip.
    #[test]
    fn share_id_bincode_roundtrip(raw in 0u64..u64::MAX) {
        let id = ShareId::new(raw);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: ShareId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }

    /// A non-negative lifetime expires exactly `secs` after `now`.
    #[test]
    fn lifetime_expires_after_duration(
        start in 0u64..1_000_000,
        secs in 0i64..1_000_000,
        offset in 0u64..2_000_000,
    ) {
        let now = Timestamp::new(start);
        let expiry = Lifetime::Seconds(secs).expiry_from(now).unwrap();
        let later = Timestamp::new(start + offset);
        prop_assert_eq!(expiry.is_expired(later), offset >= secs as u64);
    }

    /// Negative lifetimes never resolve to an expiry.
    #[test]
    fn negative_lifetime_rejected(secs in i64::MIN..0) {
        prop_assert_eq!(Lifetime::Seconds(secs).expiry_from(Timestamp::new(0)), None);
    }

    /// Indefinite shares never expire.
    #[test]
    fn indefinite_never_expires(now in 0u64..u64::MAX) {
        prop_assert!(!Expiry::Indefinite.is_expired(Timestamp::new(now)));
    }

    /// URIs are accepted iff non-empty, short enough and free of whitespace.
    #[test]
    fn uri_validation(raw in "[a-z0-9./:_-]{0,300}") {
        let ok = !raw.is_empty() && raw.len() <= MAX_URI_LENGTH;
        match Uri::parse(raw.clone()) {
            Ok(uri) => {
                prop_assert!(ok);
                prop_assert_eq!(uri.as_str(), raw.as_str());
            }
            Err(err) => {
                prop_assert!(!ok);
                prop_assert_eq!(err.kind(), ErrorKind::InvalidUri);
            }
        }
    }

    /// Error codes map back to their kind.
    #[test]
    fn error_code_roundtrip(code in 0u8..19) {
        let kind = ErrorKind::from_code(code).unwrap();
        prop_assert_eq!(kind.code(), code);
    }
}

#[test]
fn access_levels_render_lowercase() {
    assert_eq!(AccessLevel::Read.to_string(), "read");
    assert_eq!(AccessLevel::Write.to_string(), "write");
}
