//! Canonical encoding and content-addressing for KUs (spec §3, §4.1).
//!
//! `serde_json::Map` is backed by a `BTreeMap` as long as the
//! `preserve_order` feature is off (it is, across this workspace), so
//! converting a `Ku` to `serde_json::Value` and serializing it already
//! yields keys in lexicographic order at every nesting level. The only
//! remaining work here is stripping `sig` and normalizing `tags` before
//! that serialization happens.

use crate::error::{Error, Result};
use crate::types::Ku;

const CID_PREFIX: &str = "cid-blake3:";

/// Sorts and dedups a tag list in place.
fn normalize_tags(tags: &mut Vec<String>) {
    tags.sort();
    tags.dedup();
}

/// Produces the canonical byte representation of `ku`: `sig` stripped,
/// `tags` sorted and deduped, object keys in lexicographic order.
pub fn canonical_bytes(ku: &Ku) -> Result<Vec<u8>> {
    let mut unsigned = ku.without_signature();
    normalize_tags(&mut unsigned.tags);

    let mut value = serde_json::to_value(&unsigned)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("sig");
    } else {
        return Err(Error::MissingField("ku did not encode as an object".into()));
    }

    serde_json::to_vec(&value).map_err(Error::from)
}

/// Computes the content identifier of `ku`, ignoring any `sig` present.
///
/// `cid(k) == cid(k.without_signature())` and signing a KU never changes
/// its CID — the signature covers the CID, not the other way around.
pub fn cid(ku: &Ku) -> Result<String> {
    let bytes = canonical_bytes(ku)?;
    let hash = blake3::hash(&bytes);
    Ok(format!("{CID_PREFIX}{}", hash.to_hex()))
}

/// Parses the hex digest out of a `cid-blake3:<hex>` string, if well-formed.
pub fn parse_cid(cid: &str) -> Option<&str> {
    cid.strip_prefix(CID_PREFIX)
        .filter(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, Signature, SCHEMA_ID};
    use proptest::prelude::*;

    fn sample_ku(tags: Vec<String>) -> Ku {
        Ku {
            ku_type: "ku.patch.migration".into(),
            schema_id: SCHEMA_ID.into(),
            content_type: "application/json".into(),
            payload: serde_json::json!({"title": "Example", "severity": "high"}),
            parents: vec![],
            sources: vec![],
            tests: vec![],
            provenance: Provenance::default(),
            tags,
            sig: None,
        }
    }

    #[test]
    fn cid_ignores_signature() {
        let unsigned = sample_ku(vec!["db".into(), "postgres".into()]);
        let mut signed = unsigned.clone();
        signed.sig = Some(Signature {
            algorithm: "Ed25519".into(),
            key_id: "somekey".into(),
            signature: "deadbeef".into(),
            pub_pem: "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----".into(),
        });

        assert_eq!(cid(&unsigned).unwrap(), cid(&signed).unwrap());
    }

    #[test]
    fn cid_is_stable_across_tag_order() {
        let a = sample_ku(vec!["db".into(), "postgres".into()]);
        let b = sample_ku(vec!["postgres".into(), "db".into()]);
        assert_eq!(cid(&a).unwrap(), cid(&b).unwrap());
    }

    #[test]
    fn cid_has_expected_prefix_and_length() {
        let ku = sample_ku(vec![]);
        let id = cid(&ku).unwrap();
        assert!(id.starts_with(CID_PREFIX));
        assert!(parse_cid(&id).is_some());
    }

    #[test]
    fn parse_cid_rejects_malformed_input() {
        assert!(parse_cid("cid-blake3:nothex").is_none());
        assert!(parse_cid("sha256:abcd").is_none());
        assert!(parse_cid("cid-blake3:").is_none());
    }

    proptest! {
        #[test]
        fn cid_is_pure_function_of_unsigned_content(
            title in "[a-zA-Z0-9 ]{0,40}",
            tags in proptest::collection::vec("[a-z]{1,10}", 0..6),
        ) {
            let mut ku = sample_ku(tags);
            ku.payload = serde_json::json!({"title": title});
            let first = cid(&ku).unwrap();
            let second = cid(&ku).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
