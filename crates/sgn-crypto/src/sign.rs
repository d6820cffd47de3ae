//! Attaching and verifying signatures on a [`sgn_core::Ku`] (spec §4.2).

use data_encoding::BASE64URL_NOPAD;
use sgn_core::{canonical_bytes, Ku, Signature};

use crate::error::{Result, VerifyOutcome};
use crate::fingerprint::key_id_from_pem;
use crate::keypair::{verifying_key_from_pem, verify_raw, KeyPair};

const ALGORITHM: &str = "Ed25519";

/// Signs `ku`'s canonical bytes and returns a copy carrying `sig`.
pub fn sign_ku(ku: &Ku, keypair: &KeyPair) -> Result<Ku> {
    let pub_pem = keypair.public_key_pem()?;
    let key_id = key_id_from_pem(&pub_pem)?;
    let bytes = canonical_bytes(ku)?;
    let raw_sig = keypair.sign(&bytes);

    let mut signed = ku.clone();
    signed.sig = Some(Signature {
        algorithm: ALGORITHM.to_string(),
        key_id,
        signature: BASE64URL_NOPAD.encode(&raw_sig),
        pub_pem,
    });
    Ok(signed)
}

/// Verifies `ku`'s attached signature against its own canonical bytes.
///
/// Checks, in order: presence of `sig`, that `pub_pem` decodes to a valid
/// public key and the declared `key_id` matches its fingerprint, then the
/// signature itself. Trust-allowlist membership is a separate concern
/// (`sgn-trust`), not checked here.
pub fn verify_ku(ku: &Ku) -> VerifyOutcome {
    verify_ku_with_pub_pem(ku, None)
}

/// Verifies `ku` the same way as [`verify_ku`], additionally requiring
/// that `expected_pub_pem`, when given, matches the `pub_pem` embedded in
/// `ku.sig` (spec §4.2/§8: "swapping pub invalidates verify(..).ok==false").
pub fn verify_ku_with_pub_pem(ku: &Ku, expected_pub_pem: Option<&str>) -> VerifyOutcome {
    let sig = match &ku.sig {
        Some(sig) => sig,
        None => return VerifyOutcome::MissingSig,
    };

    if let Some(expected) = expected_pub_pem {
        if expected.trim() != sig.pub_pem.trim() {
            return VerifyOutcome::PubKeyMismatch;
        }
    }

    let key = match verifying_key_from_pem(&sig.pub_pem) {
        Ok(k) => k,
        Err(_) => return VerifyOutcome::DecodeError,
    };

    let expected_key_id = match key_id_from_pem(&sig.pub_pem) {
        Ok(id) => id,
        Err(_) => return VerifyOutcome::DecodeError,
    };
    if expected_key_id != sig.key_id {
        return VerifyOutcome::KeyIdMismatch;
    }

    let raw_sig: [u8; 64] = match BASE64URL_NOPAD
        .decode(sig.signature.as_bytes())
        .ok()
        .and_then(|v| v.try_into().ok())
    {
        Some(bytes) => bytes,
        None => return VerifyOutcome::DecodeError,
    };

    let bytes = match canonical_bytes(ku) {
        Ok(b) => b,
        Err(_) => return VerifyOutcome::DecodeError,
    };

    if verify_raw(&key, &bytes, &raw_sig) {
        VerifyOutcome::Ok
    } else {
        VerifyOutcome::BadSignature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgn_core::{Provenance, SCHEMA_ID};

    fn sample_ku() -> Ku {
        Ku {
            ku_type: "ku.patch.migration".into(),
            schema_id: SCHEMA_ID.into(),
            content_type: "application/json".into(),
            payload: serde_json::json!({"title": "Example"}),
            parents: vec![],
            sources: vec![],
            tests: vec![],
            provenance: Provenance::default(),
            tags: vec!["a".into()],
            sig: None,
        }
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let kp = KeyPair::generate();
        let ku = sample_ku();
        let signed = sign_ku(&ku, &kp).unwrap();
        assert_eq!(verify_ku(&signed), VerifyOutcome::Ok);
    }

    #[test]
    fn signing_preserves_cid() {
        let kp = KeyPair::generate();
        let ku = sample_ku();
        let signed = sign_ku(&ku, &kp).unwrap();
        assert_eq!(sgn_core::cid(&ku).unwrap(), sgn_core::cid(&signed).unwrap());
    }

    #[test]
    fn unsigned_ku_reports_missing_sig() {
        assert_eq!(verify_ku(&sample_ku()), VerifyOutcome::MissingSig);
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let kp = KeyPair::generate();
        let ku = sample_ku();
        let mut signed = sign_ku(&ku, &kp).unwrap();
        signed.payload = serde_json::json!({"title": "Tampered"});
        assert_eq!(verify_ku(&signed), VerifyOutcome::BadSignature);
    }

    #[test]
    fn swapped_pub_pem_fails_verification() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let ku = sample_ku();
        let signed = sign_ku(&ku, &kp).unwrap();
        let swapped = other.public_key_pem().unwrap();
        assert_eq!(
            verify_ku_with_pub_pem(&signed, Some(&swapped)),
            VerifyOutcome::PubKeyMismatch
        );
    }

    #[test]
    fn matching_pub_pem_still_verifies() {
        let kp = KeyPair::generate();
        let ku = sample_ku();
        let signed = sign_ku(&ku, &kp).unwrap();
        let pub_pem = kp.public_key_pem().unwrap();
        assert_eq!(
            verify_ku_with_pub_pem(&signed, Some(&pub_pem)),
            VerifyOutcome::Ok
        );
    }

    #[test]
    fn forged_key_id_is_detected() {
        let kp = KeyPair::generate();
        let ku = sample_ku();
        let mut signed = sign_ku(&ku, &kp).unwrap();
        if let Some(sig) = signed.sig.as_mut() {
            sig.key_id = "forged".into();
        }
        assert_eq!(verify_ku(&signed), VerifyOutcome::KeyIdMismatch);
    }
}
