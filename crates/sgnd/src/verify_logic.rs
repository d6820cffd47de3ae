//! Shared verify+trust evaluation used by `POST /publish`, `POST /verify`,
//! and `POST /edges` (spec §4.2, §4.3, §4.7).

use sgn_core::Ku;
use sgn_crypto::verify_ku_with_pub_pem;
use sgn_trust::{TrustDecision, TrustPolicy};

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub ok: bool,
    pub trusted: bool,
    pub reason: Option<String>,
    pub trust_reason: Option<String>,
    pub key_id: Option<String>,
}

fn trust_gate(key_id: Option<String>, trust: &TrustPolicy) -> (bool, Option<String>) {
    let decision = key_id
        .as_deref()
        .map(|id| trust.decide(id))
        .unwrap_or(TrustDecision::UntrustedDenied);

    match decision {
        TrustDecision::Trusted => (true, None),
        TrustDecision::UntrustedWarn | TrustDecision::UntrustedDenied => {
            (false, Some("key_not_allowlisted".to_string()))
        }
    }
}

/// Runs signature verification then, if the signature is valid,
/// evaluates the signer's key against the current trust policy.
///
/// `pub_pem`, when given, must match the `pub_pem` embedded in `ku.sig`
/// (spec §8: "swapping pub invalidates verify(..).ok==false") — it is
/// not a substitute key to verify against, just a caller-side assertion
/// of which key it expects the KU to be signed by.
pub fn evaluate(ku: &Ku, trust: &TrustPolicy, pub_pem: Option<&str>) -> VerificationOutcome {
    let outcome = verify_ku_with_pub_pem(ku, pub_pem);
    if !outcome.is_ok() {
        return VerificationOutcome {
            ok: false,
            trusted: false,
            reason: Some(outcome.as_str().to_string()),
            trust_reason: None,
            key_id: None,
        };
    }

    let key_id = ku.sig.as_ref().map(|sig| sig.key_id.clone());
    let (trusted, trust_reason) = trust_gate(key_id.clone(), trust);

    VerificationOutcome {
        ok: true,
        trusted,
        reason: None,
        trust_reason,
        key_id,
    }
}

/// Evaluates a bare public key (no signed KU) against the trust policy,
/// for callers like `POST /edges` that only carry `pub_pem` (spec §6,
/// §4.7): derives `key_id` from the PEM and checks it against the
/// allow-list directly, with no signature to check.
pub fn evaluate_key(pub_pem: &str, trust: &TrustPolicy) -> VerificationOutcome {
    let key_id = match sgn_crypto::key_id_from_pem(pub_pem) {
        Ok(id) => id,
        Err(_) => {
            return VerificationOutcome {
                ok: false,
                trusted: false,
                reason: Some("decode_error".to_string()),
                trust_reason: None,
                key_id: None,
            };
        }
    };

    let (trusted, trust_reason) = trust_gate(Some(key_id.clone()), trust);

    VerificationOutcome {
        ok: true,
        trusted,
        reason: None,
        trust_reason,
        key_id: Some(key_id),
    }
}

/// Whether an enforce-mode caller must reject this outcome outright, and
/// with which error kind.
pub fn enforce_rejection(outcome: &VerificationOutcome, trust: &TrustPolicy) -> Option<sgn_core::ErrorKind> {
    use sgn_trust::TrustMode;

    if trust.current().mode != TrustMode::Enforce {
        return None;
    }
    if !outcome.ok {
        return Some(sgn_core::ErrorKind::VerifyFailed);
    }
    if !outcome.trusted {
        return Some(sgn_core::ErrorKind::UntrustedKey);
    }
    None
}
