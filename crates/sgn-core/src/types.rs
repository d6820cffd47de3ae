//! Core KU (Knowledge Unit) types (spec §3).
//!
//! Field order here is cosmetic only — canonical encoding always goes
//! through [`crate::canonical`], which re-derives key order from the
//! JSON object representation rather than struct declaration order.

use serde::{Deserialize, Serialize};

/// Schema identifier for the current wire format.
pub const SCHEMA_ID: &str = "ku.v1";

/// Default content type for a KU payload.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Provenance block: who produced this KU.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    /// PEM-encoded public key of the signer, or `None` if unattributed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_pubkey: Option<String>,
}

/// Signature block attached to a signed KU.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    /// Signature algorithm identifier. Always `"Ed25519"` today.
    pub algorithm: String,
    /// Fingerprint of the signing public key (spec §4.2).
    pub key_id: String,
    /// base64url-encoded Ed25519 signature over canonical bytes.
    pub signature: String,
    /// PEM-encoded public key used to produce the signature.
    pub pub_pem: String,
}

/// A Knowledge Unit: the atomic signed record exchanged by the network.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ku {
    /// KU type tag, e.g. `"ku.patch.migration"`.
    #[serde(rename = "type")]
    pub ku_type: String,

    /// Schema identifier. Expected to be [`SCHEMA_ID`].
    #[serde(default = "default_schema_id")]
    pub schema_id: String,

    /// MIME type of `payload`.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Opaque structured payload content (title, description, severity, …).
    pub payload: serde_json::Value,

    /// CIDs of parent KUs, in insertion order.
    #[serde(default)]
    pub parents: Vec<String>,

    /// CIDs of source KUs, in insertion order.
    #[serde(default)]
    pub sources: Vec<String>,

    /// CIDs of test KUs, in insertion order.
    #[serde(default)]
    pub tests: Vec<String>,

    /// Provenance metadata.
    #[serde(default)]
    pub provenance: Provenance,

    /// Free-form tag set. Order is not semantically meaningful; the
    /// canonical encoder sorts and dedups this field before hashing.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Signature block, absent on an unsigned KU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<Signature>,
}

fn default_schema_id() -> String {
    SCHEMA_ID.to_string()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

impl Ku {
    /// Returns a copy of this KU with `sig` cleared.
    pub fn without_signature(&self) -> Ku {
        let mut ku = self.clone();
        ku.sig = None;
        ku
    }

    /// Convenience accessor: `payload.title`, if present and a string.
    pub fn title(&self) -> Option<&str> {
        self.payload.get("title").and_then(|v| v.as_str())
    }

    /// Convenience accessor: `payload.description`, if present and a string.
    pub fn description(&self) -> Option<&str> {
        self.payload.get("description").and_then(|v| v.as_str())
    }

    /// Convenience accessor: `payload.solution`, if present and a string.
    pub fn solution(&self) -> Option<&str> {
        self.payload.get("solution").and_then(|v| v.as_str())
    }

    /// Convenience accessor: `payload.severity`, if present and a string.
    pub fn severity(&self) -> Option<&str> {
        self.payload.get("severity").and_then(|v| v.as_str())
    }

    /// Convenience accessor: `payload.confidence`, if present and numeric.
    pub fn confidence(&self) -> Option<f64> {
        self.payload.get("confidence").and_then(|v| v.as_f64())
    }

    /// Convenience accessor: `payload.affected_systems`, if present.
    pub fn affected_systems(&self) -> Vec<String> {
        self.payload
            .get("affected_systems")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Convenience accessor: `payload.discovered_by`, if present.
    pub fn discovered_by(&self) -> Option<&str> {
        self.payload.get("discovered_by").and_then(|v| v.as_str())
    }
}

/// Edge relation type (spec §3).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    AppliesTo,
    Verifies,
    Supersedes,
    ConflictsWith,
}

impl EdgeType {
    /// All edge types accepted by the allow set (spec §6).
    pub const ALL: [EdgeType; 4] = [
        EdgeType::AppliesTo,
        EdgeType::Verifies,
        EdgeType::Supersedes,
        EdgeType::ConflictsWith,
    ];

    /// Parse from the wire string representation.
    pub fn parse(s: &str) -> Option<EdgeType> {
        match s {
            "applies_to" => Some(EdgeType::AppliesTo),
            "verifies" => Some(EdgeType::Verifies),
            "supersedes" => Some(EdgeType::Supersedes),
            "conflicts_with" => Some(EdgeType::ConflictsWith),
            _ => None,
        }
    }

    /// The wire string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::AppliesTo => "applies_to",
            EdgeType::Verifies => "verifies",
            EdgeType::Supersedes => "supersedes",
            EdgeType::ConflictsWith => "conflicts_with",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed directed edge between two KUs (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_key_id: Option<String>,
    pub created_at: i64,
}

/// Derived search/listing projection of a stored KU (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KuRecord {
    pub cid: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub ku_type: String,
    pub description: Option<String>,
    pub solution: Option<String>,
    pub severity: Option<String>,
    pub confidence: Option<f64>,
    pub tags: Vec<String>,
    pub affected_systems: Vec<String>,
    pub discovered_by: Option<String>,
    /// Equal to `cid`; kept for API shape parity with spec §3.
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    pub reputation_score: f64,
    pub created_at: i64,
    pub accessed_at: i64,
    pub access_count: i64,
}

impl KuRecord {
    /// Build the index projection of a KU that has just been accepted.
    pub fn from_ku(cid: &str, ku: &Ku, now_ms: i64) -> KuRecord {
        let mut tags = ku.tags.clone();
        tags.sort();
        tags.dedup();

        KuRecord {
            cid: cid.to_string(),
            title: ku.title().map(str::to_string),
            ku_type: ku.ku_type.clone(),
            description: ku.description().map(str::to_string),
            solution: ku.solution().map(str::to_string),
            severity: ku.severity().map(str::to_string),
            confidence: ku.confidence(),
            tags,
            affected_systems: ku.affected_systems(),
            discovered_by: ku.discovered_by().map(str::to_string),
            hash: cid.to_string(),
            signature: ku.sig.clone(),
            reputation_score: 0.5,
            created_at: now_ms,
            accessed_at: now_ms,
            access_count: 0,
        }
    }
}

/// Structured search query over the object store (spec §4.4).
#[derive(Clone, Debug, Default)]
pub struct SearchQuery {
    pub ku_type: Option<String>,
    pub severity: Option<String>,
    pub min_confidence: Option<f64>,
    pub tags: Vec<String>,
    pub affected_systems: Vec<String>,
    pub text: Option<String>,
    pub limit: u32,
}

/// Default/maximum result-set sizes for [`SearchQuery`] (spec §4.4).
pub const SEARCH_DEFAULT_LIMIT: u32 = 10;
pub const SEARCH_MAX_LIMIT: u32 = 100;

impl SearchQuery {
    /// Clamp `limit` into `[1, SEARCH_MAX_LIMIT]`, defaulting to
    /// [`SEARCH_DEFAULT_LIMIT`] when unset or zero.
    pub fn normalized_limit(&self) -> u32 {
        match self.limit {
            0 => SEARCH_DEFAULT_LIMIT,
            n => n.min(SEARCH_MAX_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_type_round_trip() {
        for et in EdgeType::ALL {
            assert_eq!(EdgeType::parse(et.as_str()), Some(et));
        }
        assert_eq!(EdgeType::parse("bogus"), None);
    }

    #[test]
    fn ku_record_sorts_and_dedups_tags() {
        let ku = Ku {
            ku_type: "ku.patch.migration".into(),
            schema_id: SCHEMA_ID.into(),
            content_type: DEFAULT_CONTENT_TYPE.into(),
            payload: serde_json::json!({"title": "t"}),
            parents: vec![],
            sources: vec![],
            tests: vec![],
            provenance: Provenance::default(),
            tags: vec!["b".into(), "a".into(), "a".into()],
            sig: None,
        };
        let record = KuRecord::from_ku("cid-blake3:abc", &ku, 1000);
        assert_eq!(record.tags, vec!["a".to_string(), "b".to_string()]);
    }
}
