//! Credential registry and authorization queries.
//!
//! # Design Decisions
//! - Lookup by exact caller id; secrets compared by digest in constant time
//! - Unknown callers still pay for one digest comparison
//! - Revocation is a status, records are never removed by it
//! - Pure query over one snapshot; no side effects

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::capability::CapabilitySet;
use super::secret::SecretHash;

/// Lifecycle status of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    #[default]
    Active,
    Revoked,
}

/// One caller credential from `credentials.yaml`.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: String,
    pub secret_hash: SecretHash,
    pub capabilities: CapabilitySet,
    pub status: CredentialStatus,
}

/// Identity handed to handlers after a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CallerIdentity {
    /// Request to a public route; no credentials were checked.
    Anonymous,
    Authenticated {
        id: String,
        capabilities: CapabilitySet,
    },
}

impl CallerIdentity {
    pub fn id(&self) -> Option<&str> {
        match self {
            CallerIdentity::Anonymous => None,
            CallerIdentity::Authenticated { id, .. } => Some(id),
        }
    }
}

/// Why a request was not authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("missing caller credentials")]
    MissingCredentials,
    #[error("unknown caller")]
    UnknownCaller,
    #[error("bad secret")]
    BadSecret,
    #[error("credential revoked")]
    Revoked,
    #[error("insufficient capability")]
    InsufficientCapability,
}

impl Denied {
    /// `true` for denials that mean "who are you?" (401) rather than
    /// "you may not" (403).
    pub fn is_authentication_failure(&self) -> bool {
        !matches!(self, Denied::InsufficientCapability)
    }

    /// Metric/log label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Denied::MissingCredentials => "missing_credentials",
            Denied::UnknownCaller => "unknown_caller",
            Denied::BadSecret => "bad_secret",
            Denied::Revoked => "revoked",
            Denied::InsufficientCapability => "insufficient_capability",
        }
    }
}

/// Error raised when two records share an id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate credential id {0:?}")]
pub struct DuplicateCredential(pub String);

/// Credential index of one snapshot.
#[derive(Debug)]
pub struct CredentialRegistry {
    records: HashMap<String, CredentialRecord>,
    // Compared against when the caller id is unknown.
    decoy: SecretHash,
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            decoy: SecretHash::of(""),
        }
    }
}

impl CredentialRegistry {
    /// Index records by id, rejecting duplicates.
    pub fn from_records(
        records: impl IntoIterator<Item = CredentialRecord>,
    ) -> Result<Self, DuplicateCredential> {
        let mut registry = Self::default();
        for record in records {
            if registry.records.contains_key(&record.id) {
                return Err(DuplicateCredential(record.id));
            }
            registry.records.insert(record.id.clone(), record);
        }
        Ok(registry)
    }

    pub fn get(&self, id: &str) -> Option<&CredentialRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records with `Active` status.
    pub fn active_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.status == CredentialStatus::Active)
            .count()
    }

    /// Authenticate `caller_id`/`presented_secret` and check that the caller
    /// holds every capability in `required`.
    pub fn authorize(
        &self,
        caller_id: &str,
        presented_secret: &str,
        required: &CapabilitySet,
    ) -> Result<CallerIdentity, Denied> {
        let Some(record) = self.records.get(caller_id) else {
            let _ = std::hint::black_box(self.decoy.verify(std::hint::black_box(presented_secret)));
            return Err(Denied::UnknownCaller);
        };

        if !record.secret_hash.verify(presented_secret) {
            return Err(Denied::BadSecret);
        }
        if record.status == CredentialStatus::Revoked {
            return Err(Denied::Revoked);
        }
        if !required.is_subset(&record.capabilities) {
            return Err(Denied::InsufficientCapability);
        }

        Ok(CallerIdentity::Authenticated {
            id: record.id.clone(),
            capabilities: record.capabilities.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::capability::capability_set;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn record(id: &str, secret: &str, caps: &[&str], status: CredentialStatus) -> CredentialRecord {
        CredentialRecord {
            id: id.to_string(),
            secret_hash: SecretHash::of(secret),
            capabilities: capability_set(caps.iter().copied()),
            status,
        }
    }

    fn registry() -> CredentialRegistry {
        CredentialRegistry::from_records([
            record("svc-a", "alpha", &["read:accounts", "write:accounts"], CredentialStatus::Active),
            record("svc-b", "bravo", &[], CredentialStatus::Active),
            record("svc-old", "old", &["read:accounts"], CredentialStatus::Revoked),
        ])
        .unwrap()
    }

    #[test]
    fn test_authorized_with_superset() {
        let reg = registry();
        let identity = reg
            .authorize("svc-a", "alpha", &capability_set(["read:accounts"]))
            .unwrap();
        assert_eq!(identity.id(), Some("svc-a"));
    }

    #[test]
    fn test_empty_requirement_needs_only_authentication() {
        let reg = registry();
        assert!(reg.authorize("svc-b", "bravo", &CapabilitySet::new()).is_ok());
    }

    #[test]
    fn test_denial_reasons() {
        let reg = registry();
        let need = capability_set(["read:accounts"]);
        assert_eq!(reg.authorize("nobody", "x", &need), Err(Denied::UnknownCaller));
        assert_eq!(reg.authorize("svc-a", "wrong", &need), Err(Denied::BadSecret));
        assert_eq!(reg.authorize("svc-old", "old", &need), Err(Denied::Revoked));
        assert_eq!(
            reg.authorize("svc-b", "bravo", &need),
            Err(Denied::InsufficientCapability)
        );
    }

    #[test]
    fn test_unknown_caller_denied_even_when_secret_matches_decoy() {
        let reg = registry();
        assert_eq!(
            reg.authorize("nobody", "", &CapabilitySet::new()),
            Err(Denied::UnknownCaller)
        );
    }

    #[test]
    fn test_revoked_with_bad_secret_reports_bad_secret() {
        let reg = registry();
        assert_eq!(
            reg.authorize("svc-old", "guess", &CapabilitySet::new()),
            Err(Denied::BadSecret)
        );
    }

    #[test]
    fn test_strict_subset_is_denied() {
        let reg = registry();
        let need = capability_set(["read:accounts", "write:accounts", "admin"]);
        assert_eq!(
            reg.authorize("svc-a", "alpha", &need),
            Err(Denied::InsufficientCapability)
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = CredentialRegistry::from_records([
            record("dup", "a", &[], CredentialStatus::Active),
            record("dup", "b", &[], CredentialStatus::Revoked),
        ])
        .unwrap_err();
        assert_eq!(err, DuplicateCredential("dup".into()));
    }

    fn tags() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-z]{1,6}:[a-z]{1,8}", 0..6)
    }

    fn caller_with(held: &BTreeSet<String>) -> CredentialRegistry {
        CredentialRegistry::from_records([CredentialRecord {
            id: "svc".into(),
            secret_hash: SecretHash::of("pw"),
            capabilities: capability_set(held.iter().cloned()),
            status: CredentialStatus::Active,
        }])
        .unwrap()
    }

    proptest! {
        #[test]
        fn prop_held_superset_is_authorized(
            (held, required) in tags().prop_flat_map(|held| {
                let all: Vec<String> = held.iter().cloned().collect();
                let len = all.len();
                (Just(held), prop::sample::subsequence(all, 0..=len))
            })
        ) {
            let reg = caller_with(&held);
            let result = reg.authorize("svc", "pw", &capability_set(required));
            prop_assert!(result.is_ok());
        }

        #[test]
        fn prop_held_strict_subset_is_forbidden(
            held in tags(),
            missing in prop::collection::btree_set("[a-z]{1,6}:[A-Z]{1,8}", 1..4),
        ) {
            // Upper-case suffixes never collide with held tags.
            let reg = caller_with(&held);
            let required = capability_set(held.iter().chain(missing.iter()).cloned());
            prop_assert_eq!(
                reg.authorize("svc", "pw", &required),
                Err(Denied::InsufficientCapability)
            );
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(Denied::UnknownCaller.is_authentication_failure());
        assert!(Denied::Revoked.is_authentication_failure());
        assert!(!Denied::InsufficientCapability.is_authentication_failure());
        assert_eq!(registry().active_count(), 2);
    }
}
