//! Relation values carried by entities that reference other entities.

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// A reference to another stored entity.
///
/// Holds the target's surrogate id and, once resolved, the target's
/// fingerprint. Only the fingerprint takes part in hashing; a reference
/// built from a bare id stays unresolved until the store fills it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related<I> {
    pub id: I,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fingerprint: Option<Fingerprint>,
}

impl<I> Related<I> {
    /// An unresolved reference to `id`.
    pub fn new(id: I) -> Self {
        Related {
            id,
            fingerprint: None,
        }
    }

    /// A reference whose target fingerprint is already known.
    pub fn resolved(id: I, fingerprint: Fingerprint) -> Self {
        Related {
            id,
            fingerprint: Some(fingerprint),
        }
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.fingerprint.is_some()
    }

    /// Replaces the cached target fingerprint with the current one.
    pub fn resolve(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = Some(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::digest_parts;

    #[test]
    fn resolve_replaces_stale_fingerprint() {
        let mut rel = Related::resolved(3_i64, digest_parts(["old"]));
        rel.resolve(digest_parts(["new"]));
        assert_eq!(rel.fingerprint(), Some(&digest_parts(["new"])));
        assert_eq!(rel.id, 3);
    }

    #[test]
    fn unresolved_omits_fingerprint_in_json() {
        let rel = Related::new(5_i64);
        assert!(!rel.is_resolved());
        assert_eq!(serde_json::to_string(&rel).unwrap(), r#"{"id":5}"#);
    }
}
