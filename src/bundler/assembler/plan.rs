//! Merge planning for the staging tree.
//!
//! Deciding what to copy is a pure function of what is already staged and
//! what is offered; the assembler only carries the plan out. The first copy
//! of a destination path always wins.

use crate::bundler::Warning;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Staged files keyed by path relative to the staging root, valued by SHA-256.
pub type DestinationState = BTreeMap<PathBuf, String>;

/// A file offered for staging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingFile {
    /// Path relative to the staging root (`<platform>/<file>`)
    pub destination: PathBuf,
    /// Where the file was collected from
    pub origin: PathBuf,
    /// File contents
    pub contents: Vec<u8>,
    /// SHA-256 of `contents`
    pub sha256: String,
}

/// An incoming file that lost to an earlier copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exclusion {
    /// Contested destination
    pub destination: PathBuf,
    /// Where the excluded copy came from
    pub origin: PathBuf,
    /// Digest of the copy that stays
    pub kept_sha256: String,
    /// Digest of the excluded copy
    pub excluded_sha256: String,
}

impl Exclusion {
    /// Warning surfaced to the operator for this exclusion.
    pub fn warning(&self) -> Warning {
        Warning::DuplicateArtifactCollision {
            path: self.destination.clone(),
            kept_sha256: self.kept_sha256.clone(),
            excluded_sha256: self.excluded_sha256.clone(),
        }
    }
}

/// Outcome of [`plan_merge`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Files to write, in offer order
    pub copies: Vec<IncomingFile>,
    /// Files that will not be written
    pub exclusions: Vec<Exclusion>,
}

/// Plans a merge of `incoming` into `existing`.
///
/// A destination already present in `existing`, or offered earlier in
/// `incoming`, keeps its first copy; later copies become exclusions.
pub fn plan_merge(existing: &DestinationState, incoming: Vec<IncomingFile>) -> MergePlan {
    let mut claimed = existing.clone();
    let mut plan = MergePlan::default();

    for file in incoming {
        match claimed.get(&file.destination) {
            Some(kept) => plan.exclusions.push(Exclusion {
                destination: file.destination,
                origin: file.origin,
                kept_sha256: kept.clone(),
                excluded_sha256: file.sha256,
            }),
            None => {
                claimed.insert(file.destination.clone(), file.sha256.clone());
                plan.copies.push(file);
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::builder::checksum::sha256_bytes;

    fn incoming(dest: &str, origin: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            destination: dest.into(),
            origin: origin.into(),
            contents: bytes.to_vec(),
            sha256: sha256_bytes(bytes),
        }
    }

    #[test]
    fn already_staged_file_is_kept() {
        let mut existing = DestinationState::new();
        existing.insert("linux-x86-64/libeinvoice.so".into(), sha256_bytes(b"first"));

        let plan = plan_merge(
            &existing,
            vec![incoming("linux-x86-64/libeinvoice.so", "/ci/b", b"second")],
        );

        assert!(plan.copies.is_empty());
        assert_eq!(plan.exclusions.len(), 1);
        assert_eq!(plan.exclusions[0].kept_sha256, sha256_bytes(b"first"));
        assert_eq!(plan.exclusions[0].excluded_sha256, sha256_bytes(b"second"));
    }

    #[test]
    fn first_offer_wins_within_one_merge() {
        let plan = plan_merge(
            &DestinationState::new(),
            vec![
                incoming("linux-x86-64/libeinvoice.so", "/ci/a", b"first"),
                incoming("darwin-aarch64/libeinvoice.dylib", "/ci/a", b"mac"),
                incoming("linux-x86-64/libeinvoice.so", "/ci/b", b"second"),
            ],
        );

        assert_eq!(plan.copies.len(), 2);
        assert_eq!(plan.copies[0].contents, b"first");
        assert_eq!(plan.exclusions[0].origin, PathBuf::from("/ci/b"));
        assert!(matches!(
            plan.exclusions[0].warning(),
            Warning::DuplicateArtifactCollision { .. }
        ));
    }
}
