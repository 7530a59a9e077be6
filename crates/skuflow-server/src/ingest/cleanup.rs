//! Source cleanup policy
//!
//! Decides, once a run has reached a terminal state, whether the source
//! artifact is removed. Cleanup is best-effort: it can never change a run
//! outcome that has already been determined.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// What to do with the source artifact after the run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Delete regardless of outcome
    #[default]
    Always,
    /// Delete only when the run completed
    Success,
    /// Always retain
    Never,
}

impl CleanupPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupPolicy::Always => "always",
            CleanupPolicy::Success => "success",
            CleanupPolicy::Never => "never",
        }
    }

    /// Strict parse; configuration loading treats a failure here as fatal at
    /// process start.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "always" => Ok(CleanupPolicy::Always),
            "success" => Ok(CleanupPolicy::Success),
            "never" => Ok(CleanupPolicy::Never),
            other => Err(anyhow::anyhow!(
                "Invalid cleanup policy: {} (must be 'always', 'success', or 'never')",
                other
            )),
        }
    }

    /// Lenient parse for values that arrive outside startup validation; an
    /// unrecognized value behaves as `Never` with a diagnostic.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or_else(|_| {
            warn!(policy = %s, "Unrecognized cleanup policy, retaining source artifact");
            CleanupPolicy::Never
        })
    }

    /// The decision matrix: `always` deletes regardless, `success` deletes
    /// only on a completed run, `never` retains.
    pub fn should_delete(&self, run_succeeded: bool) -> bool {
        match self {
            CleanupPolicy::Always => true,
            CleanupPolicy::Success => run_succeeded,
            CleanupPolicy::Never => false,
        }
    }
}

impl std::fmt::Display for CleanupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Apply the policy to the source artifact.
///
/// Deletion failures (already removed, permissions) are logged and swallowed.
pub fn apply_cleanup(policy: CleanupPolicy, source_path: &Path, run_succeeded: bool) {
    if !policy.should_delete(run_succeeded) {
        info!(
            path = %source_path.display(),
            policy = %policy,
            "Keeping source artifact"
        );
        return;
    }

    info!(
        path = %source_path.display(),
        policy = %policy,
        run_succeeded,
        "Deleting source artifact"
    );

    if let Err(e) = std::fs::remove_file(source_path) {
        warn!(
            path = %source_path.display(),
            error = %e,
            "Failed to delete source artifact"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_matrix() {
        assert!(CleanupPolicy::Always.should_delete(true));
        assert!(CleanupPolicy::Always.should_delete(false));

        assert!(CleanupPolicy::Success.should_delete(true));
        assert!(!CleanupPolicy::Success.should_delete(false));

        assert!(!CleanupPolicy::Never.should_delete(true));
        assert!(!CleanupPolicy::Never.should_delete(false));
    }

    #[test]
    fn test_parse_strict() {
        assert_eq!(CleanupPolicy::parse("always").unwrap(), CleanupPolicy::Always);
        assert_eq!(CleanupPolicy::parse("SUCCESS").unwrap(), CleanupPolicy::Success);
        assert_eq!(CleanupPolicy::parse("never").unwrap(), CleanupPolicy::Never);
        assert!(CleanupPolicy::parse("sometimes").is_err());
    }

    #[test]
    fn test_parse_lenient_falls_back_to_never() {
        assert_eq!(CleanupPolicy::parse_lenient("sometimes"), CleanupPolicy::Never);
        assert_eq!(CleanupPolicy::parse_lenient("always"), CleanupPolicy::Always);
    }

    #[test]
    fn test_apply_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");
        std::fs::write(&path, "sku,name\n").unwrap();

        apply_cleanup(CleanupPolicy::Always, &path, false);
        assert!(!path.exists());
    }

    #[test]
    fn test_apply_retains_on_failed_run_with_success_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.csv");
        std::fs::write(&path, "sku,name\n").unwrap();

        apply_cleanup(CleanupPolicy::Success, &path, false);
        assert!(path.exists());
    }

    #[test]
    fn test_apply_missing_file_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.csv");

        // Must not panic or surface an error
        apply_cleanup(CleanupPolicy::Always, &path, true);
    }
}
