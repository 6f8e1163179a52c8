use crate::models::StatInfo;
use thiserror::Error;

/// Errors a remote stat commit can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error("Failed to store stat '{0}'")]
    StoreFailed(String),
}

/// Commit modified stats to the remote store.
///
/// Remote commit is disabled: saved achievement files are the only output.
/// Kept so callers can still branch on "count or failure"; always reports
/// zero stats committed.
pub fn commit_stats(modified: &[StatInfo]) -> Result<usize, CommitError> {
    tracing::info!(
        "Remote stat commit disabled, {} modified stats left uncommitted",
        modified.iter().filter(|stat| stat.is_modified()).count()
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntStatInfo;

    #[test]
    fn test_commit_is_a_no_op() {
        let stat = StatInfo::Integer(IntStatInfo {
            id: "kills".to_string(),
            display_name: "Kills".to_string(),
            value: 5,
            original_value: 1,
            increment_only: false,
            permission: 0,
        });
        assert_eq!(commit_stats(&[stat]), Ok(0));
        assert_eq!(commit_stats(&[]), Ok(0));
    }
}
