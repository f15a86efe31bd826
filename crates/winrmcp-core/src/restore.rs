//! Restore and cleanup phases.
//!
//! Both run once per transfer, each in a shell of its own, after every
//! upload session has been closed.

use crate::error::{CopyError, CopyErrorKind, CopyResult};
use crate::remote::RemoteClient;
use crate::runner::CommandRunner;
use crate::scripts::v1;
use crate::session::with_shell;

pub const RESTORE_OPERATION: &str = "restore";
pub const CLEANUP_OPERATION: &str = "cleanup";

/// Decode the uploaded temp file into `to_path`.
///
/// Fails with [`CopyErrorKind::DestinationIsDirectory`] when `to_path` is an
/// existing directory; the directory is left untouched.
pub async fn restore_content(
    client: &dyn RemoteClient,
    runner: &CommandRunner,
    from_path: &str,
    to_path: &str,
) -> CopyResult<()> {
    let script = v1::restore(from_path, to_path);

    with_shell(client, |shell| async move {
        runner
            .run(&*shell, &script, RESTORE_OPERATION)
            .await
            .map_err(classify_restore_error)
    })
    .await
}

fn classify_restore_error(e: CopyError) -> CopyError {
    match e.exit_code {
        Some(v1::DIRECTORY_CONFLICT_EXIT_CODE) => e
            .reclassify(CopyErrorKind::DestinationIsDirectory)
            .context("Destination is an existing directory"),
        Some(_) => e.reclassify(CopyErrorKind::Restore),
        None => e,
    }
}

/// Remove the temp file. Succeeds when it is already gone.
pub async fn cleanup_content(
    client: &dyn RemoteClient,
    runner: &CommandRunner,
    path: &str,
) -> CopyResult<()> {
    let script = v1::cleanup(path);

    with_shell(client, |shell| async move {
        runner
            .run(&*shell, &script, CLEANUP_OPERATION)
            .await
            .map_err(|e| match e.exit_code {
                Some(_) => e.reclassify(CopyErrorKind::Cleanup),
                None => e,
            })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryRemote;

    #[test]
    fn test_exit_one_is_directory_conflict() {
        let err = classify_restore_error(CopyError::command_failed(RESTORE_OPERATION, 1));
        assert!(err.is_directory_conflict());
        assert_eq!(err.exit_code, Some(1));
    }

    #[test]
    fn test_other_exit_is_restore_error() {
        let err = classify_restore_error(CopyError::command_failed(RESTORE_OPERATION, 5));
        assert_eq!(err.kind, CopyErrorKind::Restore);
        assert!(err.message.contains("code=5"));
    }

    #[test]
    fn test_submit_failure_keeps_kind() {
        let err = classify_restore_error(CopyError::session_creation("gone"));
        assert_eq!(err.kind, CopyErrorKind::SessionCreation);
    }

    const TEMP: &str = "$env:TEMP\\winrmcp-cleanup.tmp";

    #[tokio::test]
    async fn test_cleanup_removes_temp_file() {
        let remote = MemoryRemote::new();
        remote.put_file(TEMP, b"QUFB\r\n");

        cleanup_content(&remote, &CommandRunner::new(false), TEMP)
            .await
            .unwrap();
        assert!(!remote.exists(TEMP));
        assert_eq!(remote.shells()[0].close_count, 1);
    }

    #[tokio::test]
    async fn test_cleanup_of_absent_temp_file_succeeds() {
        let remote = MemoryRemote::new();

        cleanup_content(&remote, &CommandRunner::new(false), TEMP)
            .await
            .unwrap();
        assert_eq!(remote.shells().len(), 1);
        assert_eq!(remote.shells()[0].close_count, 1);
    }

    #[tokio::test]
    async fn test_cleanup_failure_carries_code() {
        let remote = MemoryRemote::new();
        remote.put_file(TEMP, b"QUFB\r\n");
        remote.fail_command("Remove-Item $tmp_file_path", 0, 4);

        let err = cleanup_content(&remote, &CommandRunner::new(false), TEMP)
            .await
            .unwrap_err();

        assert_eq!(err.kind, CopyErrorKind::Cleanup);
        assert_eq!(err.exit_code, Some(4));
        assert!(err.message.contains("code=4"));
        assert_eq!(remote.shells()[0].close_count, 1);
    }
}
