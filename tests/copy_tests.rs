use std::io::Write;
use std::sync::Arc;
use winrmcp::*;
use winrmcp_core::testing::MemoryRemote;

fn client(remote: &MemoryRemote, config: &WinrmcpConfig) -> Winrmcp {
    let mut config = config.clone();
    config.echo_remote_output = false;
    Winrmcp::new(Arc::new(remote.clone()), &config)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8 ^ 0x5a).collect()
}

#[tokio::test]
async fn test_copy_local_file() {
    let remote = MemoryRemote::new();
    let data = pattern(10_000);
    let mut local = tempfile::NamedTempFile::new().unwrap();
    local.write_all(&data).unwrap();

    let summary = client(&remote, &WinrmcpConfig::default())
        .copy(local.path(), "C:\\inbox\\payload.bin")
        .await
        .unwrap();

    assert_eq!(remote.file("C:\\inbox\\payload.bin").unwrap(), data);
    assert_eq!(summary.bytes_transferred, 10_000);
    assert_eq!(summary.chunks_per_session, vec![2]);
    assert!(remote.temp_files().is_empty());
}

#[tokio::test]
async fn test_large_copy_rotates_shells() {
    let remote = MemoryRemote::new();
    let data = pattern(20_000);
    let config = WinrmcpConfig {
        max_operations_per_shell: 2,
        ..WinrmcpConfig::default()
    };

    let summary = client(&remote, &config)
        .write("C:\\big.bin", &mut data.as_slice())
        .await
        .unwrap();

    // 5955-byte chunks under the default command limit.
    assert_eq!(summary.chunks_per_session, vec![2, 2, 0]);
    assert_eq!(remote.file("C:\\big.bin").unwrap(), data);
    for shell in remote.shells() {
        assert_eq!(shell.close_count, 1);
        assert!(shell.commands.iter().all(|c| c.len() <= 8000));
    }
    assert_eq!(remote.live_variables(), 0);
}

#[tokio::test]
async fn test_write_from_trickling_reader() {
    let remote = MemoryRemote::new();
    let mut reader = tokio_test::io::Builder::new()
        .read(b"hello ")
        .read(b"from ")
        .read(b"a slow source")
        .build();

    client(&remote, &WinrmcpConfig::default())
        .write("C:\\greeting.txt", &mut reader)
        .await
        .unwrap();

    assert_eq!(
        remote.file("C:\\greeting.txt").unwrap(),
        b"hello from a slow source".to_vec()
    );
}

#[tokio::test]
async fn test_source_error_is_reported() {
    let remote = MemoryRemote::new();
    let mut reader = tokio_test::io::Builder::new()
        .read(b"partial")
        .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset"))
        .build();

    let err = client(&remote, &WinrmcpConfig::default())
        .write("C:\\broken.bin", &mut reader)
        .await
        .unwrap_err();

    assert_eq!(err.kind, CopyErrorKind::SourceRead);
    assert!(err.message.contains("peer reset"));
    assert!(!remote.exists("C:\\broken.bin"));
    assert!(remote.shells().iter().all(|s| s.close_count == 1));
}

#[tokio::test]
async fn test_copy_empty_file() {
    let remote = MemoryRemote::new();
    let local = tempfile::NamedTempFile::new().unwrap();

    let summary = client(&remote, &WinrmcpConfig::default())
        .copy(local.path(), "C:\\empty.txt")
        .await
        .unwrap();

    assert_eq!(summary.total_chunks(), 0);
    assert_eq!(remote.file("C:\\empty.txt").unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn test_copy_directory_is_rejected() {
    let remote = MemoryRemote::new();
    let dir = tempfile::tempdir().unwrap();

    let err = client(&remote, &WinrmcpConfig::default())
        .copy(dir.path(), "C:\\dir")
        .await
        .unwrap_err();

    assert_eq!(err.kind, CopyErrorKind::InvalidConfig);
    assert!(err.message.starts_with("Copying directories is not supported"));
    assert!(remote.shells().is_empty());
}

#[tokio::test]
async fn test_copy_missing_file() {
    let remote = MemoryRemote::new();
    let dir = tempfile::tempdir().unwrap();

    let err = client(&remote, &WinrmcpConfig::default())
        .copy(dir.path().join("nope.bin"), "C:\\nope.bin")
        .await
        .unwrap_err();

    assert_eq!(err.kind, CopyErrorKind::SourceRead);
    assert!(err.message.starts_with("Couldn't read file"));
    assert!(remote.shells().is_empty());
}

#[tokio::test]
async fn test_copy_onto_remote_directory() {
    let remote = MemoryRemote::new();
    remote.mkdir("C:\\Program Files\\App");
    let mut local = tempfile::NamedTempFile::new().unwrap();
    local.write_all(b"data").unwrap();

    let err = client(&remote, &WinrmcpConfig::default())
        .copy(local.path(), "C:\\Program Files\\App")
        .await
        .unwrap_err();

    assert!(err.is_directory_conflict());
    assert!(remote.is_dir("C:\\Program Files\\App"));
}

#[tokio::test]
async fn test_shell_refused_on_restore() {
    let remote = MemoryRemote::new();
    // One upload shell, then nothing.
    remote.refuse_shells_after(1);

    let err = client(&remote, &WinrmcpConfig::default())
        .write("C:\\out.bin", &mut &b"abc"[..])
        .await
        .unwrap_err();

    assert_eq!(err.kind, CopyErrorKind::SessionCreation);
    assert!(err.message.starts_with("Error restoring file from"));
}

#[test]
fn test_config_file_with_env_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"maxOperationsPerShell": 7, "echoRemoteOutput": false}"#)
        .unwrap();

    let config = WinrmcpConfig::from_file(file.path())
        .unwrap()
        .with_overrides(|key| match key {
            config::ENV_DEBUG => Some("yes".to_string()),
            _ => None,
        })
        .unwrap();

    assert_eq!(config.max_operations_per_shell, 7);
    assert!(!config.echo_remote_output);
    assert!(config.verbose);

    let options = CopyOptions::from(&config);
    assert_eq!(options.max_operations_per_shell, 7);
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = WinrmcpConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.kind, CopyErrorKind::Io);
}

#[test]
fn test_error_converts_to_string() {
    let err = CopyError::invalid_config("bad limit");
    let s: String = err.into();
    assert!(s.contains("bad limit"));
}
