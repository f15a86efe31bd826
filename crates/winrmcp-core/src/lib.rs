//! # winrmcp-core
//!
//! Uploads a byte stream to a Windows host that offers nothing but remote
//! PowerShell command execution. Architecture:
//! - `types` — options, summaries, protocol limits
//! - `error` — transfer error type
//! - `naming` — uuid-based temp file and variable names
//! - `chunk` — chunk sizing under the command length limit, base64 encoding
//! - `remote` — the client / shell / command capability consumed by the core
//! - `runner` — one synchronous remote command with concurrent output drains
//! - `scripts` — versioned PowerShell templates (append, restore, cleanup)
//! - `stream` — remote `StreamWriter` bound to a session variable
//! - `pipeline` — producer/consumer chunk writer for one shell
//! - `session` — shell rotation across the upload
//! - `restore` — restore and cleanup phases
//! - `copy` — end-to-end orchestration

pub mod chunk;
pub mod copy;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod remote;
pub mod restore;
pub mod runner;
pub mod scripts;
pub mod session;
pub mod stream;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use copy::copy_to;
pub use error::{CopyError, CopyErrorKind, CopyResult};
pub use remote::{OutputStream, RemoteClient, RemoteCommand, RemoteShell};
pub use runner::CommandRunner;
pub use types::*;
