//! # winrmcp
//!
//! Copy files to a Windows host that exposes only remote PowerShell command
//! execution. The transfer engine lives in `winrmcp-core`; this crate adds
//! the client entry point, configuration loading and logging setup.
//!
//! ```ignore
//! let config = WinrmcpConfig::from_file("winrmcp.json")?.with_env_overrides()?;
//! logging::init_logging(config.verbose)?;
//! let cp = Winrmcp::new(remote, &config);
//! cp.copy("build/app.zip", "C:\\deploy\\app.zip").await?;
//! ```

pub mod client;
pub mod config;
pub mod logging;

pub use client::Winrmcp;
pub use config::WinrmcpConfig;
pub use winrmcp_core::{
    CopyError, CopyErrorKind, CopyOptions, CopyResult, RemoteClient, RemoteCommand, RemoteShell,
    TransferSummary,
};
