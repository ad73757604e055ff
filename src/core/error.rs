use thiserror::Error;

use crate::core::config::ConfigError;

/// Everything that can abort a sync run. All variants are fatal; the
/// scheduler's next invocation is the retry.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("config: {0}")]
    Configuration(#[from] ConfigError),

    #[error("hetzner {endpoint}: {cause:#}")]
    UpstreamUnavailable {
        endpoint: &'static str,
        cause: anyhow::Error,
    },

    #[error("no active servers found in hetzner account")]
    EmptyInventory,

    #[error("could not resolve pricing for any active server")]
    NoPriceableServers,

    #[error("internal: {0}")]
    AssertionFailure(String),

    #[error("coroot login failed: {0:#}")]
    Authentication(anyhow::Error),

    #[error("could not auto-discover coroot project; set COROOT_PROJECT explicitly")]
    ProjectDiscovery,

    #[error("coroot rejected pricing update: HTTP {status}: {body}")]
    UpdateRejected { status: u16, body: String },
}

impl SyncError {
    /// Process exit code, grouped by failing stage.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Configuration(_) => 2,
            SyncError::UpstreamUnavailable { .. } | SyncError::EmptyInventory => 3,
            SyncError::NoPriceableServers => 4,
            SyncError::Authentication(_)
            | SyncError::ProjectDiscovery
            | SyncError::UpdateRejected { .. } => 5,
            // 70 = EX_SOFTWARE: a coding defect, not a runtime condition
            SyncError::AssertionFailure(_) => 70,
        }
    }
}
