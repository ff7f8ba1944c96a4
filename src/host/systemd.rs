//! Capture launcher that activates the host crash target through systemd

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::command::{resolve_binary, run};
use super::{CaptureLauncher, HostError};

/// Unit that drives the host's out-of-band capture
pub const DEFAULT_CAPTURE_TARGET: &str = "obmc-host-crash@0.target";

#[derive(Debug, Clone)]
pub struct SystemdCaptureLauncher {
    systemctl: PathBuf,
    target: String,
    timeout: Duration,
}

impl SystemdCaptureLauncher {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self::with_path(resolve_binary("systemctl"), target, timeout)
    }

    pub fn with_path(systemctl: PathBuf, target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            systemctl,
            target: target.into(),
            timeout,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn start_args(&self) -> Vec<String> {
        vec![
            "start".to_string(),
            "--no-block".to_string(),
            "--job-mode=replace".to_string(),
            self.target.clone(),
        ]
    }
}

#[async_trait]
impl CaptureLauncher for SystemdCaptureLauncher {
    async fn start_capture(&self) -> Result<(), HostError> {
        tracing::info!(target_unit = %self.target, "Starting system dump capture");
        run(&self.systemctl, &self.start_args(), self.timeout).await?;
        Ok(())
    }
}
