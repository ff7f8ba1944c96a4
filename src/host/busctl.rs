//! Host collaborators backed by the `busctl` command-line tool

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::command::{resolve_binary, run};
use super::{BootProgress, DiagnosticLogger, DumpLogEvent, HostError, HostState, HostStateProvider};

const OBJECT_MAPPER_SERVICE: &str = "xyz.openbmc_project.ObjectMapper";
const OBJECT_MAPPER_PATH: &str = "/xyz/openbmc_project/object_mapper";
const HOST_STATE_SERVICE: &str = "xyz.openbmc_project.State.Host";
const HOST_STATE_PATH: &str = "/xyz/openbmc_project/state/host0";
const HOST_STATE_INTERFACE: &str = "xyz.openbmc_project.State.Host";
const BOOT_PROGRESS_INTERFACE: &str = "xyz.openbmc_project.State.Boot.Progress";

const LOGGING_SERVICE: &str = "xyz.openbmc_project.Logging";
const LOGGING_PATH: &str = "/xyz/openbmc_project/logging";
const LOGGING_CREATE_INTERFACE: &str = "xyz.openbmc_project.Logging.Create";
const DUMP_ERROR_INTERFACE: &str = "org.open_power.Dump.Error.Dump";
const INFORMATIONAL_SEVERITY: &str = "xyz.openbmc_project.Logging.Entry.Level.Informational";

/// Reads host state properties with `busctl get-property`
#[derive(Debug, Clone)]
pub struct BusctlHostState {
    busctl: PathBuf,
    timeout: Duration,
}

impl BusctlHostState {
    pub fn new(timeout: Duration) -> Self {
        Self::with_path(resolve_binary("busctl"), timeout)
    }

    pub fn with_path(busctl: PathBuf, timeout: Duration) -> Self {
        Self { busctl, timeout }
    }

    /// Find the service implementing `interface` on `path`, falling back to
    /// the well-known host state service when the mapper has no answer.
    async fn service_for(&self, interface: &str) -> String {
        let args = vec![
            "call".to_string(),
            OBJECT_MAPPER_SERVICE.to_string(),
            OBJECT_MAPPER_PATH.to_string(),
            OBJECT_MAPPER_SERVICE.to_string(),
            "GetObject".to_string(),
            "sas".to_string(),
            HOST_STATE_PATH.to_string(),
            "1".to_string(),
            interface.to_string(),
        ];
        match run(&self.busctl, &args, self.timeout).await {
            Ok(output) => parse_mapper_service(&output).unwrap_or_else(|| {
                tracing::warn!(interface, output = %output, "Empty mapper response");
                HOST_STATE_SERVICE.to_string()
            }),
            Err(e) => {
                tracing::warn!(interface, error = %e, "Mapper lookup failed");
                HOST_STATE_SERVICE.to_string()
            }
        }
    }

    async fn property(&self, interface: &str, property: &str) -> Result<String, HostError> {
        let service = self.service_for(interface).await;
        let args = vec![
            "get-property".to_string(),
            service,
            HOST_STATE_PATH.to_string(),
            interface.to_string(),
            property.to_string(),
        ];
        let output = run(&self.busctl, &args, self.timeout).await?;
        parse_string_property(&output)
    }
}

#[async_trait]
impl HostStateProvider for BusctlHostState {
    async fn host_state(&self) -> Result<HostState, HostError> {
        let value = self
            .property(HOST_STATE_INTERFACE, "CurrentHostState")
            .await?;
        value
            .parse()
            .map_err(|_| HostError::UnexpectedOutput(format!("host state {}", value)))
    }

    async fn boot_progress(&self) -> Result<BootProgress, HostError> {
        let value = self
            .property(BOOT_PROGRESS_INTERFACE, "BootProgress")
            .await?;
        value
            .parse()
            .map_err(|_| HostError::UnexpectedOutput(format!("boot progress {}", value)))
    }
}

/// Records dump events through the logging service's `Create` method
#[derive(Debug, Clone)]
pub struct BusctlDiagnosticLogger {
    busctl: PathBuf,
    timeout: Duration,
}

impl BusctlDiagnosticLogger {
    pub fn new(timeout: Duration) -> Self {
        Self::with_path(resolve_binary("busctl"), timeout)
    }

    pub fn with_path(busctl: PathBuf, timeout: Duration) -> Self {
        Self { busctl, timeout }
    }

    fn create_args(event: &DumpLogEvent) -> Vec<String> {
        vec![
            "call".to_string(),
            LOGGING_SERVICE.to_string(),
            LOGGING_PATH.to_string(),
            LOGGING_CREATE_INTERFACE.to_string(),
            "Create".to_string(),
            "ssa{ss}".to_string(),
            DUMP_ERROR_INTERFACE.to_string(),
            INFORMATIONAL_SEVERITY.to_string(),
            "3".to_string(),
            "Dump ID".to_string(),
            event.dump_id.to_string(),
            "File Name".to_string(),
            event.file_path.display().to_string(),
            "Dump Type".to_string(),
            event.file_type.clone(),
        ]
    }
}

#[async_trait]
impl DiagnosticLogger for BusctlDiagnosticLogger {
    async fn log_dump_event(&self, event: &DumpLogEvent) -> Result<(), HostError> {
        run(&self.busctl, &Self::create_args(event), self.timeout).await?;
        Ok(())
    }
}

/// Extract the value of a `s "..."` reply
fn parse_string_property(output: &str) -> Result<String, HostError> {
    let value = output
        .trim()
        .strip_prefix("s ")
        .ok_or_else(|| HostError::UnexpectedOutput(output.to_string()))?;
    Ok(value.trim().trim_matches('"').to_string())
}

/// Extract the first service name from an `a{sas}` mapper reply
fn parse_mapper_service(output: &str) -> Option<String> {
    let mut parts = output.split_whitespace();
    if parts.next()? != "a{sas}" {
        return None;
    }
    let count: usize = parts.next()?.parse().ok()?;
    if count == 0 {
        return None;
    }
    parts.next().map(|s| s.trim_matches('"').to_string())
}
