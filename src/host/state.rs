//! Host power and boot progress states

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const HOST_STATE_PREFIX: &str = "xyz.openbmc_project.State.Host.HostState.";
const BOOT_PROGRESS_PREFIX: &str = "xyz.openbmc_project.State.Boot.Progress.ProgressStages.";

/// Current power state of the managed host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostState {
    Off,
    Running,
    TransitioningToRunning,
    TransitioningToOff,
    Standby,
    Quiesced,
    DiagnosticMode,
}

impl HostState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostState::Off => "Off",
            HostState::Running => "Running",
            HostState::TransitioningToRunning => "TransitioningToRunning",
            HostState::TransitioningToOff => "TransitioningToOff",
            HostState::Standby => "Standby",
            HostState::Quiesced => "Quiesced",
            HostState::DiagnosticMode => "DiagnosticMode",
        }
    }
}

impl FromStr for HostState {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.strip_prefix(HOST_STATE_PREFIX).unwrap_or(value) {
            "Off" => Ok(HostState::Off),
            "Running" => Ok(HostState::Running),
            "TransitioningToRunning" => Ok(HostState::TransitioningToRunning),
            "TransitioningToOff" => Ok(HostState::TransitioningToOff),
            "Standby" => Ok(HostState::Standby),
            "Quiesced" => Ok(HostState::Quiesced),
            "DiagnosticMode" => Ok(HostState::DiagnosticMode),
            _ => Err(()),
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boot progress stage reported by the host firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootProgress {
    Unspecified,
    PrimaryProcInit,
    BusInit,
    MemoryInit,
    SecondaryProcInit,
    PCIInit,
    SystemSetup,
    SystemInitComplete,
    OSStart,
    OSRunning,
    MotherboardInit,
}

impl BootProgress {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootProgress::Unspecified => "Unspecified",
            BootProgress::PrimaryProcInit => "PrimaryProcInit",
            BootProgress::BusInit => "BusInit",
            BootProgress::MemoryInit => "MemoryInit",
            BootProgress::SecondaryProcInit => "SecondaryProcInit",
            BootProgress::PCIInit => "PCIInit",
            BootProgress::SystemSetup => "SystemSetup",
            BootProgress::SystemInitComplete => "SystemInitComplete",
            BootProgress::OSStart => "OSStart",
            BootProgress::OSRunning => "OSRunning",
            BootProgress::MotherboardInit => "MotherboardInit",
        }
    }

    /// Stages at which the host counts as running
    pub fn is_host_running(&self) -> bool {
        matches!(
            self,
            BootProgress::SystemInitComplete
                | BootProgress::SystemSetup
                | BootProgress::OSStart
                | BootProgress::OSRunning
                | BootProgress::PCIInit
        )
    }
}

impl FromStr for BootProgress {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.strip_prefix(BOOT_PROGRESS_PREFIX).unwrap_or(value) {
            "Unspecified" => Ok(BootProgress::Unspecified),
            "PrimaryProcInit" => Ok(BootProgress::PrimaryProcInit),
            "BusInit" => Ok(BootProgress::BusInit),
            "MemoryInit" => Ok(BootProgress::MemoryInit),
            "SecondaryProcInit" => Ok(BootProgress::SecondaryProcInit),
            "PCIInit" => Ok(BootProgress::PCIInit),
            "SystemSetup" => Ok(BootProgress::SystemSetup),
            "SystemInitComplete" => Ok(BootProgress::SystemInitComplete),
            "OSStart" => Ok(BootProgress::OSStart),
            "OSRunning" => Ok(BootProgress::OSRunning),
            "MotherboardInit" => Ok(BootProgress::MotherboardInit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BootProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a system dump may be requested given the host's state.
///
/// The host must be running, quiesced, or on its way off.
pub fn dump_allowed(progress: BootProgress, state: HostState) -> bool {
    progress.is_host_running()
        || matches!(state, HostState::Quiesced | HostState::TransitioningToOff)
}
