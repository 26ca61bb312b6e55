//! SNMP port controller built on the net-snmp command-line tools.
//!
//! Reading runs
//!
//! ```text
//! snmpget -v1 -t 1 -r 1 -c private 192.168.1.73 enterprises.19865.1.2.1.33.0
//! SNMPv2-SMI::enterprises.19865.1.2.1.33.0 = INTEGER: 15
//! ```
//!
//! and decodes the integer into eight pins.  Writing runs `snmpset` with the
//! same target and an `i <value>` suffix.
//!
//! Both calls block for up to `timeout × (retries + 1)` seconds when the
//! device is unreachable; they are only ever called from tokio's blocking
//! pool by the port poller.

use std::process::Command;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;
use uicast_core::application::{PortController, PortError};
use uicast_core::{PinState, PortId};

use crate::domain::config::DeviceSection;

/// The device address, shared between the panel (which edits it) and the
/// controller (which reads it on every call).
#[derive(Debug, Clone)]
pub struct DeviceTarget(Arc<RwLock<String>>);

impl DeviceTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(host.into())))
    }

    pub fn host(&self) -> String {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_host(&self, host: &str) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = host.to_string();
    }
}

/// Everything about the SNMP invocation except the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpSettings {
    pub community: String,
    pub oid_template: String,
    pub timeout_secs: u32,
    pub retries: u32,
    pub snmpget: String,
    pub snmpset: String,
}

impl From<&DeviceSection> for SnmpSettings {
    fn from(section: &DeviceSection) -> Self {
        Self {
            community: section.community.clone(),
            oid_template: section.oid_template.clone(),
            timeout_secs: section.timeout_secs,
            retries: section.retries,
            snmpget: section.snmpget.clone(),
            snmpset: section.snmpset.clone(),
        }
    }
}

impl Default for SnmpSettings {
    fn default() -> Self {
        Self::from(&DeviceSection::default())
    }
}

#[derive(Debug, Clone)]
pub struct SnmpPortController {
    target: DeviceTarget,
    settings: SnmpSettings,
}

impl SnmpPortController {
    pub fn new(target: DeviceTarget, settings: SnmpSettings) -> Self {
        Self { target, settings }
    }

    /// The OID of `port`'s register.
    pub fn oid(&self, port: PortId) -> String {
        self.settings
            .oid_template
            .replace("{port}", &port.0.to_string())
    }

    /// Arguments shared by `snmpget` and `snmpset`, ending with the OID.
    fn base_args(&self, port: PortId) -> Vec<String> {
        vec![
            "-v1".to_string(),
            "-t".to_string(),
            self.settings.timeout_secs.to_string(),
            "-r".to_string(),
            self.settings.retries.to_string(),
            "-c".to_string(),
            self.settings.community.clone(),
            self.target.host(),
            self.oid(port),
        ]
    }

    pub fn get_args(&self, port: PortId) -> Vec<String> {
        self.base_args(port)
    }

    pub fn set_args(&self, port: PortId, value: u8) -> Vec<String> {
        let mut args = self.base_args(port);
        args.push("i".to_string());
        args.push(value.to_string());
        args
    }

    fn run(&self, program: &str, args: &[String]) -> Result<String, PortError> {
        debug!(program, args = %args.join(" "), "running SNMP command");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| PortError::Spawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(PortError::CommandFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PortController for SnmpPortController {
    fn read_port(&self, port: PortId) -> Result<PinState, PortError> {
        let stdout = self.run(&self.settings.snmpget, &self.get_args(port))?;
        let value = parse_snmp_integer(&stdout)
            .ok_or_else(|| PortError::UnexpectedResponse(stdout.trim().to_string()))?;
        Ok(PinState::from_bits((value & 0xFF) as u8))
    }

    fn write_port(&self, port: PortId, value: u8) -> Result<(), PortError> {
        self.run(&self.settings.snmpset, &self.set_args(port, value))
            .map(|_| ())
    }
}

/// Extracts `<n>` from a `... = INTEGER: <n>` line.
pub fn parse_snmp_integer(output: &str) -> Option<i64> {
    output.lines().find_map(|line| {
        let (_, value) = line.split_once("= INTEGER:")?;
        value.split_whitespace().next()?.parse().ok()
    })
}
