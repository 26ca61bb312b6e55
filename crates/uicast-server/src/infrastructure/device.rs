//! Connects the panel to the running port poller.

use uicast_core::application::{PinReading, PollerHandle};

use crate::application::panel::DeviceLink;
use crate::infrastructure::snmp::DeviceTarget;

/// [`DeviceLink`] backed by a [`PollerHandle`] and the shared
/// [`DeviceTarget`] the SNMP controller reads its host from.
#[derive(Debug, Clone)]
pub struct PolledDevice {
    target: DeviceTarget,
    poller: PollerHandle,
}

impl PolledDevice {
    pub fn new(target: DeviceTarget, poller: PollerHandle) -> Self {
        Self { target, poller }
    }
}

impl DeviceLink for PolledDevice {
    fn set_host(&self, host: &str) {
        self.target.set_host(host);
    }

    fn request_refresh(&self) {
        self.poller.request_refresh();
    }

    fn write_pins(&self, value: u8) {
        self.poller.actuate(value);
    }

    fn reading(&self) -> PinReading {
        self.poller.reading()
    }
}
