//! The boundary between the timer devices and the gateway that exposes them.
//!
//! Devices never talk to the gateway directly. They hold a [`HostHandle`] and send
//! [`HostMessage`]s through it; whoever owns the receiving end (the Homie bridge in the
//! binary, a plain receiver in tests) turns them into registrations and notifications.

use std::fmt;

use homie5::{HomieDataType, HomieValue};
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::settings::CHANNEL_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    CountdownTimer,
    PrecisionTimer,
    RepeatingInterval,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::CountdownTimer => "timer",
            DeviceKind::PrecisionTimer => "precision-timer",
            DeviceKind::RepeatingInterval => "interval",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub title: &'static str,
    pub datatype: HomieDataType,
    pub read_only: bool,
    pub range: Option<(i64, i64)>,
    /// Current value, `None` until the device has produced one.
    pub value: Option<HomieValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Everything the host needs to expose a device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub description: String,
    pub properties: Vec<PropertySpec>,
    pub actions: Vec<ActionSpec>,
    pub events: Vec<EventSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    RegisterDevice(DeviceDescriptor),
    PropertyChanged {
        device_id: String,
        property: &'static str,
        value: HomieValue,
    },
    Event {
        device_id: String,
        event: &'static str,
    },
}

/// Fire-and-forget sender for host notifications.
#[derive(Debug, Clone)]
pub struct HostHandle {
    sender: Sender<HostMessage>,
}

impl HostHandle {
    pub fn new() -> (Self, Receiver<HostMessage>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        (Self { sender }, receiver)
    }

    async fn send(&self, message: HostMessage) {
        if let Err(err) = self.sender.send(message).await {
            log::warn!("Host is gone, dropping notification: {:?}", err.0);
        }
    }

    pub async fn register_device(&self, descriptor: DeviceDescriptor) {
        self.send(HostMessage::RegisterDevice(descriptor)).await;
    }

    pub async fn notify_property_changed(&self, device_id: &str, property: &'static str, value: HomieValue) {
        self.send(HostMessage::PropertyChanged {
            device_id: device_id.to_string(),
            property,
            value,
        })
        .await;
    }

    pub async fn notify_event(&self, device_id: &str, event: &'static str) {
        self.send(HostMessage::Event {
            device_id: device_id.to_string(),
            event,
        })
        .await;
    }
}
