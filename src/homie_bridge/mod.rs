//! Exposes the timer devices on a Homie 5 MQTT broker.
//!
//! The bridge is a root device that owns one child device per timer. It consumes
//! [`HostMessage`]s from the registry and turns incoming set commands into [`AppEvent`]s.

use std::collections::{BTreeMap, HashMap};

use color_eyre::eyre::{self, eyre, Result};
use hc_homie5::{homie_device, run_homie_client, HomieClientEvent, HomieClientHandle, HomieDevice, MqttClientConfig};
use homie5::{
    device_description::{
        DeviceDescriptionBuilder, HomieNodeDescription, HomiePropertyDescription, HomiePropertyFormat,
    },
    HomieDataType, PropertyRef,
};
use tokio::sync::mpsc;

use crate::{
    app_state::AppEvent,
    host::{DeviceDescriptor, HostMessage},
    settings::Settings,
};

mod timer_device;

pub use timer_device::{TimerDevice, TIMER_NODE_ID};

const BRIDGE_NODE_ID: &str = "addon";
const PAIR_PROP_ID: &str = "pair";

pub(crate) fn homie_id(value: &str) -> Result<HomieID> {
    HomieID::try_from(value.to_string()).map_err(|e| eyre!("Invalid homie id '{}': {}", value, e))
}

#[homie_device]
pub struct HomieBridge {
    children: HashMap<String, TimerDevice>,
    node_id: HomieID,
    pair_prop: HomieID,
    app_event_sender: mpsc::Sender<AppEvent>,
    connected: bool,
}

impl HomieBridge {
    pub fn new(
        app_event_sender: mpsc::Sender<AppEvent>,
        settings: &Settings,
    ) -> Result<(Self, HomieClientHandle, mpsc::Receiver<HomieClientEvent>)> {
        let (homie_proto, last_will) =
            Homie5DeviceProtocol::new(settings.homie.controller_id.clone(), settings.homie.homie_domain.clone());

        let homie_client_options = MqttClientConfig::new(&settings.homie.hostname)
            .client_id(&settings.homie.client_id)
            .port(settings.homie.port)
            .username(&settings.homie.username)
            .password(&settings.homie.password)
            .last_will(Some(last_will));

        let (homie_client_handle, homie_client, homie_event_receiver) = run_homie_client(
            homie_client_options.to_mqtt_options(),
            homie_client_options.mqtt_channel_size,
        )?;

        let node_id = homie_id(BRIDGE_NODE_ID)?;
        let pair_prop = homie_id(PAIR_PROP_ID)?;
        let mut node_desc = HomieNodeDescription {
            name: Some("Timers add-on".to_string()),
            r#type: None,
            properties: BTreeMap::new(),
        };
        node_desc.properties.insert(
            pair_prop.clone(),
            HomiePropertyDescription {
                name: Some("Advertise devices".to_string()),
                datatype: HomieDataType::Boolean,
                format: HomiePropertyFormat::Empty,
                settable: true,
                retained: false,
                unit: None,
            },
        );

        let device_desc = DeviceDescriptionBuilder::new()
            .name(settings.homie.controller_name.clone())
            .add_node(node_id.clone(), node_desc)
            .build();

        Ok((
            Self {
                device_ref: DeviceRef::new(settings.homie.homie_domain.clone(), settings.homie.controller_id.clone()),
                status: HomieDeviceStatus::Init,
                device_desc,
                homie_proto,
                homie_client,
                children: HashMap::new(),
                node_id,
                pair_prop,
                app_event_sender,
                connected: false,
            },
            homie_client_handle,
            homie_event_receiver,
        ))
    }

    pub async fn handle_host_message(&mut self, message: HostMessage) -> Result<()> {
        match message {
            HostMessage::RegisterDevice(descriptor) => self.register_device(descriptor).await,
            HostMessage::PropertyChanged {
                device_id,
                property,
                value,
            } => {
                let connected = self.connected;
                match self.children.get_mut(&device_id) {
                    Some(child) => child.set_property(property, value, connected).await,
                    None => {
                        log::trace!("Property {} changed on unexposed device {}", property, device_id);
                        Ok(())
                    }
                }
            }
            HostMessage::Event { device_id, event } => {
                let Some(child) = self.children.get(&device_id) else {
                    log::trace!("Event {} on unexposed device {}", event, device_id);
                    return Ok(());
                };
                if !self.connected {
                    log::debug!("Not connected, dropping event {} of {}", event, device_id);
                    return Ok(());
                }
                child.emit_event(event).await
            }
        }
    }

    /// Adds or replaces the child device for `descriptor`.
    ///
    /// A descriptor with an id that is not a valid homie id is logged and skipped.
    async fn register_device(&mut self, descriptor: DeviceDescriptor) -> Result<()> {
        let child = match TimerDevice::new(&descriptor, &self.device_ref, &self.homie_proto, &self.homie_client) {
            Ok(child) => child,
            Err(err) => {
                log::error!("Cannot expose {} {} ({}): {}", descriptor.kind, descriptor.name, descriptor.id, err);
                return Ok(());
            }
        };
        let child_id = child.child_id().clone();
        let replaced = self.children.insert(descriptor.id.clone(), child).is_some();

        if !replaced {
            log::debug!("Exposing {} {} as {}", descriptor.kind, descriptor.name, child_id);
            self.device_desc.add_child(child_id);
            self.device_desc.update_version();
            if self.connected {
                self.status = HomieDeviceStatus::Init;
                self.publish_state().await?;
                self.publish_description().await?;
                self.status = HomieDeviceStatus::Ready;
                self.publish_state().await?;
            }
        }

        if self.connected {
            if let Some(child) = self.children.get_mut(&descriptor.id) {
                child.publish_device().await?;
            }
        }
        Ok(())
    }

    /// Publishes the bridge and all child devices after a (re)connect.
    pub async fn connected(&mut self) -> Result<()> {
        self.connected = true;
        self.publish_device().await?;
        for child in self.children.values_mut() {
            child.publish_device().await?;
        }
        Ok(())
    }

    pub fn disconnected(&mut self) {
        self.connected = false;
    }

    pub async fn disconnect_devices(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        for child in self.children.values_mut() {
            child.disconnect_device().await?;
        }
        self.disconnect_device().await?;
        Ok(())
    }

    pub async fn disconnect_client(&mut self) -> Result<()> {
        self.homie_client.disconnect().await?;
        Ok(())
    }

    async fn send_app_event(&self, event: AppEvent) -> Result<()> {
        self.app_event_sender.send(event).await?;
        Ok(())
    }
}

impl HomieDevice for HomieBridge {
    type ResultError = eyre::Error;

    async fn handle_set_command(&mut self, property: &PropertyRef, set_value: &str) -> Result<(), Self::ResultError> {
        if property.device_ref() == &self.device_ref {
            if property.node_id() == &self.node_id && property.prop_id() == &self.pair_prop {
                log::debug!("Advertise requested");
                self.send_app_event(AppEvent::StartPairing).await?;
            } else {
                log::debug!("Ignoring set command for {}/{}", property.node_id(), property.prop_id());
            }
            return Ok(());
        }

        let device_id = property.device_ref().device_id().to_string();
        if !self.children.contains_key(&device_id) {
            log::warn!("Set command for unknown device {}", device_id);
            return Ok(());
        }
        log::trace!("{}/{} set to {}", device_id, property.prop_id(), set_value);
        self.send_app_event(AppEvent::PerformAction {
            device_id,
            action: property.prop_id().to_string(),
        })
        .await
    }
}
