use std::collections::{BTreeMap, HashMap};

use color_eyre::eyre::{self, Result};
use hc_homie5::{homie_device, HomieDevice};
use homie5::{
    device_description::{
        DeviceDescriptionBuilder, HomieNodeDescription, HomiePropertyDescription, HomiePropertyFormat,
    },
    HomieDataType, HomieValue, PropertyRef,
};

use crate::host::{DeviceDescriptor, PropertySpec};

use super::homie_id;

pub const TIMER_NODE_ID: &str = "timer";

/// Homie child device exposing one virtual timer.
///
/// Properties become retained values, actions settable non-retained booleans and events
/// non-retained booleans that are published as `true` whenever the event fires.
#[homie_device]
#[derive(Debug)]
pub struct TimerDevice {
    node_id: HomieID,
    values: HashMap<HomieID, HomieValue>,
}

impl TimerDevice {
    pub fn new(
        descriptor: &DeviceDescriptor,
        root_ref: &DeviceRef,
        homie_proto: &Homie5DeviceProtocol,
        homie_client: &HomieMQTTClient,
    ) -> Result<Self> {
        let device_id = homie_id(&descriptor.id)?;
        let homie_proto = homie_proto.clone_for_child(device_id.clone());
        let node_id = homie_id(TIMER_NODE_ID)?;

        let mut properties = BTreeMap::new();
        let mut values = HashMap::new();
        for prop in descriptor.properties.iter() {
            let prop_id = homie_id(prop.name)?;
            if let Some(value) = &prop.value {
                values.insert(prop_id.clone(), value.clone());
            }
            properties.insert(prop_id, property_description(prop));
        }
        for action in descriptor.actions.iter() {
            properties.insert(
                homie_id(action.name)?,
                HomiePropertyDescription {
                    name: Some(action.title.to_string()),
                    datatype: HomieDataType::Boolean,
                    format: HomiePropertyFormat::Empty,
                    settable: true,
                    retained: false,
                    unit: None,
                },
            );
        }
        for event in descriptor.events.iter() {
            properties.insert(
                homie_id(event.name)?,
                HomiePropertyDescription {
                    name: Some(event.description.to_string()),
                    datatype: HomieDataType::Boolean,
                    format: HomiePropertyFormat::Empty,
                    settable: false,
                    retained: false,
                    unit: None,
                },
            );
        }

        let node_desc = HomieNodeDescription {
            name: Some(descriptor.description.clone()),
            r#type: Some(format!("hc-timers/{}", descriptor.kind)),
            properties,
        };

        let device_desc = DeviceDescriptionBuilder::new()
            .name(descriptor.name.clone())
            .root(root_ref.device_id().clone())
            .parent(root_ref.device_id().clone())
            .add_node(node_id.clone(), node_desc)
            .build();

        Ok(Self {
            device_ref: DeviceRef::new(homie_proto.homie_domain().clone(), device_id),
            status: HomieDeviceStatus::Init,
            device_desc,
            homie_proto,
            homie_client: homie_client.clone(),
            node_id,
            values,
        })
    }

    pub fn child_id(&self) -> &HomieID {
        self.device_ref.device_id()
    }

    /// Keeps the last value of every property so a republish restores the device state.
    pub async fn set_property(&mut self, property: &str, value: HomieValue, publish: bool) -> Result<()> {
        let prop_id = homie_id(property)?;
        if publish {
            self.homie_client
                .homie_publish(self.homie_proto.publish_value(&self.node_id, &prop_id, &value, true))
                .await?;
        }
        self.values.insert(prop_id, value);
        Ok(())
    }

    pub async fn emit_event(&self, event: &str) -> Result<()> {
        let prop_id = homie_id(event)?;
        self.homie_client
            .homie_publish(
                self.homie_proto
                    .publish_value(&self.node_id, &prop_id, &HomieValue::Bool(true), false),
            )
            .await?;
        Ok(())
    }
}

fn property_description(prop: &PropertySpec) -> HomiePropertyDescription {
    let format = prop
        .range
        .and_then(|(min, max)| HomiePropertyFormat::parse(&format!("{}:{}", min, max), &prop.datatype).ok())
        .unwrap_or(HomiePropertyFormat::Empty);
    HomiePropertyDescription {
        name: Some(prop.title.to_string()),
        datatype: prop.datatype,
        format,
        settable: !prop.read_only,
        retained: true,
        unit: None,
    }
}

impl HomieDevice for TimerDevice {
    type ResultError = eyre::Error;

    async fn publish_property_values(&mut self) -> Result<(), Self::ResultError> {
        for (prop_id, value) in self.values.iter() {
            self.homie_client
                .homie_publish(self.homie_proto.publish_value(&self.node_id, prop_id, value, true))
                .await?;
        }
        Ok(())
    }

    // Actions are routed by the bridge, which sees every set command first.
    async fn handle_set_command(&mut self, _property: &PropertyRef, _set_value: &str) -> Result<(), Self::ResultError> {
        Ok(())
    }
}
