use serde::{Deserialize, Serialize};

/// The add-on configuration document as stored by the host.
///
/// Keys this add-on does not know about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonConfig {
    #[serde(default)]
    pub timers: Vec<TimerConfig>,
    #[serde(default)]
    pub precision_timers: Vec<TimerConfig>,
    #[serde(default)]
    pub intervals: Vec<IntervalConfig>,
    #[serde(default)]
    pub deactivate_progress_bar: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub seconds: u64,
}

/// Intervals share the timer layout, `seconds` is the repeat period.
pub type IntervalConfig = TimerConfig;

impl TimerConfig {
    pub fn new(name: impl Into<String>, seconds: u64) -> Self {
        Self {
            id: None,
            name: name.into(),
            seconds,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the id if one is set and not blank.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// A configuration entry after id assignment, handed to device constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    pub seconds: u64,
}

impl DeviceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, seconds: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            seconds,
        }
    }
}
