use std::str::FromStr;

use thiserror::Error;

use crate::host::ActionSpec;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownAction {
    Start,
    Reset,
    Restart,
}

impl CountdownAction {
    pub const ALL: [CountdownAction; 3] = [CountdownAction::Start, CountdownAction::Reset, CountdownAction::Restart];

    pub fn name(&self) -> &'static str {
        match self {
            CountdownAction::Start => "start",
            CountdownAction::Reset => "reset",
            CountdownAction::Restart => "restart",
        }
    }

    pub fn spec(&self) -> ActionSpec {
        let title = match self {
            CountdownAction::Start => "Start",
            CountdownAction::Reset => "Reset",
            CountdownAction::Restart => "Restart",
        };
        ActionSpec {
            name: self.name(),
            title,
        }
    }
}

impl FromStr for CountdownAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(CountdownAction::Start),
            "reset" => Ok(CountdownAction::Reset),
            "restart" => Ok(CountdownAction::Restart),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionAction {
    Start,
}

impl PrecisionAction {
    pub fn name(&self) -> &'static str {
        match self {
            PrecisionAction::Start => "start",
        }
    }

    pub fn spec(&self) -> ActionSpec {
        ActionSpec {
            name: self.name(),
            title: "Start",
        }
    }
}

impl FromStr for PrecisionAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(PrecisionAction::Start),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}
