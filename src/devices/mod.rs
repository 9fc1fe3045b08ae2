mod actions;
mod countdown_timer;
mod precision_timer;
mod registry;
mod repeating_interval;

pub use actions::*;
pub use countdown_timer::*;
pub use precision_timer::{PrecisionTimer, EVENT_ELAPSED};
pub use registry::*;
pub use repeating_interval::{RepeatingInterval, PROP_PROGRESS};

use crate::{
    host::{DeviceDescriptor, DeviceKind, HostHandle},
    tick_scheduler::{TickScheduler, TickToken},
};

/// What every device needs from its surroundings.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub host: HostHandle,
    pub scheduler: TickScheduler,
    /// Level used for start/reset activity lines.
    pub activity: log::Level,
}

impl DeviceContext {
    pub fn new(host: HostHandle, scheduler: TickScheduler, activity: log::Level) -> Self {
        Self {
            host,
            scheduler,
            activity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Performed,
    UnknownAction,
    UnknownDevice,
}

#[derive(Debug)]
pub enum Device {
    Countdown(CountdownTimer),
    Precision(PrecisionTimer),
    Interval(RepeatingInterval),
}

impl Device {
    pub fn id(&self) -> &str {
        match self {
            Device::Countdown(d) => d.id(),
            Device::Precision(d) => d.id(),
            Device::Interval(d) => d.id(),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Countdown(_) => DeviceKind::CountdownTimer,
            Device::Precision(_) => DeviceKind::PrecisionTimer,
            Device::Interval(_) => DeviceKind::RepeatingInterval,
        }
    }

    pub fn descriptor(&self) -> DeviceDescriptor {
        match self {
            Device::Countdown(d) => d.descriptor(),
            Device::Precision(d) => d.descriptor(),
            Device::Interval(d) => d.descriptor(),
        }
    }

    pub async fn perform_action(&mut self, name: &str) -> ActionOutcome {
        let parsed = match self {
            Device::Countdown(d) => match name.parse::<CountdownAction>() {
                Ok(action) => {
                    d.perform(action).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Device::Precision(d) => match name.parse::<PrecisionAction>() {
                Ok(action) => {
                    d.perform(action).await;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Device::Interval(_) => Err(UnknownAction(name.to_string())),
        };

        match parsed {
            Ok(()) => ActionOutcome::Performed,
            Err(err) => {
                log::warn!("{} ({}) -- {}", self.id(), self.kind(), err);
                ActionOutcome::UnknownAction
            }
        }
    }

    pub async fn handle_tick(&mut self, token: TickToken) {
        match self {
            Device::Countdown(d) => d.tick(token).await,
            Device::Precision(d) => d.fire(token).await,
            Device::Interval(d) => d.tick(token).await,
        }
    }

    pub fn shutdown(&mut self) {
        match self {
            Device::Countdown(d) => d.shutdown(),
            Device::Precision(d) => d.shutdown(),
            Device::Interval(d) => d.shutdown(),
        }
    }
}
