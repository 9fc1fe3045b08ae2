use std::time::Duration;

use crate::{
    config::DeviceConfig,
    host::{DeviceDescriptor, DeviceKind, EventSpec},
    tick_scheduler::{ScheduledTick, TickToken},
};

use super::{actions::PrecisionAction, DeviceContext};

pub const EVENT_ELAPSED: &str = "elapsed";

/// One-shot timer that fires a single `elapsed` event after the configured delay.
///
/// There is no per-second counting: the whole delay is one sleep, so the event is not
/// quantized to tick boundaries and nothing is published while waiting.
#[derive(Debug)]
pub struct PrecisionTimer {
    config: DeviceConfig,
    pending: Option<ScheduledTick>,
    ctx: DeviceContext,
}

impl PrecisionTimer {
    pub fn new(config: DeviceConfig, ctx: DeviceContext) -> Self {
        Self {
            config,
            pending: None,
            ctx,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            kind: DeviceKind::PrecisionTimer,
            description: format!("Precise timer firing once after {} seconds", self.config.seconds),
            properties: Vec::new(),
            actions: vec![PrecisionAction::Start.spec()],
            events: vec![EventSpec {
                name: EVENT_ELAPSED,
                description: "The timer has elapsed",
            }],
        }
    }

    pub async fn perform(&mut self, action: PrecisionAction) {
        match action {
            PrecisionAction::Start => self.start(),
        }
    }

    pub fn start(&mut self) {
        if self.pending.is_some() {
            return;
        }
        log::log!(self.ctx.activity, "Starting precision timer {}", self.config.name);
        self.pending = Some(
            self.ctx
                .scheduler
                .once(&self.config.id, Duration::from_secs(self.config.seconds)),
        );
    }

    pub async fn fire(&mut self, token: TickToken) {
        if self.pending.as_ref().map(|p| p.token()) != Some(token) {
            log::trace!("{} -- ignoring stale completion {:?}", self.config.id, token);
            return;
        }
        self.ctx.host.notify_event(&self.config.id, EVENT_ELAPSED).await;
        self.pending = None;
    }

    pub fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}
