use std::time::Duration;

use homie5::{HomieDataType, HomieValue};

use crate::{
    config::DeviceConfig,
    host::{DeviceDescriptor, DeviceKind, EventSpec, PropertySpec},
    tick_scheduler::{ScheduledTick, TickToken},
};

use super::DeviceContext;

pub const PROP_PROGRESS: &str = "progress";
pub const EVENT_ELAPSED: &str = "elapsed";

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Fires `elapsed` every `seconds` ticks for as long as the device exists.
#[derive(Debug)]
pub struct RepeatingInterval {
    config: DeviceConfig,
    counter: u64,
    show_progress: bool,
    tick: Option<ScheduledTick>,
    ctx: DeviceContext,
}

impl RepeatingInterval {
    /// Creates the interval and starts ticking right away.
    pub fn new(config: DeviceConfig, show_progress: bool, ctx: DeviceContext) -> Self {
        let tick = Some(ctx.scheduler.repeating(&config.id, TICK_PERIOD));
        Self {
            config,
            counter: 0,
            show_progress,
            tick,
            ctx,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// A period of 1 wraps past the event on every tick after the first.
    pub fn fires_only_once(period: u64) -> bool {
        period == 1
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn descriptor(&self) -> DeviceDescriptor {
        let properties = if self.show_progress {
            vec![PropertySpec {
                name: PROP_PROGRESS,
                title: "Progress",
                datatype: HomieDataType::Integer,
                read_only: true,
                range: Some((1, self.config.seconds as i64)),
                value: (self.counter > 0).then_some(HomieValue::Integer(self.counter as i64)),
            }]
        } else {
            Vec::new()
        };
        DeviceDescriptor {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            kind: DeviceKind::RepeatingInterval,
            description: format!("Interval firing every {} seconds", self.config.seconds),
            properties,
            actions: Vec::new(),
            events: vec![EventSpec {
                name: EVENT_ELAPSED,
                description: "The interval has elapsed",
            }],
        }
    }

    // The event is checked before the wrap and the progress is published after it. A
    // period of 1 therefore only fires on the very first tick.
    pub async fn tick(&mut self, token: TickToken) {
        if self.tick.as_ref().map(|t| t.token()) != Some(token) {
            return;
        }

        self.counter += 1;
        if self.counter == self.config.seconds {
            self.ctx.host.notify_event(&self.config.id, EVENT_ELAPSED).await;
        }
        if self.counter > self.config.seconds {
            self.counter = 1;
        }
        if self.show_progress {
            self.ctx
                .host
                .notify_property_changed(&self.config.id, PROP_PROGRESS, HomieValue::Integer(self.counter as i64))
                .await;
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::test_support::{drain, property, test_context},
        host::HostMessage,
    };
    use tokio::time::{timeout, Instant};

    fn elapsed(id: &str) -> HostMessage {
        HostMessage::Event {
            device_id: id.into(),
            event: EVENT_ELAPSED,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_period() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut interval = RepeatingInterval::new(DeviceConfig::new("i", "Watering", 3), false, ctx);
        let start = Instant::now();
        let mut fired_at = Vec::new();

        for _ in 0..10 {
            let ev = ticks.recv().await.unwrap();
            interval.tick(ev.token).await;
            for msg in drain(&mut host) {
                assert_eq!(msg, elapsed("i"));
                fired_at.push(start.elapsed().as_secs());
            }
        }
        assert_eq!(fired_at, vec![3, 6, 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_stays_within_period() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut interval = RepeatingInterval::new(DeviceConfig::new("i", "Watering", 3), true, ctx);

        let mut trace = Vec::new();
        for _ in 0..7 {
            let ev = ticks.recv().await.unwrap();
            interval.tick(ev.token).await;
            trace.extend(drain(&mut host));
        }

        let progress = |v| property("i", PROP_PROGRESS, HomieValue::Integer(v));
        assert_eq!(
            trace,
            vec![
                progress(1),
                progress(2),
                elapsed("i"),
                progress(3),
                progress(1),
                progress(2),
                elapsed("i"),
                progress(3),
                progress(1),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn period_of_one_only_fires_on_first_cycle() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut interval = RepeatingInterval::new(DeviceConfig::new("i", "Fast", 1), true, ctx);

        let mut events = 0;
        for _ in 0..5 {
            let ev = ticks.recv().await.unwrap();
            interval.tick(ev.token).await;
            events += drain(&mut host)
                .iter()
                .filter(|m| matches!(m, HostMessage::Event { .. }))
                .count();
            assert_eq!(interval.counter(), 1);
        }
        assert_eq!(events, 1);
        assert!(RepeatingInterval::fires_only_once(1));
        assert!(!RepeatingInterval::fires_only_once(2));
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_progress_is_not_described() {
        let (ctx, _host, _ticks) = test_context();
        let interval = RepeatingInterval::new(DeviceConfig::new("i", "Watering", 3), false, ctx);
        let desc = interval.descriptor();
        assert!(desc.properties.is_empty());
        assert!(desc.actions.is_empty());
        assert_eq!(desc.events.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let (ctx, _host, mut ticks) = test_context();
        let mut interval = RepeatingInterval::new(DeviceConfig::new("i", "Watering", 3), true, ctx);
        interval.shutdown();
        assert!(timeout(Duration::from_secs(10), ticks.recv()).await.is_err());
    }
}
