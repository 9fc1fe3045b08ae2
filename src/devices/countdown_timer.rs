use std::time::Duration;

use homie5::{HomieDataType, HomieValue};

use crate::{
    config::DeviceConfig,
    host::{DeviceDescriptor, DeviceKind, PropertySpec},
    tick_scheduler::{ScheduledTick, TickToken},
};

use super::{actions::CountdownAction, DeviceContext};

pub const PROP_RUNNING: &str = "running";
pub const PROP_ELAPSED: &str = "elapsed";
pub const PROP_SECONDS: &str = "seconds";

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Counts seconds up to the configured limit once started.
///
/// `running` is true exactly while a tick task is held. Reaching the limit stops the
/// ticks and leaves the timer in the elapsed state until it is reset.
#[derive(Debug)]
pub struct CountdownTimer {
    config: DeviceConfig,
    seconds: u64,
    running: bool,
    elapsed: bool,
    tick: Option<ScheduledTick>,
    ctx: DeviceContext,
}

impl CountdownTimer {
    pub fn new(config: DeviceConfig, ctx: DeviceContext) -> Self {
        Self {
            config,
            seconds: 0,
            running: false,
            elapsed: false,
            tick: None,
            ctx,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_elapsed(&self) -> bool {
        self.elapsed
    }

    pub fn descriptor(&self) -> DeviceDescriptor {
        DeviceDescriptor {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            kind: DeviceKind::CountdownTimer,
            description: format!("Timer elapsing after {} seconds", self.config.seconds),
            properties: vec![
                PropertySpec {
                    name: PROP_RUNNING,
                    title: "Running",
                    datatype: HomieDataType::Boolean,
                    read_only: true,
                    range: None,
                    value: Some(HomieValue::Bool(self.is_running())),
                },
                PropertySpec {
                    name: PROP_ELAPSED,
                    title: "Elapsed",
                    datatype: HomieDataType::Boolean,
                    read_only: true,
                    range: None,
                    value: Some(HomieValue::Bool(self.elapsed)),
                },
                PropertySpec {
                    name: PROP_SECONDS,
                    title: "Seconds",
                    datatype: HomieDataType::Integer,
                    read_only: true,
                    range: Some((0, self.config.seconds as i64)),
                    value: Some(HomieValue::Integer(self.seconds as i64)),
                },
            ],
            actions: CountdownAction::ALL.iter().map(CountdownAction::spec).collect(),
            events: Vec::new(),
        }
    }

    pub async fn perform(&mut self, action: CountdownAction) {
        match action {
            CountdownAction::Start => self.start().await,
            CountdownAction::Reset => self.reset().await,
            CountdownAction::Restart => self.restart().await,
        }
    }

    pub async fn start(&mut self) {
        if self.tick.is_some() {
            return;
        }
        log::log!(self.ctx.activity, "Starting timer {}", self.config.name);

        if self.elapsed {
            self.set_elapsed(false).await;
            self.set_seconds(0).await;
        }
        self.set_running(true).await;
        self.tick = Some(self.ctx.scheduler.repeating(&self.config.id, TICK_PERIOD));
    }

    pub async fn reset(&mut self) {
        log::log!(self.ctx.activity, "Resetting timer {}", self.config.name);

        if let Some(tick) = self.tick.take() {
            tick.cancel();
            self.set_running(false).await;
        }
        self.set_elapsed(false).await;
        self.set_seconds(0).await;
    }

    pub async fn restart(&mut self) {
        self.reset().await;
        self.start().await;
    }

    pub async fn tick(&mut self, token: TickToken) {
        if self.tick.as_ref().map(|t| t.token()) != Some(token) {
            log::trace!("{} -- ignoring stale tick {:?}", self.config.id, token);
            return;
        }

        self.set_seconds(self.seconds + 1).await;

        if self.seconds >= self.config.seconds {
            if let Some(tick) = self.tick.take() {
                tick.cancel();
            }
            log::log!(self.ctx.activity, "Timer {} elapsed", self.config.name);
            self.set_elapsed(true).await;
            self.set_running(false).await;
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.cancel();
        }
    }

    async fn set_running(&mut self, running: bool) {
        self.running = running;
        self.ctx
            .host
            .notify_property_changed(&self.config.id, PROP_RUNNING, HomieValue::Bool(running))
            .await;
    }

    async fn set_elapsed(&mut self, elapsed: bool) {
        self.elapsed = elapsed;
        self.ctx
            .host
            .notify_property_changed(&self.config.id, PROP_ELAPSED, HomieValue::Bool(elapsed))
            .await;
    }

    async fn set_seconds(&mut self, seconds: u64) {
        self.seconds = seconds;
        self.ctx
            .host
            .notify_property_changed(&self.config.id, PROP_SECONDS, HomieValue::Integer(seconds as i64))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::test_support::{drain, property, test_context};
    use tokio::time::{timeout, Instant};

    fn tea() -> DeviceConfig {
        DeviceConfig::new("tea", "Tea", 3)
    }

    #[tokio::test(start_paused = true)]
    async fn tea_timer_trace() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut timer = CountdownTimer::new(tea(), ctx);
        let start = Instant::now();

        timer.start().await;
        let mut trace: Vec<_> = drain(&mut host).into_iter().map(|m| (0, m)).collect();

        while timer.is_running() {
            let ev = ticks.recv().await.unwrap();
            timer.tick(ev.token).await;
            let t = start.elapsed().as_secs();
            trace.extend(drain(&mut host).into_iter().map(|m| (t, m)));
        }

        assert_eq!(
            trace,
            vec![
                (0, property("tea", PROP_RUNNING, HomieValue::Bool(true))),
                (1, property("tea", PROP_SECONDS, HomieValue::Integer(1))),
                (2, property("tea", PROP_SECONDS, HomieValue::Integer(2))),
                (3, property("tea", PROP_SECONDS, HomieValue::Integer(3))),
                (3, property("tea", PROP_ELAPSED, HomieValue::Bool(true))),
                (3, property("tea", PROP_RUNNING, HomieValue::Bool(false))),
            ]
        );
        assert!(timer.is_elapsed());
        assert_eq!(timer.seconds(), 3);
        assert!(timeout(Duration::from_secs(10), ticks.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_running_countdown() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut timer = CountdownTimer::new(DeviceConfig::new("t", "Pasta", 600), ctx);

        timer.start().await;
        for _ in 0..2 {
            let ev = ticks.recv().await.unwrap();
            timer.tick(ev.token).await;
        }
        drain(&mut host);

        timer.reset().await;
        assert_eq!(
            drain(&mut host),
            vec![
                property("t", PROP_RUNNING, HomieValue::Bool(false)),
                property("t", PROP_ELAPSED, HomieValue::Bool(false)),
                property("t", PROP_SECONDS, HomieValue::Integer(0)),
            ]
        );
        assert!(!timer.is_running());
        assert_eq!(timer.seconds(), 0);

        assert!(timeout(Duration::from_secs(10), ticks.recv()).await.is_err());
        assert!(drain(&mut host).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_queued_before_reset_is_ignored() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut timer = CountdownTimer::new(tea(), ctx);

        timer.start().await;
        let queued = ticks.recv().await.unwrap();
        timer.reset().await;
        drain(&mut host);

        timer.tick(queued.token).await;
        assert!(drain(&mut host).is_empty());
        assert_eq!(timer.seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_schedules_one_countdown() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut timer = CountdownTimer::new(tea(), ctx);

        timer.start().await;
        timer.start().await;
        assert_eq!(drain(&mut host), vec![property("tea", PROP_RUNNING, HomieValue::Bool(true))]);

        let ev = ticks.recv().await.unwrap();
        timer.tick(ev.token).await;
        assert!(timeout(Duration::from_millis(999), ticks.recv()).await.is_err());
        assert_eq!(timer.seconds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_idle_republishes_elapsed() {
        let (ctx, mut host, _ticks) = test_context();
        let mut timer = CountdownTimer::new(tea(), ctx);

        timer.reset().await;
        assert_eq!(
            drain(&mut host),
            vec![
                property("tea", PROP_ELAPSED, HomieValue::Bool(false)),
                property("tea", PROP_SECONDS, HomieValue::Integer(0)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_matches_reset_then_start() {
        async fn run(use_restart: bool) -> Vec<crate::host::HostMessage> {
            let (ctx, mut host, mut ticks) = test_context();
            let mut timer = CountdownTimer::new(tea(), ctx);
            timer.start().await;
            let ev = ticks.recv().await.unwrap();
            timer.tick(ev.token).await;
            drain(&mut host);

            if use_restart {
                timer.restart().await;
            } else {
                timer.reset().await;
                timer.start().await;
            }
            while timer.is_running() {
                let ev = ticks.recv().await.unwrap();
                timer.tick(ev.token).await;
            }
            drain(&mut host)
        }

        let restarted = run(true).await;
        let reset_started = run(false).await;
        assert_eq!(restarted, reset_started);
        assert_eq!(restarted.len(), 3 + 1 + 3 + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_elapsed_counts_again() {
        let (ctx, mut host, mut ticks) = test_context();
        let mut timer = CountdownTimer::new(DeviceConfig::new("t", "Short", 1), ctx);

        timer.start().await;
        let ev = ticks.recv().await.unwrap();
        timer.tick(ev.token).await;
        assert!(timer.is_elapsed());
        drain(&mut host);

        timer.start().await;
        assert_eq!(
            drain(&mut host),
            vec![
                property("t", PROP_ELAPSED, HomieValue::Bool(false)),
                property("t", PROP_SECONDS, HomieValue::Integer(0)),
                property("t", PROP_RUNNING, HomieValue::Bool(true)),
            ]
        );
        let ev = ticks.recv().await.unwrap();
        timer.tick(ev.token).await;
        assert!(timer.is_elapsed());
        assert_eq!(timer.seconds(), 1);
    }

    #[test]
    fn descriptor_lists_properties_and_actions() {
        let (host, _rx) = crate::host::HostHandle::new();
        let (scheduler, _ticks) = crate::tick_scheduler::TickScheduler::new();
        let timer = CountdownTimer::new(tea(), DeviceContext::new(host, scheduler, log::Level::Debug));
        let desc = timer.descriptor();

        assert_eq!(desc.kind, DeviceKind::CountdownTimer);
        let props: Vec<_> = desc.properties.iter().map(|p| p.name).collect();
        assert_eq!(props, vec![PROP_RUNNING, PROP_ELAPSED, PROP_SECONDS]);
        assert!(desc.properties.iter().all(|p| p.read_only));
        assert_eq!(desc.properties[2].value, Some(HomieValue::Integer(0)));
        let actions: Vec<_> = desc.actions.iter().map(|a| a.name).collect();
        assert_eq!(actions, vec!["start", "reset", "restart"]);
        assert!(desc.events.is_empty());
    }
}
