use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::{
    config::{AddonConfig, DeviceConfig, TimerConfig},
    config_store::{ConfigStore, ConfigStoreError},
    host::{DeviceKind, HostHandle},
    id_generator::IdGenerator,
    tick_scheduler::{TickEvent, TickScheduler},
};

use super::{ActionOutcome, CountdownTimer, Device, DeviceContext, PrecisionTimer, RepeatingInterval};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Error loading add-on configuration: {0}")]
    Load(#[from] ConfigStoreError),
}

/// Owns every virtual device of the add-on, keyed by id.
pub struct DeviceRegistry {
    devices: HashMap<String, Device>,
    order: Vec<String>,
    host: HostHandle,
    scheduler: TickScheduler,
    ids: Box<dyn IdGenerator + Send>,
    activity: log::Level,
    show_progress: bool,
}

impl DeviceRegistry {
    pub fn new(host: HostHandle, scheduler: TickScheduler, ids: Box<dyn IdGenerator + Send>) -> Self {
        Self {
            devices: HashMap::new(),
            order: Vec::new(),
            host,
            scheduler,
            ids,
            activity: log::Level::Debug,
            show_progress: true,
        }
    }

    /// Loads the add-on configuration, creates its devices and writes the document back
    /// with generated ids filled in.
    ///
    /// Returns the number of devices created by this call. A failed save is logged, the
    /// devices created from the document stay.
    pub async fn load(&mut self, store: &ConfigStore) -> Result<usize, RegistryError> {
        let mut config = store.load().await?;
        let created = self.load_document(&mut config).await;

        match store.save(&config).await {
            Ok(_) => log::debug!("Saved add-on configuration"),
            Err(err) => log::error!("Error saving add-on configuration: {}", err),
        }
        Ok(created)
    }

    async fn load_document(&mut self, config: &mut AddonConfig) -> usize {
        self.activity = if config.debug {
            log::Level::Info
        } else {
            log::Level::Debug
        };
        self.show_progress = !config.deactivate_progress_bar;

        let mut taken: HashSet<String> = config
            .timers
            .iter()
            .chain(config.precision_timers.iter())
            .chain(config.intervals.iter())
            .filter_map(|entry| entry.id().map(str::to_string))
            .chain(self.order.iter().cloned())
            .collect();

        let mut created = 0;
        for (kind, entries) in [
            (DeviceKind::CountdownTimer, &mut config.timers),
            (DeviceKind::PrecisionTimer, &mut config.precision_timers),
            (DeviceKind::RepeatingInterval, &mut config.intervals),
        ] {
            for entry in entries.iter_mut() {
                let id = self.assign_id(entry, &mut taken);
                if entry.seconds == 0 {
                    log::warn!("Skipping {} {} ({}): seconds must be greater than 0", kind, entry.name, id);
                    continue;
                }
                if self.devices.contains_key(&id) {
                    log::warn!("Skipping {} {}: duplicate id {}", kind, entry.name, id);
                    continue;
                }
                if kind == DeviceKind::RepeatingInterval && RepeatingInterval::fires_only_once(entry.seconds) {
                    log::warn!(
                        "Interval {} ({}) has a period of 1 second and will only fire its elapsed event once",
                        entry.name,
                        id
                    );
                }
                let device_config = DeviceConfig::new(id, entry.name.clone(), entry.seconds);
                self.add_device(kind, device_config);
                created += 1;
            }
        }
        log::info!("Loaded {} devices", created);
        created
    }

    fn assign_id(&mut self, entry: &mut TimerConfig, taken: &mut HashSet<String>) -> String {
        if let Some(id) = entry.id() {
            return id.to_string();
        }
        let id = loop {
            let candidate = self.ids.generate();
            if taken.insert(candidate.clone()) {
                break candidate;
            }
        };
        log::debug!("Assigned id {} to {}", id, entry.name);
        entry.id = Some(id.clone());
        id
    }

    fn add_device(&mut self, kind: DeviceKind, config: DeviceConfig) {
        let ctx = DeviceContext::new(self.host.clone(), self.scheduler.clone(), self.activity);
        let id = config.id.clone();
        let device = match kind {
            DeviceKind::CountdownTimer => Device::Countdown(CountdownTimer::new(config, ctx)),
            DeviceKind::PrecisionTimer => Device::Precision(PrecisionTimer::new(config, ctx)),
            DeviceKind::RepeatingInterval => {
                Device::Interval(RepeatingInterval::new(config, self.show_progress, ctx))
            }
        };
        log::debug!("Created {} {}", kind, id);
        self.devices.insert(id.clone(), device);
        self.order.push(id);
    }

    /// Registers every device with the host, timers first, then precision timers, then
    /// intervals. Calling it again re-registers the same devices.
    pub async fn advertise(&self) {
        for device in self.iter() {
            self.host.register_device(device.descriptor()).await;
        }
    }

    pub async fn perform_action(&mut self, device_id: &str, action: &str) -> ActionOutcome {
        let Some(device) = self.devices.get_mut(device_id) else {
            log::warn!("Action {} for unknown device {}", action, device_id);
            return ActionOutcome::UnknownDevice;
        };
        log::debug!("{} -- action: {}", device_id, action);
        device.perform_action(action).await
    }

    pub async fn handle_tick(&mut self, event: TickEvent) {
        match self.devices.get_mut(&event.device_id) {
            Some(device) => device.handle_tick(event.token).await,
            None => log::trace!("Tick for unknown device {}", event.device_id),
        }
    }

    /// Cancels all pending ticks.
    pub fn shutdown(&mut self) {
        log::debug!("Stopping all device timers");
        for device in self.devices.values_mut() {
            device.shutdown();
        }
    }

    /// Devices in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.order.iter().filter_map(move |id| self.devices.get(id))
    }

    pub fn device_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::test_support::drain,
        host::HostMessage,
        id_generator::{RandomIdGenerator, SequentialIdGenerator},
    };

    fn registry() -> (DeviceRegistry, tokio::sync::mpsc::Receiver<HostMessage>) {
        let (host, host_rx) = HostHandle::new();
        let (scheduler, _ticks) = TickScheduler::new();
        (
            DeviceRegistry::new(host, scheduler, Box::new(SequentialIdGenerator::new("gen"))),
            host_rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn assigns_ids_and_keeps_existing_ones() {
        let (mut reg, _host) = registry();
        let mut config = AddonConfig {
            timers: vec![TimerConfig::new("Tea", 3), TimerConfig::new("Pasta", 600).with_id("pasta")],
            precision_timers: vec![TimerConfig::new("Eggs", 420)],
            ..Default::default()
        };

        assert_eq!(reg.load_document(&mut config).await, 3);
        assert_eq!(config.timers[0].id(), Some("gen-1"));
        assert_eq!(config.timers[1].id(), Some("pasta"));
        assert_eq!(config.precision_timers[0].id(), Some("gen-2"));
        assert_eq!(reg.device_ids(), ["gen-1", "pasta", "gen-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn generated_ids_avoid_configured_ones() {
        let (mut reg, _host) = registry();
        let mut config = AddonConfig {
            timers: vec![TimerConfig::new("Tea", 3), TimerConfig::new("Pasta", 600).with_id("gen-1")],
            ..Default::default()
        };

        reg.load_document(&mut config).await;
        assert_eq!(config.timers[0].id(), Some("gen-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn skips_zero_seconds_and_duplicates() {
        let (mut reg, _host) = registry();
        let mut config = AddonConfig {
            timers: vec![
                TimerConfig::new("Broken", 0),
                TimerConfig::new("A", 5).with_id("same"),
                TimerConfig::new("B", 5).with_id("same"),
            ],
            ..Default::default()
        };

        assert_eq!(reg.load_document(&mut config).await, 1);
        assert_eq!(reg.device_ids(), ["same"]);
        assert!(config.timers[0].id().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn advertises_in_kind_order() {
        let (mut reg, mut host) = registry();
        let mut config = AddonConfig {
            intervals: vec![TimerConfig::new("Water", 10).with_id("i")],
            precision_timers: vec![TimerConfig::new("Eggs", 420).with_id("p")],
            timers: vec![TimerConfig::new("Tea", 3).with_id("t")],
            ..Default::default()
        };
        reg.load_document(&mut config).await;

        for _ in 0..2 {
            reg.advertise().await;
            let registered: Vec<_> = drain(&mut host)
                .into_iter()
                .filter_map(|m| match m {
                    HostMessage::RegisterDevice(d) => Some((d.id, d.kind)),
                    _ => None,
                })
                .collect();
            assert_eq!(
                registered,
                vec![
                    ("t".to_string(), DeviceKind::CountdownTimer),
                    ("p".to_string(), DeviceKind::PrecisionTimer),
                    ("i".to_string(), DeviceKind::RepeatingInterval),
                ]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_actions_complete() {
        let (mut reg, _host) = registry();
        let mut config = AddonConfig {
            timers: vec![TimerConfig::new("Tea", 3).with_id("t")],
            intervals: vec![TimerConfig::new("Water", 10).with_id("i")],
            ..Default::default()
        };
        reg.load_document(&mut config).await;

        assert_eq!(reg.perform_action("t", "start").await, ActionOutcome::Performed);
        assert_eq!(reg.perform_action("t", "explode").await, ActionOutcome::UnknownAction);
        assert_eq!(reg.perform_action("i", "reset").await, ActionOutcome::UnknownAction);
        assert_eq!(reg.perform_action("nope", "start").await, ActionOutcome::UnknownDevice);
    }

    #[tokio::test(start_paused = true)]
    async fn one_second_interval_is_still_created() {
        let (mut reg, _host) = registry();
        let mut config = AddonConfig {
            intervals: vec![TimerConfig::new("Fast", 1).with_id("fast")],
            ..Default::default()
        };

        assert_eq!(reg.load_document(&mut config).await, 1);
        assert_eq!(reg.device_ids(), ["fast"]);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_store_is_left_untouched() {
        let (mut reg, _host) = registry();
        let raw = "timers:\n  - name: Tea\n    seconds: 3";
        let inner = simple_kv_store::InMemoryStore::new();
        inner.set("timers", raw).await.unwrap();
        let store = ConfigStore::KeyValue {
            store: simple_kv_store::KeyValueStore::InMemory(inner.clone()),
            key: "timers".to_string(),
        };

        assert!(matches!(reg.load(&store).await, Err(RegistryError::Load(_))));
        assert!(reg.is_empty());
        assert_eq!(inner.get("timers").await.as_deref(), Some(raw));
    }

    #[tokio::test(start_paused = true)]
    async fn debug_flag_raises_activity_level() {
        let (mut reg, _host) = registry();
        let mut config = AddonConfig {
            debug: true,
            ..Default::default()
        };
        reg.load_document(&mut config).await;
        assert_eq!(reg.activity, log::Level::Info);
    }

    #[tokio::test(start_paused = true)]
    async fn load_persists_generated_ids() {
        let (host, _host_rx) = HostHandle::new();
        let (scheduler, _ticks) = TickScheduler::new();
        let store = ConfigStore::in_memory("timers");
        store
            .save(&AddonConfig {
                timers: vec![TimerConfig::new("Tea", 3)],
                ..Default::default()
            })
            .await
            .unwrap();

        let mut reg = DeviceRegistry::new(host.clone(), scheduler.clone(), Box::new(RandomIdGenerator));
        assert_eq!(reg.load(&store).await.unwrap(), 1);
        let saved = store.load().await.unwrap();
        let id = saved.timers[0].id().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(reg.device_ids(), [id.clone()]);

        let mut again = DeviceRegistry::new(host, scheduler, Box::new(RandomIdGenerator));
        again.load(&store).await.unwrap();
        assert_eq!(store.load().await.unwrap().timers[0].id(), Some(id.as_str()));
        assert_eq!(again.device_ids(), [id]);
    }
}
