use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};

use crate::settings::CHANNEL_CAPACITY;

/// Identifies one scheduled tick task. A device only accepts ticks carrying the token of
/// the task it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken(u64);

#[derive(Debug, Clone)]
pub struct TickEvent {
    pub device_id: String,
    pub token: TickToken,
}

/// Handle to a running tick task. The task is aborted when the handle is cancelled or
/// dropped.
#[derive(Debug)]
pub struct ScheduledTick {
    token: TickToken,
    handle: JoinHandle<()>,
}

impl ScheduledTick {
    pub fn token(&self) -> TickToken {
        self.token
    }

    pub fn cancel(self) {
        // abort happens in drop
    }
}

impl Drop for ScheduledTick {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    next_token: Arc<AtomicU64>,
    sender: Sender<TickEvent>,
}

impl TickScheduler {
    pub fn new() -> (Self, Receiver<TickEvent>) {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        (
            TickScheduler {
                next_token: Arc::new(AtomicU64::new(1)),
                sender,
            },
            receiver,
        )
    }

    fn token(&self) -> TickToken {
        TickToken(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    /// Sends a tick for `device_id` every `period`, starting one period from now.
    pub fn repeating(&self, device_id: &str, period: Duration) -> ScheduledTick {
        let token = self.token();
        let sender = self.sender.clone();
        let device_id = device_id.to_string();

        let handle = tokio::spawn(async move {
            log::trace!("Tick {:?} for {} every {:?}", token, device_id, period);

            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip the immediate first tick

            loop {
                interval.tick().await;
                if let Err(err) = sender
                    .send(TickEvent {
                        device_id: device_id.clone(),
                        token,
                    })
                    .await
                {
                    log::warn!("Error sending tick: [{}] - {}", device_id, err);
                    break;
                }
            }
        });

        ScheduledTick { token, handle }
    }

    /// Sends a single tick for `device_id` after `delay`.
    pub fn once(&self, device_id: &str, delay: Duration) -> ScheduledTick {
        let token = self.token();
        let sender = self.sender.clone();
        let device_id = device_id.to_string();

        let handle = tokio::spawn(async move {
            log::trace!("Tick {:?} for {} in {:?}", token, device_id, delay);

            tokio::time::sleep(delay).await;

            if let Err(err) = sender
                .send(TickEvent {
                    device_id: device_id.clone(),
                    token,
                })
                .await
            {
                log::warn!("Error sending tick: [{}] - {}", device_id, err);
            }
        });

        ScheduledTick { token, handle }
    }
}
