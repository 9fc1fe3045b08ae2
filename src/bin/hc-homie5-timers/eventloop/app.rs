use std::time::Duration;

use color_eyre::eyre::Result;
use hc_homie5_timers::{
    app_state::{AppEvent, AppState},
    devices::ActionOutcome,
};

pub async fn handle_app_event(event: AppEvent, state: &mut AppState) -> Result<bool> {
    match event {
        AppEvent::PerformAction { device_id, action } => {
            if state.should_exit {
                log::debug!("Shutting down, ignoring action {} for {}", action, device_id);
                return Ok(false);
            }
            if let ActionOutcome::UnknownDevice = state.registry.perform_action(&device_id, &action).await {
                log::debug!("No device {} to perform {} on", device_id, action);
            }
        }
        AppEvent::StartPairing => {
            log::info!("Advertising {} devices", state.registry.len());
            state.registry.advertise().await;
        }
        AppEvent::Exit => {
            // stop all pending ticks before going offline
            state.registry.shutdown();

            state.bridge.disconnect_devices().await?;

            // give mqtt a second to publish the disconnect states
            tokio::time::sleep(Duration::from_secs(1)).await;
            state.bridge.disconnect_client().await?;

            state.should_exit = true;
        }
    }
    Ok(false)
}
