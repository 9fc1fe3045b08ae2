use color_eyre::eyre::Result;
use hc_homie5_timers::{app_state::AppState, host::HostMessage};

pub async fn handle_host_message(message: HostMessage, state: &mut AppState) -> Result<bool> {
    if let Err(err) = state.bridge.handle_host_message(message).await {
        log::error!("Error publishing device update: {}", err);
    }
    Ok(false)
}
