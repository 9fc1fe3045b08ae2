use color_eyre::eyre::Result;
use hc_homie5::{HomieClientEvent, HomieDevice};
use hc_homie5_timers::app_state::{AppState, ConnectionEvent, ConnectionState};

pub async fn handle_homie_client_event(event: HomieClientEvent, state: &mut AppState) -> Result<bool> {
    match event {
        HomieClientEvent::Connect => {
            let con_event = state.homie_state.change_state(ConnectionState::Connected);
            log::debug!("Timers: mqtt connected ({:?}). Publishing devices", con_event);
            state.bridge.connected().await?;
        }
        HomieClientEvent::Disconnect => {
            log::debug!("Timers: mqtt disconnected.");
            if let Some(ConnectionEvent::Disconnect) = state.homie_state.change_state(ConnectionState::Disconnected) {
                state.bridge.disconnected();
            }
        }
        HomieClientEvent::HomieMessage(event) => {
            if let homie5::Homie5Message::PropertySet { property, set_value } = &event {
                log::trace!(
                    "Set command: {}/{}/{} = {}",
                    property.device_ref().device_id(),
                    property.node_id(),
                    property.prop_id(),
                    set_value
                );
                state.bridge.handle_set_command(property, set_value).await?;
            }
        }
        HomieClientEvent::Stop => {
            log::debug!("Timers homie client stopped");
        }
        HomieClientEvent::Error(err) => {
            log::error!("Timers HomieError: {:?}", err);
        }
    }
    Ok(false)
}
