use tokio::sync::mpsc::Sender;

use crate::{devices::DeviceRegistry, homie_bridge::HomieBridge};

#[derive(Debug)]
pub enum AppEvent {
    PerformAction { device_id: String, action: String },
    StartPairing,
    Exit,
}

pub struct AppState {
    pub registry: DeviceRegistry,
    pub bridge: HomieBridge,
    pub app_event_sender: Sender<AppEvent>,
    pub should_exit: bool,
    pub homie_state: ConnectionState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Init,
    Connected,
    Disconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connect,
    Disconnect,
    Reconnect,
}

impl ConnectionState {
    pub fn change_state(&mut self, new_state: ConnectionState) -> Option<ConnectionEvent> {
        let event = match (&self, &new_state) {
            (ConnectionState::Init, ConnectionState::Connected) => Some(ConnectionEvent::Connect),
            (ConnectionState::Connected, ConnectionState::Disconnected) => Some(ConnectionEvent::Disconnect),
            (ConnectionState::Disconnected, ConnectionState::Connected) => Some(ConnectionEvent::Reconnect),
            _ => None,
        };

        *self = new_state;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_transitions() {
        let mut state = ConnectionState::Init;
        assert_eq!(state.change_state(ConnectionState::Connected), Some(ConnectionEvent::Connect));
        assert_eq!(state.change_state(ConnectionState::Connected), None);
        assert_eq!(state.change_state(ConnectionState::Disconnected), Some(ConnectionEvent::Disconnect));
        assert_eq!(state.change_state(ConnectionState::Connected), Some(ConnectionEvent::Reconnect));
    }

    #[test]
    fn disconnect_before_connect_is_silent() {
        let mut state = ConnectionState::Init;
        assert_eq!(state.change_state(ConnectionState::Disconnected), None);
        assert_eq!(state, ConnectionState::Disconnected);
    }
}
