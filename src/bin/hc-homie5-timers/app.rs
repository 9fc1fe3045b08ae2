use color_eyre::eyre::Result;
use hc_homie5::HomieClientHandle;
use hc_homie5_timers::{
    app_state::{AppEvent, AppState, ConnectionState},
    config_store::ConfigStore,
    devices::DeviceRegistry,
    homie_bridge::HomieBridge,
    host::HostHandle,
    id_generator::RandomIdGenerator,
    settings::{CHANNEL_CAPACITY, SETTINGS},
    tick_scheduler::TickScheduler,
};
use tokio::sync::mpsc;

use crate::eventloop::EventMultiPlexer;

pub async fn initialize_app() -> Result<(EventMultiPlexer, HomieClientHandle, AppState)> {
    let settings = &SETTINGS;

    let (app_event_sender, app_event_receiver) = mpsc::channel::<AppEvent>(CHANNEL_CAPACITY);

    // Setup homie root device for the add-on
    // =====================================================
    let (bridge, homie_client_handle, homie_event_receiver) = HomieBridge::new(app_event_sender.clone(), settings)?;

    // Setup devices
    // =====================================================
    let (host, host_receiver) = HostHandle::new();
    let (scheduler, tick_receiver) = TickScheduler::new();

    let mut registry = DeviceRegistry::new(host, scheduler, Box::new(RandomIdGenerator));
    match ConfigStore::open(&settings.app.config_store, &settings.app.addon_id).await {
        Ok(config_store) => match registry.load(&config_store).await {
            Ok(count) => log::info!("Created {} timer devices", count),
            Err(err) => log::error!("{}", err),
        },
        Err(err) => log::error!("Cannot open config store, starting without devices: {}", err),
    }
    registry.advertise().await;

    // Setup EventMultiPlexer
    // =====================================================
    let event_multiplexer =
        EventMultiPlexer::new(app_event_receiver, homie_event_receiver, tick_receiver, host_receiver);

    Ok((
        event_multiplexer,
        homie_client_handle,
        AppState {
            registry,
            bridge,
            app_event_sender,
            should_exit: false,
            homie_state: ConnectionState::Init,
        },
    ))
}

pub async fn deinitialize_app(homie_client_handle: HomieClientHandle) -> Result<()> {
    homie_client_handle.stop().await?;
    log::debug!("Deinitialized app...");

    Ok(())
}
