use app::handle_app_event;
use color_eyre::eyre::Result;
use hc_homie5::{define_event_multiplexer, HomieClientEvent};
use hc_homie5_timers::{
    app_state::{AppEvent, AppState},
    host::HostMessage,
    tick_scheduler::TickEvent,
};
use homie_client::handle_homie_client_event;
use host::handle_host_message;
use ticks::handle_tick_event;

mod app;
mod homie_client;
mod host;
mod ticks;

define_event_multiplexer! {
    #[derive(Debug)]
    pub enum Event {
        App(AppEvent) => app,
        HomieClient(HomieClientEvent) => homie_client,
        Tick(TickEvent) => ticks,
        Host(HostMessage) => host,
    }
}

pub async fn run_event_loop(event_multiplexer: &mut EventMultiPlexer, state: &mut AppState) -> Result<()> {
    loop {
        // once exiting, wait one more second for outstanding events and then stop
        let timeout = if state.should_exit { 1 } else { 60 };
        let exit = match event_multiplexer.next(timeout).await {
            Event::App(app_event) => handle_app_event(app_event, state).await?,
            Event::HomieClient(homie_client_event) => handle_homie_client_event(homie_client_event, state).await?,
            Event::Tick(tick_event) => handle_tick_event(tick_event, state).await?,
            Event::Host(host_message) => handle_host_message(host_message, state).await?,
            Event::Timeout => state.should_exit,
            Event::None => false,
        };

        if exit {
            break;
        }
    }
    log::debug!("Exiting application event loop");
    Ok(())
}
