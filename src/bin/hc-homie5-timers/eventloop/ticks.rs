use color_eyre::eyre::Result;
use hc_homie5_timers::{app_state::AppState, tick_scheduler::TickEvent};

pub async fn handle_tick_event(event: TickEvent, state: &mut AppState) -> Result<bool> {
    log::trace!("Tick: {:?}", event);
    state.registry.handle_tick(event).await;
    Ok(false)
}
