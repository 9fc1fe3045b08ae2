use app::{deinitialize_app, initialize_app};
use app_env::{initialize_logging, initialize_panic_handler};
use color_eyre::eyre::Result;
use eventloop::run_event_loop;
use hc_homie5_timers::app_state::AppEvent;
mod app;
mod app_env;
mod eventloop;

async fn run_application() -> Result<()> {
    initialize_logging()?;
    initialize_panic_handler()?;

    let (mut event_multiplexer, homie_client_handle, mut state) = initialize_app().await?;

    // Exit cleanly on Ctrl-C
    let ctrl_sender = state.app_event_sender.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(_) => {
                if let Err(err) = ctrl_sender.send(AppEvent::Exit).await {
                    log::error!("Error during application shutdown: {}", err);
                }
            }
            Err(err) => log::error!("Cannot listen for ctrl-c: {}", err),
        }
    });

    run_event_loop(&mut event_multiplexer, &mut state).await?;

    deinitialize_app(homie_client_handle).await?;

    // make sure the channels stay open until the end...
    drop(event_multiplexer);

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(e) = run_application().await {
        eprintln!("{} fatal error: {:?}", env!("CARGO_PKG_NAME"), e);
        Err(e)
    } else {
        Ok(())
    }
}
