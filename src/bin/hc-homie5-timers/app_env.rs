use std::path::PathBuf;

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use hc_homie5_timers::settings::ENV_PREFIX;
use once_cell::sync::Lazy;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    self, filter::EnvFilter, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, Layer,
};

pub static DATA_FOLDER: Lazy<Option<PathBuf>> =
    Lazy::new(|| std::env::var(format!("{}_DATA", *ENV_PREFIX)).ok().map(PathBuf::from));

pub static LOG_ENV: Lazy<String> = Lazy::new(|| format!("{}_LOGLEVEL", *ENV_PREFIX));

pub static LOG_FILE: Lazy<String> = Lazy::new(|| format!("{}.log", env!("CARGO_PKG_NAME")));

pub static LOG_TO_FILE: Lazy<bool> = Lazy::new(|| env_flag("LOG_TO_FILE", false));

pub static ENV_COLOR_LOG: Lazy<bool> = Lazy::new(|| env_flag("ENV_COLOR_LOG", true));

pub static LOG_SOURCE_FILES: Lazy<bool> = Lazy::new(|| env_flag("LOG_SOURCE_FILES", false));

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(format!("{}_{}", *ENV_PREFIX, name))
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "schaze", env!("CARGO_PKG_NAME"))
}

pub fn initialize_panic_handler() -> Result<()> {
    std::panic::set_hook(Box::new(move |panic_info| {
        #[cfg(not(debug_assertions))]
        {
            use human_panic::{handle_dump, print_msg, Metadata};
            let meta = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

            let file_path = handle_dump(&meta, panic_info);
            if print_msg(file_path, &meta).is_err() {
                eprintln!("{} panicked: {}", env!("CARGO_PKG_NAME"), panic_info);
            }
        }

        log::error!("Panic occurred: {}", panic_info);

        #[cfg(debug_assertions)]
        {
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .verbosity(better_panic::Verbosity::Full)
                .create_panic_handler()(panic_info);
        }

        std::process::exit(1);
    }));

    Ok(())
}

/// Directory for the optional log file.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = DATA_FOLDER.clone() {
        dir
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

/// `RUST_LOG` wins, then `HCTIMER_LOGLEVEL` scoped to this crate, then `info`.
fn default_log_filter() -> String {
    let crate_name = env!("CARGO_CRATE_NAME").replace('-', "_");
    std::env::var("RUST_LOG").unwrap_or_else(|_| match std::env::var(LOG_ENV.as_str()) {
        Ok(level) => format!("{}={}", crate_name, level),
        Err(_) => format!("{}=info", crate_name),
    })
}

pub fn initialize_logging() -> Result<()> {
    std::env::set_var("RUST_LOG", default_log_filter());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_file(*LOG_SOURCE_FILES)
        .with_line_number(*LOG_SOURCE_FILES)
        .with_target(false)
        .with_ansi(*ENV_COLOR_LOG)
        .with_filter(EnvFilter::from_default_env());
    let registry = tracing_subscriber::registry()
        .with(console_layer)
        .with(ErrorLayer::default());

    if !*LOG_TO_FILE {
        registry.init();
        return Ok(());
    }

    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_file = std::fs::File::create(directory.join(LOG_FILE.as_str()))?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_file(*LOG_SOURCE_FILES)
        .with_line_number(*LOG_SOURCE_FILES)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::from_default_env());
    registry.with(file_layer).init();
    Ok(())
}
