pub mod app_state;
pub mod config;
pub mod config_store;
pub mod devices;
pub mod homie_bridge;
pub mod host;
pub mod id_generator;
pub mod settings;
pub mod tick_scheduler;
pub mod unwrap_or_exit;
