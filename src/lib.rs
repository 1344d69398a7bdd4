pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod keyring;
pub mod platform;
pub mod report;
pub mod session;
pub mod state;
pub mod store;

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, ValueEnum, Debug, Default, Serialize)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
