//! User configuration.
//!
//! `~/.marketlens/config.ini` is loaded into a [`ConfigFile`], which converts
//! into the per-component configs ([`MarketConfig`], [`MapConfig`],
//! [`PrefetchConfig`]). A missing file means defaults.
//!
//! [`MarketConfig`]: crate::market::MarketConfig
//! [`MapConfig`]: crate::map::MapConfig
//! [`PrefetchConfig`]: crate::prefetch::PrefetchConfig

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, IdentifierSettings, LoggingSettings, MapSettings, MarketSettings,
    NetworkSettings, PrefetchSettings,
};
