pub mod config;
pub mod impute;
pub mod logging;
pub mod repair;
pub mod table;

pub use config::Config;
