pub mod completions;
pub mod config;
pub mod currency;
pub mod flight;
pub mod notify;
pub mod progress;
