pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod registry;
pub mod service;
pub mod stats;
pub mod types;
