pub mod config;
pub mod error;
pub mod logging;

pub mod backend;
pub mod cache;
pub mod endpoint_stats;
pub mod pipeline;
pub mod recovery;
pub mod retry;
pub mod store;
