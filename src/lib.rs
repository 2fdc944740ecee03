pub mod api_error;
pub mod api_fetch;
pub mod api_types;
pub mod config;
pub mod http_client;
pub mod logging;
pub mod provider;
pub mod query;
pub mod query_cache;
pub mod selection;
pub mod simulator;
pub mod state;
pub mod teams;
