pub mod api_server;
pub mod blockchain_manager;
pub mod cancellation;
pub mod config;
pub mod errors;
pub mod lending_session;
pub mod position_aggregator;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
