pub mod http;
pub mod log_store;
pub mod runner;
