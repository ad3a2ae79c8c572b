pub mod board;
pub mod config;
pub mod error;
pub mod football_data;
pub mod forecast;
pub mod form;
pub mod history;
pub mod http_cache;
pub mod http_client;
pub mod logging;
pub mod match_result;
