pub mod block_store;
pub mod config;
pub mod error;
pub mod feed_client;
pub mod feed_url;
pub mod ics_parser;
