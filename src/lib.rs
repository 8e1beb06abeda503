pub mod batch;
pub mod cli;
pub mod config;
pub mod db;
pub mod decision;
pub mod embedding;
pub mod error;
pub mod fetch;
pub mod ingest;
mod metrics;
pub mod server;
pub mod storage;
pub mod utils;
pub mod vector;

pub use config::Opts;
pub use ingest::Ingestor;
