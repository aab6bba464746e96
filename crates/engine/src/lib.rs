// Streaming varnishlog parsing and transaction correlation.

// Core pipeline
pub mod capture;
pub mod parser;
pub mod store;
pub mod tx;

// Consumers
pub mod filter;
pub mod format;

pub mod conf;
