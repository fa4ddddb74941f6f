pub mod chunker;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod scrape;
pub mod server;
pub mod state;
