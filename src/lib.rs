pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod tei;
pub mod tokenize;
