pub mod analysis;
pub mod app_state;
pub mod config;
pub mod directory;
pub mod embedding;
pub mod entities;
pub mod export;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod llm;
pub mod pipeline;
pub mod repositories;
pub mod router;
pub mod scoring;
pub mod sessions;
