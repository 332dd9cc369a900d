pub mod config;
pub mod context;
pub mod export;
pub mod generation;
pub mod llm;
pub mod material;
pub mod progress;
pub mod quality;
pub mod store;
pub mod template;
pub mod textutil;
pub mod trace;
pub mod workflow;
