//! Session-level operations behind the CLI.

pub mod batch;
pub mod config;
pub mod export;
pub mod session;

pub use batch::{run_batch, BatchOptions, BatchReport};
pub use config::{init_default_config, StudioConfig};
pub use export::{export_materials, parse_selection};
pub use session::Session;
