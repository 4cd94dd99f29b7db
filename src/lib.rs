pub mod config;
pub mod filestats;
pub mod filter;
pub mod handle;
pub mod heartbeat;
pub mod iterext;
pub mod language;
pub mod project;
pub mod sender;
