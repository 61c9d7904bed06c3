//! CLI command handling

pub mod connection;
pub mod event;
pub mod output;

pub use connection::*;
pub use event::*;
pub use output::*;
