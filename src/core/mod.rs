pub mod backend;
pub mod errors;
pub mod event;
pub mod idle;
pub mod input;
pub mod listener;
pub mod output;
pub mod protocol;
pub mod runtime;
pub mod server;
pub mod supervise;
pub mod window;

// Re-export key types
pub use errors::{CoreError, Result};
pub use event::Event;
pub use runtime::{Runtime, RuntimeConfig};
pub use server::Server;
