//! Platform implementations of the backend and protocol collaborators.
//!
//! Only the offscreen platform lives in this crate; display-server
//! backends implement [`crate::core::backend::Backend`] and
//! [`crate::core::protocol::Protocol`] on their side.

pub mod headless;

pub use headless::{HeadlessBackend, HeadlessProtocol, ProtocolCall};
