//! Decoration mode negotiation.
//!
//! The compositor always decides: the mode comes from configuration, and a
//! client request only triggers sending it again.

use crate::core::protocol::{DecorationMode, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub handle: ObjectId,
    pub toplevel: ObjectId,
    /// Last mode the client asked for. Observed, never honored.
    pub requested: Option<DecorationMode>,
}

pub fn configured_mode(server_side: bool) -> DecorationMode {
    if server_side {
        DecorationMode::ServerSide
    } else {
        DecorationMode::ClientSide
    }
}
