//! Core error types

use thiserror::Error;

/// Core compositor errors.
///
/// Only `Terminal` escapes the event loop; every other variant is logged by
/// the server and the operation that raised it leaves prior state intact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("allocation failed: {0}")]
    Allocation(String),

    #[error("mode negotiation failed: {0}")]
    Negotiation(String),

    #[error("output configuration rejected: {0}")]
    Transaction(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("terminal condition: {0}")]
    Terminal(String),

    #[error("unknown output: {0}")]
    UnknownOutput(u32),

    #[error("unknown view: {0}")]
    UnknownView(u32),

    #[error("unknown input device: {0}")]
    UnknownDevice(u32),
}

impl CoreError {
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    pub fn negotiation(msg: impl Into<String>) -> Self {
        Self::Negotiation(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
