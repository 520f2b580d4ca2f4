//! Idle inhibitor tracking.
//!
//! Clients such as video players or games hold inhibitors to keep the
//! session from going idle. The derived state is simply "any inhibitor
//! alive", pushed to the idle notifier after every change.

use crate::core::errors::{CoreError, Result};
use crate::core::listener::{Listeners, Signal, Source};
use crate::core::protocol::{ObjectId, Protocol};
use crate::util::logging;

#[derive(Debug, Default)]
pub struct IdleInhibitors {
    inhibitors: Vec<ObjectId>,
    listeners: Listeners,
}

impl IdleInhibitors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inhibited(&self) -> bool {
        !self.inhibitors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inhibitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inhibitors.is_empty()
    }

    pub fn add(&mut self, handle: ObjectId, protocol: &mut dyn Protocol) -> Result<()> {
        if self.inhibitors.contains(&handle) {
            return Err(CoreError::protocol(format!("inhibitor {:?} created twice", handle)));
        }
        self.inhibitors.push(handle);
        self.listeners.subscribe(Source::Inhibitor(handle), &[Signal::Destroy]);
        tracing::debug!(target: logging::IDLE, "Created idle inhibitor {:?}", handle);

        self.check_active(protocol);
        Ok(())
    }

    pub fn remove(&mut self, handle: ObjectId, protocol: &mut dyn Protocol) -> Result<()> {
        if self.listeners.unsubscribe_all(Source::Inhibitor(handle)) == 0 {
            return Err(CoreError::protocol(format!("unknown inhibitor {:?}", handle)));
        }
        self.inhibitors.retain(|&h| h != handle);
        tracing::debug!(target: logging::IDLE, "Destroyed idle inhibitor {:?}", handle);

        self.check_active(protocol);
        Ok(())
    }

    /// Drop every inhibitor without notifying; used during teardown.
    pub fn clear(&mut self) {
        for handle in self.inhibitors.drain(..) {
            self.listeners.unsubscribe_all(Source::Inhibitor(handle));
        }
    }

    fn check_active(&self, protocol: &mut dyn Protocol) {
        protocol.set_idle_inhibited(self.is_inhibited());
    }
}
