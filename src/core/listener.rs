//! Subscription records.
//!
//! Each component owns a [`Listeners`] table holding the (source, signal)
//! pairs it subscribed to. An event is only routed into a component while
//! the matching record exists, and a component drops every record of an
//! entity before it frees that entity, so a late event can never reach
//! freed state.

use std::collections::HashSet;

use crate::core::backend::{DeviceId, OutputId};
use crate::core::protocol::ObjectId;

/// The entity a subscription is registered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Output(OutputId),
    Device(DeviceId),
    Toplevel(ObjectId),
    Popup(ObjectId),
    Decoration(ObjectId),
    Inhibitor(ObjectId),
    DragIcon(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Destroy,
    Commit,
    Frame,
    RequestState,
    Map,
    Unmap,
    SetTitle,
    SetAppId,
    SetParent,
    RequestFullscreen,
    RequestConfigure,
    RequestMode,
    Reposition,
    Key,
    Modifiers,
    Motion,
    Button,
    Axis,
    Touch,
}

#[derive(Debug, Default)]
pub struct Listeners {
    records: HashSet<(Source, Signal)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, source: Source, signals: &[Signal]) {
        for &signal in signals {
            self.records.insert((source, signal));
        }
    }

    /// Drop every record registered on `source`. Returns how many were dropped.
    pub fn unsubscribe_all(&mut self, source: Source) -> usize {
        let before = self.records.len();
        self.records.retain(|(s, _)| *s != source);
        before - self.records.len()
    }

    pub fn is_subscribed(&self, source: Source, signal: Signal) -> bool {
        self.records.contains(&(source, signal))
    }

    pub fn has_source(&self, source: Source) -> bool {
        self.records.iter().any(|(s, _)| *s == source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_all_only_touches_one_source() {
        let mut listeners = Listeners::new();
        let a = Source::Toplevel(ObjectId(1));
        let b = Source::Toplevel(ObjectId(2));
        listeners.subscribe(a, &[Signal::Map, Signal::Destroy]);
        listeners.subscribe(b, &[Signal::Map]);

        assert_eq!(listeners.unsubscribe_all(a), 2);
        assert!(!listeners.is_subscribed(a, Signal::Map));
        assert!(listeners.is_subscribed(b, Signal::Map));
        assert_eq!(listeners.len(), 1);
    }
}
