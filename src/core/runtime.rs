//! The event loop.
//!
//! One thread, one event at a time. Each turn checks the process-level
//! sources (termination signals, the primary client's hangup pipe), queues
//! what they produced, and lets the server dispatch everything pending.
//! The hangup poll doubles as the loop's idle wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::backend::Backend;
use crate::core::event::Event;
use crate::core::protocol::Protocol;
use crate::core::server::Server;
use crate::core::supervise::ClientProcess;
use crate::util::logging;
use crate::wlog;

/// Loop configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Longest time a turn waits for the client pipe.
    pub tick: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick: Duration::from_millis(16) }
    }
}

pub struct Runtime {
    config: RuntimeConfig,
    /// Set from SIGINT/SIGTERM handlers.
    terminate_requested: Arc<AtomicBool>,
    client_gone: bool,
    turns: u64,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            terminate_requested: Arc::new(AtomicBool::new(false)),
            client_gone: false,
            turns: 0,
        }
    }

    /// Route SIGINT and SIGTERM into the loop.
    pub fn register_signals(&self) -> Result<()> {
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.terminate_requested))
                .with_context(|| format!("Failed to register handler for signal {signal}"))?;
        }
        Ok(())
    }

    /// Flag that a termination signal arrived.
    pub fn terminate_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate_requested)
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Run one turn. Returns false once the server is terminating.
    pub fn turn<B: Backend, P: Protocol>(
        &mut self,
        server: &mut Server<B, P>,
        client: Option<&ClientProcess>,
    ) -> Result<bool> {
        self.turns += 1;

        if self.terminate_requested.swap(false, Ordering::SeqCst) {
            server.push_event(Event::Terminate);
        }

        match client {
            Some(client) if !self.client_gone => {
                let timeout = self.config.tick.as_millis().min(i32::MAX as u128) as i32;
                if client.poll_hangup(timeout).context("Failed to poll client pipe")? {
                    self.client_gone = true;
                    server.push_event(Event::ClientExited);
                }
            }
            _ => std::thread::sleep(self.config.tick),
        }

        server.dispatch();
        Ok(!server.is_terminating())
    }

    /// Turn until the server terminates.
    pub fn run<B: Backend, P: Protocol>(
        &mut self,
        server: &mut Server<B, P>,
        client: Option<&ClientProcess>,
    ) -> Result<()> {
        wlog!(logging::SERVER, "Entering event loop");
        while self.turn(server, client)? {}
        wlog!(logging::SERVER, "Event loop exited after {} turns", self.turns);
        Ok(())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
