//! SessionHost - the single serialization point around the state machine.
//!
//! Application commands and platform notifications arrive from independent
//! threads. Both are funnelled into one FIFO queue drained by a dedicated
//! thread, so the state machine sees a total order and only ever runs one
//! operation at a time. Gateway calls block that thread, never the async
//! runtime.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use sessionconf::HostConfig;
use sessionproto::{ActivationState, EventEnvelope};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::command::{Command, Reply};
use crate::config;
use crate::emitter::EventEmitter;
use crate::error::{SessionError, SessionResult};
use crate::gateway::{GatewayNotification, NativeSessionGateway};
use crate::state_machine::SessionStateMachine;

/// Result of one command, stamped with its position in the total order.
#[derive(Debug)]
pub struct CommandOutcome {
    /// Zero when the host stopped before the command could run.
    pub sequence: u64,
    pub result: SessionResult<Reply>,
}

enum HostInput {
    /// A command, or the reason it was rejected at the dispatch boundary.
    /// Rejections still pass through the queue to keep response order.
    Command {
        command: SessionResult<Command>,
        reply: oneshot::Sender<CommandOutcome>,
    },
    Platform(GatewayNotification),
    Shutdown,
}

/// Cloneable handle for submitting commands.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<HostInput>,
}

impl SessionHandle {
    /// Queue a command and return where its outcome will arrive.
    ///
    /// Enqueueing is synchronous, so the order of `enqueue` calls is the
    /// order in which commands run and responses are produced.
    pub fn enqueue(
        &self,
        command: SessionResult<Command>,
    ) -> SessionResult<oneshot::Receiver<CommandOutcome>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HostInput::Command { command, reply })
            .map_err(|_| host_stopped())?;
        Ok(rx)
    }

    /// Queue a command and wait for its outcome.
    pub async fn execute(&self, command: Command) -> CommandOutcome {
        match self.enqueue(Ok(command)) {
            Ok(rx) => rx.await.unwrap_or_else(|_| CommandOutcome {
                sequence: 0,
                result: Err(host_stopped()),
            }),
            Err(e) => CommandOutcome {
                sequence: 0,
                result: Err(e),
            },
        }
    }

    pub fn notifier(&self) -> PlatformNotifier {
        PlatformNotifier {
            tx: self.tx.clone(),
        }
    }
}

/// Entry point for platform callbacks. Never blocks; safe to call from any
/// thread the platform delivers notifications on.
#[derive(Clone)]
pub struct PlatformNotifier {
    tx: mpsc::UnboundedSender<HostInput>,
}

impl PlatformNotifier {
    /// Queue a notification behind everything already submitted.
    ///
    /// Returns false if the host has stopped.
    pub fn notify(&self, notification: GatewayNotification) -> bool {
        match self.tx.send(HostInput::Platform(notification)) {
            Ok(()) => true,
            Err(mpsc::error::SendError(HostInput::Platform(notification))) => {
                debug!("session host stopped, dropping {:?}", notification);
                false
            }
            Err(_) => false,
        }
    }
}

pub(crate) fn host_stopped() -> SessionError {
    SessionError::GatewayUnavailable("session host has stopped".to_string())
}

/// Owns the serialization thread.
pub struct SessionHost {
    handle: SessionHandle,
    thread: Option<JoinHandle<()>>,
}

impl SessionHost {
    /// Start the host thread around an already-built state machine.
    pub fn spawn(machine: SessionStateMachine) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let thread = thread::Builder::new()
            .name("audio-session".to_string())
            .spawn(move || run(machine, rx))?;

        Ok(Self {
            handle: SessionHandle { tx },
            thread: Some(thread),
        })
    }

    /// Build the emitter and state machine from host configuration, apply
    /// the bootstrap session if one is configured, and start the thread.
    pub fn from_config(
        gateway: Arc<dyn NativeSessionGateway>,
        host_config: &HostConfig,
    ) -> Result<(Self, mpsc::Receiver<EventEnvelope>)> {
        let (emitter, events) = EventEmitter::channel(host_config.events.buffer);
        let mut machine = SessionStateMachine::new(gateway, emitter)
            .with_auto_resume(host_config.policy.auto_resume);

        if let Some(initial) = config::from_bootstrap(&host_config.session)
            .context("invalid [session] in configuration")?
        {
            machine
                .configure(initial)
                .context("failed to apply startup session configuration")?;
        }

        let host = Self::spawn(machine).context("failed to start session host thread")?;
        Ok((host, events))
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn notifier(&self) -> PlatformNotifier {
        self.handle.notifier()
    }

    /// Finish queued work, release the session, and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.handle.tx.send(HostInput::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("session host thread panicked");
            }
        }
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(mut machine: SessionStateMachine, mut rx: mpsc::UnboundedReceiver<HostInput>) {
    info!("session host started");

    while let Some(input) = rx.blocking_recv() {
        match input {
            HostInput::Command { command, reply } => {
                let result = command.and_then(|command| machine.execute(command));
                let sequence = machine.next_sequence();
                if let Err(e) = &result {
                    debug!("command failed ({}): {}", e.kind(), e);
                }
                if reply.send(CommandOutcome { sequence, result }).is_err() {
                    debug!("caller went away before response {}", sequence);
                }
            }
            HostInput::Platform(notification) => machine.handle_notification(notification),
            HostInput::Shutdown => break,
        }
    }

    // Do not hold the hardware after we are gone
    if machine.state() != ActivationState::Inactive {
        if let Err(e) = machine.deactivate(&Default::default()) {
            warn!("deactivation at shutdown: {}", e);
        }
    }

    info!("session host stopped");
}
