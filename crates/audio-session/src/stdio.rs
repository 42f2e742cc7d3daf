//! JSON-lines host over stdin/stdout.
//!
//! Each input line is either a method call
//! (`{"id":1,"method":"activate","arguments":{}}`) or a simulated platform
//! notification (`{"simulate":{"type":"interruptionBegan"}}`). Responses and
//! events share the output stream; both carry `sequence`, so a reader can
//! recover the order in which the host produced them.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sessionproto::{
    EventEnvelope, InterruptionEvent, InterruptionOption, MethodCall, RouteChangeEvent,
    RouteChangeReason, RouteDescriptor,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dispatcher::{CommandDispatcher, PendingRequest};
use crate::error::SessionError;
use crate::gateway::{GatewayNotification, NativeSessionGateway};
use crate::host::{PlatformNotifier, SessionHost};
use crate::simulated::SimulatedGateway;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
    Simulate { simulate: Simulation },
    Call(MethodCall),
}

/// Platform notification injected from the input stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Simulation {
    InterruptionBegan,
    InterruptionEnded {
        #[serde(default)]
        should_resume: bool,
    },
    /// Optionally switches the simulated route before notifying.
    RouteChange {
        reason: RouteChangeReason,
        #[serde(default)]
        route: Option<RouteDescriptor>,
    },
    MediaServicesLost,
    MediaServicesReset,
    SilenceSecondaryAudioHint {
        begin: bool,
    },
    /// Gateway state only; no notification is sent.
    OtherAudioPlaying {
        playing: bool,
    },
    /// Gateway state only; no notification is sent.
    GatewayOffline {
        offline: bool,
    },
}

/// Apply a simulation to the gateway and forward the matching notification.
pub fn simulate(simulation: Simulation, gateway: &SimulatedGateway, notifier: &PlatformNotifier) {
    debug!("simulating {:?}", simulation);
    let notification = match simulation {
        Simulation::InterruptionBegan => {
            GatewayNotification::Interruption(InterruptionEvent::began())
        }
        Simulation::InterruptionEnded { should_resume } => {
            let options = should_resume.then_some(InterruptionOption::ShouldResume);
            GatewayNotification::Interruption(InterruptionEvent::ended(options))
        }
        Simulation::RouteChange { reason, route } => {
            let previous_route = match route {
                Some(route) => gateway.set_route(route),
                None => gateway.current_route().unwrap_or_default(),
            };
            GatewayNotification::RouteChange(RouteChangeEvent {
                reason,
                previous_route,
            })
        }
        Simulation::MediaServicesLost => {
            gateway.reset_media_services();
            GatewayNotification::MediaServicesLost
        }
        Simulation::MediaServicesReset => {
            gateway.reset_media_services();
            GatewayNotification::MediaServicesReset
        }
        Simulation::SilenceSecondaryAudioHint { begin } => {
            GatewayNotification::SilenceSecondaryAudioHint { begin }
        }
        Simulation::OtherAudioPlaying { playing } => {
            gateway.set_other_audio_playing(playing);
            return;
        }
        Simulation::GatewayOffline { offline } => {
            gateway.set_unavailable(offline);
            return;
        }
    };
    notifier.notify(notification);
}

/// Serve the protocol until `input` reaches end of stream.
///
/// Takes ownership of the host: once every queued command has been answered
/// the host is shut down, which closes the event stream and ends the run.
pub async fn run<R, W>(
    host: SessionHost,
    events: mpsc::Receiver<EventEnvelope>,
    gateway: Arc<SimulatedGateway>,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let dispatcher = CommandDispatcher::new(host.handle());
    let notifier = host.notifier();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (pending_tx, pending_rx) = mpsc::unbounded_channel::<PendingRequest>();

    let pump = tokio::spawn(pump_output(pending_rx, events, out_tx, host));

    let mut lines = input.lines();
    let mut pending_tx = Some(pending_tx);

    loop {
        tokio::select! {
            line = lines.next_line(), if pending_tx.is_some() => {
                match line.context("failed to read input")? {
                    Some(line) => {
                        if let Some(pending) = &pending_tx {
                            handle_line(&line, &dispatcher, &gateway, &notifier, pending);
                        }
                    }
                    None => {
                        debug!("input closed, draining");
                        pending_tx = None;
                    }
                }
            }
            line = out_rx.recv() => match line {
                Some(line) => {
                    output.write_all(line.as_bytes()).await.context("failed to write output")?;
                    output.write_all(b"\n").await.context("failed to write output")?;
                    output.flush().await.context("failed to flush output")?;
                }
                None => break,
            },
        }
    }

    pump.await.context("output task failed")?;
    info!("stdio host finished");
    Ok(())
}

fn handle_line(
    line: &str,
    dispatcher: &CommandDispatcher,
    gateway: &SimulatedGateway,
    notifier: &PlatformNotifier,
    pending: &mpsc::UnboundedSender<PendingRequest>,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let request = match serde_json::from_str::<Inbound>(line) {
        Ok(Inbound::Simulate { simulate: simulation }) => {
            simulate(simulation, gateway, notifier);
            return;
        }
        Ok(Inbound::Call(call)) => dispatcher.submit(call),
        Err(e) => {
            warn!("malformed input line: {}", e);
            dispatcher.reject(None, SessionError::UnsupportedMethod(format!("malformed request: {}", e)))
        }
    };

    if pending.send(request).is_err() {
        warn!("response writer gone");
    }
}

/// Merge responses and events into one stream ordered by sequence.
///
/// Responses are produced in submission order, so the oldest outstanding
/// request always holds the smallest sequence still to come. An event is
/// written only once every response stamped before it has been written.
///
/// A request is queued on `pending` before any later input line is handled,
/// and every event comes from such a later line, so a request that precedes
/// an event is always visible to `try_recv` by the time the event arrives.
async fn pump_output(
    mut pending: mpsc::UnboundedReceiver<PendingRequest>,
    mut events: mpsc::Receiver<EventEnvelope>,
    out: mpsc::UnboundedSender<String>,
    host: SessionHost,
) {
    let mut held: Option<EventEnvelope> = None;
    let mut events_open = true;

    loop {
        let request = match pending.try_recv() {
            Ok(request) => request,
            Err(mpsc::error::TryRecvError::Disconnected) => break,
            Err(mpsc::error::TryRecvError::Empty) => {
                // Nothing outstanding, so a held event is next in order
                if let Some(envelope) = held.take() {
                    write_line(&out, &envelope, envelope.sequence);
                    continue;
                }

                tokio::select! {
                    request = pending.recv() => match request {
                        Some(request) => request,
                        None => break,
                    },
                    envelope = events.recv(), if events_open => {
                        match envelope {
                            Some(envelope) => match pending.try_recv() {
                                Ok(request) => {
                                    held = Some(envelope);
                                    request
                                }
                                Err(_) => {
                                    write_line(&out, &envelope, envelope.sequence);
                                    continue;
                                }
                            },
                            None => {
                                events_open = false;
                                continue;
                            }
                        }
                    }
                }
            }
        };

        let response = request.response().await;

        // Events stamped before this response were emitted before it was sent
        loop {
            let envelope = match held.take() {
                Some(envelope) => envelope,
                None => match events.try_recv() {
                    Ok(envelope) => envelope,
                    Err(_) => break,
                },
            };
            if envelope.sequence < response.sequence {
                write_line(&out, &envelope, envelope.sequence);
            } else {
                held = Some(envelope);
                break;
            }
        }

        write_line(&out, &response, response.sequence);
    }

    if let Some(envelope) = held.take() {
        write_line(&out, &envelope, envelope.sequence);
    }

    // All responses written; stopping the host closes the event stream
    if let Err(e) = tokio::task::spawn_blocking(move || host.shutdown()).await {
        warn!("host shutdown failed: {}", e);
    }

    while let Some(envelope) = events.recv().await {
        write_line(&out, &envelope, envelope.sequence);
    }
}

fn write_line<T: Serialize>(out: &mpsc::UnboundedSender<String>, value: &T, sequence: u64) {
    match serde_json::to_string(value) {
        Ok(line) => {
            let _ = out.send(line);
        }
        Err(e) => warn!("failed to encode output {}: {}", sequence, e),
    }
}
