//! Realtime voice session core.
//!
//! Communicates with the host application via JSON-line IPC on
//! stdin/stdout. This is the entry point that wires host commands into
//! the session manager and session events back out to the host.

mod audio;
mod config;
mod error;
mod ipc;
mod session;
mod tools;
mod transcript;
mod transport;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::read_session_config;
use ipc::bridge::{emit_event, spawn_stdin_reader};
use ipc::{HostCommand, HostEvent};
use session::{SessionEvent, SessionManager};

#[tokio::main]
async fn main() {
    // Initialize tracing (respects RUST_LOG env, defaults to info).
    // stderr only — stdout carries the IPC protocol.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Emit starting event immediately so the host knows we're alive.
    emit_event(&HostEvent::Starting {});

    let mut cmd_rx = spawn_stdin_reader();
    let (session_tx, mut session_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut manager = SessionManager::new(session_tx);
    // Latency preference set via IPC; overrides the config file at connect.
    let mut fast_response_override: Option<bool> = None;

    emit_event(&HostEvent::Ready {});
    info!("session core ready");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(command) => {
                        if !handle_command(&mut manager, &mut fast_response_override, command) {
                            break; // Stop command received
                        }
                    }
                    None => {
                        // stdin closed — parent process gone
                        info!("stdin closed, shutting down");
                        break;
                    }
                }
            }
            Some(ev) = session_rx.recv() => {
                emit_event(&translate(ev));
            }
        }
    }

    manager.disconnect();
    info!("session core shutting down");
}

/// Handle a single command from the host.
/// Returns `false` if the main loop should exit.
fn handle_command(
    manager: &mut SessionManager,
    fast_response_override: &mut Option<bool>,
    cmd: HostCommand,
) -> bool {
    match cmd {
        HostCommand::Ping {} => {
            emit_event(&HostEvent::Pong {});
        }

        HostCommand::Stop {} => {
            emit_event(&HostEvent::Stopping {});
            return false;
        }

        HostCommand::Connect {
            fast_response,
            input_device,
        } => {
            let mut cfg = read_session_config();
            if let Some(enabled) = fast_response.or(*fast_response_override) {
                cfg.fast_response = Some(enabled);
            }
            if input_device.is_some() {
                cfg.input_device = input_device;
            }
            info!(endpoint = %cfg.endpoint(), model = %cfg.model(), "connect requested");
            manager.connect(cfg);
        }

        HostCommand::Disconnect {} => {
            info!("disconnect requested");
            manager.disconnect();
        }

        HostCommand::SetSensitivity { gain } => {
            manager.set_gain(gain);
        }

        HostCommand::SetFastResponse { enabled } => {
            info!(enabled, "fast response preference updated");
            *fast_response_override = Some(enabled);
        }

        HostCommand::ListAudioDevices {} => {
            emit_event(&HostEvent::AudioDevices {
                input: audio::capture::list_devices(),
                output: audio::capture::list_output_devices(),
            });
        }
    }
    true
}

fn translate(ev: SessionEvent) -> HostEvent {
    match ev {
        SessionEvent::StateChange(state) => HostEvent::StateChange { state },
        SessionEvent::Volume(level) => HostEvent::Volume { level },
        SessionEvent::Transcript(t) => HostEvent::Transcript(t),
        SessionEvent::ToolCommand(a) => HostEvent::ToolCommand(a),
        SessionEvent::Error { kind, message } => HostEvent::Error { kind, message },
        SessionEvent::Disconnected => HostEvent::Disconnected {},
    }
}
