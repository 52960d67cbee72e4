//! Session orchestration.
//!
//! One `SessionManager` owns at most one live session. The session task
//! runs a single ordered event loop over capture frames, inbound server
//! events, and playback-idle signals; because every inbound message is
//! handled on that one loop, barge-in is atomic with respect to audio
//! chunks — no chunk of an interrupted turn can be enqueued after
//! `stop_all` runs.
//!
//! Disconnect order is fixed: stop the microphone, stop playback, close
//! the transport. A connect attempt still in flight when disconnect is
//! requested is cancelled by generation counter: the resolved transport
//! handle is closed instead of adopted.

pub mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, trace, warn};

use crate::audio::capture::{CaptureControls, CaptureGraph, CapturedFrame};
use crate::audio::playback::{PlaybackScheduler, WallClock};
use crate::audio::{codec, resample, send_mime_type, PLAYBACK_SAMPLE_RATE, SEND_SAMPLE_RATE};
use crate::config::SessionConfig;
use crate::error::{ErrorKind, SessionError};
use crate::tools::{HostAction, ToolCall, ToolCallDispatcher};
use crate::transcript::{Role, TranscriptAggregator, TranscriptEvent};
use crate::transport::ws::{self, TransportConfig};
use crate::transport::{ClientMessage, ServerEvent, TransportHandle};

pub use state::{SessionState, StateCell};

/// Events surfaced to the host. Each fires zero or more times, in the
/// order the session observed the underlying cause.
#[derive(Debug)]
pub enum SessionEvent {
    StateChange(SessionState),
    /// Smoothed microphone level, one per capture frame.
    Volume(f32),
    Transcript(TranscriptEvent),
    /// A tool side effect delegated to the host application.
    ToolCommand(HostAction),
    Error { kind: ErrorKind, message: String },
    /// Always the final event of a session or a failed connect attempt.
    Disconnected,
}

/// Owns the lifecycle of the single live session.
pub struct SessionManager {
    events: mpsc::UnboundedSender<SessionEvent>,
    generation: Arc<AtomicU64>,
    controls: Arc<CaptureControls>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SessionManager {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            events,
            generation: Arc::new(AtomicU64::new(0)),
            controls: CaptureControls::new(crate::audio::filters::DEFAULT_GAIN),
            shutdown: None,
            task: None,
        }
    }

    /// Host-adjustable capture sensitivity; applies to the live session
    /// immediately.
    pub fn set_gain(&self, gain: f32) {
        self.controls.set_gain(gain);
    }

    /// Start a session. Any previous session is torn down first; the new
    /// session task waits for that teardown to finish before it touches
    /// the microphone or the event stream, so there is never more than
    /// one live session and event streams never interleave.
    pub fn connect(&mut self, config: SessionConfig) {
        self.disconnect();
        let previous = self.task.take();
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown = Some(shutdown_tx);

        self.controls.set_gain(config.gain());
        let events = self.events.clone();
        let generation = Arc::clone(&self.generation);
        let controls = Arc::clone(&self.controls);
        self.task = Some(tokio::spawn(async move {
            if let Some(prev) = previous {
                let _ = prev.await;
            }
            run(
                config,
                my_generation,
                generation,
                controls,
                events,
                shutdown_rx,
                |cfg| async move { ws::connect(&cfg).await },
            )
            .await;
        }));
    }

    /// Tear the live session down. Safe with no session; cancels an
    /// in-flight connect.
    pub fn disconnect(&mut self) {
        // Bumping first guarantees a pending handshake is never adopted.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
    }
}

/// Whether a resolved connect attempt may become the active session.
fn should_adopt(generation: &AtomicU64, my_generation: u64) -> bool {
    generation.load(Ordering::SeqCst) == my_generation
}

async fn run<D, F>(
    config: SessionConfig,
    my_generation: u64,
    generation: Arc<AtomicU64>,
    controls: Arc<CaptureControls>,
    events: mpsc::UnboundedSender<SessionEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    dial: D,
) where
    D: FnOnce(TransportConfig) -> F,
    F: std::future::Future<
        Output = Result<(TransportHandle, mpsc::UnboundedReceiver<ServerEvent>), SessionError>,
    >,
{
    let emit = |ev: SessionEvent| {
        let _ = events.send(ev);
    };
    emit(SessionEvent::StateChange(SessionState::Connecting));

    let api_key = match config.api_key.clone() {
        Some(k) if !k.is_empty() => k,
        _ => {
            emit(SessionEvent::Error {
                kind: ErrorKind::TransportAuth,
                message: ErrorKind::TransportAuth.user_message().into(),
            });
            emit(SessionEvent::StateChange(SessionState::Idle));
            emit(SessionEvent::Disconnected);
            return;
        }
    };

    let transport_config = TransportConfig {
        endpoint: config.endpoint().to_string(),
        api_key,
    };
    let (handle, server_rx) = match dial(transport_config).await {
        Ok(pair) => pair,
        Err(e) => {
            fail_connect(&events, e);
            return;
        }
    };

    // Disconnect raced the handshake: close the handle, never adopt it.
    if !should_adopt(&generation, my_generation) {
        info!("connect cancelled before adoption, closing transport");
        handle.close();
        emit(SessionEvent::StateChange(SessionState::Idle));
        emit(SessionEvent::Disconnected);
        return;
    }

    handle.send(ClientMessage::Setup {
        model: config.model().to_string(),
        fast_response: config.fast_response(),
    });

    // Identity context: one reference chunk ahead of live audio.
    if let Some(path) = &config.reference_audio {
        match read_reference_pcm(path) {
            Ok(samples) => handle.send(ClientMessage::AudioChunk {
                mime_type: send_mime_type(),
                encoded_audio: codec::encode_for_wire(&samples),
            }),
            Err(e) => warn!("reference audio skipped: {e}"),
        }
    }

    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let capture = match CaptureGraph::start(config.input_device.clone(), Arc::clone(&controls), frame_tx) {
        Ok(c) => c,
        Err(e) => {
            handle.close();
            fail_connect(&events, e);
            return;
        }
    };
    info!(native_rate = capture.native_rate(), "capture running");

    let (idle_tx, idle_rx) = mpsc::unbounded_channel();
    let clock = Arc::new(WallClock::new());
    let scheduler = match PlaybackScheduler::new(clock.clone(), idle_tx.clone()) {
        Ok(s) => s,
        Err(e) => {
            // Session stays usable for transcripts and tools; audio out
            // is silently absent.
            warn!("audio output unavailable, running detached: {e}");
            PlaybackScheduler::detached(clock, idle_tx)
        }
    };

    let mut session = Session {
        events: events.clone(),
        handle,
        scheduler,
        aggregator: TranscriptAggregator::new(),
        dispatcher: ToolCallDispatcher::new(),
        controls,
        state: StateCell::new(SessionState::Connecting),
    };
    session.set_state(SessionState::Listening);
    info!("session live");

    let mut frame_rx = frame_rx;
    let mut idle_rx = idle_rx;
    let mut server_rx = server_rx;
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            Some(frame) = frame_rx.recv() => session.handle_frame(frame),
            Some(()) = idle_rx.recv() => session.handle_playback_idle(),
            ev = server_rx.recv() => match ev {
                Some(ev) => {
                    if session.handle_server_event(ev) == Flow::Ended {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    session.teardown(capture);
}

fn fail_connect(events: &mpsc::UnboundedSender<SessionEvent>, e: SessionError) {
    if e.kind == ErrorKind::TransportAuth {
        crate::config::clear_api_key();
    }
    warn!(kind = %e.kind, fatal = e.kind.is_fatal(), "connect failed: {}", e.message);
    let _ = events.send(SessionEvent::Error {
        kind: e.kind,
        message: e.kind.user_message().into(),
    });
    let _ = events.send(SessionEvent::StateChange(SessionState::Idle));
    let _ = events.send(SessionEvent::Disconnected);
}

/// Raw little-endian 16-bit PCM file -> normalized samples.
fn read_reference_pcm(path: &std::path::Path) -> anyhow::Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        anyhow::bail!("not a whole number of 16-bit samples: {} bytes", bytes.len());
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
        .collect())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Ended,
}

/// Live session state, driven entirely from the ordered loop in `run`.
struct Session {
    events: mpsc::UnboundedSender<SessionEvent>,
    handle: TransportHandle,
    scheduler: PlaybackScheduler,
    aggregator: TranscriptAggregator,
    dispatcher: ToolCallDispatcher,
    controls: Arc<CaptureControls>,
    state: StateCell,
}

impl Session {
    fn emit(&self, ev: SessionEvent) {
        let _ = self.events.send(ev);
    }

    fn set_state(&self, next: SessionState) {
        if self.state.set(next) {
            self.emit(SessionEvent::StateChange(next));
        }
    }

    /// Conditioned capture frame -> downsample -> encode -> fire-and-forget
    /// send. Nothing in this path blocks on the network.
    fn handle_frame(&self, frame: CapturedFrame) {
        self.emit(SessionEvent::Volume(frame.volume));
        if frame.gated {
            trace!(volume = frame.volume, "frame gated");
        }
        let samples = resample::downsample(&frame.samples, frame.sample_rate, SEND_SAMPLE_RATE);
        self.handle.send(ClientMessage::AudioChunk {
            mime_type: send_mime_type(),
            encoded_audio: codec::encode_for_wire(&samples),
        });
    }

    /// Playback drained and stayed empty through the debounce.
    fn handle_playback_idle(&self) {
        self.controls.set_assistant_speaking(false);
        if matches!(
            self.state.get(),
            SessionState::Speaking | SessionState::Thinking
        ) {
            self.set_state(SessionState::Listening);
        }
    }

    fn handle_server_event(&mut self, ev: ServerEvent) -> Flow {
        match ev {
            ServerEvent::AudioChunk { encoded_audio } => {
                match codec::decode_from_wire(&encoded_audio) {
                    Ok(samples) => {
                        self.scheduler.enqueue(samples, PLAYBACK_SAMPLE_RATE);
                        self.controls.set_assistant_speaking(true);
                        self.set_state(SessionState::Speaking);
                    }
                    // Recovered locally: drop the chunk, keep the session.
                    Err(e) => warn!("dropping inbound chunk: {e}"),
                }
                Flow::Continue
            }
            ServerEvent::Interrupted {} => {
                self.scheduler.stop_all();
                self.aggregator.discard_model_turn();
                self.controls.set_assistant_speaking(false);
                self.set_state(SessionState::Listening);
                Flow::Continue
            }
            ServerEvent::InputTranscriptDelta { text } => {
                let ev = self.aggregator.append_delta(Role::User, &text);
                self.emit(SessionEvent::Transcript(ev));
                Flow::Continue
            }
            ServerEvent::OutputTranscriptDelta { text } => {
                let ev = self.aggregator.append_delta(Role::Model, &text);
                self.emit(SessionEvent::Transcript(ev));
                Flow::Continue
            }
            ServerEvent::TurnComplete {} => {
                for ev in self.aggregator.finalize_turn() {
                    self.emit(SessionEvent::Transcript(ev));
                }
                // Grace period: if audio is still draining, the playback
                // idle signal takes us back to Listening.
                if !self.scheduler.is_active() {
                    self.controls.set_assistant_speaking(false);
                    self.set_state(SessionState::Listening);
                }
                Flow::Continue
            }
            ServerEvent::ToolCall { id, name, args } => {
                self.set_state(SessionState::Thinking);
                let outcome = self.dispatcher.dispatch(ToolCall { id, name, args });
                if let Some(action) = outcome.action {
                    self.emit(SessionEvent::ToolCommand(action));
                }
                // Exactly one result per call id, sent before the next
                // inbound event is observed.
                self.handle.send(ClientMessage::tool_result(outcome.result));
                Flow::Continue
            }
            ServerEvent::Closed {} => Flow::Ended,
            ServerEvent::Error { message } => {
                // The raw transport text goes to the log only; the host
                // sees the stable message class for the kind.
                warn!("transport error: {message}");
                self.emit(SessionEvent::Error {
                    kind: ErrorKind::TransportNetwork,
                    message: ErrorKind::TransportNetwork.user_message().into(),
                });
                Flow::Ended
            }
        }
    }

    /// Fixed order: microphone, playback, transport.
    fn teardown(self, mut capture: CaptureGraph) {
        capture.stop();
        self.scheduler.stop_all();
        self.handle.close();
        self.set_state(SessionState::Closed);
        self.emit(SessionEvent::Disconnected);
        info!("session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::{ManualClock, PlaybackClock};
    use crate::transport::Outbound;
    use serde_json::json;

    struct Fixture {
        session: Session,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        outbound: mpsc::UnboundedReceiver<Outbound>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (handle, outbound) = TransportHandle::channel();
        let clock = Arc::new(ManualClock::new());
        let (idle_tx, _idle_rx) = mpsc::unbounded_channel();
        let scheduler = PlaybackScheduler::detached(clock.clone(), idle_tx);
        let session = Session {
            events: event_tx,
            handle,
            scheduler,
            aggregator: TranscriptAggregator::new(),
            dispatcher: ToolCallDispatcher::new(),
            controls: CaptureControls::new(1.5),
            state: StateCell::new(SessionState::Listening),
        };
        Fixture {
            session,
            events,
            outbound,
            clock,
        }
    }

    fn drain_events(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn audio_chunk(n: usize) -> ServerEvent {
        ServerEvent::AudioChunk {
            encoded_audio: codec::encode_for_wire(&vec![0.1f32; n]),
        }
    }

    #[tokio::test]
    async fn first_audio_chunk_enters_speaking() {
        let mut f = fixture();
        let flow = f.session.handle_server_event(audio_chunk(1365));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(f.session.state.get(), SessionState::Speaking);
        assert!(f.session.scheduler.is_active());
        // Gate threshold context follows playback activity.
        assert_eq!(
            f.session.controls.gate_context(),
            crate::audio::filters::GateContext::AssistantSpeaking
        );
    }

    #[tokio::test]
    async fn barge_in_stops_playback_and_discards_model_transcript() {
        let mut f = fixture();
        f.session.handle_server_event(audio_chunk(2400));
        f.session.handle_server_event(ServerEvent::OutputTranscriptDelta {
            text: "As I was say".into(),
        });
        f.clock.advance(0.02);

        f.session.handle_server_event(ServerEvent::Interrupted {});

        assert!(!f.session.scheduler.is_active());
        assert!(f.session.scheduler.next_start() <= f.clock.now());
        assert_eq!(f.session.state.get(), SessionState::Listening);
        assert_eq!(
            f.session.controls.gate_context(),
            crate::audio::filters::GateContext::Quiet
        );

        // The interrupted utterance is not a completed turn.
        f.session.handle_server_event(ServerEvent::TurnComplete {});
        let finals: Vec<_> = drain_events(&mut f.events)
            .into_iter()
            .filter_map(|ev| match ev {
                SessionEvent::Transcript(t) if t.is_final => Some(t),
                _ => None,
            })
            .collect();
        assert!(finals.is_empty());
    }

    #[tokio::test]
    async fn enqueue_after_barge_in_never_schedules_in_the_past() {
        let mut f = fixture();
        f.session.handle_server_event(audio_chunk(24_000));
        f.clock.advance(0.1);
        f.session.handle_server_event(ServerEvent::Interrupted {});
        f.session.handle_server_event(audio_chunk(2400));
        assert!(f.session.scheduler.next_start() >= f.clock.now() - 1e-9);
    }

    #[tokio::test]
    async fn malformed_chunk_is_dropped_session_survives() {
        let mut f = fixture();
        let flow = f.session.handle_server_event(ServerEvent::AudioChunk {
            encoded_audio: "???".into(),
        });
        assert_eq!(flow, Flow::Continue);
        assert_eq!(f.session.state.get(), SessionState::Listening);
        assert!(!f.session.scheduler.is_active());
        // Not surfaced to the host as an error.
        assert!(drain_events(&mut f.events)
            .iter()
            .all(|ev| !matches!(ev, SessionEvent::Error { .. })));
    }

    #[tokio::test]
    async fn tool_call_returns_result_and_delegates_side_effect() {
        let mut f = fixture();
        f.session.handle_server_event(ServerEvent::ToolCall {
            id: "c1".into(),
            name: "play_video".into(),
            args: json!({ "video_id": "dQw4w9WgXcQ" }),
        });
        assert_eq!(f.session.state.get(), SessionState::Thinking);

        let events = drain_events(&mut f.events);
        assert!(events
            .iter()
            .any(|ev| matches!(ev, SessionEvent::ToolCommand(a) if a.name == "play_video")));

        match f.outbound.try_recv().unwrap() {
            Outbound::Message(ClientMessage::ToolResult { id, result, .. }) => {
                assert_eq!(id, "c1");
                assert_eq!(result["ok"], true);
            }
            other => panic!("unexpected outbound {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_tool_args_feed_back_without_side_effect() {
        let mut f = fixture();
        f.session.handle_server_event(ServerEvent::ToolCall {
            id: "c2".into(),
            name: "play_video".into(),
            args: json!({ "video_id": "nope" }),
        });
        let events = drain_events(&mut f.events);
        assert!(!events
            .iter()
            .any(|ev| matches!(ev, SessionEvent::ToolCommand(_))));
        match f.outbound.try_recv().unwrap() {
            Outbound::Message(ClientMessage::ToolResult { result, .. }) => {
                assert_eq!(result["error"], "invalid_video_id");
                assert_eq!(result["received"], "nope");
            }
            other => panic!("unexpected outbound {other:?}"),
        }
    }

    #[tokio::test]
    async fn turn_complete_finalizes_each_role_once() {
        let mut f = fixture();
        f.session.handle_server_event(ServerEvent::InputTranscriptDelta {
            text: "what time is it".into(),
        });
        f.session.handle_server_event(ServerEvent::OutputTranscriptDelta {
            text: "It is noon.".into(),
        });
        f.session.handle_server_event(ServerEvent::TurnComplete {});
        f.session.handle_server_event(ServerEvent::TurnComplete {});

        let finals: Vec<_> = drain_events(&mut f.events)
            .into_iter()
            .filter_map(|ev| match ev {
                SessionEvent::Transcript(t) if t.is_final => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(finals.len(), 2);
        assert_eq!(finals[0].role, Role::User);
        assert_eq!(finals[1].role, Role::Model);
    }

    #[tokio::test]
    async fn capture_frame_is_resampled_and_sent() {
        let mut f = fixture();
        f.session.handle_frame(CapturedFrame {
            samples: vec![0.1f32; 4096],
            sample_rate: 48_000,
            volume: 7.5,
            gated: false,
        });
        match f.outbound.try_recv() {
            Ok(Outbound::Message(ClientMessage::AudioChunk { encoded_audio, mime_type })) => {
                assert_eq!(mime_type, send_mime_type());
                let decoded = codec::decode_from_wire(&encoded_audio).unwrap();
                assert_eq!(decoded.len(), 1365);
            }
            other => panic!("unexpected outbound {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_ends_the_session() {
        let mut f = fixture();
        let flow = f.session.handle_server_event(ServerEvent::Error {
            message: "quota exceeded".into(),
        });
        assert_eq!(flow, Flow::Ended);
        let events = drain_events(&mut f.events);
        // The host gets the stable message class, not the raw wire text.
        assert!(events.iter().any(|ev| matches!(
            ev,
            SessionEvent::Error { kind: ErrorKind::TransportNetwork, message }
                if message == ErrorKind::TransportNetwork.user_message()
        )));
    }

    #[tokio::test]
    async fn cancelled_connect_is_never_adopted() {
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(1));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (gate_tx, gate_rx) = tokio::sync::oneshot::channel::<()>();
        let (handle, mut outbound) = TransportHandle::channel();
        let (_server_tx, server_rx) = mpsc::unbounded_channel();
        let config = SessionConfig {
            api_key: Some("key".into()),
            ..Default::default()
        };

        // The dial future resolves only once the gate opens, holding the
        // handshake in flight.
        let task = tokio::spawn(run(
            config,
            1,
            Arc::clone(&generation),
            CaptureControls::new(1.5),
            event_tx,
            shutdown_rx,
            move |_| async move {
                let _ = gate_rx.await;
                Ok::<_, SessionError>((handle, server_rx))
            },
        ));

        // Disconnect arrives before the handshake resolves.
        generation.fetch_add(1, Ordering::SeqCst);
        let _ = gate_tx.send(());
        task.await.unwrap();

        // The resolved handle is closed without a single frame sent.
        assert!(matches!(outbound.try_recv().unwrap(), Outbound::Close));
        assert!(outbound.try_recv().is_err());

        // No setup, no Listening; the attempt ends Idle then Disconnected.
        let seen = drain_events(&mut events);
        assert!(matches!(
            seen[0],
            SessionEvent::StateChange(SessionState::Connecting)
        ));
        assert!(seen
            .iter()
            .all(|ev| !matches!(ev, SessionEvent::StateChange(SessionState::Listening))));
        assert!(matches!(seen.last().unwrap(), SessionEvent::Disconnected));
    }

    #[tokio::test]
    async fn fatal_connect_failure_ends_with_disconnected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        fail_connect(
            &tx,
            SessionError::new(ErrorKind::TransportNetwork, "dns failure"),
        );
        let seen = drain_events(&mut rx);
        assert!(matches!(
            seen[0],
            SessionEvent::Error { kind: ErrorKind::TransportNetwork, ref message }
                if message == ErrorKind::TransportNetwork.user_message()
        ));
        assert!(matches!(
            seen[1],
            SessionEvent::StateChange(SessionState::Idle)
        ));
        assert!(matches!(seen[2], SessionEvent::Disconnected));
    }

    #[tokio::test]
    async fn reconnect_finishes_previous_attempt_before_starting() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = SessionManager::new(tx);
        // No credential: each attempt fails fast after Connecting.
        manager.connect(SessionConfig::default());
        manager.connect(SessionConfig::default());
        drop(manager);

        let mut seen = Vec::new();
        while let Some(ev) = rx.recv().await {
            seen.push(ev);
        }
        // Two complete sequences, never interleaved: the first attempt's
        // Disconnected precedes the second attempt's Connecting.
        assert_eq!(seen.len(), 8);
        assert!(matches!(
            seen[0],
            SessionEvent::StateChange(SessionState::Connecting)
        ));
        assert!(matches!(seen[3], SessionEvent::Disconnected));
        assert!(matches!(
            seen[4],
            SessionEvent::StateChange(SessionState::Connecting)
        ));
        assert!(matches!(seen[7], SessionEvent::Disconnected));
    }

    #[tokio::test]
    async fn playback_idle_returns_to_listening() {
        let mut f = fixture();
        f.session.handle_server_event(audio_chunk(1365));
        assert_eq!(f.session.state.get(), SessionState::Speaking);
        f.session.handle_playback_idle();
        assert_eq!(f.session.state.get(), SessionState::Listening);
        assert_eq!(
            f.session.controls.gate_context(),
            crate::audio::filters::GateContext::Quiet
        );
    }
}
