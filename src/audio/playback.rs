//! Playback scheduling for streamed response audio.
//!
//! The scheduler owns the output clock and the set of in-flight sources.
//! Buffers are scheduled back-to-back on a `next_start` cursor so playback
//! is gapless, and `stop_all` halts everything instantly for barge-in.
//!
//! Audio leaves through a dedicated rodio thread; the scheduler itself is
//! `Send` and can live inside the session task. It can also be built
//! detached (no output device) for tests and for draining on disconnect.

use std::collections::HashSet;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Debounce before declaring playback idle, to absorb inter-chunk gaps in
/// the network stream.
const IDLE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Monotonic output clock, in seconds. Injected so tests can drive time
/// manually.
pub trait PlaybackClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock anchored at construction.
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl PlaybackClock for WallClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Hand-advanced clock for tests.
pub struct ManualClock {
    time: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            time: Mutex::new(0.0),
        }
    }

    pub fn advance(&self, secs: f64) {
        *self.time.lock().unwrap() += secs;
    }
}

impl PlaybackClock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock().unwrap()
    }
}

/// Bookkeeping for one scheduled buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scheduled {
    pub id: u64,
    pub start: f64,
    pub duration: f64,
}

struct Book {
    next_start: f64,
    live: HashSet<u64>,
    next_id: u64,
    /// Bumped by `stop_all`; stale completion timers check it before
    /// touching the live set.
    generation: u64,
}

enum OutputCmd {
    Append(Vec<f32>, u32),
    Stop,
}

/// Dedicated thread owning the rodio stream (rodio handles are not `Send`).
struct OutputThread {
    tx: std_mpsc::Sender<OutputCmd>,
}

impl OutputThread {
    fn spawn() -> anyhow::Result<Self> {
        let (tx, rx) = std_mpsc::channel::<OutputCmd>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<anyhow::Result<()>>();
        std::thread::spawn(move || {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow::anyhow!("audio output: {e}")));
                    return;
                }
            };
            let sink = match Sink::try_new(&handle) {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow::anyhow!("audio sink: {e}")));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            let _stream = stream;
            while let Ok(cmd) = rx.recv() {
                match cmd {
                    OutputCmd::Append(samples, rate) => {
                        sink.append(SamplesBuffer::new(1, rate, samples));
                    }
                    OutputCmd::Stop => sink.stop(),
                }
            }
        });
        ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("audio output thread died"))??;
        Ok(Self { tx })
    }
}

/// Gapless playback scheduler. See module docs.
pub struct PlaybackScheduler {
    clock: Arc<dyn PlaybackClock>,
    book: Arc<Mutex<Book>>,
    idle_tx: mpsc::UnboundedSender<()>,
    output: Option<OutputThread>,
}

impl PlaybackScheduler {
    /// Open the default output device. `idle_tx` receives one message each
    /// time the live set empties and stays empty through the debounce.
    pub fn new(
        clock: Arc<dyn PlaybackClock>,
        idle_tx: mpsc::UnboundedSender<()>,
    ) -> anyhow::Result<Self> {
        let output = OutputThread::spawn()?;
        Ok(Self::build(clock, idle_tx, Some(output)))
    }

    /// Scheduler with no output device. Scheduling semantics are identical;
    /// nothing is audible.
    pub fn detached(clock: Arc<dyn PlaybackClock>, idle_tx: mpsc::UnboundedSender<()>) -> Self {
        Self::build(clock, idle_tx, None)
    }

    fn build(
        clock: Arc<dyn PlaybackClock>,
        idle_tx: mpsc::UnboundedSender<()>,
        output: Option<OutputThread>,
    ) -> Self {
        let next_start = clock.now();
        Self {
            clock,
            book: Arc::new(Mutex::new(Book {
                next_start,
                live: HashSet::new(),
                next_id: 0,
                generation: 0,
            })),
            idle_tx,
            output,
        }
    }

    /// Schedule a decoded buffer for gapless playback.
    ///
    /// If the cursor has fallen behind the clock (underrun), it snaps
    /// forward to `now` before scheduling, so nothing is ever scheduled in
    /// the past.
    pub fn enqueue(&self, samples: Vec<f32>, sample_rate: u32) -> Scheduled {
        let duration = samples.len() as f64 / sample_rate as f64;
        let (scheduled, generation) = {
            let mut book = self.book.lock().unwrap();
            let now = self.clock.now();
            if book.next_start < now {
                book.next_start = now;
            }
            let id = book.next_id;
            book.next_id += 1;
            let start = book.next_start;
            book.next_start = start + duration;
            book.live.insert(id);
            (
                Scheduled {
                    id,
                    start,
                    duration,
                },
                book.generation,
            )
        };

        if let Some(out) = &self.output {
            if out.tx.send(OutputCmd::Append(samples, sample_rate)).is_err() {
                warn!("playback output thread gone, dropping buffer");
            }
        }

        self.spawn_completion_timer(scheduled, generation);
        scheduled
    }

    /// Halt every live source and reset the cursor to the current clock
    /// time. Idempotent; safe with zero live sources. Used for barge-in.
    pub fn stop_all(&self) {
        {
            let mut book = self.book.lock().unwrap();
            book.generation += 1;
            book.live.clear();
            book.next_start = self.clock.now();
        }
        if let Some(out) = &self.output {
            let _ = out.tx.send(OutputCmd::Stop);
        }
        debug!("playback stopped");
    }

    /// Whether any source is still live.
    pub fn is_active(&self) -> bool {
        !self.book.lock().unwrap().live.is_empty()
    }

    /// Current value of the scheduling cursor.
    pub fn next_start(&self) -> f64 {
        self.book.lock().unwrap().next_start
    }

    fn spawn_completion_timer(&self, scheduled: Scheduled, generation: u64) {
        let clock = Arc::clone(&self.clock);
        let book = Arc::clone(&self.book);
        let idle_tx = self.idle_tx.clone();
        tokio::spawn(async move {
            let wait = (scheduled.start + scheduled.duration - clock.now()).max(0.0);
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            Self::finish_source(&book, &idle_tx, scheduled.id, generation);
        });
    }

    /// Natural completion of one source. Ignored if `stop_all` ran since
    /// it was scheduled.
    fn finish_source(
        book: &Arc<Mutex<Book>>,
        idle_tx: &mpsc::UnboundedSender<()>,
        id: u64,
        generation: u64,
    ) {
        let now_empty = {
            let mut b = book.lock().unwrap();
            if b.generation != generation {
                return;
            }
            b.live.remove(&id);
            b.live.is_empty()
        };
        if now_empty {
            let book = Arc::clone(book);
            let idle_tx = idle_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(IDLE_DEBOUNCE).await;
                let still_idle = {
                    let b = book.lock().unwrap();
                    b.generation == generation && b.live.is_empty()
                };
                if still_idle {
                    let _ = idle_tx.send(());
                }
            });
        }
    }
}
