//! Periodic board reading from a frame file.
//!
//! A capture tool keeps overwriting one image file; every tick re-reads it and
//! runs a detection cycle on a worker thread. A busy flag drops ticks while a
//! cycle is still running, and failed cycles stretch the tick interval up to
//! a bound.

use crate::config::WatchJson;
use crate::detect::{load_rgb, Detector};
use boardsight::{BoardSightResult, BoardState, TroopCatalog};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Tick delay that doubles after each failure, capped at `max`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        let factor = 1u32.checked_shl(self.failures).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1).min(31);
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }
}

/// Rendered board of a finished cycle, or why the cycle failed.
type CycleReport = Result<String, String>;

/// Clears the busy flag and reports the cycle when the worker ends, even by
/// panic.
struct CycleGuard {
    busy: Arc<AtomicBool>,
    tx: mpsc::Sender<CycleReport>,
    report: Option<CycleReport>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let report = self
            .report
            .take()
            .unwrap_or_else(|| Err("detection worker panicked".to_string()));
        self.busy.store(false, Ordering::Release);
        let _ = self.tx.send(report);
    }
}

/// Runs `work` on a new thread; exactly one report reaches `tx` per call.
fn spawn_cycle<F>(
    busy: Arc<AtomicBool>,
    tx: mpsc::Sender<CycleReport>,
    work: F,
) -> thread::JoinHandle<()>
where
    F: FnOnce() -> BoardSightResult<String> + Send + 'static,
{
    thread::spawn(move || {
        let mut guard = CycleGuard {
            busy,
            tx,
            report: None,
        };
        guard.report = Some(work().map_err(|err| err.to_string()));
    })
}

fn read_board(
    detector: &Detector,
    board: &Mutex<Option<BoardState>>,
    opts: &WatchJson,
) -> BoardSightResult<String> {
    let rgb = load_rgb(&opts.frame_path)?;
    let mut slot = board.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let out = match slot.as_mut() {
        Some(state) => detector.detect_into(&rgb, state)?,
        None => {
            let (out, state) = detector.detect(&rgb)?;
            *slot = Some(state);
            out
        }
    };
    if out.is_skipped() {
        tracing::warn!("frame {} could not be processed", opts.frame_path.display());
    }
    let summary = slot.as_ref().map(BoardState::summary).unwrap_or_default();
    Ok(summary.render(Some(TroopCatalog::standard())))
}

/// Runs cycles until `max_cycles` have finished (forever when `None`).
pub fn run(detector: Arc<Detector>, opts: WatchJson, max_cycles: Option<usize>) {
    let opts = Arc::new(opts);
    let board: Arc<Mutex<Option<BoardState>>> = Arc::new(Mutex::new(None));
    let busy = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<CycleReport>();
    let mut backoff = Backoff::new(
        Duration::from_millis(opts.interval_ms.max(1)),
        Duration::from_millis(opts.max_backoff_ms),
    );
    let mut started = 0usize;
    let mut finished = 0usize;

    tracing::info!(frame = %opts.frame_path.display(), "watching");
    loop {
        while let Ok(result) = rx.try_recv() {
            finished += 1;
            match result {
                Ok(text) => {
                    backoff.record_success();
                    println!("{text}\n");
                }
                Err(err) => {
                    backoff.record_failure();
                    tracing::warn!(
                        "cycle failed: {err}; next attempt in {:?}",
                        backoff.delay()
                    );
                }
            }
        }
        if max_cycles.is_some_and(|max| finished >= max) {
            break;
        }

        let may_start = max_cycles.map_or(true, |max| started < max);
        if may_start
            && busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            started += 1;
            let detector = Arc::clone(&detector);
            let board = Arc::clone(&board);
            let opts = Arc::clone(&opts);
            spawn_cycle(Arc::clone(&busy), tx.clone(), move || {
                read_board(&detector, &board, &opts)
            });
        } else if may_start {
            tracing::debug!("previous cycle still running; skipping tick");
        }

        thread::sleep(backoff.delay());
    }
}
