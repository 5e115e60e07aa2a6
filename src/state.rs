use crate::models::{Instrument, SchedulerPhase, StatusSnapshot};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-wide mutable state. Everything here is either atomic or behind a
/// lock that is never held across an await.
#[derive(Debug)]
pub struct BotState {
    started_at: Instant,
    interval: Duration,
    instruments: Vec<Instrument>,
    active: AtomicBool,
    emitting: AtomicBool,
    cycles_completed: AtomicU64,
    signals_delivered: AtomicU64,
    delivery_failures: AtomicU64,
    ticks: Mutex<TickTimes>,
    last_delivery_error: Mutex<Option<String>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct TickTimes {
    last: Option<DateTime<Utc>>,
    next: Option<DateTime<Utc>>,
}

/// Held for the length of one EMITTING phase; dropping it returns to IDLE.
#[derive(Debug)]
pub struct EmittingGuard<'a> {
    state: &'a BotState,
}

impl Drop for EmittingGuard<'_> {
    fn drop(&mut self) {
        self.state.emitting.store(false, Ordering::Release);
    }
}

impl BotState {
    pub fn new(interval: Duration, instruments: Vec<Instrument>) -> Self {
        Self {
            started_at: Instant::now(),
            interval,
            instruments,
            active: AtomicBool::new(false),
            emitting: AtomicBool::new(false),
            cycles_completed: AtomicU64::new(0),
            signals_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            ticks: Mutex::new(TickTimes::default()),
            last_delivery_error: Mutex::new(None),
        }
    }

    /// Marks the chat active. Returns true only on the first activation.
    pub fn activate(&self) -> bool {
        !self.active.swap(true, Ordering::AcqRel)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SchedulerPhase {
        if self.emitting.load(Ordering::Acquire) {
            SchedulerPhase::Emitting
        } else {
            SchedulerPhase::Idle
        }
    }

    /// IDLE -> EMITTING. `None` when a cycle is already running.
    pub fn try_begin_emitting(&self) -> Option<EmittingGuard<'_>> {
        self.emitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| EmittingGuard { state: self })
    }

    pub fn record_tick(&self, fired_at: DateTime<Utc>) {
        self.lock_ticks(|ticks| ticks.last = Some(fired_at));
    }

    pub fn set_next_tick(&self, next: DateTime<Utc>) {
        self.lock_ticks(|ticks| ticks.next = Some(next));
    }

    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.signals_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, description: String) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
        let mut last = self
            .last_delivery_error
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *last = Some(description);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let ticks = self.lock_ticks(|ticks| *ticks);
        let last_delivery_error = self
            .last_delivery_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        StatusSnapshot {
            uptime: self.uptime(),
            phase: self.phase(),
            active: self.is_active(),
            interval: self.interval,
            last_tick: ticks.last,
            next_tick: ticks.next,
            instruments: self.instruments.clone(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            signals_delivered: self.signals_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            last_delivery_error,
            taken_at: Utc::now(),
        }
    }

    fn lock_ticks<R>(&self, f: impl FnOnce(&mut TickTimes) -> R) -> R {
        let mut ticks = self.ticks.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut ticks)
    }
}
