use crate::pipeline::{CycleReport, SignalPipeline};
use chrono::Utc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{info, warn};

/// Single repeating timer. Owns its next fire time and re-arms it only after
/// a cycle has completed, so two firings are always at least one interval apart.
pub struct Scheduler {
    pipeline: SignalPipeline,
    interval: Duration,
    next_fire: Instant,
    last_fired: Option<Instant>,
    ticks: u64,
}

impl Scheduler {
    pub fn new(pipeline: SignalPipeline, interval: Duration) -> Self {
        let mut scheduler = Self {
            pipeline,
            interval,
            next_fire: Instant::now(),
            last_fired: None,
            ticks: 0,
        };
        scheduler.rearm();
        scheduler
    }

    pub fn next_fire(&self) -> Instant {
        self.next_fire
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    pub async fn run(mut self) {
        info!("Scheduler started, interval {:?}", self.interval);
        loop {
            self.tick().await;
        }
    }

    /// Waits for the next fire time, runs one cycle and re-arms.
    /// Returns `None` when the tick was dropped because a cycle was in flight.
    pub async fn tick(&mut self) -> Option<CycleReport> {
        time::sleep_until(self.next_fire).await;
        let report = self.fire().await;
        self.rearm();
        report
    }

    async fn fire(&mut self) -> Option<CycleReport> {
        let state = self.pipeline.state().clone();
        let Some(_guard) = state.try_begin_emitting() else {
            warn!("Previous cycle still emitting, dropping tick");
            return None;
        };

        self.ticks += 1;
        self.last_fired = Some(Instant::now());
        state.record_tick(Utc::now());
        if self.ticks % 10 == 0 {
            info!("Automatic check #{}", self.ticks);
        }

        let report = self.pipeline.emit_all().await;
        state.record_cycle();
        Some(report)
    }

    fn rearm(&mut self) {
        self.next_fire = Instant::now() + self.interval;
        if let Ok(interval) = chrono::Duration::from_std(self.interval) {
            self.pipeline.state().set_next_tick(Utc::now() + interval);
        }
    }
}
