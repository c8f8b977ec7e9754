/*
 * Layout batches that are computed off the UI thread and handed to a window
 * group for application by the owning message loop.
 *
 * The group never interprets a `LayoutResult`; it only keeps the most recent
 * batch and passes it, together with its `Stopwatch`, to the configured
 * `LayoutApplier` during a drain.
 */
use crate::error::Result as PlatformResult;
use crate::types::{NativeHandle, Rectangle};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutResultItem {
    pub widget: NativeHandle,
    pub bounds: Rectangle,
}

/*
 * The computed geometry for the children of one container. A batch is a
 * `Vec<LayoutResult>`, one entry per container touched by the computation.
 */
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutResult {
    pub container: NativeHandle,
    pub items: Vec<LayoutResultItem>,
}

impl LayoutResult {
    pub fn new(container: NativeHandle) -> Self {
        Self {
            container,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, widget: NativeHandle, bounds: Rectangle) -> Self {
        self.items.push(LayoutResultItem { widget, bounds });
        self
    }
}

/*
 * Applies a layout batch to native windows. Always invoked on the thread that
 * owns the group the batch was queued on.
 */
pub trait LayoutApplier: Send + Sync {
    fn apply_layout_results(
        &self,
        results: &[LayoutResult],
        stopwatch: Option<&Stopwatch>,
    ) -> PlatformResult<()>;
}

/*
 * Fallback applier for targets without a native windowing backend.
 * It records what would have moved and nothing else.
 */
#[derive(Debug, Default)]
pub struct LoggingLayoutApplier;

impl LayoutApplier for LoggingLayoutApplier {
    fn apply_layout_results(
        &self,
        results: &[LayoutResult],
        stopwatch: Option<&Stopwatch>,
    ) -> PlatformResult<()> {
        if let Some(sw) = stopwatch {
            sw.start("apply");
        }
        for result in results {
            log::debug!(
                "LoggingLayoutApplier: container {:?} with {} item(s)",
                result.container,
                result.items.len()
            );
        }
        if let Some(sw) = stopwatch {
            sw.stop("apply");
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct StopwatchEntry {
    started: Option<Instant>,
    total: Duration,
    count: u32,
}

/*
 * Timing token travelling with a layout batch.
 * Phases are identified by name; each `start`/`stop` pair adds to that phase's
 * accumulated duration. The computation thread and the applying thread may
 * both touch the same stopwatch, so state sits behind a mutex.
 */
#[derive(Debug, Default)]
pub struct Stopwatch {
    entries: Mutex<HashMap<String, StopwatchEntry>>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, phase: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(phase.to_string()).or_default().started = Some(Instant::now());
    }

    /*
     * Ends the running measurement for `phase` and returns its duration.
     * Stopping a phase that was never started is ignored.
     */
    pub fn stop(&self, phase: &str) -> Option<Duration> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get_mut(phase)?;
        let elapsed = entry.started.take()?.elapsed();
        entry.total += elapsed;
        entry.count += 1;
        Some(elapsed)
    }

    pub fn total(&self, phase: &str) -> Duration {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(phase).map(|e| e.total).unwrap_or_default()
    }

    pub fn count(&self, phase: &str) -> u32 {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(phase).map(|e| e.count).unwrap_or(0)
    }

    pub fn log_summary(&self) {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut phases: Vec<_> = entries.iter().collect();
        phases.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        for (phase, entry) in phases {
            log::debug!(
                "Stopwatch: {phase}: {:?} over {} run(s)",
                entry.total,
                entry.count
            );
        }
    }
}
