/*
 * observer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rebuild observer for tracing and progress reporting.
 */

//! Observer abstraction for rebuild events.
//!
//! The pipeline reports stage boundaries through a [`PipelineObserver`] so
//! it does not depend on a particular logging setup. The service holds one
//! observer for its whole lifetime.

use std::time::Duration;

use crate::error::PreprocessError;

/// Event severity level for pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Trace,
    Debug,
    Info,
    Warn,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Trace => "trace",
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
        }
    }
}

/// Observer for rebuild events.
///
/// All methods have empty default implementations, so observers implement
/// only what they care about. Called from the preprocessing worker thread.
pub trait PipelineObserver: Send + Sync {
    /// Called when a stage begins.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the stage
    /// * `index` - Zero-based index of the stage
    /// * `total` - Number of stages in one rebuild
    fn on_stage_start(&self, _name: &str, _index: usize, _total: usize) {}

    fn on_stage_complete(&self, _name: &str, _index: usize, _total: usize) {}

    /// Called when a stage fails. The rebuild still produces a degraded
    /// snapshot afterwards.
    fn on_stage_error(&self, _name: &str, _index: usize, _error: &PreprocessError) {}

    fn on_event(&self, _message: &str, _level: EventLevel) {}

    fn on_pipeline_start(&self, _generation: u64, _total_stages: usize) {}

    fn on_pipeline_complete(&self, _generation: u64, _elapsed: Duration) {}

    fn on_pipeline_error(&self, _generation: u64, _error: &PreprocessError) {}
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that emits `tracing` events.
///
/// Stage boundaries are logged at debug level since rebuilds happen on
/// every pause in typing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage_start(&self, name: &str, index: usize, total: usize) {
        tracing::debug!(
            stage.name = name,
            stage.index = index,
            stage.total = total,
            "Starting stage"
        );
    }

    fn on_stage_complete(&self, name: &str, index: usize, total: usize) {
        tracing::debug!(
            stage.name = name,
            stage.index = index,
            stage.total = total,
            "Completed stage"
        );
    }

    fn on_stage_error(&self, name: &str, index: usize, error: &PreprocessError) {
        tracing::warn!(
            stage.name = name,
            stage.index = index,
            error = %error,
            "Stage failed"
        );
    }

    fn on_event(&self, message: &str, level: EventLevel) {
        match level {
            EventLevel::Trace => tracing::trace!("{}", message),
            EventLevel::Debug => tracing::debug!("{}", message),
            EventLevel::Info => tracing::info!("{}", message),
            EventLevel::Warn => tracing::warn!("{}", message),
        }
    }

    fn on_pipeline_start(&self, generation: u64, total_stages: usize) {
        tracing::debug!(generation, total_stages, "Starting rebuild");
    }

    fn on_pipeline_complete(&self, generation: u64, elapsed: Duration) {
        tracing::info!(
            generation,
            elapsed_ms = elapsed.as_millis() as u64,
            "Rebuild complete"
        );
    }

    fn on_pipeline_error(&self, generation: u64, error: &PreprocessError) {
        tracing::warn!(generation, error = %error, "Rebuild degraded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl PipelineObserver for CountingObserver {
        fn on_stage_start(&self, _name: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _name: &str, _index: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_error(&self, _name: &str, _index: usize, _error: &PreprocessError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_observer() {
        let observer = NoopObserver;
        observer.on_stage_start("concat", 0, 5);
        observer.on_pipeline_complete(1, Duration::from_millis(3));
    }

    #[test]
    fn test_observer_as_trait_object() {
        let counting = Arc::new(CountingObserver {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        });
        let observer: Arc<dyn PipelineObserver> = counting.clone();
        observer.on_stage_start("concat", 0, 2);
        observer.on_stage_complete("concat", 0, 2);
        observer.on_stage_error("wrap", 1, &PreprocessError::Fault("boom".into()));
        observer.on_event("ignored", EventLevel::Info);
        assert_eq!(counting.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counting.completes.load(Ordering::SeqCst), 1);
        assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_level_names() {
        assert_eq!(EventLevel::Warn.as_str(), "warn");
        assert_eq!(EventLevel::Trace.as_str(), "trace");
    }
}
