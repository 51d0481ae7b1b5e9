//! One editor's view of one sketch.

use std::sync::Arc;

use tracing::info;

use crate::checker::{ErrorChecker, ProblemSink};
use crate::classpath::ClassPathProvider;
use crate::config::{CheckerConfig, SessionConfig};
use crate::error::{RenameError, Result};
use crate::observer::PipelineObserver;
use crate::service::{PreprocessingService, Snapshot};
use crate::source::{SketchSource, SourceFile};
use crate::usages::{RenamePlan, Usages, find_usages, plan_rename};

/// Wires a [`PreprocessingService`] to an [`ErrorChecker`] so the editor has
/// a single entry point for edits and queries.
#[derive(Debug)]
pub struct SketchSession {
    service: Arc<PreprocessingService>,
    checker: ErrorChecker,
}

impl SketchSession {
    pub fn new(
        source: Arc<dyn SketchSource>,
        provider: Arc<dyn ClassPathProvider>,
        config: SessionConfig,
        sink: Arc<dyn ProblemSink>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<Self> {
        let service = Arc::new(PreprocessingService::new(source, provider, config.service, observer)?);
        let checker = ErrorChecker::new(Arc::clone(&service), sink, config.checker)?;
        info!(sketch = %service.config().sketch_name, "Sketch session started");
        Ok(SketchSession { service, checker })
    }

    pub fn service(&self) -> &Arc<PreprocessingService> {
        &self.service
    }

    pub fn checker(&self) -> &ErrorChecker {
        &self.checker
    }

    /// A tab was edited.
    pub fn notify_changed(&self) {
        self.service.notify_changed();
        self.checker.notify_changed();
    }

    pub fn preferences_changed(&self, config: CheckerConfig) {
        self.checker.preferences_changed(config);
    }

    /// Wait for the current snapshot.
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.service.when_done_blocking(|snapshot| Arc::clone(snapshot), None)
    }

    pub fn find_usages(&self, file_index: usize, start: usize, stop: usize) -> Result<Option<Usages>> {
        self.service
            .when_done_blocking(move |snapshot| find_usages(snapshot, file_index, start, stop), None)
    }

    pub fn plan_rename(
        &self,
        file_index: usize,
        offset: usize,
        new_name: &str,
    ) -> Result<std::result::Result<RenamePlan, RenameError>> {
        let new_name = new_name.to_string();
        self.service
            .when_done_blocking(move |snapshot| plan_rename(snapshot, file_index, offset, &new_name), None)
    }

    /// Plan a rename against the current snapshot and apply it to `files`.
    pub fn rename(
        &self,
        files: &[SourceFile],
        file_index: usize,
        offset: usize,
        new_name: &str,
    ) -> Result<std::result::Result<Vec<SourceFile>, RenameError>> {
        Ok(self
            .plan_rename(file_index, offset, new_name)?
            .map(|plan| plan.apply(files)))
    }

    /// Stop the checker first so it never sees a disposed service.
    pub fn dispose(&self) {
        self.checker.dispose();
        self.service.dispose();
    }
}

impl Drop for SketchSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::classpath::DefaultClassPathProvider;
    use crate::config::ServiceConfig;
    use crate::observer::NoopObserver;
    use crate::problem::Problem;
    use crate::source::InMemorySketch;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Vec<Problem>>>);

    impl ProblemSink for Collect {
        fn set_problems(&self, problems: Vec<Problem>) {
            self.0.lock().unwrap().push(problems);
        }
    }

    fn session(sketch: Arc<InMemorySketch>, sink: Arc<Collect>) -> SketchSession {
        session_with_debounce(sketch, sink, 10)
    }

    fn session_with_debounce(sketch: Arc<InMemorySketch>, sink: Arc<Collect>, debounce_millis: u64) -> SketchSession {
        let config = SessionConfig {
            service: ServiceConfig::default(),
            checker: CheckerConfig {
                debounce_millis,
                ..CheckerConfig::default()
            },
        };
        SketchSession::new(
            sketch,
            Arc::new(DefaultClassPathProvider::new()),
            config,
            sink,
            Arc::new(NoopObserver),
        )
        .unwrap()
    }

    fn wait_for(sink: &Collect, mut done: impl FnMut(&[Problem]) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if sink.0.lock().unwrap().last().is_some_and(|p| done(p)) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_edit_updates_problems() {
        let sketch = Arc::new(InMemorySketch::from_texts([("A", "void f(){x}"), ("B", "int y;")]));
        let sink = Arc::new(Collect::default());
        let session = session(Arc::clone(&sketch), Arc::clone(&sink));
        assert!(wait_for(&sink, |p| p.len() == 1));

        sketch.set_text(0, "void f(){y=1;}");
        session.notify_changed();
        assert!(wait_for(&sink, |p| p.is_empty()));

        let usages = session.find_usages(1, 4, 5).unwrap().unwrap();
        assert_eq!(usages.count(), 2);
    }

    #[test]
    fn test_edits_within_debounce_publish_once() {
        let sketch = Arc::new(InMemorySketch::from_texts([("A", "int a;")]));
        let sink = Arc::new(Collect::default());
        let session = session_with_debounce(Arc::clone(&sketch), Arc::clone(&sink), 300);
        assert!(wait_for(&sink, |p| p.is_empty()));
        std::thread::sleep(Duration::from_millis(400));
        let before = sink.0.lock().unwrap().len();

        for i in 0..20 {
            sketch.set_text(0, format!("int a{i};"));
            session.notify_changed();
            std::thread::sleep(Duration::from_millis(10));
        }
        sketch.set_text(0, "void f(){x}");
        session.notify_changed();

        assert!(wait_for(&sink, |p| p.len() == 1));
        std::thread::sleep(Duration::from_millis(700));
        assert_eq!(sink.0.lock().unwrap().len(), before + 1);
    }

    #[test]
    fn test_rename_through_session() {
        let sketch = Arc::new(InMemorySketch::from_texts([("A", "void f(){y=1;}"), ("B", "int y;")]));
        let session = session(Arc::clone(&sketch), Arc::new(Collect::default()));
        let renamed = session.rename(&sketch.files(), 0, 9, "speed").unwrap().unwrap();
        assert_eq!(renamed[0].text, "void f(){speed=1;}");
        assert_eq!(renamed[1].text, "int speed;");
    }

    #[test]
    fn test_disabling_checks_clears_problems() {
        let sketch = Arc::new(InMemorySketch::from_texts([("A", "void f(){x}")]));
        let sink = Arc::new(Collect::default());
        let session = session(sketch, Arc::clone(&sink));
        assert!(wait_for(&sink, |p| !p.is_empty()));

        session.preferences_changed(CheckerConfig {
            error_check_enabled: false,
            ..CheckerConfig::default()
        });
        assert!(!session.checker().is_attached());
        assert!(wait_for(&sink, |p| p.is_empty()));
    }
}
