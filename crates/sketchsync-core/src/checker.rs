//! Turning snapshots into the editor's problem list.
//!
//! [`check_sketch`] is the pure part: it picks the problems one snapshot
//! should show. [`ErrorChecker`] subscribes to a [`PreprocessingService`] and
//! publishes the result through a [`ProblemSink`] once edits have been quiet
//! for the configured debounce delay.
//!
//! Problem categories short-circuit in this order:
//!
//! 1. problems recorded before a tree existed
//! 2. curly quotes
//! 3. unbalanced braces
//! 4. compiler problems

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use once_cell::sync::Lazy;
use regex::Regex;
use sketchsync_error_reporting::interpolate;
use sketchsync_frontend::{CompilerProblem, ImportResolver, ProblemId};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::CheckerConfig;
use crate::error::Result;
use crate::problem::Problem;
use crate::service::{ListenerId, PreprocessingService, Snapshot};
use crate::simplify::{CURLY_QUOTES, simplify};
use crate::sketch::PreprocessedSketch;

static CURLY_QUOTE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new("[“”‘’]").expect("curly quote regex"));

/// Compiler problems that only restate another problem at the same spot.
const REDUNDANT_PROBLEMS: &[(ProblemId, &str)] = &[(ProblemId::ParsingErrorInsertToComplete, ":: IdentifierOrNew")];

/// Where published problem lists go. Called from the checker's publisher
/// thread; implementations hand off to their own UI context.
pub trait ProblemSink: Send + Sync {
    fn set_problems(&self, problems: Vec<Problem>);
}

impl<F> ProblemSink for F
where
    F: Fn(Vec<Problem>) + Send + Sync,
{
    fn set_problems(&self, problems: Vec<Problem>) {
        self(problems)
    }
}

/// The problems to show for `sketch`.
pub fn check_sketch(sketch: &PreprocessedSketch, config: &CheckerConfig) -> Vec<Problem> {
    let mut problems = sketch.other_problems().to_vec();
    if problems.is_empty() {
        problems = curly_quote_problems(sketch);
    }
    if problems.is_empty() {
        problems = missing_brace_problems(sketch);
    }
    if problems.is_empty() {
        problems = compiler_problems(sketch, config);
    }
    problems
}

/// Curly quotes outside of literals, plus compiler token problems whose
/// original text contains one.
pub fn curly_quote_problems(sketch: &PreprocessedSketch) -> Vec<Problem> {
    if sketch.tree().is_none() {
        return Vec::new();
    }

    let scrubbed = sketch.scrubbed_pde_code();
    let mut problems: Vec<Problem> = Vec::new();
    for m in CURLY_QUOTE_REGEX.find_iter(scrubbed) {
        let file_index = sketch.pde_offset_to_file_index(m.start());
        let Some(file) = sketch.file(file_index) else {
            continue;
        };
        let offset = m.start() - file.pde_start;
        let message = interpolate("editor.status.bad_curly_quote", &[m.as_str()]);
        problems.push(Problem::error(file_index, file, offset, offset + m.len(), message));
    }

    for diagnostic in sketch.diagnostics() {
        if !matches!(
            diagnostic.id,
            ProblemId::ParsingErrorDeleteToken
                | ProblemId::ParsingErrorDeleteTokens
                | ProblemId::ParsingErrorInvalidToken
                | ProblemId::ParsingErrorReplaceTokens
                | ProblemId::UnterminatedString
        ) {
            continue;
        }
        let interval = sketch.map_derived_to_original(diagnostic.start, diagnostic.end);
        let Some(interval) = interval.mapped() else {
            continue;
        };
        let Some(file) = sketch.file(interval.file_index) else {
            continue;
        };
        let bad_code = sketch.original_text(interval);
        for (at, quote) in bad_code.char_indices().filter(|(_, c)| CURLY_QUOTES.contains(c)) {
            let start = interval.start_file_offset + at;
            let seen = problems
                .iter()
                .any(|p| p.file_index == interval.file_index && p.start_offset() == start);
            if seen {
                continue;
            }
            let key = if diagnostic.id == ProblemId::UnterminatedString {
                "editor.status.unterm_string_curly"
            } else {
                "editor.status.bad_curly_quote"
            };
            let message = interpolate(key, &[&quote.to_string()]);
            problems.push(Problem::error(interval.file_index, file, start, start + quote.len_utf8(), message));
        }
    }
    problems
}

/// Brace imbalance in the first file that has one.
///
/// A compiler problem asking for a brace in the same file is preferred since
/// it points closer to the mistake, unless it sits at the very end of the
/// derived text.
pub fn missing_brace_problems(sketch: &PreprocessedSketch) -> Vec<Problem> {
    let scrubbed = sketch.scrubbed_pde_code();
    let mut found = None;
    for (file_index, file) in sketch.files().iter().enumerate() {
        let Some(code) = scrubbed.get(file.pde_start..file.pde_start + file.len) else {
            continue;
        };
        if let Some((offset, key)) = brace_imbalance(code) {
            found = Some(Problem::error(file_index, file, offset, offset + 1, interpolate(key, &[])));
            break;
        }
    }
    let Some(problem) = found else {
        return Vec::new();
    };

    let java_len = sketch.java_code().len();
    let preferred = sketch
        .diagnostics()
        .iter()
        .filter(|d| is_missing_brace_problem(d) && d.end < java_len)
        .filter(|d| {
            sketch
                .map_derived_to_original(d.start, d.end)
                .mapped()
                .is_some_and(|i| i.file_index == problem.file_index)
        })
        .find_map(|d| convert_problem(sketch, d));
    vec![preferred.unwrap_or(problem)]
}

/// Offset and message key of the first brace problem in `code`, if any.
fn brace_imbalance(code: &str) -> Option<(usize, &'static str)> {
    let mut open = Vec::new();
    for (offset, b) in code.bytes().enumerate() {
        match b {
            b'{' => open.push(offset),
            b'}' if open.pop().is_none() => return Some((offset, "editor.status.missing.left_curly_bracket")),
            _ => {}
        }
    }
    open.last()
        .map(|&offset| (offset, "editor.status.missing.right_curly_bracket"))
}

fn is_missing_brace_problem(problem: &CompilerProblem) -> bool {
    let expected = match problem.id {
        ProblemId::ParsingErrorInsertToComplete => problem.argument(0),
        ProblemId::ParsingErrorInsertTokenAfter => problem.argument(1),
        _ => None,
    };
    expected.is_some_and(|e| e.starts_with(['{', '}']))
}

/// Compiler problems mapped into the files, filtered and reworded.
pub fn compiler_problems(sketch: &PreprocessedSketch, config: &CheckerConfig) -> Vec<Problem> {
    let mut suggestions: HashMap<String, Vec<String>> = HashMap::new();
    let mut problems: Vec<Problem> = Vec::new();
    for diagnostic in sketch.diagnostics() {
        if !diagnostic.is_error() && !config.warnings_enabled {
            continue;
        }
        if is_redundant(diagnostic) {
            continue;
        }
        let Some(mut problem) = convert_problem(sketch, diagnostic) else {
            continue;
        };
        let duplicate = problems
            .iter()
            .any(|p| p.file_index == problem.file_index && p.start_offset() == problem.start_offset());
        if duplicate {
            continue;
        }

        if config.import_suggest_enabled
            && matches!(diagnostic.id, ProblemId::UndefinedType | ProblemId::UndefinedName)
            && let (Some(name), Some(resolver)) = (diagnostic.argument(0), sketch.search_resolver())
        {
            problem.import_suggestions = suggestions
                .entry(name.to_string())
                .or_insert_with(|| import_suggestions(resolver, name))
                .clone();
        }
        problems.push(problem);
    }
    problems
}

fn is_redundant(problem: &CompilerProblem) -> bool {
    REDUNDANT_PROBLEMS
        .iter()
        .any(|&(id, arg)| problem.id == id && problem.argument(0) == Some(arg))
}

/// `problem` in file coordinates, or `None` when it lies in scaffolding.
pub fn convert_problem(sketch: &PreprocessedSketch, problem: &CompilerProblem) -> Option<Problem> {
    let interval = sketch.map_derived_to_original(problem.start, problem.end);
    let interval = interval.mapped()?;
    let file = sketch.file(interval.file_index)?;
    let message = simplify(problem, sketch.original_text(interval));
    Some(
        Problem::new(
            interval.file_index,
            file,
            interval.start_file_offset,
            interval.stop_file_offset,
            problem.kind,
            message,
        )
        .with_code(problem.id.as_str()),
    )
}

/// Fully qualified types named `simple`, `java*` packages first.
pub fn import_suggestions(resolver: &dyn ImportResolver, simple: &str) -> Vec<String> {
    if simple.contains('.') {
        return Vec::new();
    }
    let mut found = resolver.find_types_named(simple);
    found.sort_by(|a, b| {
        b.starts_with("java")
            .cmp(&a.starts_with("java"))
            .then_with(|| a.cmp(b))
    });
    found.dedup();
    found
}

enum Publish {
    Problems(Vec<Problem>),
    Clear,
    Shutdown,
}

struct CheckerInner {
    config: Mutex<CheckerConfig>,
    /// When the next publish may happen; `None` while checking is off
    next_update: Mutex<Option<Instant>>,
    listener: Mutex<Option<ListenerId>>,
    publish: mpsc::UnboundedSender<Publish>,
    sink: Arc<dyn ProblemSink>,
}

impl CheckerInner {
    fn config(&self) -> MutexGuard<'_, CheckerConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_update(&self) -> Option<Instant> {
        *self.next_update.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_next_update(&self, at: Option<Instant>) {
        *self.next_update.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    fn send(&self, message: Publish) {
        if self.publish.send(message).is_err() {
            debug!("Problem publisher is gone");
        }
    }

    fn handle_snapshot(&self, snapshot: &Snapshot) {
        let config = self.config().clone();
        let problems = check_sketch(snapshot, &config);
        debug!(
            generation = snapshot.generation(),
            problems = problems.len(),
            "Checked snapshot"
        );
        self.send(Publish::Problems(problems));
    }
}

/// Debounced problem publishing for one sketch.
pub struct ErrorChecker {
    service: Arc<PreprocessingService>,
    inner: Arc<CheckerInner>,
    publisher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ErrorChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChecker")
            .field("config", &*self.inner.config())
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl ErrorChecker {
    pub fn new(service: Arc<PreprocessingService>, sink: Arc<dyn ProblemSink>, config: CheckerConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(CheckerInner {
            config: Mutex::new(config.clone()),
            next_update: Mutex::new(Some(Instant::now())),
            listener: Mutex::new(None),
            publish: tx,
            sink,
        });

        let publisher_inner = Arc::clone(&inner);
        let publisher = thread::Builder::new()
            .name("sketchsync-publish".into())
            .spawn(move || runtime.block_on(run_publisher(publisher_inner, rx)))?;

        let checker = ErrorChecker {
            service,
            inner,
            publisher: Mutex::new(Some(publisher)),
        };
        if config.error_check_enabled {
            checker.attach();
            checker.check_latest();
        }
        Ok(checker)
    }

    pub fn config(&self) -> CheckerConfig {
        self.inner.config().clone()
    }

    /// Whether the checker is subscribed to snapshots.
    pub fn is_attached(&self) -> bool {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// An edit happened: push the next publish out by the debounce delay.
    pub fn notify_changed(&self) {
        let delay = self.inner.config().debounce();
        if self.is_attached() {
            self.inner.set_next_update(Some(Instant::now() + delay));
        }
    }

    /// Apply new preferences. Turning checking off detaches from the
    /// service and clears the published problems.
    pub fn preferences_changed(&self, config: CheckerConfig) {
        let enabled = config.error_check_enabled;
        *self.inner.config() = config;
        match (enabled, self.is_attached()) {
            (true, false) => {
                info!("Error checking enabled");
                self.inner.set_next_update(Some(Instant::now()));
                self.attach();
                self.check_latest();
            }
            (false, true) => {
                info!("Error checking disabled");
                self.detach();
                self.inner.set_next_update(None);
                self.inner.send(Publish::Clear);
            }
            _ => {}
        }
    }

    /// Stop publishing and detach from the service.
    pub fn dispose(&self) {
        self.detach();
        self.inner.send(Publish::Shutdown);
        let handle = self.publisher.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle
            && handle.thread().id() != thread::current().id()
            && handle.join().is_err()
        {
            tracing::error!("Problem publisher panicked");
        }
    }

    fn attach(&self) {
        let inner = Arc::clone(&self.inner);
        let id = self
            .service
            .register_listener(move |snapshot| inner.handle_snapshot(snapshot));
        *self.inner.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
    }

    /// The snapshot published before attaching would otherwise go unchecked.
    fn check_latest(&self) {
        let inner = Arc::clone(&self.inner);
        self.service.when_done(move |snapshot| inner.handle_snapshot(snapshot));
    }

    fn detach(&self) {
        let id = self.inner.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(id) = id {
            self.service.unregister_listener(id);
        }
    }
}

impl Drop for ErrorChecker {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_publisher(inner: Arc<CheckerInner>, mut rx: mpsc::UnboundedReceiver<Publish>) {
    let mut pending: Option<Vec<Problem>> = None;
    loop {
        let deadline = inner.next_update();
        let armed = pending.is_some() && deadline.is_some();
        let wake_at = tokio::time::Instant::from_std(deadline.unwrap_or_else(Instant::now));

        tokio::select! {
            message = rx.recv() => match message {
                // A newer list supersedes one still waiting
                Some(Publish::Problems(problems)) => pending = Some(problems),
                Some(Publish::Clear) => {
                    pending = None;
                    inner.sink.set_problems(Vec::new());
                }
                Some(Publish::Shutdown) | None => break,
            },
            _ = tokio::time::sleep_until(wake_at), if armed => {
                match inner.next_update() {
                    Some(at) if Instant::now() >= at => {
                        if let Some(problems) = pending.take() {
                            debug!(problems = problems.len(), "Publishing problems");
                            inner.sink.set_problems(problems);
                        }
                    }
                    // Pushed back by a newer edit; sleep again
                    Some(_) => {}
                    None => pending = None,
                }
            }
        }
    }
    debug!("Problem publisher stopped");
}
