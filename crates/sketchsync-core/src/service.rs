//! Background preprocessing.
//!
//! [`PreprocessingService`] owns one worker thread that rebuilds snapshots and
//! one dispatcher thread that runs callbacks. Edits call
//! [`notify_changed`](PreprocessingService::notify_changed), which fills a
//! single request slot: notifications that arrive while the slot is full are
//! absorbed, so a burst of edits costs one rebuild.
//!
//! Callbacks never run on the worker. Every completed rebuild becomes one
//! message to the dispatcher carrying the snapshot, the listeners registered
//! at that moment and the `when_done` callbacks waiting for it. Messages are
//! sent while the state lock is held, so callbacks observe snapshots in
//! generation order.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc as std_mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classpath::{ClassPathCache, ClassPathFlags, ClassPathProvider};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::observer::PipelineObserver;
use crate::pipeline::Pipeline;
use crate::sketch::PreprocessedSketch;
use crate::source::SketchSource;

/// Shared handle to a published snapshot.
pub type Snapshot = Arc<PreprocessedSketch>;

type Listener = Arc<dyn Fn(&Snapshot) + Send + Sync>;
type Callback = Box<dyn FnOnce(&Snapshot) + Send>;

/// Registration handle returned by
/// [`register_listener`](PreprocessingService::register_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

thread_local! {
    static ON_SERVICE_THREAD: Cell<bool> = const { Cell::new(false) };
}

fn on_service_thread() -> bool {
    ON_SERVICE_THREAD.with(Cell::get)
}

enum Dispatch {
    Deliver {
        snapshot: Snapshot,
        listeners: Vec<Listener>,
        callbacks: Vec<Callback>,
    },
    Shutdown,
}

#[derive(Default)]
struct State {
    /// The capacity-1 request slot
    pending: bool,
    /// Generation under construction
    running: Option<u64>,
    next_generation: u64,
    latest: Option<Snapshot>,
    waiting: Vec<Callback>,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener: u64,
}

struct Shared {
    state: Mutex<State>,
    request: Notify,
    shutdown: CancellationToken,
    enabled: AtomicBool,
    dispatch: mpsc::UnboundedSender<Dispatch>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, message: Dispatch) {
        if self.dispatch.send(message).is_err() {
            debug!("Callback dispatcher is gone, dropping delivery");
        }
    }
}

/// Debounced, coalescing rebuilds of one sketch.
pub struct PreprocessingService {
    shared: Arc<Shared>,
    flags: Arc<ClassPathFlags>,
    config: ServiceConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PreprocessingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("PreprocessingService")
            .field("enabled", &self.is_enabled())
            .field("pending", &state.pending)
            .field("running", &state.running)
            .field("listeners", &state.listeners.len())
            .finish_non_exhaustive()
    }
}

impl PreprocessingService {
    /// Start the worker and dispatcher threads and request the first rebuild.
    ///
    /// A sketch with plain Java tabs starts disabled.
    pub fn new(
        source: Arc<dyn SketchSource>,
        provider: Arc<dyn ClassPathProvider>,
        config: ServiceConfig,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                next_generation: 1,
                ..State::default()
            }),
            request: Notify::new(),
            shutdown: CancellationToken::new(),
            enabled: AtomicBool::new(!source.has_java_tabs()),
            dispatch: dispatch_tx,
        });

        let pipeline = Pipeline::new(config.class_name(), ClassPathCache::new(provider), observer);
        let flags = pipeline.class_path_flags();

        let dispatcher = thread::Builder::new()
            .name("sketchsync-dispatch".into())
            .spawn(move || run_dispatcher(dispatch_rx))?;

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("sketchsync-preprocess".into())
            .spawn(move || {
                ON_SERVICE_THREAD.with(|flag| flag.set(true));
                runtime.block_on(run_worker(worker_shared, pipeline, source));
            })?;

        let service = PreprocessingService {
            shared,
            flags,
            config,
            worker: Mutex::new(Some(worker)),
            dispatcher: Mutex::new(Some(dispatcher)),
        };
        if !service.is_enabled() {
            info!("Sketch has Java tabs, preprocessing disabled");
        }
        service.notify_changed();
        Ok(service)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    /// Ask for a rebuild. Never blocks; absorbed if one is already queued.
    pub fn notify_changed(&self) {
        if !self.is_enabled() || self.is_disposed() {
            return;
        }
        let mut state = self.shared.lock();
        if state.pending {
            debug!("Rebuild already queued, coalescing");
            return;
        }
        state.pending = true;
        drop(state);
        self.shared.request.notify_one();
    }

    /// Drop a queued rebuild request. A rebuild in flight still completes.
    pub fn cancel_pending(&self) {
        self.shared.lock().pending = false;
    }

    /// Enable or disable rebuilds. Re-enabling requests a rebuild.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.shared.enabled.swap(enabled, Ordering::SeqCst);
        if was == enabled {
            return;
        }
        info!(enabled, "Preprocessing toggled");
        if enabled {
            self.notify_changed();
        } else {
            self.cancel_pending();
        }
    }

    /// Libraries were installed or removed.
    pub fn notify_libraries_changed(&self) {
        self.flags.mark_libraries_changed();
        self.notify_changed();
    }

    /// The code folder's contents changed.
    pub fn notify_code_folder_changed(&self) {
        self.flags.mark_code_folder_changed();
        self.notify_changed();
    }

    /// Most recent snapshot, if any rebuild has finished.
    pub fn latest(&self) -> Option<Snapshot> {
        self.shared.lock().latest.clone()
    }

    /// Call `listener` with every snapshot published from now on.
    pub fn register_listener(&self, listener: impl Fn(&Snapshot) + Send + Sync + 'static) -> ListenerId {
        let mut state = self.shared.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.insert(id, Arc::new(listener));
        id
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.shared.lock().listeners.remove(&id).is_some()
    }

    /// Call `callback` once with the first snapshot completed after this call,
    /// or with the latest one if nothing is queued or running.
    pub fn when_done(&self, callback: impl FnOnce(&Snapshot) + Send + 'static) {
        let mut state = self.shared.lock();
        let idle = state.running.is_none() && !state.pending;
        match state.latest.clone() {
            Some(snapshot) if idle || !self.is_enabled() => self.shared.send(Dispatch::Deliver {
                snapshot,
                listeners: Vec::new(),
                callbacks: vec![Box::new(callback)],
            }),
            _ => state.waiting.push(Box::new(callback)),
        }
    }

    /// Like [`when_done`](Self::when_done), but block the calling thread until
    /// `callback` has run and return its result.
    ///
    /// `timeout` defaults to the configured blocking timeout.
    pub fn when_done_blocking<R: Send + 'static>(
        &self,
        callback: impl FnOnce(&Snapshot) -> R + Send + 'static,
        timeout: Option<Duration>,
    ) -> Result<R> {
        if self.is_disposed() {
            return Err(ServiceError::Disposed);
        }
        if !self.is_enabled() {
            return Err(ServiceError::Disabled);
        }
        if on_service_thread() {
            return Err(ServiceError::WouldDeadlock);
        }

        let timeout = timeout.unwrap_or_else(|| self.config.blocking_timeout());
        let (tx, rx) = std_mpsc::sync_channel(1);
        self.when_done(move |snapshot| {
            // The caller may have timed out already
            let _ = tx.send(callback(snapshot));
        });
        match rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for a snapshot");
                Err(ServiceError::Timeout(timeout))
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) if self.is_disposed() => Err(ServiceError::Disposed),
            Err(std_mpsc::RecvTimeoutError::Disconnected) => Err(ServiceError::CallbackPanicked),
        }
    }

    /// Stop both threads. The rebuild in flight finishes first; callbacks
    /// still waiting for a snapshot are dropped.
    pub fn dispose(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        info!("Disposing preprocessing service");
        self.shared.shutdown.cancel();
        self.shared.request.notify_one();

        let on_own_thread = on_service_thread();
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = worker
            && !on_own_thread
            && handle.join().is_err()
        {
            error!("Preprocessing worker panicked");
        }

        let mut state = self.shared.lock();
        state.waiting.clear();
        state.pending = false;
        self.shared.send(Dispatch::Shutdown);
        drop(state);

        let dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = dispatcher
            && !on_own_thread
            && handle.join().is_err()
        {
            error!("Callback dispatcher panicked");
        }
    }
}

impl Drop for PreprocessingService {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_worker(shared: Arc<Shared>, mut pipeline: Pipeline, source: Arc<dyn SketchSource>) {
    debug!("Preprocessing worker started");
    loop {
        let generation = loop {
            if shared.shutdown.is_cancelled() {
                debug!("Preprocessing worker stopped");
                return;
            }
            {
                let mut state = shared.lock();
                if state.pending {
                    state.pending = false;
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    state.running = Some(generation);
                    break generation;
                }
            }
            tokio::select! {
                _ = shared.request.notified() => {}
                _ = shared.shutdown.cancelled() => {}
            }
        };

        let files = source.files();
        let snapshot = Arc::new(pipeline.run(generation, &files));

        let mut state = shared.lock();
        state.running = None;
        state.latest = Some(Arc::clone(&snapshot));
        let callbacks = std::mem::take(&mut state.waiting);
        let listeners = state.listeners.values().cloned().collect();
        shared.send(Dispatch::Deliver {
            snapshot,
            listeners,
            callbacks,
        });
    }
}

fn run_dispatcher(mut rx: mpsc::UnboundedReceiver<Dispatch>) {
    ON_SERVICE_THREAD.with(|flag| flag.set(true));
    while let Some(message) = rx.blocking_recv() {
        let Dispatch::Deliver {
            snapshot,
            listeners,
            callbacks,
        } = message
        else {
            break;
        };
        let generation = snapshot.generation();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&snapshot))).is_err() {
                error!(generation, "Snapshot listener panicked");
            }
        }
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&snapshot))).is_err() {
                error!(generation, "when_done callback panicked");
            }
        }
    }
    debug!("Callback dispatcher stopped");
}
