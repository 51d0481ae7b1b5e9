//! Threading behavior of the preprocessing service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sketchsync_core::*;

fn start(source: Arc<dyn SketchSource>) -> PreprocessingService {
    PreprocessingService::new(
        source,
        Arc::new(DefaultClassPathProvider::new()),
        ServiceConfig::default(),
        Arc::new(TracingObserver),
    )
    .unwrap()
}

fn wait_for_generation(service: &PreprocessingService, generation: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while service.latest().map_or(0, |s| s.generation()) < generation {
        assert!(Instant::now() < deadline, "generation {generation} never arrived");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Blocks the first read until released, counting every read.
struct GatedSketch {
    inner: InMemorySketch,
    reads: AtomicUsize,
    gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

impl SketchSource for GatedSketch {
    fn files(&self) -> Vec<SourceFile> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
        }
        self.inner.files()
    }

    fn has_java_tabs(&self) -> bool {
        false
    }
}

#[test]
fn test_burst_of_edits_costs_one_rebuild() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let source = Arc::new(GatedSketch {
        inner: InMemorySketch::from_texts([("A", "int a;")]),
        reads: AtomicUsize::new(0),
        gate: Mutex::new(Some((entered_tx, release_rx))),
    });
    let service = start(Arc::clone(&source) as Arc<dyn SketchSource>);

    // Generation 1 is now stuck reading the tabs
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    for i in 0..20 {
        source.inner.set_text(0, format!("int a{i};"));
        service.notify_changed();
    }
    release_tx.send(()).unwrap();

    wait_for_generation(&service, 2);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    let latest = service.latest().unwrap();
    assert_eq!(latest.generation(), 2);
    assert_eq!(latest.pde_code(), "int a19;\n");
}

#[test]
fn test_listeners_see_generations_in_order() {
    let sketch = Arc::new(InMemorySketch::from_texts([("A", "int a;")]));
    let service = start(Arc::clone(&sketch) as Arc<dyn SketchSource>);
    let seen: Arc<Mutex<Vec<u64>>> = Arc::default();
    {
        let seen = Arc::clone(&seen);
        service.register_listener(move |snapshot| seen.lock().unwrap().push(snapshot.generation()));
    }

    for i in 0..30 {
        sketch.set_text(0, format!("int a{i};"));
        service.notify_changed();
        if i % 7 == 0 {
            std::thread::sleep(Duration::from_millis(3));
        }
    }
    service.notify_changed();
    let last = service.when_done_blocking(|s| s.generation(), None).unwrap();
    wait_for_generation(&service, last);
    std::thread::sleep(Duration::from_millis(50));

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "out of order: {seen:?}");
}

#[test]
fn test_panicking_listener_does_not_stop_delivery() {
    let sketch = Arc::new(InMemorySketch::from_texts([("A", "int a;")]));
    let service = start(Arc::clone(&sketch) as Arc<dyn SketchSource>);
    service.when_done_blocking(|_| (), None).unwrap();

    service.register_listener(|_| panic!("listener failure"));
    let delivered = Arc::new(AtomicUsize::new(0));
    {
        let delivered = Arc::clone(&delivered);
        service.register_listener(move |_| {
            delivered.fetch_add(1, Ordering::SeqCst);
        });
    }

    sketch.set_text(0, "int b;");
    service.notify_changed();
    wait_for_generation(&service, 2);
    let code = service.when_done_blocking(|s| s.pde_code().to_string(), None).unwrap();
    assert_eq!(code, "int b;\n");
    assert!(delivered.load(Ordering::SeqCst) >= 1);

    let result = service.when_done_blocking(|_| -> u8 { panic!("callback failure") }, None);
    assert!(matches!(result, Err(ServiceError::CallbackPanicked)));
    assert!(service.when_done_blocking(|_| (), None).is_ok());
}

#[test]
fn test_blocking_wait_times_out() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let source = Arc::new(GatedSketch {
        inner: InMemorySketch::from_texts([("A", "int a;")]),
        reads: AtomicUsize::new(0),
        gate: Mutex::new(Some((entered_tx, release_rx))),
    });
    let service = start(Arc::clone(&source) as Arc<dyn SketchSource>);
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let result = service.when_done_blocking(|s| s.generation(), Some(Duration::from_millis(50)));
    assert!(matches!(result, Err(ServiceError::Timeout(_))));

    release_tx.send(()).unwrap();
    assert_eq!(service.when_done_blocking(|s| s.generation(), None).unwrap(), 1);
}
