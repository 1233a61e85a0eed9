//! Integration tests for stop-dispatcher.
//!
//! These tests drive full shutdown cycles through the public API.

use anyhow::anyhow;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::{Duration, Instant};
use stop_dispatcher::{
    Callback, CancellationToken, Dispatcher, Emitter, Intake, PriorityCallback, TimeoutGuard,
};

/// Callback that appends `name` to a shared log.
fn recording(log: &Arc<Mutex<Vec<String>>>, name: &str) -> Callback {
    let log = Arc::clone(log);
    let name = name.to_string();
    Callback::new(move |_| {
        let log = Arc::clone(&log);
        let name = name.clone();
        async move {
            log.lock().push(name);
            Ok(())
        }
    })
}

/// Emitter that hands its intake to the test instead of stopping on its own.
fn capturing_emitter() -> (Emitter, Arc<Mutex<Option<Intake>>>) {
    let slot = Arc::new(Mutex::new(None));
    let stash = Arc::clone(&slot);
    let emitter = Emitter::new(move |intake| async move {
        *stash.lock() = Some(intake);
    });
    (emitter, slot)
}

async fn take_intake(slot: &Arc<Mutex<Option<Intake>>>) -> Intake {
    loop {
        if let Some(intake) = slot.lock().clone() {
            return intake;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

fn stop_after(intake: Intake, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        intake.stop("fake_reason").await;
    });
}

#[tokio::test]
async fn test_direct_stop_runs_callback() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let dispatcher = Dispatcher::new();
    dispatcher.register_callback(Callback::new(move |_| {
        let flag = Arc::clone(&flag);
        async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }
    }));

    stop_after(dispatcher.intake(), Duration::from_millis(10));
    assert!(dispatcher.wait(&CancellationToken::new()).await.is_ok());
    assert!(called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_wait_returns_only_after_emitter_fires() {
    let delay = Duration::from_millis(50);
    let started = Instant::now();
    let dispatcher = Dispatcher::builder()
        .emitter(Emitter::new(move |intake| async move {
            tokio::time::sleep(delay).await;
            intake.stop("fake_reason").await;
        }))
        .build();

    assert!(dispatcher.wait(&CancellationToken::new()).await.is_ok());
    assert!(started.elapsed() >= delay);
}

#[tokio::test]
async fn test_interleaved_priorities() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();

    dispatcher.register_callback_with_priority(recording(&log, "p0-a"), 0);
    dispatcher.register_callback_with_priority(recording(&log, "p0-b"), 0);
    dispatcher.register_callback_with_priority(recording(&log, "p1"), 1);
    dispatcher.register_callback_with_priority(recording(&log, "p0-c"), 0);
    dispatcher.register_callback_with_priority(recording(&log, "p3"), 3);

    stop_after(dispatcher.intake(), Duration::from_millis(5));
    dispatcher.wait(&CancellationToken::new()).await.unwrap();

    assert_eq!(*log.lock(), vec!["p3", "p1", "p0-a", "p0-b", "p0-c"]);
}

#[tokio::test]
async fn test_bulk_priority_registration() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();

    dispatcher.register_priority_callbacks(vec![
        PriorityCallback::new(-1, recording(&log, "last")),
        PriorityCallback::new(7, recording(&log, "first")),
        recording(&log, "middle").into(),
    ]);

    stop_after(dispatcher.intake(), Duration::from_millis(5));
    dispatcher.wait(&CancellationToken::new()).await.unwrap();

    assert_eq!(*log.lock(), vec!["first", "middle", "last"]);
}

#[tokio::test]
async fn test_composite_error_text() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new();

    dispatcher.register_callback(Callback::new(|_| async { Err(anyhow!("fake_error")) }));
    dispatcher.register_callback(recording(&log, "still runs"));
    dispatcher.register_callback(Callback::new(|_| async { Err(anyhow!("fake_error2")) }));

    stop_after(dispatcher.intake(), Duration::from_millis(5));
    let err = dispatcher.wait(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.to_string(), "fake_error\nfake_error2\n");
    assert_eq!(*log.lock(), vec!["still runs"]);
}

#[tokio::test]
async fn test_unregister_between_cycles() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (emitter, slot) = capturing_emitter();
    let dispatcher = Dispatcher::builder().emitter(emitter).build();

    dispatcher.register_callback(recording(&log, "a"));
    let b = dispatcher.register_callback(recording(&log, "b"));
    dispatcher.register_callback(recording(&log, "c"));

    let intake = take_intake(&slot).await;

    stop_after(intake.clone(), Duration::from_millis(5));
    dispatcher.wait(&CancellationToken::new()).await.unwrap();
    assert_eq!(*log.lock(), vec!["a", "b", "c"]);

    log.lock().clear();
    b.unregister();

    stop_after(intake, Duration::from_millis(5));
    dispatcher.wait(&CancellationToken::new()).await.unwrap();
    assert_eq!(*log.lock(), vec!["a", "c"]);
}

#[tokio::test]
async fn test_reason_is_not_kept_between_cycles() {
    let dispatcher = Dispatcher::new();

    stop_after(dispatcher.intake(), Duration::from_millis(5));
    dispatcher.wait(&CancellationToken::new()).await.unwrap();

    let second = tokio::time::timeout(
        Duration::from_millis(50),
        dispatcher.wait(&CancellationToken::new()),
    )
    .await;
    assert!(second.is_err(), "second cycle needs a new reason");
}

#[tokio::test]
async fn test_callbacks_run_sequentially() {
    let running = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));
    let dispatcher = Dispatcher::new();

    for _ in 0..3 {
        let running = Arc::clone(&running);
        let overlapped = Arc::clone(&overlapped);
        dispatcher.register_callback(Callback::new(move |_| {
            let running = Arc::clone(&running);
            let overlapped = Arc::clone(&overlapped);
            async move {
                if running.swap(true, Ordering::SeqCst) {
                    overlapped.store(true, Ordering::SeqCst);
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.store(false, Ordering::SeqCst);
                Ok(())
            }
        }));
    }

    stop_after(dispatcher.intake(), Duration::from_millis(5));
    dispatcher.wait(&CancellationToken::new()).await.unwrap();
    assert!(!overlapped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_timeout_guard_fires_after_graceful_completion() {
    let status = Arc::new(AtomicI32::new(0));
    let recorded = Arc::clone(&status);
    let dispatcher = Dispatcher::new();

    dispatcher.register_callback_with_priority(
        TimeoutGuard::new(Duration::from_millis(50))
            .with_terminator(move |code: i32| recorded.store(code, Ordering::SeqCst))
            .into(),
        i32::MAX,
    );

    stop_after(dispatcher.intake(), Duration::from_millis(5));
    assert!(dispatcher.wait(&CancellationToken::new()).await.is_ok());
    assert_eq!(status.load(Ordering::SeqCst), 0);

    // The guard is a kill switch: it is not disarmed by a successful shutdown.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(status.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_or_cancel_gives_reason_back() {
    let dispatcher = Dispatcher::new();
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });

    let reason = dispatcher
        .intake()
        .stop_or_cancel("unclaimed", &token)
        .await
        .unwrap_err();
    assert_eq!(reason.as_message(), Some("unclaimed"));
}

#[tokio::test]
async fn test_stop_or_cancel_delivers_to_waiting_dispatcher() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handler_seen = Arc::clone(&seen);
    let dispatcher = Dispatcher::builder()
        .reason_handler(move |reason| handler_seen.lock().push(reason.to_string()))
        .build();
    let intake = dispatcher.intake();
    let token = CancellationToken::new();

    let producer = tokio::spawn(async move { intake.stop_or_cancel("delivered", &token).await });

    assert!(dispatcher.wait(&CancellationToken::new()).await.is_ok());
    assert!(producer.await.unwrap().is_ok());
    assert_eq!(*seen.lock(), vec!["delivered"]);
}

#[tokio::test]
async fn test_dropped_wait_does_not_lose_reason() {
    let dispatcher = Dispatcher::new();
    let parent = CancellationToken::new();

    let mut abandoned = Box::pin(dispatcher.wait(&parent));
    assert!(futures::poll!(abandoned.as_mut()).is_pending());

    let intake = dispatcher.intake();
    let producer = tokio::spawn(async move { intake.stop("lost").await });
    tokio::task::yield_now().await;
    drop(abandoned);

    let second = tokio::time::timeout(Duration::from_secs(1), dispatcher.wait(&parent)).await;
    assert!(second.is_ok(), "the next wait must receive the reason");
    producer.await.unwrap();
}
