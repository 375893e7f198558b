//! Backpressure, cancellation, and the close/drain protocol.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use relay_bus::{BusConfig, BusError, Event, EventBus, HandlerFn, MemoryBus, Scope};
use tokio::time::{sleep, timeout, Instant};

use crate::support::{eventually, init_tracing, settle};

#[tokio::test]
async fn full_queue_publish_respects_deadline() {
    init_tracing();
    // Zero capacity and no subscribers: nothing ever drains, so the publish
    // must give up when its scope expires.
    let bus = MemoryBus::with_config(BusConfig::default().with_queue_capacity(0));
    let scope = Scope::new().with_timeout(Duration::from_millis(20));
    let started = Instant::now();

    let err = bus
        .publish(&scope, "nobody", Event::new(1u32))
        .await
        .unwrap_err();

    assert_eq!(err, BusError::DeadlineExceeded);
    assert!(started.elapsed() < Duration::from_millis(200));
    bus.close();
}

#[tokio::test]
async fn full_queue_publish_respects_cancel() {
    let bus = MemoryBus::with_config(BusConfig::default().with_queue_capacity(0));
    let scope = Scope::new();

    let canceller = scope.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = bus
        .publish(&scope, "nobody", Event::new(1u32))
        .await
        .unwrap_err();
    assert_eq!(err, BusError::Cancelled);
    bus.close();
}

#[tokio::test]
async fn close_unblocks_waiting_publisher() {
    let bus = Arc::new(MemoryBus::with_config(
        BusConfig::default().with_queue_capacity(0),
    ));

    let publisher = tokio::spawn({
        let bus = Arc::clone(&bus);
        async move { bus.publish(&Scope::new(), "stuck", Event::new(1u32)).await }
    });
    sleep(Duration::from_millis(20)).await;

    bus.close();

    let result = timeout(Duration::from_secs(2), publisher)
        .await
        .expect("blocked publisher did not observe close")
        .unwrap();
    assert_eq!(result, Err(BusError::Closed));
}

#[tokio::test]
async fn close_drains_accepted_events() {
    let bus = MemoryBus::with_config(
        BusConfig::default()
            .with_queue_capacity(16)
            .with_workers_per_topic(1),
    );
    let done = Arc::new(AtomicU32::new(0));

    bus.subscribe(
        "slow",
        HandlerFn::arc({
            let done = Arc::clone(&done);
            move |_scope, _event| {
                let done = Arc::clone(&done);
                async move {
                    sleep(Duration::from_millis(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        }),
    )
    .await
    .unwrap();

    let scope = Scope::new();
    for n in 0..5u32 {
        bus.publish(&scope, "slow", Event::new(n)).await.unwrap();
    }

    bus.close();

    // New work is rejected immediately...
    let err = bus
        .publish(&scope, "slow", Event::new(99u32))
        .await
        .unwrap_err();
    assert_eq!(err, BusError::Closed);

    // ...while everything accepted before close still gets delivered.
    eventually(Duration::from_secs(2), || done.load(Ordering::SeqCst) == 5).await;
}

#[tokio::test]
async fn extra_workers_complete_out_of_order() {
    let bus = MemoryBus::with_config(
        BusConfig::default()
            .with_queue_capacity(16)
            .with_workers_per_topic(2),
    );
    let completions = Arc::new(Mutex::new(Vec::new()));

    bus.subscribe(
        "parallel",
        HandlerFn::arc({
            let completions = Arc::clone(&completions);
            move |_scope, event: Event| {
                let completions = Arc::clone(&completions);
                async move {
                    let n = *event.downcast_ref::<u32>().unwrap_or(&0);
                    if n == 1 {
                        sleep(Duration::from_millis(300)).await;
                    }
                    completions.lock().push(n);
                    Ok(())
                }
            }
        }),
    )
    .await
    .unwrap();

    let scope = Scope::new();
    bus.publish(&scope, "parallel", Event::new(1u32)).await.unwrap();
    bus.publish(&scope, "parallel", Event::new(2u32)).await.unwrap();

    // The second worker finishes the fast event while the first still
    // sleeps: completion order is not enqueue order.
    eventually(Duration::from_secs(2), || completions.lock().len() == 2).await;
    assert_eq!(*completions.lock(), vec![2, 1]);
    bus.close();
}

#[tokio::test]
async fn close_is_idempotent_under_concurrency() {
    let bus = Arc::new(MemoryBus::new());
    bus.subscribe(
        "t",
        HandlerFn::arc(|_scope, _event| async { Ok(()) }),
    )
    .await
    .unwrap();

    let closers: Vec<_> = (0..4)
        .map(|_| {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.close() })
        })
        .collect();
    for closer in closers {
        closer.await.unwrap();
    }

    settle().await;
    let err = bus
        .publish(&Scope::new(), "t", Event::new(1u32))
        .await
        .unwrap_err();
    assert_eq!(err, BusError::Closed);
}
