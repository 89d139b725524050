//! End-to-end dispatch scenarios: registration, filtering, extra arguments,
//! result-driven republishing, ancestor-type routing, and the bounded-wait
//! publish variant.

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use localbus::{
    arg, BusConfig, Event, EventHandler, EventRef, HandlerDescriptor, LocalBus, Outcome,
};

const TEST_ID: i64 = 15;
const TEST_VALUE: i64 = 105;

#[derive(Debug)]
struct TestEvent {
    id: i64,
}

impl Event for TestEvent {}

#[derive(Debug)]
struct AnotherEvent {
    id: i64,
}

impl Event for AnotherEvent {}

#[derive(Debug)]
struct UnrelatedEvent;

impl Event for UnrelatedEvent {}

/// Marker key standing in for an event interface.
#[derive(Debug)]
struct DeviceEvents;

#[derive(Debug)]
struct SensorEvent {
    id: i64,
}

impl Event for SensorEvent {
    fn ancestors(&self) -> Vec<TypeId> {
        vec![TypeId::of::<DeviceEvents>()]
    }
}

/// Scenario handler: one subscription per behavior, unset sentinels start
/// at -1.
#[derive(Default)]
struct Recorder {
    id: AtomicI64,
    value: AtomicI64,
    counter: AtomicUsize,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: AtomicI64::new(-1),
            value: AtomicI64::new(-1),
            counter: AtomicUsize::new(0),
        })
    }
}

impl EventHandler for Recorder {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![
            HandlerDescriptor::subscribe(
                &self,
                "handle",
                |h: Arc<Recorder>, ev: Arc<TestEvent>| async move {
                    h.id.store(ev.id, Ordering::SeqCst);
                    h.counter.fetch_add(1, Ordering::SeqCst);
                    Outcome::None
                },
            ),
            HandlerDescriptor::subscribe_with(
                &self,
                "handle_with_value",
                |h: Arc<Recorder>, _ev: Arc<TestEvent>, value: i64| async move {
                    h.value.store(value, Ordering::SeqCst);
                    Outcome::None
                },
            ),
            HandlerDescriptor::subscribe(
                &self,
                "produces_event",
                |_h: Arc<Recorder>, ev: Arc<AnotherEvent>| async move {
                    Outcome::maybe(Some(TestEvent { id: ev.id }))
                },
            ),
            HandlerDescriptor::subscribe_with(
                &self,
                "produces_collection",
                |_h: Arc<Recorder>, ev: Arc<AnotherEvent>, amount: i64| async move {
                    Outcome::from_iter(
                        (0..amount).map(|i| Some(Arc::new(TestEvent { id: ev.id + i }) as EventRef)),
                    )
                },
            ),
        ]
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Polls `cond` every few milliseconds until it holds or `deadline` passes.
async fn wait_for(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

#[tokio::test]
async fn test_event_receive() {
    init_tracing();
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);
    assert_eq!(bus.handler_count(), 4);
    assert_eq!(bus.filter_count(), 0);

    assert!(bus.publish_sync(TestEvent { id: TEST_ID }, Duration::from_secs(1)).await);

    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
    // No extra argument supplied: the arity-2 subscription never ran.
    assert_eq!(recorder.value.load(Ordering::SeqCst), -1);
    assert_eq!(recorder.counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unrelated_event_is_not_delivered() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    assert!(bus.publish_sync(UnrelatedEvent, Duration::from_secs(1)).await);

    assert_eq!(recorder.id.load(Ordering::SeqCst), -1);
    assert_eq!(recorder.counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_event_filter_vetoes_one_pairing_only() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    // Suppress "handle" for test events below the minimum id; every other
    // (event, descriptor) pairing stays live.
    const MIN_ID: i64 = 10;
    bus.add_filter(|event: &dyn Event, descriptor: &HandlerDescriptor| {
        descriptor.method() == "handle"
            && event
                .downcast_ref::<TestEvent>()
                .is_some_and(|ev| ev.id < MIN_ID)
    });
    assert_eq!(bus.filter_count(), 1);

    assert!(bus.publish_sync(TestEvent { id: 1 }, Duration::from_secs(1)).await);
    assert_eq!(recorder.id.load(Ordering::SeqCst), -1);

    assert!(bus.publish_sync(TestEvent { id: TEST_ID }, Duration::from_secs(1)).await);
    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
}

#[tokio::test]
async fn test_filtered_suppresses_only_named_descriptor() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    bus.add_filter(|_event: &dyn Event, descriptor: &HandlerDescriptor| {
        descriptor.method() == "handle"
    });

    assert!(
        bus.publish_sync_with(
            TestEvent { id: TEST_ID },
            Duration::from_secs(1),
            vec![arg(TEST_VALUE)],
        )
        .await
    );

    // "handle" was vetoed, its sibling subscription for the same event ran.
    assert_eq!(recorder.id.load(Ordering::SeqCst), -1);
    assert_eq!(recorder.value.load(Ordering::SeqCst), TEST_VALUE);
}

#[tokio::test]
async fn test_event_extra_parameters() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    assert!(
        bus.publish_sync_with(
            TestEvent { id: TEST_ID },
            Duration::from_secs(1),
            vec![arg(TEST_VALUE)],
        )
        .await
    );

    // The arity-1 subscription still runs (extras ignored for it), and the
    // arity-2 subscription observes the supplied value.
    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
    assert_eq!(recorder.value.load(Ordering::SeqCst), TEST_VALUE);
}

#[tokio::test]
async fn test_extra_argument_type_mismatch_faults_only_that_handler() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    assert!(
        bus.publish_sync_with(
            TestEvent { id: TEST_ID },
            Duration::from_secs(1),
            vec![arg("not a number")],
        )
        .await
    );

    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
    assert_eq!(recorder.value.load(Ordering::SeqCst), -1);
}

#[tokio::test]
async fn test_produce_event() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    bus.publish(AnotherEvent { id: TEST_ID }).forget();

    assert!(
        wait_for(Duration::from_secs(2), || {
            recorder.counter.load(Ordering::SeqCst) == 1
        })
        .await
    );
    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
}

#[tokio::test]
async fn test_produce_collection() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    // "produces_event" fires too (arity 1), so 10 sequence events + 1.
    bus.publish_with(AnotherEvent { id: TEST_ID }, vec![arg(10i64)]).forget();

    assert!(
        wait_for(Duration::from_secs(2), || {
            recorder.counter.load(Ordering::SeqCst) == 11
        })
        .await
    );
}

struct MixedProducer {
    delivered: AtomicUsize,
}

impl EventHandler for MixedProducer {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![
            HandlerDescriptor::subscribe(
                &self,
                "produces_mixed",
                |_h: Arc<MixedProducer>, _ev: Arc<AnotherEvent>| async move {
                    // Three items, one of which is not an event.
                    Outcome::from_iter(vec![
                        Some(Arc::new(TestEvent { id: 1 }) as EventRef),
                        None,
                        Some(Arc::new(TestEvent { id: 2 }) as EventRef),
                    ])
                },
            ),
            HandlerDescriptor::subscribe(
                &self,
                "count_test_events",
                |h: Arc<MixedProducer>, _ev: Arc<TestEvent>| async move {
                    h.delivered.fetch_add(1, Ordering::SeqCst);
                    Outcome::None
                },
            ),
        ]
    }
}

#[tokio::test]
async fn test_non_event_sequence_items_produce_no_publishes() {
    let bus = LocalBus::new(BusConfig::default());
    let producer = Arc::new(MixedProducer {
        delivered: AtomicUsize::new(0),
    });
    bus.register(&producer);

    bus.publish(AnotherEvent { id: 0 }).forget();

    assert!(
        wait_for(Duration::from_secs(2), || {
            producer.delivered.load(Ordering::SeqCst) == 2
        })
        .await
    );
    // Give a straggler republish a moment to show up; it must not.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(producer.delivered.load(Ordering::SeqCst), 2);
}

struct DeviceListener {
    hits: AtomicUsize,
    last_id: AtomicI64,
}

impl EventHandler for DeviceListener {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![
            // The same method subscribed under the concrete type and the
            // marker: reachable twice per sensor event, must run once.
            HandlerDescriptor::subscribe(
                &self,
                "on_device_event",
                |h: Arc<DeviceListener>, ev: Arc<SensorEvent>| async move {
                    h.hits.fetch_add(1, Ordering::SeqCst);
                    h.last_id.store(ev.id, Ordering::SeqCst);
                    Outcome::None
                },
            ),
            HandlerDescriptor::subscribe_marker::<_, DeviceEvents, _, _>(
                &self,
                "on_device_event",
                |h: Arc<DeviceListener>, ev: EventRef| async move {
                    h.hits.fetch_add(1, Ordering::SeqCst);
                    if let Some(sensor) = ev.downcast_ref::<SensorEvent>() {
                        h.last_id.store(sensor.id, Ordering::SeqCst);
                    }
                    Outcome::None
                },
            ),
        ]
    }
}

#[tokio::test]
async fn test_ancestor_subscription_receives_concrete_event_exactly_once() {
    let bus = LocalBus::new(BusConfig::default());
    let listener = Arc::new(DeviceListener {
        hits: AtomicUsize::new(0),
        last_id: AtomicI64::new(-1),
    });
    bus.register(&listener);

    assert!(bus.publish_sync(SensorEvent { id: TEST_ID }, Duration::from_secs(1)).await);

    assert_eq!(listener.hits.load(Ordering::SeqCst), 1);
    assert_eq!(listener.last_id.load(Ordering::SeqCst), TEST_ID);
}

struct MarkerOnly {
    hits: AtomicUsize,
}

impl EventHandler for MarkerOnly {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![HandlerDescriptor::subscribe_marker::<_, DeviceEvents, _, _>(
            &self,
            "on_any_device_event",
            |h: Arc<MarkerOnly>, _ev: EventRef| async move {
                h.hits.fetch_add(1, Ordering::SeqCst);
                Outcome::None
            },
        )]
    }
}

#[tokio::test]
async fn test_marker_subscription_sees_descendants_not_strangers() {
    let bus = LocalBus::new(BusConfig::default());
    let listener = Arc::new(MarkerOnly {
        hits: AtomicUsize::new(0),
    });
    bus.register(&listener);

    assert!(bus.publish_sync(SensorEvent { id: 1 }, Duration::from_secs(1)).await);
    assert_eq!(listener.hits.load(Ordering::SeqCst), 1);

    assert!(bus.publish_sync(TestEvent { id: 1 }, Duration::from_secs(1)).await);
    assert_eq!(listener.hits.load(Ordering::SeqCst), 1);
}

struct Sleeper {
    nap: Duration,
    woke: AtomicBool,
}

impl EventHandler for Sleeper {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![HandlerDescriptor::subscribe(
            &self,
            "sleep_through_it",
            |h: Arc<Sleeper>, _ev: Arc<TestEvent>| async move {
                tokio::time::sleep(h.nap).await;
                h.woke.store(true, Ordering::SeqCst);
                Outcome::None
            },
        )]
    }
}

#[tokio::test]
async fn test_publish_sync_times_out_on_slow_handler() {
    let bus = LocalBus::new(BusConfig::default());
    let sleeper = Arc::new(Sleeper {
        nap: Duration::from_secs(5),
        woke: AtomicBool::new(false),
    });
    bus.register(&sleeper);

    // Returns false, not an error, when the handler outlives the window.
    assert!(!bus.publish_sync(TestEvent { id: 1 }, Duration::from_secs(1)).await);
}

#[tokio::test]
async fn test_timed_out_dispatch_runs_to_completion() {
    let bus = LocalBus::new(BusConfig::default());
    let sleeper = Arc::new(Sleeper {
        nap: Duration::from_millis(100),
        woke: AtomicBool::new(false),
    });
    bus.register(&sleeper);

    assert!(!bus.publish_sync(TestEvent { id: 1 }, Duration::from_millis(10)).await);
    assert!(!sleeper.woke.load(Ordering::SeqCst));

    // The abandoned dispatch keeps running and finishes on its own.
    assert!(
        wait_for(Duration::from_secs(1), || {
            sleeper.woke.load(Ordering::SeqCst)
        })
        .await
    );
}

struct FaultyPair {
    survived: AtomicBool,
}

fn boom() -> Outcome {
    panic!("handler bug")
}

impl EventHandler for FaultyPair {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![
            HandlerDescriptor::subscribe(
                &self,
                "explodes",
                |_h: Arc<FaultyPair>, _ev: Arc<TestEvent>| async move { boom() },
            ),
            HandlerDescriptor::subscribe(
                &self,
                "still_runs",
                |h: Arc<FaultyPair>, _ev: Arc<TestEvent>| async move {
                    h.survived.store(true, Ordering::SeqCst);
                    Outcome::None
                },
            ),
        ]
    }
}

#[tokio::test]
async fn test_handler_panic_does_not_abort_dispatch() {
    let bus = LocalBus::new(BusConfig::default());
    let pair = Arc::new(FaultyPair {
        survived: AtomicBool::new(false),
    });
    bus.register(&pair);

    assert!(bus.publish_sync(TestEvent { id: 1 }, Duration::from_secs(1)).await);
    assert!(pair.survived.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_panicking_filter_does_not_block_delivery() {
    let bus = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();
    bus.register(&recorder);

    bus.add_filter(|_event: &dyn Event, _descriptor: &HandlerDescriptor| -> bool {
        panic!("filter bug")
    });

    assert!(bus.publish_sync(TestEvent { id: TEST_ID }, Duration::from_secs(1)).await);
    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
}

#[tokio::test]
async fn test_bounded_bus_delivers_everything() {
    let bus = LocalBus::new(BusConfig::bounded(1));
    let recorder = Recorder::new();
    bus.register(&recorder);

    let mut last = None;
    for i in 0..10 {
        last = Some(bus.publish(TestEvent { id: i }));
    }
    let last = last.expect("at least one publish");

    assert!(
        wait_for(Duration::from_secs(2), || {
            recorder.counter.load(Ordering::SeqCst) == 10
        })
        .await
    );
    assert!(wait_for(Duration::from_secs(1), || last.is_finished()).await);
    bus.shutdown().await;
}

/// Tracks how many of its subscriptions run at the same instant.
struct SlowPair {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowPair {
    async fn step(&self) {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EventHandler for SlowPair {
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
        vec![
            HandlerDescriptor::subscribe(
                &self,
                "first_leg",
                |h: Arc<SlowPair>, _ev: Arc<TestEvent>| async move {
                    h.step().await;
                    Outcome::None
                },
            ),
            HandlerDescriptor::subscribe(
                &self,
                "second_leg",
                |h: Arc<SlowPair>, _ev: Arc<TestEvent>| async move {
                    h.step().await;
                    Outcome::None
                },
            ),
        ]
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_handlers_within_one_dispatch_run_sequentially() {
    let bus = LocalBus::new(BusConfig::default());
    let pair = Arc::new(SlowPair {
        live: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    bus.register(&pair);

    assert!(bus.publish_sync(TestEvent { id: 1 }, Duration::from_secs(1)).await);

    // Both subscriptions ran, never overlapping within the one dispatch.
    assert_eq!(pair.peak.load(Ordering::SeqCst), 1);
    assert_eq!(pair.live.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registration_races_in_flight_dispatches() {
    let bus = LocalBus::new(BusConfig::default());
    let early = Recorder::new();
    bus.register(&early);

    // Keep dispatches in flight while handlers and filters are added.
    let publisher = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                bus.publish(TestEvent { id: i }).forget();
                if i % 16 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let late = Arc::new(MixedProducer {
        delivered: AtomicUsize::new(0),
    });
    for _ in 0..50 {
        bus.add_filter(|_: &dyn Event, _: &HandlerDescriptor| false);
        tokio::task::yield_now().await;
    }
    bus.register(&late);
    publisher.await.expect("publisher task");

    // Anything registered before its publish is delivered.
    assert!(bus.publish_sync(TestEvent { id: TEST_ID }, Duration::from_secs(1)).await);
    assert_eq!(early.id.load(Ordering::SeqCst), TEST_ID);
    assert!(late.delivered.load(Ordering::SeqCst) >= 1);

    bus.shutdown().await;
}

#[tokio::test]
async fn test_dyn_bus_surface() {
    use localbus::EventBus;

    let local = LocalBus::new(BusConfig::default());
    let recorder = Recorder::new();

    let bus: Arc<dyn EventBus> = Arc::new(local);
    bus.register_handler(recorder.clone());
    bus.register_filter(Arc::new(
        |_event: &dyn Event, descriptor: &HandlerDescriptor| descriptor.method() == "never_matches",
    ));

    let delivered = bus
        .publish_event_sync(
            Arc::new(TestEvent { id: TEST_ID }),
            Duration::from_secs(1),
            Vec::new(),
        )
        .await;

    assert!(delivered);
    assert_eq!(recorder.id.load(Ordering::SeqCst), TEST_ID);
}
