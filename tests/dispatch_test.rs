mod common;

use common::{RecordingSpider, ScriptedTransport, Step, uri, uris};
use crawlbox::config::{JobConfig, JobOptions};
use crawlbox::store::{MemoryStore, Store};
use crawlbox::{Dispatcher, HandlerError, ValidationOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn job(name: &str, options: JobOptions) -> JobConfig {
    JobConfig::builder().name(name).options(options).build()
}

fn dispatcher(
    config: JobConfig,
    store: Arc<MemoryStore>,
    spider: Arc<RecordingSpider>,
    transport: Arc<ScriptedTransport>,
) -> Dispatcher {
    Dispatcher::builder()
        .config(config)
        .store(store)
        .spider(spider)
        .transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_transient_failure_is_retried_once() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(ScriptedTransport::new().script(&uri("y"), [Step::Fail(503)]));

    let retry_store = store.clone();
    let spider = Arc::new(
        RecordingSpider::new(uris(&["x", "y", "z"])).on_success_hook(move |request, _| {
            // A request that finally succeeds leaves no failure history behind.
            let key = request.to_key().unwrap();
            assert_eq!(
                retry_store
                    .hash_get("crawlbox.xyz:retry_count", &key)
                    .unwrap(),
                None
            );
            Ok(None)
        }),
    );

    let options = JobOptions::builder().concurrency(2).retry_count(1).build();
    let dispatcher = dispatcher(job("xyz", options), store, spider.clone(), transport.clone());

    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.success, 3);
    assert_eq!(summary.transport_failures, 1);
    assert_eq!(summary.handler_failures, 0);
    assert_eq!(summary.concurrency, 2);
    assert_eq!(dispatcher.request_overplus().unwrap(), 0);

    let mut fetched = spider.successes();
    fetched.sort();
    assert_eq!(fetched, uris(&["x", "y", "z"]));
    assert!(spider.errors().is_empty());
    assert_eq!(transport.dispatched().len(), 4);
}

#[tokio::test]
async fn test_malformed_uri_is_excluded_from_total() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(ScriptedTransport::new());

    let total_seen = Arc::new(AtomicUsize::new(0));
    let seen = total_seen.clone();
    let mut requests = uris(&["a", "b"]);
    requests.insert(1, "ht!tp://bad".to_string());
    requests.push(uri("c"));

    let spider = Arc::new(RecordingSpider::new(requests).on_success_hook(
        move |_, dispatcher| {
            seen.store(dispatcher.request_total().unwrap() as usize, Ordering::SeqCst);
            Ok(None)
        },
    ));

    let dispatcher = dispatcher(
        job("malformed", JobOptions::default()),
        store,
        spider.clone(),
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.success, 3);
    assert_eq!(total_seen.load(Ordering::SeqCst), 3);
    assert!(!transport.dispatched().iter().any(|u| u.contains("bad")));
}

#[tokio::test]
async fn test_duplicates_are_fetched_once() {
    let transport = Arc::new(ScriptedTransport::new());
    let spider = Arc::new(RecordingSpider::new(uris(&["a", "b", "a", "c", "b"])));

    let dispatcher = dispatcher(
        job("dedup", JobOptions::builder().concurrency(3).build()),
        Arc::new(MemoryStore::new()),
        spider,
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(transport.dispatched().len(), 3);
}

#[tokio::test]
async fn test_added_request_is_dispatched_before_older_work() {
    let transport = Arc::new(ScriptedTransport::new());
    let counts = Arc::new(std::sync::Mutex::new(None));
    let recorded = counts.clone();

    let spider = Arc::new(RecordingSpider::new(uris(&["a", "b", "c"])).on_success_hook(
        move |request, dispatcher| {
            if request.uri == uri("a") {
                assert!(dispatcher.add_request(uri("discovered"))?);
                assert!(!dispatcher.add_request("ht!tp://bad")?);
                *recorded.lock().unwrap() = Some((
                    dispatcher.request_total().unwrap(),
                    dispatcher.request_overplus().unwrap(),
                ));
            }
            Ok(None)
        },
    ));

    let dispatcher = dispatcher(
        job("frontier", JobOptions::default()),
        Arc::new(MemoryStore::new()),
        spider.clone(),
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    // After `a` resolved: total 3 -> 4, overplus 2 -> 3.
    assert_eq!(*counts.lock().unwrap(), Some((4, 3)));
    assert_eq!(summary.total, 4);
    assert_eq!(summary.success, 4);
    assert_eq!(
        transport.dispatched(),
        uris(&["a", "discovered", "b", "c"])
    );
}

#[tokio::test]
async fn test_retries_are_dispatched_before_fresh_work() {
    let transport = Arc::new(ScriptedTransport::new().script(&uri("a"), [Step::Fail(500)]));
    let spider = Arc::new(RecordingSpider::new(uris(&["a", "b", "c"])));

    let dispatcher = dispatcher(
        job("priority", JobOptions::builder().retry_count(1).build()),
        Arc::new(MemoryStore::new()),
        spider,
        transport.clone(),
    );
    dispatcher.run().await.unwrap();

    assert_eq!(transport.dispatched(), uris(&["a", "a", "b", "c"]));
}

#[tokio::test]
async fn test_exhausted_retries_call_error_handler_once() {
    let transport = Arc::new(ScriptedTransport::new().script(
        &uri("down"),
        [Step::Fail(500), Step::Fail(502), Step::Fail(503), Step::Fail(504)],
    ));
    let spider = Arc::new(RecordingSpider::new(uris(&["down", "up"])));

    let dispatcher = dispatcher(
        job("exhausted", JobOptions::builder().retry_count(2).build()),
        Arc::new(MemoryStore::new()),
        spider.clone(),
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.transport_failures, 3);

    let attempts = transport
        .dispatched()
        .iter()
        .filter(|u| **u == uri("down"))
        .count();
    assert_eq!(attempts, 3);

    let errors = spider.errors();
    assert_eq!(errors.len(), 1);
    let (failed_uri, message, body) = &errors[0];
    assert_eq!(failed_uri, &uri("down"));
    assert!(message.contains("503"));
    assert_eq!(
        body.as_deref(),
        Some(format!("failed {}", uri("down")).as_bytes())
    );
}

#[tokio::test]
async fn test_zero_retry_budget_fails_immediately() {
    let transport = Arc::new(ScriptedTransport::new().script(&uri("a"), [Step::Fail(500)]));
    let spider = Arc::new(RecordingSpider::new(uris(&["a"])));

    let dispatcher = dispatcher(
        job("no-retry", JobOptions::builder().retry_count(0).build()),
        Arc::new(MemoryStore::new()),
        spider.clone(),
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.success, 0);
    assert_eq!(summary.transport_failures, 1);
    assert_eq!(spider.errors().len(), 1);
    assert_eq!(transport.dispatched().len(), 1);
}

#[tokio::test]
async fn test_handler_failures_do_not_block_the_run() {
    let transport = Arc::new(ScriptedTransport::new());
    let spider = Arc::new(RecordingSpider::new(uris(&["ok", "err", "boom"])).on_success_hook(
        |request, _| {
            if request.uri.ends_with("/err") {
                return Err(HandlerError::Parse("no title".into()));
            }
            if request.uri.ends_with("/boom") {
                panic!("handler bug");
            }
            Ok(None)
        },
    ));

    let dispatcher = dispatcher(
        job("handlers", JobOptions::default()),
        Arc::new(MemoryStore::new()),
        spider,
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.success, 3);
    assert_eq!(summary.handler_failures, 2);
    assert_eq!(summary.transport_failures, 0);
    assert_eq!(transport.dispatched().len(), 3);
}

#[tokio::test]
async fn test_error_handler_panic_is_not_a_handler_failure() {
    let transport = Arc::new(ScriptedTransport::new().script(&uri("down"), [Step::Fail(500)]));
    let spider = Arc::new(RecordingSpider::new(uris(&["down", "up"])).panicking_on_error());

    let dispatcher = dispatcher(
        job("error-panic", JobOptions::builder().retry_count(0).build()),
        Arc::new(MemoryStore::new()),
        spider.clone(),
        transport,
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(spider.errors().len(), 1);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.transport_failures, 1);
    assert_eq!(summary.handler_failures, 0);
    assert_eq!(dispatcher.request_overplus().unwrap(), 0);
}

#[tokio::test]
async fn test_content_validation_failure_is_not_retried() {
    let transport = Arc::new(ScriptedTransport::new());
    let spider = Arc::new(RecordingSpider::new(uris(&["thin"])).on_success_hook(|_, _| {
        Ok(Some(ValidationOutcome::invalid(["missing price"])))
    }));

    let dispatcher = dispatcher(
        job("validate", JobOptions::default()),
        Arc::new(MemoryStore::new()),
        spider,
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.handler_failures, 0);
    assert_eq!(transport.dispatched().len(), 1);
}

#[tokio::test]
async fn test_in_flight_never_exceeds_concurrency() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(ScriptedTransport::with_latency(Duration::from_millis(10)));

    let paths: Vec<String> = (0..20).map(|i| format!("page/{i}")).collect();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();

    let probe = store.clone();
    let spider = Arc::new(RecordingSpider::new(uris(&path_refs)).on_success_hook(
        move |_, _| {
            let in_flight = probe.hash_get_all("crawlbox.bounded:requesting").unwrap();
            assert!(in_flight.len() <= 3, "{} requests in flight", in_flight.len());
            Ok(None)
        },
    ));

    let dispatcher = dispatcher(
        job("bounded", JobOptions::builder().concurrency(3).build()),
        store,
        spider,
        transport.clone(),
    );
    let summary = dispatcher.run().await.unwrap();

    assert_eq!(summary.success, 20);
    assert!(transport.max_in_flight() <= 3);
    assert!(transport.max_in_flight() >= 2);
}

#[tokio::test]
async fn test_interval_pauses_after_each_completion() {
    let transport = Arc::new(ScriptedTransport::new());
    let spider = Arc::new(RecordingSpider::new(uris(&["a", "b", "c"])));

    let options = JobOptions::builder()
        .interval(Duration::from_millis(30))
        .build();
    let dispatcher = dispatcher(
        job("paced", options),
        Arc::new(MemoryStore::new()),
        spider,
        transport,
    );
    let summary = dispatcher.run().await.unwrap();

    assert!(summary.elapsed >= Duration::from_millis(90));
}

#[tokio::test]
async fn test_base_uri_and_numeric_ids() {
    let transport = Arc::new(ScriptedTransport::new());
    let spider = Arc::new(RecordingSpider::new([1_i64, 2, 3]));

    let options = JobOptions::builder()
        .base_uri("http://example.com/item/")
        .build();
    let dispatcher = dispatcher(
        job("ids", options),
        Arc::new(MemoryStore::new()),
        spider,
        transport.clone(),
    );
    dispatcher.run().await.unwrap();

    assert_eq!(transport.dispatched(), uris(&["item/1", "item/2", "item/3"]));
}

#[tokio::test]
async fn test_completed_run_leaves_no_state() {
    let store = Arc::new(MemoryStore::new());
    store.counter_set("crawlbox.other:total", 7).unwrap();

    let transport = Arc::new(ScriptedTransport::new().script(&uri("b"), [Step::Fail(500)]));
    let spider = Arc::new(RecordingSpider::new(uris(&["a", "b"])));

    let dispatcher = dispatcher(
        job("teardown", JobOptions::default()),
        store.clone(),
        spider,
        transport,
    );
    dispatcher.run().await.unwrap();

    assert_eq!(store.delete_prefix("crawlbox.teardown:").unwrap(), 0);
    assert_eq!(store.counter_get("crawlbox.other:total").unwrap(), Some(7));
}
