use std::io::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use kube_events_reader::controller::{EventController, JsonStreamWatcher};
use kube_events_reader::event::Event;
use kube_events_reader::export::MetricsServer;
use kube_events_reader::filter::{FieldPatterns, RuleSet, SinkFilter};
use kube_events_reader::format::EventTemplate;
use kube_events_reader::queue::RateLimiterConfig;
use kube_events_reader::sink::{ConsoleSink, MetricsSink, Sink};

fn watch_file(lines: &[String]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    for line in lines {
        writeln!(file, "{line}").expect("write");
    }
    file
}

fn added(namespace: &str, name: &str, event_type: &str, reason: &str, message: &str) -> String {
    event_line("ADDED", namespace, name, "1", event_type, reason, message)
}

fn event_line(
    change: &str,
    namespace: &str,
    name: &str,
    resource_version: &str,
    event_type: &str,
    reason: &str,
    message: &str,
) -> String {
    format!(
        r#"{{"type":"{change}","object":{{"metadata":{{"name":"{name}","namespace":"{namespace}","resourceVersion":"{resource_version}"}},"involvedObject":{{"kind":"Pod","namespace":"{namespace}","name":"test-pod"}},"reason":"{reason}","message":"{message}","type":"{event_type}","reportingComponent":"kubelet","reportingInstance":"node-1","count":1}}}}"#
    )
}

/// Polls until the condition holds or the deadline passes.
async fn wait_for(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Writer that the test can inspect while the sink holds it.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).expect("utf8 output")
    }

    fn line_count(&self) -> usize {
        self.contents().lines().count()
    }
}

impl std::io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Fails its first `fail_first` deliveries, then succeeds.
struct FlakySink {
    attempts: AtomicUsize,
    fail_first: usize,
}

impl FlakySink {
    fn new(fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            fail_first,
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Sink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    fn deliver(&self, _event: &Event) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            bail!("transient failure on attempt {attempt}");
        }
        Ok(())
    }
}

fn run_controller(
    namespace: &str,
    source: &std::path::Path,
    sinks: Vec<Arc<dyn Sink>>,
    token: &CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    let controller = EventController::new(
        namespace,
        Arc::new(JsonStreamWatcher::from_path(source)),
        Arc::new(sinks),
        RateLimiterConfig::default(),
    );
    let token = token.clone();
    tokio::spawn(async move { controller.run(2, token).await })
}

#[tokio::test]
async fn test_console_delivery_end_to_end() {
    let file = watch_file(&[
        added("logging", "a.1", "Normal", "Started", "Started container app"),
        added("tracing", "b.1", "Warning", "BackOff", "Back-off restarting failed container"),
        // Same resource version as the first line: a resync echo, skipped.
        event_line(
            "MODIFIED",
            "logging",
            "a.1",
            "1",
            "Normal",
            "Started",
            "Started container app",
        ),
    ]);

    let buffer = SharedBuffer::default();
    let console = Arc::new(ConsoleSink::with_writer(
        RuleSet::allow_all(),
        EventTemplate::Json,
        Box::new(buffer.clone()),
    ));

    let token = CancellationToken::new();
    let handle = run_controller("", file.path(), vec![console], &token);

    wait_for(|| buffer.line_count() == 2, "two console lines").await;
    // Give the skipped echo a moment to (not) arrive.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(buffer.line_count(), 2);

    let output = buffer.contents();
    assert!(output.contains("\"reason\":\"Started\""));
    assert!(output.contains("\"reason\":\"BackOff\""));
    assert!(output.contains("\"kind\":\"KubernetesEvent\""));

    token.cancel();
    handle.await.expect("join").expect("run");
}

#[tokio::test]
async fn test_metrics_exclude_rule_and_exposition() {
    let file = watch_file(&[
        added("logging", "a.1", "Normal", "Started", "Started container app"),
        added(
            "logging",
            "b.1",
            "Warning",
            "BackOff",
            "Back-off restarting failed container app in pod test-pod",
        ),
    ]);

    let filters = SinkFilter {
        name: "metrics".to_string(),
        match_rules: vec![],
        exclude: vec![FieldPatterns {
            event_type: "Normal".to_string(),
            ..Default::default()
        }],
    };
    let sink = Arc::new(
        MetricsSink::new(RuleSet::compile(Some(&filters)).expect("compile")).expect("sink"),
    );

    let server = MetricsServer::new("127.0.0.1:0", "/metrics", sink.registry().clone());
    server.start().await.expect("start server");
    let addr = server.local_addr().expect("bound address");

    let token = CancellationToken::new();
    let handle = run_controller("", file.path(), vec![Arc::clone(&sink) as Arc<dyn Sink>], &token);

    let fetch = || async {
        reqwest::get(format!("http://{addr}/metrics"))
            .await
            .expect("metrics request")
            .text()
            .await
            .expect("metrics body")
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let body = fetch().await;
        if body.contains("type=\"Warning\"") {
            // The excluded Normal event must never appear.
            assert!(!body.contains("type=\"Normal\""));
            assert!(body.contains(
                "kube_events_total{event_namespace=\"logging\",kind=\"Pod\",type=\"Warning\"} 1"
            ));
            assert!(body.contains("message=\"Back-off restarting failed container\""));
            break;
        }
        assert!(Instant::now() < deadline, "timed out waiting for warning sample");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let health = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("health request");
    assert_eq!(health.status(), 200);

    token.cancel();
    handle.await.expect("join").expect("run");
    server.stop().await.expect("stop server");
}

#[tokio::test]
async fn test_transient_sink_failure_recovers() {
    let file = watch_file(&[added(
        "logging",
        "a.1",
        "Normal",
        "Started",
        "Started container app",
    )]);

    let sink = FlakySink::new(2);
    let token = CancellationToken::new();
    let handle = run_controller(
        "",
        file.path(),
        vec![Arc::clone(&sink) as Arc<dyn Sink>],
        &token,
    );

    // Two failures, then the third attempt lands.
    wait_for(|| sink.attempts() == 3, "three delivery attempts").await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.attempts(), 3, "no further redelivery after success");

    token.cancel();
    handle.await.expect("join").expect("run");
}

#[tokio::test]
async fn test_namespaced_controllers_share_one_metrics_sink() {
    let file = watch_file(&[
        added("logging", "a.1", "Normal", "Started", "Started container app"),
        added("tracing", "b.1", "Normal", "Started", "Started container app"),
        added("other", "c.1", "Normal", "Started", "Started container app"),
    ]);

    let sink = Arc::new(MetricsSink::new(RuleSet::allow_all()).expect("sink"));
    let token = CancellationToken::new();
    let handles = vec![
        run_controller(
            "logging",
            file.path(),
            vec![Arc::clone(&sink) as Arc<dyn Sink>],
            &token,
        ),
        run_controller(
            "tracing",
            file.path(),
            vec![Arc::clone(&sink) as Arc<dyn Sink>],
            &token,
        ),
    ];

    let render = || {
        use prometheus::Encoder;
        let mut buf = Vec::new();
        prometheus::TextEncoder::new()
            .encode(&sink.registry().gather(), &mut buf)
            .expect("encode");
        String::from_utf8(buf).expect("utf8 exposition")
    };

    wait_for(
        || {
            let body = render();
            body.contains("event_namespace=\"logging\"") && body.contains("event_namespace=\"tracing\"")
        },
        "both namespaces counted",
    )
    .await;

    // The unwatched namespace never reaches the shared sink.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!render().contains("event_namespace=\"other\""));

    token.cancel();
    for handle in handles {
        handle.await.expect("join").expect("run");
    }
}
