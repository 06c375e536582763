use anyhow::Result;
use prometheus::{IntCounterVec, Opts, Registry};
use tracing::debug;

use crate::classify::Classifier;
use crate::event::Event;
use crate::filter::RuleSet;
use crate::sink::Sink;

pub const METRICS_SINK_NAME: &str = "metrics";

/// Label value substituted when an event carries no kind or namespace,
/// so series stay addressable.
const UNKNOWN_LABEL: &str = "unknown";

/// Counts accepted events into five counter families on a dedicated
/// registry. Message labels go through the classifier first to keep
/// cardinality bounded.
pub struct MetricsSink {
    rules: RuleSet,
    classifier: Classifier,
    registry: Registry,

    /// Every accepted event, by kind, namespace and type.
    events_total: IntCounterVec,
    /// Normal events with full object identity and canonical message.
    normal_total: IntCounterVec,
    /// Warning events with full object identity and canonical message.
    warning_total: IntCounterVec,
    /// Normal events rolled up by reporting controller.
    reporting_normal_total: IntCounterVec,
    /// Warning events rolled up by reporting controller.
    reporting_warning_total: IntCounterVec,
}

const DETAIL_LABELS: &[&str] = &[
    "kind",
    "event_object",
    "event_namespace",
    "reason",
    "controller",
    "controller_instance",
    "message",
];

const CONTROLLER_LABELS: &[&str] = &["controller", "controller_instance", "kind", "event_namespace"];

impl MetricsSink {
    pub fn new(rules: RuleSet) -> Result<Self> {
        let registry = Registry::new();

        let events_total = IntCounterVec::new(
            Opts::new("kube_events_total", "Total count of observed events."),
            &["kind", "event_namespace", "type"],
        )?;
        let normal_total = IntCounterVec::new(
            Opts::new(
                "kube_events_normal_total",
                "Normal events by object, reason and canonical message.",
            ),
            DETAIL_LABELS,
        )?;
        let warning_total = IntCounterVec::new(
            Opts::new(
                "kube_events_warning_total",
                "Warning events by object, reason and canonical message.",
            ),
            DETAIL_LABELS,
        )?;
        let reporting_normal_total = IntCounterVec::new(
            Opts::new(
                "kube_events_reporting_controller_normal_total",
                "Normal events by reporting controller.",
            ),
            CONTROLLER_LABELS,
        )?;
        let reporting_warning_total = IntCounterVec::new(
            Opts::new(
                "kube_events_reporting_controller_warning_total",
                "Warning events by reporting controller.",
            ),
            CONTROLLER_LABELS,
        )?;

        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(normal_total.clone()))?;
        registry.register(Box::new(warning_total.clone()))?;
        registry.register(Box::new(reporting_normal_total.clone()))?;
        registry.register(Box::new(reporting_warning_total.clone()))?;

        Ok(Self {
            rules,
            classifier: Classifier::new(),
            registry,
            events_total,
            normal_total,
            warning_total,
            reporting_normal_total,
            reporting_warning_total,
        })
    }

    /// The registry this sink writes to, for exposition.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        UNKNOWN_LABEL
    } else {
        value
    }
}

impl Sink for MetricsSink {
    fn name(&self) -> &str {
        METRICS_SINK_NAME
    }

    fn deliver(&self, event: &Event) -> Result<()> {
        if !self.rules.is_allowed(event) {
            debug!(key = %event.key(), sink = METRICS_SINK_NAME, "event rejected by filter");
            return Ok(());
        }

        let kind = or_unknown(&event.involved_object.kind);
        let namespace = or_unknown(&event.involved_object.namespace);

        self.events_total
            .with_label_values(&[kind, namespace, &event.event_type])
            .inc();

        let message =
            self.classifier
                .classify(&event.involved_object.kind, &event.reason, &event.message);

        let (detail, controller) = if event.is_normal() {
            (&self.normal_total, &self.reporting_normal_total)
        } else {
            (&self.warning_total, &self.reporting_warning_total)
        };

        detail
            .with_label_values(&[
                kind,
                &event.involved_object.name,
                namespace,
                &event.reason,
                &event.reporting_controller,
                &event.reporting_instance,
                &message,
            ])
            .inc();
        controller
            .with_label_values(&[
                &event.reporting_controller,
                &event.reporting_instance,
                kind,
                namespace,
            ])
            .inc();

        Ok(())
    }
}
