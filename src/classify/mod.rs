pub mod tables;

use regex::Regex;

/// Resource kinds with a dedicated canonicalization table. Parsed from the
/// lowercased involved-object kind string; anything else falls through to
/// the generic reason-based fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Pod,
    PodDisruptionBudget,
    DaemonSet,
    ReplicaSet,
    ReplicationController,
    Deployment,
    DeploymentConfig,
    GrafanaDashboard,
    PersistentVolumeClaim,
    PersistentVolume,
    HorizontalPodAutoscaler,
    Node,
    StatefulSet,
    ClusterIssuer,
    Issuer,
    Challenge,
    CertificateSigningRequest,
    Certificate,
    Order,
    Service,
    Endpoints,
    Job,
    CronJob,
    Other,
}

impl Kind {
    /// Case-insensitive parse of a resource kind string.
    pub fn parse(kind: &str) -> Self {
        match kind.to_ascii_lowercase().as_str() {
            "pod" => Self::Pod,
            "poddisruptionbudget" => Self::PodDisruptionBudget,
            "daemonset" => Self::DaemonSet,
            "replicaset" => Self::ReplicaSet,
            "replicationcontroller" => Self::ReplicationController,
            "deployment" => Self::Deployment,
            "deploymentconfig" => Self::DeploymentConfig,
            "grafanadashboard" => Self::GrafanaDashboard,
            "persistentvolumeclaim" => Self::PersistentVolumeClaim,
            "persistentvolume" => Self::PersistentVolume,
            "horizontalpodautoscaler" => Self::HorizontalPodAutoscaler,
            "node" => Self::Node,
            "statefulset" => Self::StatefulSet,
            "clusterissuer" => Self::ClusterIssuer,
            "issuer" => Self::Issuer,
            "challenge" => Self::Challenge,
            "certificatesigningrequest" => Self::CertificateSigningRequest,
            "certificate" => Self::Certificate,
            "order" => Self::Order,
            "service" => Self::Service,
            "endpoints" => Self::Endpoints,
            "job" => Self::Job,
            "cronjob" => Self::CronJob,
            _ => Self::Other,
        }
    }
}

/// One message pattern and the canonical label it maps to.
struct Pattern {
    re: Regex,
    label: &'static str,
}

/// Compiled per-kind pattern table.
struct PatternTable {
    patterns: Vec<Pattern>,
}

impl PatternTable {
    fn compile(pairs: &[(&'static str, &'static str)]) -> Self {
        let patterns = pairs
            .iter()
            .map(|(expression, label)| Pattern {
                re: Regex::new(expression).expect("static classification pattern must compile"),
                label,
            })
            .collect();
        Self { patterns }
    }

    /// First-declared pattern wins; evaluation order is the declaration
    /// order of the source table, so the winning label is stable across
    /// restarts.
    fn lookup(&self, message: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|p| p.re.is_match(message))
            .map(|p| p.label)
    }
}

/// Maps (kind, reason, message) triples onto a small, stable label
/// vocabulary so free-text messages do not explode metric cardinality.
///
/// Construction compiles every table once; the resulting value is
/// immutable and safe for concurrent reads from any number of workers.
pub struct Classifier {
    pod: PatternTable,
    pod_disruption_budget: PatternTable,
    daemon_set: PatternTable,
    replica_set: PatternTable,
    deployment: PatternTable,
    deployment_config: PatternTable,
    grafana_dashboard: PatternTable,
    pvc: PatternTable,
    pv: PatternTable,
    hpa: PatternTable,
    node: PatternTable,
    stateful_set: PatternTable,
    issuer: PatternTable,
    challenge: PatternTable,
    csr: PatternTable,
    certificate: PatternTable,
    order: PatternTable,
    service: PatternTable,
    endpoints: PatternTable,
    job: PatternTable,
    cron_job: PatternTable,

    owner_ref_missing: Regex,
    forbidden_update: Regex,
}

const OWNER_REF_LABEL: &str = "ownerRef does not exist in namespace";
const FORBIDDEN_UPDATE_LABEL: &str = "Forbidden: User cannot update resource";

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Compiles all classification tables.
    pub fn new() -> Self {
        Self {
            pod: PatternTable::compile(tables::POD),
            pod_disruption_budget: PatternTable::compile(tables::POD_DISRUPTION_BUDGET),
            daemon_set: PatternTable::compile(tables::DAEMON_SET),
            replica_set: PatternTable::compile(tables::REPLICA_SET),
            deployment: PatternTable::compile(tables::DEPLOYMENT),
            deployment_config: PatternTable::compile(tables::DEPLOYMENT_CONFIG),
            grafana_dashboard: PatternTable::compile(tables::GRAFANA_DASHBOARD),
            pvc: PatternTable::compile(tables::PERSISTENT_VOLUME_CLAIM),
            pv: PatternTable::compile(tables::PERSISTENT_VOLUME),
            hpa: PatternTable::compile(tables::HORIZONTAL_POD_AUTOSCALER),
            node: PatternTable::compile(tables::NODE),
            stateful_set: PatternTable::compile(tables::STATEFUL_SET),
            issuer: PatternTable::compile(tables::ISSUER),
            challenge: PatternTable::compile(tables::CHALLENGE),
            csr: PatternTable::compile(tables::CERTIFICATE_SIGNING_REQUEST),
            certificate: PatternTable::compile(tables::CERTIFICATE),
            order: PatternTable::compile(tables::ORDER),
            service: PatternTable::compile(tables::SERVICE),
            endpoints: PatternTable::compile(tables::ENDPOINTS),
            job: PatternTable::compile(tables::JOB),
            cron_job: PatternTable::compile(tables::CRON_JOB),
            owner_ref_missing: Regex::new("ownerRef .* does not exist in namespace.*")
                .expect("static pattern must compile"),
            forbidden_update: Regex::new(
                ".*is forbidden: User .* cannot update resource .* in API group",
            )
            .expect("static pattern must compile"),
        }
    }

    /// Canonicalize a free-text event message for use as a metric label.
    ///
    /// Lookup order: kind-specific reason short-circuits, the kind's
    /// pattern table (first-declared-wins), two reason-keyed generic
    /// fallbacks, and finally the raw message verbatim.
    pub fn classify(&self, kind: &str, reason: &str, message: &str) -> String {
        let kind = Kind::parse(kind);

        match kind {
            Kind::HorizontalPodAutoscaler
                if reason.eq_ignore_ascii_case("FailedGetScale")
                    || reason.eq_ignore_ascii_case("FailedComputeMetricsReplicas") =>
            {
                return reason.to_string();
            }
            Kind::Issuer | Kind::ClusterIssuer if reason.eq_ignore_ascii_case("ErrGetKeyPair") => {
                return "Error getting keypair for CA issuer".to_string();
            }
            _ => {}
        }

        if let Some(table) = self.table_for(kind) {
            if let Some(label) = table.lookup(message) {
                return label.to_string();
            }
        }

        if reason.eq_ignore_ascii_case("OwnerRefInvalidNamespace")
            && self.owner_ref_missing.is_match(message)
        {
            return OWNER_REF_LABEL.to_string();
        }
        if reason.eq_ignore_ascii_case("UpdateError") && self.forbidden_update.is_match(message) {
            return FORBIDDEN_UPDATE_LABEL.to_string();
        }

        message.to_string()
    }

    fn table_for(&self, kind: Kind) -> Option<&PatternTable> {
        match kind {
            Kind::Pod => Some(&self.pod),
            Kind::PodDisruptionBudget => Some(&self.pod_disruption_budget),
            Kind::DaemonSet => Some(&self.daemon_set),
            Kind::ReplicaSet | Kind::ReplicationController => Some(&self.replica_set),
            Kind::Deployment => Some(&self.deployment),
            Kind::DeploymentConfig => Some(&self.deployment_config),
            Kind::GrafanaDashboard => Some(&self.grafana_dashboard),
            Kind::PersistentVolumeClaim => Some(&self.pvc),
            Kind::PersistentVolume => Some(&self.pv),
            Kind::HorizontalPodAutoscaler => Some(&self.hpa),
            Kind::Node => Some(&self.node),
            Kind::StatefulSet => Some(&self.stateful_set),
            Kind::Issuer | Kind::ClusterIssuer => Some(&self.issuer),
            Kind::Challenge => Some(&self.challenge),
            Kind::CertificateSigningRequest => Some(&self.csr),
            Kind::Certificate => Some(&self.certificate),
            Kind::Order => Some(&self.order),
            Kind::Service => Some(&self.service),
            Kind::Endpoints => Some(&self.endpoints),
            Kind::Job => Some(&self.job),
            Kind::CronJob => Some(&self.cron_job),
            Kind::Other => None,
        }
    }
}
