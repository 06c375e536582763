use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event types emitted by the Kubernetes API.
pub const EVENT_TYPE_NORMAL: &str = "Normal";
pub const EVENT_TYPE_WARNING: &str = "Warning";

/// Identity of the Event object itself within the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "resourceVersion")]
    pub resource_version: String,
}

/// The resource an Event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    #[serde(rename = "resourceVersion")]
    pub resource_version: String,
}

/// A platform-emitted record describing something that happened to a
/// resource. Immutable once observed; the pipeline only reads,
/// classifies, and eventually drops it from the local cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub metadata: ObjectMeta,
    #[serde(rename = "involvedObject")]
    pub involved_object: ObjectReference,
    pub reason: String,
    pub message: String,
    /// "Normal" or "Warning".
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "reportingComponent")]
    pub reporting_controller: String,
    #[serde(rename = "reportingInstance")]
    pub reporting_instance: String,
    #[serde(rename = "firstTimestamp")]
    pub first_timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "lastTimestamp")]
    pub last_timestamp: Option<DateTime<Utc>>,
    pub count: i32,
}

impl Event {
    /// Cache/queue addressing key, `namespace/name` (or `name` for
    /// cluster-scoped objects).
    pub fn key(&self) -> String {
        if self.metadata.namespace.is_empty() {
            return self.metadata.name.clone();
        }
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    /// True for events of type "Normal" (case-insensitive, matching the
    /// upstream comparison).
    pub fn is_normal(&self) -> bool {
        self.event_type.eq_ignore_ascii_case(EVENT_TYPE_NORMAL)
    }
}
