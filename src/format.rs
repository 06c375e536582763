use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::event::Event;

/// Errors from parsing a console line template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template field: {0}")]
    UnknownField(String),
}

/// Timestamp layout used by the default console line.
const TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Line layout for one accepted event: either the built-in JSON object or
/// a user-supplied text template with `{{field}}` placeholders.
#[derive(Debug, Clone)]
pub enum EventTemplate {
    Json,
    Text(Vec<Segment>),
}

#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Field(Field),
}

/// Event fields addressable from a text template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Time,
    Namespace,
    Name,
    InvolvedObjectKind,
    InvolvedObjectNamespace,
    InvolvedObjectName,
    InvolvedObjectUid,
    InvolvedObjectApiVersion,
    InvolvedObjectResourceVersion,
    Reason,
    Type,
    Message,
    ReportingController,
    ReportingInstance,
    Count,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "time" => Self::Time,
            "namespace" => Self::Namespace,
            "name" => Self::Name,
            "involvedObjectKind" => Self::InvolvedObjectKind,
            "involvedObjectNamespace" => Self::InvolvedObjectNamespace,
            "involvedObjectName" => Self::InvolvedObjectName,
            "involvedObjectUid" => Self::InvolvedObjectUid,
            "involvedObjectApiVersion" => Self::InvolvedObjectApiVersion,
            "involvedObjectResourceVersion" => Self::InvolvedObjectResourceVersion,
            "reason" => Self::Reason,
            "type" => Self::Type,
            "message" => Self::Message,
            "reportingController" => Self::ReportingController,
            "reportingInstance" => Self::ReportingInstance,
            "count" => Self::Count,
            _ => return None,
        })
    }

    fn render(self, event: &Event, time: DateTime<Utc>) -> String {
        match self {
            Self::Time => time.format(TIME_LAYOUT).to_string(),
            Self::Namespace => event.metadata.namespace.clone(),
            Self::Name => event.metadata.name.clone(),
            Self::InvolvedObjectKind => event.involved_object.kind.clone(),
            Self::InvolvedObjectNamespace => event.involved_object.namespace.clone(),
            Self::InvolvedObjectName => event.involved_object.name.clone(),
            Self::InvolvedObjectUid => event.involved_object.uid.clone(),
            Self::InvolvedObjectApiVersion => event.involved_object.api_version.clone(),
            Self::InvolvedObjectResourceVersion => {
                event.involved_object.resource_version.clone()
            }
            Self::Reason => event.reason.clone(),
            Self::Type => event.event_type.clone(),
            Self::Message => event.message.clone(),
            Self::ReportingController => event.reporting_controller.clone(),
            Self::ReportingInstance => event.reporting_instance.clone(),
            Self::Count => event.count.to_string(),
        }
    }
}

/// Shape of the default JSON console line. Field order is the declaration
/// order here.
#[derive(Serialize)]
struct JsonLine<'a> {
    time: String,
    #[serde(rename = "involvedObjectKind")]
    involved_object_kind: &'a str,
    #[serde(rename = "involvedObjectNamespace")]
    involved_object_namespace: &'a str,
    #[serde(rename = "involvedObjectName")]
    involved_object_name: &'a str,
    #[serde(rename = "involvedObjectUid")]
    involved_object_uid: &'a str,
    #[serde(rename = "involvedObjectApiVersion")]
    involved_object_api_version: &'a str,
    #[serde(rename = "involvedObjectResourceVersion")]
    involved_object_resource_version: &'a str,
    reason: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    message: &'a str,
    kind: &'a str,
}

impl EventTemplate {
    /// Parse a template string. Empty or whitespace-only input selects the
    /// default JSON layout; unknown placeholder names are an error.
    pub fn parse(format: &str) -> Result<Self, TemplateError> {
        if format.trim().is_empty() {
            return Ok(Self::Json);
        }

        let placeholder =
            Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("static pattern must compile");
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in placeholder.captures_iter(format) {
            let whole = caps.get(0).expect("capture 0");
            let name = &caps[1];
            if whole.start() > last {
                segments.push(Segment::Literal(format[last..whole.start()].to_string()));
            }
            let Some(field) = Field::parse(name) else {
                return Err(TemplateError::UnknownField(name.to_string()));
            };
            segments.push(Segment::Field(field));
            last = whole.end();
        }
        if last < format.len() {
            segments.push(Segment::Literal(format[last..].to_string()));
        }

        Ok(Self::Text(segments))
    }

    /// Render one event. A missing last-seen timestamp falls back to the
    /// current time, so every line carries a usable `time` value.
    pub fn render(&self, event: &Event) -> String {
        let time = event.last_timestamp.unwrap_or_else(Utc::now);
        match self {
            Self::Json => {
                let line = JsonLine {
                    time: time.format(TIME_LAYOUT).to_string(),
                    involved_object_kind: &event.involved_object.kind,
                    involved_object_namespace: &event.involved_object.namespace,
                    involved_object_name: &event.involved_object.name,
                    involved_object_uid: &event.involved_object.uid,
                    involved_object_api_version: &event.involved_object.api_version,
                    involved_object_resource_version: &event.involved_object.resource_version,
                    reason: &event.reason,
                    event_type: &event.event_type,
                    message: &event.message,
                    kind: "KubernetesEvent",
                };
                serde_json::to_string(&line).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "failed to render event line");
                    String::new()
                })
            }
            Self::Text(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(s) => out.push_str(s),
                        Segment::Field(f) => out.push_str(&f.render(event, time)),
                    }
                }
                out
            }
        }
    }
}

impl Default for EventTemplate {
    fn default() -> Self {
        Self::Json
    }
}
