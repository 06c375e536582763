use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::event::Event;

/// Maximum accepted size of a filter configuration file.
pub const MAX_FILTER_FILE_SIZE: u64 = 1024 * 1024;

/// Per-sink match/exclude rules parsed from the filter configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub sinks: Vec<SinkFilter>,
}

/// Filter specification for one named sink.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SinkFilter {
    pub name: String,
    #[serde(default, rename = "match")]
    pub match_rules: Vec<FieldPatterns>,
    #[serde(default)]
    pub exclude: Vec<FieldPatterns>,
}

/// One rule: an optional regular expression per event field. An empty
/// field is a wildcard.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct FieldPatterns {
    #[serde(rename = "type")]
    pub event_type: String,
    pub kind: String,
    pub reason: String,
    pub namespace: String,
    #[serde(rename = "reportingController")]
    pub reporting_controller: String,
    #[serde(rename = "reportingInstance")]
    pub reporting_instance: String,
    pub message: String,
}

impl FilterConfig {
    /// Load filter configuration from a YAML file. An absent file yields
    /// an empty configuration; malformed or oversized content is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let meta = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "filter configuration file does not exist");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading filter file {}", path.display()))
            }
        };

        if meta.len() > MAX_FILTER_FILE_SIZE {
            anyhow::bail!(
                "filter file {} exceeds maximum allowed size of {} bytes",
                path.display(),
                MAX_FILTER_FILE_SIZE
            );
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading filter file {}", path.display()))?;

        let config: FilterConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing filter file {}", path.display()))?;

        Ok(config)
    }

    /// Returns the filter specification for the named sink, if present.
    pub fn sink_filters(&self, name: &str) -> Option<&SinkFilter> {
        self.sinks.iter().find(|s| s.name == name)
    }
}

/// One compiled rule. Fields left `None` always match.
#[derive(Debug, Default)]
struct CompiledRule {
    event_type: Option<Regex>,
    kind: Option<Regex>,
    reason: Option<Regex>,
    namespace: Option<Regex>,
    reporting_controller: Option<Regex>,
    reporting_instance: Option<Regex>,
    message: Option<Regex>,
}

impl CompiledRule {
    fn compile(patterns: &FieldPatterns) -> Result<Self> {
        Ok(Self {
            event_type: compile_field(&patterns.event_type, "type")?,
            kind: compile_field(&patterns.kind, "kind")?,
            reason: compile_field(&patterns.reason, "reason")?,
            namespace: compile_field(&patterns.namespace, "namespace")?,
            reporting_controller: compile_field(
                &patterns.reporting_controller,
                "reportingController",
            )?,
            reporting_instance: compile_field(&patterns.reporting_instance, "reportingInstance")?,
            message: compile_field(&patterns.message, "message")?,
        })
    }

    /// True when every configured field matches the event.
    fn matches(&self, event: &Event) -> bool {
        field_matches(&self.event_type, &event.event_type)
            && field_matches(&self.kind, &event.involved_object.kind)
            && field_matches(&self.namespace, &event.involved_object.namespace)
            && field_matches(&self.reason, &event.reason)
            && field_matches(&self.message, &event.message)
            && field_matches(&self.reporting_controller, &event.reporting_controller)
            && field_matches(&self.reporting_instance, &event.reporting_instance)
    }
}

fn compile_field(pattern: &str, field: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    let re = Regex::new(pattern).with_context(|| format!("invalid {field} pattern {pattern:?}"))?;
    Ok(Some(re))
}

fn field_matches(re: &Option<Regex>, value: &str) -> bool {
    match re {
        Some(re) => re.is_match(value),
        None => true,
    }
}

/// Compiled match/exclude rules for one sink. Built once at sink
/// construction; immutable and shared by all controller instances.
#[derive(Debug, Default)]
pub struct RuleSet {
    match_rules: Vec<CompiledRule>,
    exclude_rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Allow-all rule set (no match and no exclude rules).
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Compile a sink filter specification. `None` compiles to allow-all.
    pub fn compile(filters: Option<&SinkFilter>) -> Result<Self> {
        let Some(filters) = filters else {
            return Ok(Self::default());
        };

        let match_rules = filters
            .match_rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()
            .context("compiling match rules")?;
        let exclude_rules = filters
            .exclude
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()
            .context("compiling exclude rules")?;

        Ok(Self {
            match_rules,
            exclude_rules,
        })
    }

    /// Two-stage filter: deny-list first, then allow-list. An exclude rule
    /// whose every configured field matches rejects the event outright.
    /// With no match rules the event is allowed; otherwise at least one
    /// match rule must fully match.
    pub fn is_allowed(&self, event: &Event) -> bool {
        if self.exclude_rules.iter().any(|rule| rule.matches(event)) {
            return false;
        }
        if self.match_rules.is_empty() {
            return true;
        }
        self.match_rules.iter().any(|rule| rule.matches(event))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::event::ObjectReference;

    fn pod_event(namespace: &str, event_type: &str, reason: &str) -> Event {
        Event {
            involved_object: ObjectReference {
                kind: "Pod".to_string(),
                namespace: namespace.to_string(),
                name: "test-pod".to_string(),
                ..Default::default()
            },
            reason: reason.to_string(),
            message: "Started container test".to_string(),
            event_type: event_type.to_string(),
            reporting_controller: "kubelet".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_rule_set_allows_all() {
        let rules = RuleSet::allow_all();
        assert!(rules.is_allowed(&pod_event("logging", "Normal", "Started")));
        assert!(rules.is_allowed(&pod_event("tracing", "Warning", "BackOff")));
    }

    #[test]
    fn test_exclude_rejects_regardless_of_match() {
        let filters = SinkFilter {
            name: "logs".to_string(),
            match_rules: vec![FieldPatterns {
                event_type: "Normal".to_string(),
                ..Default::default()
            }],
            exclude: vec![FieldPatterns {
                event_type: "Normal".to_string(),
                namespace: "logging".to_string(),
                ..Default::default()
            }],
        };
        let rules = RuleSet::compile(Some(&filters)).expect("compile");
        assert!(!rules.is_allowed(&pod_event("logging", "Normal", "Started")));
        // Exclude rule requires both fields; a different namespace passes.
        assert!(rules.is_allowed(&pod_event("tracing", "Normal", "Started")));
    }

    #[test]
    fn test_match_rules_are_or_combined() {
        let filters = SinkFilter {
            name: "logs".to_string(),
            match_rules: vec![
                FieldPatterns {
                    reason: "^BackOff$".to_string(),
                    ..Default::default()
                },
                FieldPatterns {
                    event_type: "Warning".to_string(),
                    namespace: "tracing".to_string(),
                    ..Default::default()
                },
            ],
            exclude: vec![],
        };
        let rules = RuleSet::compile(Some(&filters)).expect("compile");
        assert!(rules.is_allowed(&pod_event("logging", "Normal", "BackOff")));
        assert!(rules.is_allowed(&pod_event("tracing", "Warning", "Failed")));
        assert!(!rules.is_allowed(&pod_event("logging", "Normal", "Started")));
    }

    #[test]
    fn test_fields_within_a_rule_are_and_combined() {
        let filters = SinkFilter {
            name: "logs".to_string(),
            match_rules: vec![FieldPatterns {
                event_type: "Warning".to_string(),
                kind: "Pod".to_string(),
                ..Default::default()
            }],
            exclude: vec![],
        };
        let rules = RuleSet::compile(Some(&filters)).expect("compile");
        assert!(rules.is_allowed(&pod_event("logging", "Warning", "BackOff")));
        assert!(!rules.is_allowed(&pod_event("logging", "Normal", "BackOff")));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let filters = SinkFilter {
            name: "logs".to_string(),
            match_rules: vec![FieldPatterns {
                reason: "[unclosed".to_string(),
                ..Default::default()
            }],
            exclude: vec![],
        };
        assert!(RuleSet::compile(Some(&filters)).is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty_config() {
        let config = FilterConfig::load(Path::new("/nonexistent/filters.yaml")).expect("load");
        assert!(config.sinks.is_empty());
    }

    #[test]
    fn test_load_and_lookup_by_sink_name() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"
sinks:
  - name: metrics
    exclude:
      - type: Normal
  - name: logs
    match:
      - kind: Pod
        namespace: logging
"#
        )
        .expect("write");

        let config = FilterConfig::load(file.path()).expect("load");
        assert_eq!(config.sinks.len(), 2);

        let metrics = config.sink_filters("metrics").expect("metrics sink");
        assert_eq!(metrics.exclude.len(), 1);
        assert_eq!(metrics.exclude[0].event_type, "Normal");

        let logs = config.sink_filters("logs").expect("logs sink");
        assert_eq!(logs.match_rules[0].kind, "Pod");
        assert!(config.sink_filters("missing").is_none());
    }

    #[test]
    fn test_load_malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "sinks: [{{").expect("write");
        assert!(FilterConfig::load(file.path()).is_err());
    }
}
