use crate::mapping::{hash, Mapping};
use std::sync::Arc;
use tracegate_model::{ui, KeyValue, Log, Process, Span, TagValue, STANDARD_TAG_KEYS};

/// What survives anonymization beyond the always-hashed service and
/// operation names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Hash the keys (and string values) of the whitelisted tags instead of
    /// keeping them readable.
    pub hash_standard_tags: bool,
    /// Keep non-whitelisted tags as hashes instead of dropping them.
    pub hash_custom_tags: bool,
    /// Keep logs with hashed fields instead of dropping them.
    pub hash_logs: bool,
    /// Keep process tags hashed instead of dropping them.
    pub hash_process: bool,
}

/// Rewrites spans through the persistent mapping so traces stay
/// correlatable without leaking names.
pub struct Anonymizer {
    mapping: Arc<Mapping>,
    options: Options,
}

impl Anonymizer {
    pub fn new(mapping: Arc<Mapping>, options: Options) -> Self {
        Self { mapping, options }
    }

    /// Returns the anonymized span in UI form, with its process embedded.
    pub fn anonymize_span(&self, span: &Span) -> ui::Span {
        let service_name = span.service_name().to_string();

        let mut tags = Vec::new();
        for tag in &span.tags {
            if STANDARD_TAG_KEYS.contains(&tag.key.as_str()) {
                let tag = normalize_standard_tag(tag);
                tags.push(if self.options.hash_standard_tags {
                    hash_tag(&tag)
                } else {
                    tag
                });
            } else if self.options.hash_custom_tags {
                tags.push(hash_tag(tag));
            }
        }

        let logs = if self.options.hash_logs {
            span.logs
                .iter()
                .map(|log| Log {
                    timestamp: log.timestamp,
                    fields: log.fields.iter().map(hash_tag).collect(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let process = Process {
            service_name: self.mapping.service_hash(&service_name),
            tags: if self.options.hash_process {
                span.process
                    .as_ref()
                    .map(|process| process.tags.iter().map(hash_tag).collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            },
        };

        let anonymized = Span {
            trace_id: span.trace_id,
            span_id: span.span_id,
            parent_span_id: span.parent_span_id,
            operation_name: self.mapping.operation_hash(&service_name, &span.operation_name),
            references: span.references.clone(),
            flags: span.flags,
            start_time: span.start_time,
            duration: span.duration,
            tags,
            logs,
            process: Some(process),
            warnings: Vec::new(),
        };
        ui::Span::from_domain(&anonymized)
    }
}

// The error tag arrives as a bool, a string or an int depending on the
// client library; normalize to a bool before anything else sees it.
fn normalize_standard_tag(tag: &KeyValue) -> KeyValue {
    if tag.key != "error" {
        return tag.clone();
    }
    let value = match &tag.value {
        TagValue::Bool(b) => *b,
        TagValue::String(s) => s == "true",
        TagValue::Int64(i) => *i != 0,
        TagValue::Float64(f) => *f != 0.0,
        TagValue::Binary(_) => true,
    };
    KeyValue::bool("error", value)
}

fn hash_tag(tag: &KeyValue) -> KeyValue {
    let value = match &tag.value {
        TagValue::String(s) => TagValue::String(hash(s)),
        other => other.clone(),
    };
    KeyValue {
        key: hash(&tag.key),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_span() -> Span {
        Span {
            trace_id: tracegate_model::TraceId::new(0, 1),
            span_id: tracegate_model::SpanId(2),
            parent_span_id: None,
            operation_name: "op".to_string(),
            references: Vec::new(),
            flags: Default::default(),
            start_time: 10,
            duration: 5,
            tags: vec![
                KeyValue::bool("error", true),
                KeyValue::string("http.method", "POST"),
                KeyValue::bool("foobar", true),
            ],
            logs: vec![Log {
                timestamp: 11,
                fields: vec![KeyValue::string("event", "x")],
            }],
            process: Some(Process {
                service_name: "frontend".to_string(),
                tags: vec![
                    KeyValue::string("hostname", "h1"),
                    KeyValue::string("ip", "10.0.0.1"),
                    KeyValue::string("client-uuid", "u1"),
                ],
            }),
            warnings: vec!["w".to_string()],
        }
    }

    fn anonymizer(options: Options) -> Anonymizer {
        let dir = tempfile::tempdir().unwrap();
        let mapping = Mapping::load_or_default(dir.path().join("mapping.json")).unwrap();
        Anonymizer::new(Arc::new(mapping), options)
    }

    #[test]
    fn default_options_keep_only_readable_whitelisted_tags() {
        let anonymizer = anonymizer(Options::default());
        let output = anonymizer.anonymize_span(&sample_span());

        let keys: Vec<_> = output.tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["error", "http.method"]);
        assert_eq!(output.tags[0].value, serde_json::Value::from(true));
        assert_eq!(output.tags[1].value, serde_json::Value::from("POST"));
        assert!(output.logs.is_empty());
        assert!(output.process.as_ref().unwrap().tags.is_empty());
        assert!(output.warnings.is_none());
        // Service and operation names are always rewritten.
        assert_ne!(output.operation_name, "op");
        assert_ne!(output.process.as_ref().unwrap().service_name, "frontend");
    }

    #[test]
    fn all_flags_keep_hashed_variants() {
        let anonymizer = anonymizer(Options {
            hash_standard_tags: true,
            hash_custom_tags: true,
            hash_logs: true,
            hash_process: true,
        });
        let output = anonymizer.anonymize_span(&sample_span());

        assert_eq!(output.tags.len(), 3);
        for tag in &output.tags {
            assert_eq!(tag.key.len(), 16, "tag key not hashed: {}", tag.key);
        }
        assert_eq!(output.logs.len(), 1);
        assert_eq!(output.logs[0].fields[0].key.len(), 16);
        assert_eq!(output.process.as_ref().unwrap().tags.len(), 3);
    }

    #[test]
    fn error_tag_is_normalized_to_bool() {
        let anonymizer = anonymizer(Options::default());
        let mut span = sample_span();
        span.tags[0] = KeyValue::string("error", "true");
        let output = anonymizer.anonymize_span(&span);
        assert_eq!(output.tags[0].tag_type, "bool");
        assert_eq!(output.tags[0].value, serde_json::Value::from(true));
    }

    #[test]
    fn output_is_deterministic_for_a_fixed_mapping() {
        let anonymizer = anonymizer(Options::default());
        let span = sample_span();
        let first = serde_json::to_vec(&anonymizer.anonymize_span(&span)).unwrap();
        let second = serde_json::to_vec(&anonymizer.anonymize_span(&span)).unwrap();
        assert_eq!(first, second);
    }
}
