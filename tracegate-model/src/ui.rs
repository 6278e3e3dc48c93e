//! JSON representation of spans and traces as consumed by trace UIs and by
//! the capture files of the anonymization pipeline. Spans here either embed
//! their process or point into a shared per-trace `processes` map keyed
//! `p0, p1, …`.

use crate::{
    Flags, InvalidId, KeyValue, Log as DomainLog, Process as DomainProcess, RefType,
    Span as DomainSpan, SpanRef, TagValue,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid ui span: {0}")]
pub struct FormatError(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(rename = "type")]
    pub tag_type: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "refType")]
    pub ref_type: String,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    pub fields: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(rename = "serviceName")]
    pub service_name: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
    #[serde(
        rename = "parentSpanID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_span_id: Option<String>,
    #[serde(default)]
    pub flags: u32,
    #[serde(rename = "operationName")]
    pub operation_name: String,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    pub duration: u64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(rename = "processID", default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// A fully assembled trace with spans pointing into the shared process map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    pub spans: Vec<Span>,
    pub processes: BTreeMap<String, Process>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// Top-level `{"data": [trace]}` document emitted by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDocument {
    pub data: Vec<Trace>,
}

impl Tag {
    pub fn from_domain(kv: &KeyValue) -> Self {
        let (tag_type, value) = match &kv.value {
            TagValue::String(s) => ("string", serde_json::Value::from(s.clone())),
            TagValue::Bool(b) => ("bool", serde_json::Value::from(*b)),
            TagValue::Int64(i) => ("int64", serde_json::Value::from(*i)),
            TagValue::Float64(f) => ("float64", serde_json::Value::from(*f)),
            TagValue::Binary(b) => ("binary", serde_json::Value::from(hex::encode(b))),
        };
        Self {
            key: kv.key.clone(),
            tag_type: tag_type.to_string(),
            value,
        }
    }

    pub fn into_domain(self) -> Result<KeyValue, FormatError> {
        let value = match self.tag_type.as_str() {
            "string" => TagValue::String(as_str(&self.key, self.value)?),
            "bool" => TagValue::Bool(
                self.value
                    .as_bool()
                    .ok_or_else(|| FormatError(format!("tag '{}' is not a bool", self.key)))?,
            ),
            "int64" => TagValue::Int64(
                self.value
                    .as_i64()
                    .ok_or_else(|| FormatError(format!("tag '{}' is not an int64", self.key)))?,
            ),
            "float64" => TagValue::Float64(
                self.value
                    .as_f64()
                    .ok_or_else(|| FormatError(format!("tag '{}' is not a float64", self.key)))?,
            ),
            "binary" => {
                let text = as_str(&self.key, self.value)?;
                TagValue::Binary(
                    hex::decode(&text)
                        .map_err(|_| FormatError(format!("tag '{}' is not hex", self.key)))?,
                )
            }
            other => return Err(FormatError(format!("unknown tag type '{other}'"))),
        };
        Ok(KeyValue {
            key: self.key,
            value,
        })
    }
}

fn as_str(key: &str, value: serde_json::Value) -> Result<String, FormatError> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        _ => Err(FormatError(format!("tag '{key}' is not a string"))),
    }
}

impl Process {
    pub fn from_domain(process: &DomainProcess) -> Self {
        Self {
            service_name: process.service_name.clone(),
            tags: process.tags.iter().map(Tag::from_domain).collect(),
        }
    }

    pub fn into_domain(self) -> Result<DomainProcess, FormatError> {
        Ok(DomainProcess {
            service_name: self.service_name,
            tags: self
                .tags
                .into_iter()
                .map(Tag::into_domain)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl Span {
    pub fn from_domain(span: &DomainSpan) -> Self {
        Self {
            trace_id: span.trace_id.to_string(),
            span_id: span.span_id.to_string(),
            parent_span_id: span.parent_span_id.map(|id| id.to_string()),
            flags: span.flags.0,
            operation_name: span.operation_name.clone(),
            references: span
                .references
                .iter()
                .map(|r| Reference {
                    ref_type: match r.ref_type {
                        RefType::ChildOf => "CHILD_OF".to_string(),
                        RefType::FollowsFrom => "FOLLOWS_FROM".to_string(),
                    },
                    trace_id: r.trace_id.to_string(),
                    span_id: r.span_id.to_string(),
                })
                .collect(),
            start_time: span.start_time,
            duration: span.duration,
            tags: span.tags.iter().map(Tag::from_domain).collect(),
            logs: span
                .logs
                .iter()
                .map(|log| LogEntry {
                    timestamp: log.timestamp,
                    fields: log.fields.iter().map(Tag::from_domain).collect(),
                })
                .collect(),
            process_id: None,
            process: span.process.as_ref().map(Process::from_domain),
            warnings: if span.warnings.is_empty() {
                None
            } else {
                Some(span.warnings.clone())
            },
        }
    }

    pub fn into_domain(self) -> Result<DomainSpan, FormatError> {
        let parse_id = |s: &str| s.parse().map_err(|e: InvalidId| FormatError(e.to_string()));
        Ok(DomainSpan {
            trace_id: parse_id(&self.trace_id)?,
            span_id: self
                .span_id
                .parse()
                .map_err(|e: InvalidId| FormatError(e.to_string()))?,
            parent_span_id: self
                .parent_span_id
                .as_deref()
                .map(|s| s.parse().map_err(|e: InvalidId| FormatError(e.to_string())))
                .transpose()?,
            operation_name: self.operation_name,
            references: self
                .references
                .into_iter()
                .map(|r| {
                    let ref_type = match r.ref_type.as_str() {
                        "CHILD_OF" => RefType::ChildOf,
                        "FOLLOWS_FROM" => RefType::FollowsFrom,
                        other => {
                            return Err(FormatError(format!("unknown reference type '{other}'")))
                        }
                    };
                    Ok(SpanRef {
                        ref_type,
                        trace_id: parse_id(&r.trace_id)?,
                        span_id: r
                            .span_id
                            .parse()
                            .map_err(|e: InvalidId| FormatError(e.to_string()))?,
                    })
                })
                .collect::<Result<_, _>>()?,
            flags: Flags(self.flags),
            start_time: self.start_time,
            duration: self.duration,
            tags: self
                .tags
                .into_iter()
                .map(Tag::into_domain)
                .collect::<Result<_, _>>()?,
            logs: self
                .logs
                .into_iter()
                .map(|log| {
                    Ok(DomainLog {
                        timestamp: log.timestamp,
                        fields: log
                            .fields
                            .into_iter()
                            .map(Tag::into_domain)
                            .collect::<Result<_, _>>()?,
                    })
                })
                .collect::<Result<Vec<_>, FormatError>>()?,
            process: self.process.map(Process::into_domain).transpose()?,
            warnings: self.warnings.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SpanId, TraceId};
    use pretty_assertions::assert_eq;

    fn sample_span() -> DomainSpan {
        DomainSpan {
            trace_id: TraceId::new(1, 2),
            span_id: SpanId(3),
            parent_span_id: Some(SpanId(4)),
            operation_name: "op".to_string(),
            references: vec![SpanRef {
                ref_type: RefType::ChildOf,
                trace_id: TraceId::new(1, 2),
                span_id: SpanId(4),
            }],
            flags: Flags(crate::span::FLAG_SAMPLED),
            start_time: 1_000,
            duration: 10,
            tags: vec![KeyValue::bool("error", true), KeyValue::int64("n", 9)],
            logs: vec![DomainLog {
                timestamp: 1_001,
                fields: vec![KeyValue::string("event", "x")],
            }],
            process: Some(DomainProcess {
                service_name: "svc".to_string(),
                tags: vec![KeyValue::string("hostname", "h1")],
            }),
            warnings: vec![],
        }
    }

    #[test]
    fn domain_round_trip() {
        let span = sample_span();
        let ui = Span::from_domain(&span);
        assert_eq!(ui.trace_id, "00000000000000010000000000000002");
        assert_eq!(ui.clone().into_domain().unwrap(), span);
    }

    #[test]
    fn json_field_names_match_ui_schema() {
        let json = serde_json::to_value(Span::from_domain(&sample_span())).unwrap();
        assert!(json.get("traceID").is_some());
        assert!(json.get("spanID").is_some());
        assert!(json.get("parentSpanID").is_some());
        assert!(json.get("operationName").is_some());
        assert_eq!(json["process"]["serviceName"], "svc");
        assert_eq!(json["tags"][0]["type"], "bool");
    }

    #[test]
    fn bad_tag_type_is_rejected() {
        let tag = Tag {
            key: "k".to_string(),
            tag_type: "decimal".to_string(),
            value: serde_json::Value::from(1),
        };
        assert!(tag.into_domain().is_err());
    }
}
