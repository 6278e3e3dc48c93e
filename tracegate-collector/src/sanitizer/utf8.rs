use super::Sanitizer;
use tracegate_model::{KeyValue, Span, TagValue};

/// Substituted for an operation name that did not decode as valid UTF-8.
pub const INVALID_OPERATION_NAME: &str = "InvalidOperationName";
/// Substituted for a service name that did not decode as valid UTF-8.
pub const INVALID_SERVICE_NAME: &str = "InvalidServiceName";

/// Replaces invalid UTF-8 with deterministic placeholders.
///
/// The wire decoders are tolerant: bad bytes in name slots decode to
/// replacement characters, and string attributes that fail to decode are
/// carried through as binary. This sanitizer applies the policy: operation
/// and service names become their placeholder constants, and affected
/// attribute values are rewritten to `"<key>:<hex bytes>"`, keyed under the
/// original key.
pub struct Utf8Sanitizer;

fn carries_invalid_utf8(text: &str) -> bool {
    text.contains(char::REPLACEMENT_CHARACTER)
}

fn sanitize_tags(tags: &mut [KeyValue]) {
    for tag in tags {
        match &tag.value {
            TagValue::Binary(bytes) => {
                if std::str::from_utf8(bytes).is_err() {
                    tag.value = TagValue::String(format!("{}:{}", tag.key, hex::encode(bytes)));
                }
            }
            TagValue::String(text) => {
                if carries_invalid_utf8(text) {
                    tag.value =
                        TagValue::String(format!("{}:{}", tag.key, hex::encode(text.as_bytes())));
                }
            }
            _ => {}
        }
    }
}

impl Sanitizer for Utf8Sanitizer {
    fn sanitize(&self, mut span: Span) -> Span {
        if carries_invalid_utf8(&span.operation_name) {
            span.operation_name = INVALID_OPERATION_NAME.to_string();
        }
        sanitize_tags(&mut span.tags);
        for log in &mut span.logs {
            sanitize_tags(&mut log.fields);
        }
        if let Some(process) = &mut span.process {
            if carries_invalid_utf8(&process.service_name) {
                process.service_name = INVALID_SERVICE_NAME.to_string();
            }
            sanitize_tags(&mut process.tags);
        }
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracegate_model::Process;

    #[test]
    fn invalid_operation_and_service_names_get_placeholders() {
        let span = Span {
            operation_name: "get \u{fffd}\u{fffd}".to_string(),
            process: Some(Process::new("svc\u{fffd}")),
            ..Default::default()
        };
        let span = Utf8Sanitizer.sanitize(span);
        assert_eq!(span.operation_name, INVALID_OPERATION_NAME);
        assert_eq!(span.process.unwrap().service_name, INVALID_SERVICE_NAME);
    }

    #[test]
    fn valid_names_are_untouched() {
        let span = Span {
            operation_name: "get /".to_string(),
            process: Some(Process::new("svc")),
            ..Default::default()
        };
        let span = Utf8Sanitizer.sanitize(span);
        assert_eq!(span.operation_name, "get /");
        assert_eq!(span.process.unwrap().service_name, "svc");
    }

    #[test]
    fn invalid_binary_attributes_become_keyed_hex_strings() {
        let span = Span {
            tags: vec![
                KeyValue::binary("payload", vec![0xff, 0xfe]),
                KeyValue::binary("ascii", b"fine".to_vec()),
                KeyValue::string("name", "ok"),
            ],
            ..Default::default()
        };
        let span = Utf8Sanitizer.sanitize(span);
        assert_eq!(
            span.tags[0],
            KeyValue::string("payload", "payload:fffe")
        );
        // Valid UTF-8 binaries and plain strings are untouched.
        assert_eq!(span.tags[1], KeyValue::binary("ascii", b"fine".to_vec()));
        assert_eq!(span.tags[2], KeyValue::string("name", "ok"));
    }

    #[test]
    fn lossily_decoded_string_attributes_are_rewritten() {
        let span = Span {
            tags: vec![KeyValue::string("label", "a\u{fffd}b")],
            ..Default::default()
        };
        let span = Utf8Sanitizer.sanitize(span);
        assert_eq!(
            span.tags[0],
            KeyValue::string("label", format!("label:{}", hex::encode("a\u{fffd}b")))
        );
        // A second pass leaves the rewritten ascii value alone.
        let span = Utf8Sanitizer.sanitize(span);
        assert_eq!(
            span.tags[0],
            KeyValue::string("label", format!("label:{}", hex::encode("a\u{fffd}b")))
        );
    }

    #[test]
    fn applies_to_logs_and_process_tags() {
        let span = Span {
            logs: vec![tracegate_model::Log {
                timestamp: 1,
                fields: vec![KeyValue::binary("f", vec![0x80])],
            }],
            process: Some(tracegate_model::Process {
                service_name: "svc".to_string(),
                tags: vec![KeyValue::binary("p", vec![0xc0])],
            }),
            ..Default::default()
        };
        let span = Utf8Sanitizer.sanitize(span);
        assert_eq!(span.logs[0].fields[0], KeyValue::string("f", "f:80"));
        assert_eq!(
            span.process.unwrap().tags[0],
            KeyValue::string("p", "p:c0")
        );
    }
}
