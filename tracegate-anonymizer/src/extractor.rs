use crate::reader::{ReadError, SpanReader};
use std::collections::BTreeMap;
use std::path::Path;
use tracegate_model::{ui, TraceId};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("invalid trace id: {0}")]
    InvalidTraceId(String),
    #[error("no spans found for trace {0}")]
    TraceNotFound(String),
    #[error("failed to write trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize trace: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Re-reads an anonymized capture, keeps the spans of one trace, moves
/// their embedded processes into a shared `p0, p1, …` map and writes the
/// `{"data": [trace]}` document UIs consume.
pub fn extract_trace(
    capture_path: impl AsRef<Path>,
    trace_id: &str,
    output_path: impl AsRef<Path>,
) -> Result<(), ExtractError> {
    let wanted: TraceId = trace_id
        .parse()
        .map_err(|_| ExtractError::InvalidTraceId(trace_id.to_string()))?;

    let mut reader = SpanReader::open(capture_path)?;
    let mut spans = Vec::new();
    while let Some(span) = reader.next_span()? {
        if span.trace_id == wanted {
            spans.push(span);
        }
    }
    if spans.is_empty() {
        return Err(ExtractError::TraceNotFound(trace_id.to_string()));
    }

    let mut processes: BTreeMap<String, ui::Process> = BTreeMap::new();
    let mut keys_by_process: Vec<(ui::Process, String)> = Vec::new();
    let mut ui_spans = Vec::with_capacity(spans.len());
    for span in &spans {
        let mut ui_span = ui::Span::from_domain(span);
        if let Some(process) = ui_span.process.take() {
            let key = match keys_by_process.iter().find(|(p, _)| *p == process) {
                Some((_, key)) => key.clone(),
                None => {
                    let key = format!("p{}", keys_by_process.len());
                    keys_by_process.push((process.clone(), key.clone()));
                    processes.insert(key.clone(), process);
                    key
                }
            };
            ui_span.process_id = Some(key);
        }
        ui_spans.push(ui_span);
    }

    let document = ui::TraceDocument {
        data: vec![ui::Trace {
            trace_id: wanted.to_string(),
            spans: ui_spans,
            processes,
            warnings: None,
        }],
    };
    let content = serde_json::to_string_pretty(&document)?;
    std::fs::write(output_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::CaptureWriter;
    use pretty_assertions::assert_eq;
    use tracegate_model::{Process, Span, SpanId};

    fn span(trace_low: u64, span_id: u64, service: &str) -> Span {
        Span {
            trace_id: TraceId::new(0, trace_low),
            span_id: SpanId(span_id),
            operation_name: format!("op{span_id}"),
            start_time: 1,
            duration: 1,
            process: Some(Process::new(service)),
            ..Default::default()
        }
    }

    #[test]
    fn extracts_one_trace_with_a_shared_process_map() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("anonymized.json");
        let mut writer =
            CaptureWriter::create(&dir.path().join("c.json"), &capture, None).unwrap();
        for span in [
            span(1, 1, "svc-a"),
            span(1, 2, "svc-b"),
            span(1, 3, "svc-a"),
            span(2, 4, "svc-a"),
        ] {
            let ui_span = ui::Span::from_domain(&span);
            writer.write_span(&ui_span, &ui_span).unwrap();
        }
        writer.close().unwrap();

        let output = dir.path().join("trace.json");
        extract_trace(&capture, "0000000000000001", &output).unwrap();

        let document: ui::TraceDocument =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(document.data.len(), 1);
        let trace = &document.data[0];
        assert_eq!(trace.trace_id, "0000000000000001");
        // The span from trace 2 is filtered out.
        assert_eq!(trace.spans.len(), 3);
        // Two distinct processes, shared by key.
        assert_eq!(trace.processes.len(), 2);
        assert_eq!(trace.spans[0].process_id.as_deref(), Some("p0"));
        assert_eq!(trace.spans[1].process_id.as_deref(), Some("p1"));
        assert_eq!(trace.spans[2].process_id.as_deref(), Some("p0"));
        assert!(trace.spans.iter().all(|span| span.process.is_none()));
    }

    #[test]
    fn unknown_trace_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let capture = dir.path().join("anonymized.json");
        let mut writer =
            CaptureWriter::create(&dir.path().join("c.json"), &capture, None).unwrap();
        writer.close().unwrap();
        let err = extract_trace(&capture, "ff", dir.path().join("out.json")).unwrap_err();
        assert!(matches!(err, ExtractError::TraceNotFound(_)));
    }
}
