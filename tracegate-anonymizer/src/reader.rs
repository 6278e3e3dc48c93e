use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracegate_model::{ui, Span};

/// Malformed capture input. After the first error the reader refuses
/// further reads; a broken frame leaves no way to resynchronize.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read capture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed capture file: {0}")]
    Malformed(String),
    #[error("reader is closed after a previous error")]
    Closed,
}

/// Lazily yields spans from a capture file: a JSON array opened by a `[`
/// line, one span per line with `,` separators, optionally closed by `]`.
pub struct SpanReader {
    lines: std::io::Lines<BufReader<File>>,
    opened: bool,
    finished: bool,
    failed: bool,
}

impl SpanReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            opened: false,
            finished: false,
            failed: false,
        })
    }

    /// `Ok(None)` at clean end of input; the first failure poisons the
    /// reader.
    pub fn next_span(&mut self) -> Result<Option<Span>, ReadError> {
        if self.failed {
            return Err(ReadError::Closed);
        }
        match self.read_one() {
            Ok(span) => Ok(span),
            Err(err) => {
                self.failed = true;
                Err(err)
            }
        }
    }

    fn read_one(&mut self) -> Result<Option<Span>, ReadError> {
        if self.finished {
            return Ok(None);
        }
        if !self.opened {
            let Some(first) = self.lines.next() else {
                return Err(ReadError::Malformed("empty file".to_string()));
            };
            let first = first?;
            if first.trim() != "[" {
                return Err(ReadError::Malformed(
                    "expected the file to begin with '['".to_string(),
                ));
            }
            self.opened = true;
        }
        loop {
            let Some(line) = self.lines.next() else {
                // A crashed capture may be missing the closing bracket;
                // treat end of file as end of data.
                self.finished = true;
                return Ok(None);
            };
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "]" {
                self.finished = true;
                return Ok(None);
            }
            let payload = trimmed.strip_suffix(',').unwrap_or(trimmed);
            let ui_span: ui::Span = serde_json::from_str(payload)
                .map_err(|err| ReadError::Malformed(err.to_string()))?;
            let span = ui_span
                .into_domain()
                .map_err(|err| ReadError::Malformed(err.to_string()))?;
            return Ok(Some(span));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_capture(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const SPAN: &str = r#"{"traceID":"1","spanID":"2","operationName":"op","startTime":1,"duration":2,"process":{"serviceName":"svc","tags":[]}}"#;

    #[test]
    fn reads_spans_lazily() {
        let file = write_capture(&format!("[\n{SPAN},\n{SPAN}\n]\n"));
        let mut reader = SpanReader::open(file.path()).unwrap();
        assert_eq!(
            reader.next_span().unwrap().unwrap().operation_name,
            "op"
        );
        assert!(reader.next_span().unwrap().is_some());
        assert!(reader.next_span().unwrap().is_none());
        // Clean end keeps answering None.
        assert!(reader.next_span().unwrap().is_none());
    }

    #[test]
    fn missing_closing_bracket_is_tolerated() {
        let file = write_capture(&format!("[\n{SPAN}\n"));
        let mut reader = SpanReader::open(file.path()).unwrap();
        assert!(reader.next_span().unwrap().is_some());
        assert!(reader.next_span().unwrap().is_none());
    }

    #[test]
    fn missing_opening_bracket_fails() {
        let file = write_capture(&format!("{SPAN}\n"));
        let mut reader = SpanReader::open(file.path()).unwrap();
        assert!(matches!(
            reader.next_span().unwrap_err(),
            ReadError::Malformed(_)
        ));
    }

    #[test]
    fn first_error_poisons_the_reader() {
        let file = write_capture("[\nnot json,\n");
        let mut reader = SpanReader::open(file.path()).unwrap();
        assert!(matches!(
            reader.next_span().unwrap_err(),
            ReadError::Malformed(_)
        ));
        assert!(matches!(reader.next_span().unwrap_err(), ReadError::Closed));
    }
}
