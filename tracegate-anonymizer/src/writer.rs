use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracegate_model::ui;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write capture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize span: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The configured span cap was hit; the caller exits its loop cleanly.
    #[error("configured span limit reached")]
    MaxSpansReached,
}

// One array-framed output file: `[` + one span per line + `]`.
struct FileFramer {
    writer: BufWriter<File>,
    wrote_any: bool,
}

impl FileFramer {
    fn create(path: &Path) -> Result<Self, std::io::Error> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
            wrote_any: false,
        })
    }

    fn write_span(&mut self, span: &ui::Span) -> Result<(), WriteError> {
        if !self.wrote_any {
            self.writer.write_all(b"[\n")?;
        } else {
            self.writer.write_all(b",\n")?;
        }
        self.wrote_any = true;
        let payload = serde_json::to_vec(span)?;
        self.writer.write_all(&payload)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), std::io::Error> {
        if !self.wrote_any {
            self.writer.write_all(b"[\n")?;
        }
        self.writer.write_all(b"\n]\n")?;
        self.writer.flush()
    }
}

/// Streams every input span to the "captured" file and its anonymized twin
/// to the "anonymized" file. File-create errors are fatal at setup time;
/// the span cap surfaces as [`WriteError::MaxSpansReached`].
pub struct CaptureWriter {
    captured: FileFramer,
    anonymized: FileFramer,
    max_spans: Option<usize>,
    written: usize,
}

impl CaptureWriter {
    pub fn create(
        captured_path: &Path,
        anonymized_path: &Path,
        max_spans: Option<usize>,
    ) -> Result<Self, std::io::Error> {
        Ok(Self {
            captured: FileFramer::create(captured_path)?,
            anonymized: FileFramer::create(anonymized_path)?,
            max_spans,
            written: 0,
        })
    }

    pub fn write_span(
        &mut self,
        original: &ui::Span,
        anonymized: &ui::Span,
    ) -> Result<(), WriteError> {
        if let Some(max_spans) = self.max_spans {
            if self.written >= max_spans {
                return Err(WriteError::MaxSpansReached);
            }
        }
        self.captured.write_span(original)?;
        self.anonymized.write_span(anonymized)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn close(&mut self) -> Result<(), std::io::Error> {
        self.captured.close()?;
        self.anonymized.close()
    }
}
