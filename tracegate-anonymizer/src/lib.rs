//! Offline anonymization of captured spans: a lazy JSON-lines reader, a
//! persistent service/operation hash mapping, the anonymizer itself, the
//! capture writers and a UI-format trace extractor.

pub mod anonymizer;
pub mod extractor;
pub mod mapping;
pub mod reader;
pub mod writer;

pub use anonymizer::{Anonymizer, Options};
pub use mapping::Mapping;
pub use reader::{ReadError, SpanReader};
pub use writer::{CaptureWriter, WriteError};
