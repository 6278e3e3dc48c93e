//! Span sanitizers applied to every incoming span before processing. Each
//! sanitizer is a pure span → span function, so the composed chain is
//! idempotent and freely reorderable per concern.

mod service_name;
mod utf8;

pub use service_name::{
    EmptyServiceNameSanitizer, ServiceNameAliasSanitizer, EMPTY_SERVICE_NAME,
    NULL_PROCESS_SERVICE_NAME,
};
pub use utf8::{Utf8Sanitizer, INVALID_OPERATION_NAME, INVALID_SERVICE_NAME};

use std::collections::HashMap;
use std::sync::Arc;
use tracegate_model::Span;

pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, span: Span) -> Span;
}

struct ChainedSanitizer {
    sanitizers: Vec<Arc<dyn Sanitizer>>,
}

impl Sanitizer for ChainedSanitizer {
    fn sanitize(&self, mut span: Span) -> Span {
        for sanitizer in &self.sanitizers {
            span = sanitizer.sanitize(span);
        }
        span
    }
}

/// Composes sanitizers left to right. A single-element chain returns its
/// element directly, skipping the indirection.
pub fn chain(mut sanitizers: Vec<Arc<dyn Sanitizer>>) -> Arc<dyn Sanitizer> {
    if sanitizers.len() == 1 {
        return sanitizers.remove(0);
    }
    Arc::new(ChainedSanitizer { sanitizers })
}

/// The standard ingest chain: service-name defaults, optional alias
/// rewriting, and UTF-8 normalization.
pub fn standard_chain(service_aliases: HashMap<String, String>) -> Arc<dyn Sanitizer> {
    let mut sanitizers: Vec<Arc<dyn Sanitizer>> = vec![Arc::new(EmptyServiceNameSanitizer)];
    if !service_aliases.is_empty() {
        sanitizers.push(Arc::new(ServiceNameAliasSanitizer::new(service_aliases)));
    }
    sanitizers.push(Arc::new(Utf8Sanitizer));
    chain(sanitizers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracegate_model::{KeyValue, Process};

    #[test]
    fn single_element_chain_is_the_element() {
        let only: Arc<dyn Sanitizer> = Arc::new(EmptyServiceNameSanitizer);
        let chained = chain(vec![Arc::clone(&only)]);
        assert!(Arc::ptr_eq(&only, &chained));
    }

    #[test]
    fn standard_chain_is_idempotent() {
        let aliases = HashMap::from([("old-name".to_string(), "new-name".to_string())]);
        let sanitizer = standard_chain(aliases);

        let span = Span {
            operation_name: "op\u{fffd}".to_string(),
            process: Some(Process {
                service_name: "old-name".to_string(),
                tags: vec![KeyValue::binary("blob", vec![0xff, 0xfe])],
            }),
            ..Default::default()
        };
        let once = sanitizer.sanitize(span);
        let twice = sanitizer.sanitize(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.operation_name, INVALID_OPERATION_NAME);
        assert_eq!(once.process.as_ref().unwrap().service_name, "new-name");
    }
}
