use super::Sanitizer;
use std::collections::HashMap;
use tracegate_model::{Process, Span};

/// Placeholder for spans that arrive without a process at all.
pub const NULL_PROCESS_SERVICE_NAME: &str = "null-process-and-service-name";
/// Placeholder for spans whose process carries an empty service name.
pub const EMPTY_SERVICE_NAME: &str = "empty-service-name";

/// Guarantees every span leaves with a non-empty service name so
/// downstream grouping never sees the empty key.
pub struct EmptyServiceNameSanitizer;

impl Sanitizer for EmptyServiceNameSanitizer {
    fn sanitize(&self, mut span: Span) -> Span {
        match &mut span.process {
            None => {
                span.process = Some(Process::new(NULL_PROCESS_SERVICE_NAME));
            }
            Some(process) if process.service_name.is_empty() => {
                process.service_name = EMPTY_SERVICE_NAME.to_string();
            }
            Some(_) => {}
        }
        span
    }
}

/// Rewrites service names through a configured alias map. Only applied when
/// the map is non-empty.
pub struct ServiceNameAliasSanitizer {
    aliases: HashMap<String, String>,
}

impl ServiceNameAliasSanitizer {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }
}

impl Sanitizer for ServiceNameAliasSanitizer {
    fn sanitize(&self, mut span: Span) -> Span {
        if let Some(process) = &mut span.process {
            if let Some(alias) = self.aliases.get(&process.service_name) {
                process.service_name = alias.clone();
            }
        }
        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_process_gets_the_null_placeholder() {
        let span = EmptyServiceNameSanitizer.sanitize(Span::default());
        assert_eq!(
            span.process.unwrap().service_name,
            NULL_PROCESS_SERVICE_NAME
        );
    }

    #[test]
    fn empty_service_name_gets_its_own_placeholder() {
        let span = Span {
            process: Some(Process::new("")),
            ..Default::default()
        };
        let span = EmptyServiceNameSanitizer.sanitize(span);
        assert_eq!(span.process.unwrap().service_name, EMPTY_SERVICE_NAME);
    }

    #[test]
    fn present_names_are_untouched() {
        let span = Span {
            process: Some(Process::new("svc")),
            ..Default::default()
        };
        let span = EmptyServiceNameSanitizer.sanitize(span);
        assert_eq!(span.process.unwrap().service_name, "svc");
    }

    #[test]
    fn aliases_rewrite_only_known_names() {
        let sanitizer = ServiceNameAliasSanitizer::new(HashMap::from([(
            "frontend-canary".to_string(),
            "frontend".to_string(),
        )]));
        let span = Span {
            process: Some(Process::new("frontend-canary")),
            ..Default::default()
        };
        assert_eq!(
            sanitizer.sanitize(span).process.unwrap().service_name,
            "frontend"
        );

        let span = Span {
            process: Some(Process::new("backend")),
            ..Default::default()
        };
        assert_eq!(
            sanitizer.sanitize(span).process.unwrap().service_name,
            "backend"
        );
    }
}
