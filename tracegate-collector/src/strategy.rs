//! File-backed sampling-strategy store: a default strategy plus per-service
//! (and per-operation) overrides, loaded once at startup.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracegate_model::strategy::{
    OperationSamplingStrategy, PerOperationSamplingStrategies, ProbabilisticSamplingStrategy,
    SamplingStrategyResponse,
};

const DEFAULT_SAMPLING_PROBABILITY: f64 = 0.001;

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("failed to read strategies file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse strategies file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown strategy type '{0}'")]
    UnknownType(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StrategiesFile {
    #[serde(default)]
    default_strategy: Option<ServiceStrategy>,
    #[serde(default)]
    service_strategies: Vec<ServiceStrategy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceStrategy {
    #[serde(default)]
    service: Option<String>,
    #[serde(rename = "type")]
    strategy_type: String,
    param: f64,
    #[serde(default)]
    operation_strategies: Vec<OperationStrategy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OperationStrategy {
    operation: String,
    #[serde(rename = "type")]
    strategy_type: String,
    param: f64,
}

/// Immutable store answering `GetSamplingStrategy`; unknown services fall
/// back to the default strategy.
#[derive(Debug)]
pub struct StrategyStore {
    default: SamplingStrategyResponse,
    per_service: HashMap<String, SamplingStrategyResponse>,
}

impl StrategyStore {
    /// Store with only the built-in default (probabilistic 0.001).
    pub fn with_default() -> Self {
        Self {
            default: SamplingStrategyResponse::probabilistic(DEFAULT_SAMPLING_PROBABILITY),
            per_service: HashMap::new(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StrategyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, StrategyError> {
        let file: StrategiesFile = serde_json::from_str(content)?;
        let default = match &file.default_strategy {
            Some(strategy) => build_strategy(strategy)?,
            None => SamplingStrategyResponse::probabilistic(DEFAULT_SAMPLING_PROBABILITY),
        };
        let mut per_service = HashMap::new();
        for strategy in &file.service_strategies {
            let Some(service) = &strategy.service else {
                continue;
            };
            per_service.insert(service.clone(), build_strategy(strategy)?);
        }
        Ok(Self {
            default,
            per_service,
        })
    }

    pub fn get(&self, service_name: &str) -> SamplingStrategyResponse {
        self.per_service
            .get(service_name)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

fn build_strategy(strategy: &ServiceStrategy) -> Result<SamplingStrategyResponse, StrategyError> {
    let mut response = match strategy.strategy_type.as_str() {
        "probabilistic" => SamplingStrategyResponse::probabilistic(strategy.param),
        "ratelimiting" => SamplingStrategyResponse::rate_limiting(strategy.param as i32),
        other => return Err(StrategyError::UnknownType(other.to_string())),
    };
    if !strategy.operation_strategies.is_empty() {
        let mut per_operation = Vec::with_capacity(strategy.operation_strategies.len());
        for operation in &strategy.operation_strategies {
            if operation.strategy_type != "probabilistic" {
                return Err(StrategyError::UnknownType(format!(
                    "{} (operation strategies must be probabilistic)",
                    operation.strategy_type
                )));
            }
            per_operation.push(OperationSamplingStrategy {
                operation: operation.operation.clone(),
                probabilistic_sampling: ProbabilisticSamplingStrategy {
                    sampling_rate: operation.param,
                },
            });
        }
        response.operation_sampling = Some(PerOperationSamplingStrategies {
            default_sampling_probability: match strategy.strategy_type.as_str() {
                "probabilistic" => strategy.param,
                _ => DEFAULT_SAMPLING_PROBABILITY,
            },
            default_lower_bound_traces_per_second: 0.0,
            per_operation_strategies: per_operation,
            default_upper_bound_traces_per_second: None,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tracegate_model::strategy::SamplingStrategyType;

    const STRATEGIES: &str = r#"{
        "default_strategy": {"type": "probabilistic", "param": 0.5},
        "service_strategies": [
            {"service": "foo", "type": "probabilistic", "param": 0.8,
             "operation_strategies": [
                {"operation": "op1", "type": "probabilistic", "param": 0.2}
             ]},
            {"service": "bar", "type": "ratelimiting", "param": 5}
        ]
    }"#;

    #[test]
    fn serves_per_service_strategies_with_default_fallback() {
        let store = StrategyStore::from_json(STRATEGIES).unwrap();

        let foo = store.get("foo");
        assert_eq!(foo.strategy_type, SamplingStrategyType::Probabilistic);
        assert_eq!(foo.probabilistic_sampling.unwrap().sampling_rate, 0.8);
        let operations = foo.operation_sampling.unwrap();
        assert_eq!(operations.default_sampling_probability, 0.8);
        assert_eq!(operations.per_operation_strategies[0].operation, "op1");

        let bar = store.get("bar");
        assert_eq!(bar.strategy_type, SamplingStrategyType::RateLimiting);
        assert_eq!(bar.rate_limiting_sampling.unwrap().max_traces_per_second, 5);

        let unknown = store.get("baz");
        assert_eq!(unknown.probabilistic_sampling.unwrap().sampling_rate, 0.5);
    }

    #[test]
    fn reads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STRATEGIES.as_bytes()).unwrap();
        let store = StrategyStore::from_file(file.path()).unwrap();
        assert_eq!(store.get("bar").strategy_type, SamplingStrategyType::RateLimiting);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = StrategyStore::from_json(
            r#"{"default_strategy": {"type": "adaptive", "param": 1}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, StrategyError::UnknownType(_)));
    }

    #[test]
    fn missing_file_sections_fall_back_to_defaults() {
        let store = StrategyStore::from_json("{}").unwrap();
        assert_eq!(
            store.get("anything").probabilistic_sampling.unwrap().sampling_rate,
            DEFAULT_SAMPLING_PROBABILITY
        );
    }
}
