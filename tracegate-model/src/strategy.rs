//! Sampling-strategy variants served back to client libraries. The serde
//! form of these types is the exact JSON the agent's HTTP endpoint returns,
//! so they double as the wire DTOs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingStrategyType {
    #[serde(rename = "PROBABILISTIC")]
    Probabilistic,
    #[serde(rename = "RATE_LIMITING")]
    RateLimiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilisticSamplingStrategy {
    /// Fraction of traces to sample, within [0, 1].
    pub sampling_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitingSamplingStrategy {
    pub max_traces_per_second: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSamplingStrategy {
    pub operation: String,
    pub probabilistic_sampling: ProbabilisticSamplingStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerOperationSamplingStrategies {
    pub default_sampling_probability: f64,
    pub default_lower_bound_traces_per_second: f64,
    #[serde(default)]
    pub per_operation_strategies: Vec<OperationSamplingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_upper_bound_traces_per_second: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingStrategyResponse {
    pub strategy_type: SamplingStrategyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilistic_sampling: Option<ProbabilisticSamplingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limiting_sampling: Option<RateLimitingSamplingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_sampling: Option<PerOperationSamplingStrategies>,
}

impl SamplingStrategyResponse {
    pub fn probabilistic(sampling_rate: f64) -> Self {
        Self {
            strategy_type: SamplingStrategyType::Probabilistic,
            probabilistic_sampling: Some(ProbabilisticSamplingStrategy { sampling_rate }),
            rate_limiting_sampling: None,
            operation_sampling: None,
        }
    }

    pub fn rate_limiting(max_traces_per_second: i32) -> Self {
        Self {
            strategy_type: SamplingStrategyType::RateLimiting,
            probabilistic_sampling: None,
            rate_limiting_sampling: Some(RateLimitingSamplingStrategy {
                max_traces_per_second,
            }),
            operation_sampling: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn probabilistic_json_shape() {
        let json = serde_json::to_value(SamplingStrategyResponse::probabilistic(0.25)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "strategyType": "PROBABILISTIC",
                "probabilisticSampling": {"samplingRate": 0.25},
            })
        );
    }

    #[test]
    fn per_operation_json_shape() {
        let mut response = SamplingStrategyResponse::rate_limiting(100);
        response.operation_sampling = Some(PerOperationSamplingStrategies {
            default_sampling_probability: 0.1,
            default_lower_bound_traces_per_second: 2.0,
            per_operation_strategies: vec![OperationSamplingStrategy {
                operation: "op1".to_string(),
                probabilistic_sampling: ProbabilisticSamplingStrategy { sampling_rate: 0.5 },
            }],
            default_upper_bound_traces_per_second: None,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "strategyType": "RATE_LIMITING",
                "rateLimitingSampling": {"maxTracesPerSecond": 100},
                "operationSampling": {
                    "defaultSamplingProbability": 0.1,
                    "defaultLowerBoundTracesPerSecond": 2.0,
                    "perOperationStrategies": [
                        {"operation": "op1", "probabilisticSampling": {"samplingRate": 0.5}}
                    ],
                },
            })
        );
        let back: SamplingStrategyResponse =
            serde_json::from_value(json).unwrap();
        assert_eq!(back, response);
    }
}
