//! Sampling-strategy and baggage-restriction structs exchanged with the
//! collector over the framed TCP transport, plus conversion into the domain
//! strategy model.

use crate::field_id;
use crate::jaeger::{read_struct_list, write_struct_list};
use thrift::protocol::{
    TFieldIdentifier, TInputProtocol, TOutputProtocol, TStructIdentifier, TType,
};
use tracegate_model::strategy;

pub const STRATEGY_TYPE_PROBABILISTIC: i32 = 0;
pub const STRATEGY_TYPE_RATE_LIMITING: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbabilisticSamplingStrategy {
    pub sampling_rate: f64,
}

impl ProbabilisticSamplingStrategy {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut strategy = Self::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => strategy.sampling_rate = i_prot.read_double()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(strategy)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("ProbabilisticSamplingStrategy"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("samplingRate", TType::Double, 1))?;
        o_prot.write_double(self.sampling_rate)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitingSamplingStrategy {
    pub max_traces_per_second: i16,
}

impl RateLimitingSamplingStrategy {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut strategy = Self::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => strategy.max_traces_per_second = i_prot.read_i16()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(strategy)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("RateLimitingSamplingStrategy"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("maxTracesPerSecond", TType::I16, 1))?;
        o_prot.write_i16(self.max_traces_per_second)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationSamplingStrategy {
    pub operation: String,
    pub probabilistic_sampling: ProbabilisticSamplingStrategy,
}

impl OperationSamplingStrategy {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut strategy = Self::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => strategy.operation = i_prot.read_string()?,
                2 => strategy.probabilistic_sampling = ProbabilisticSamplingStrategy::read(i_prot)?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(strategy)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("OperationSamplingStrategy"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("operation", TType::String, 1))?;
        o_prot.write_string(&self.operation)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "probabilisticSampling",
            TType::Struct,
            2,
        ))?;
        self.probabilistic_sampling.write(o_prot)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerOperationSamplingStrategies {
    pub default_sampling_probability: f64,
    pub default_lower_bound_traces_per_second: f64,
    pub per_operation_strategies: Vec<OperationSamplingStrategy>,
    pub default_upper_bound_traces_per_second: Option<f64>,
}

impl PerOperationSamplingStrategies {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut strategies = Self::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => strategies.default_sampling_probability = i_prot.read_double()?,
                2 => strategies.default_lower_bound_traces_per_second = i_prot.read_double()?,
                3 => {
                    strategies.per_operation_strategies =
                        read_struct_list(i_prot, OperationSamplingStrategy::read)?
                }
                4 => {
                    strategies.default_upper_bound_traces_per_second = Some(i_prot.read_double()?)
                }
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(strategies)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("PerOperationSamplingStrategies"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "defaultSamplingProbability",
            TType::Double,
            1,
        ))?;
        o_prot.write_double(self.default_sampling_probability)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "defaultLowerBoundTracesPerSecond",
            TType::Double,
            2,
        ))?;
        o_prot.write_double(self.default_lower_bound_traces_per_second)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new(
            "perOperationStrategies",
            TType::List,
            3,
        ))?;
        write_struct_list(
            o_prot,
            &self.per_operation_strategies,
            OperationSamplingStrategy::write,
        )?;
        o_prot.write_field_end()?;
        if let Some(upper) = self.default_upper_bound_traces_per_second {
            o_prot.write_field_begin(&TFieldIdentifier::new(
                "defaultUpperBoundTracesPerSecond",
                TType::Double,
                4,
            ))?;
            o_prot.write_double(upper)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplingStrategyResponse {
    pub strategy_type: i32,
    pub probabilistic_sampling: Option<ProbabilisticSamplingStrategy>,
    pub rate_limiting_sampling: Option<RateLimitingSamplingStrategy>,
    pub operation_sampling: Option<PerOperationSamplingStrategies>,
}

impl SamplingStrategyResponse {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut response = Self::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => response.strategy_type = i_prot.read_i32()?,
                2 => {
                    response.probabilistic_sampling =
                        Some(ProbabilisticSamplingStrategy::read(i_prot)?)
                }
                3 => {
                    response.rate_limiting_sampling =
                        Some(RateLimitingSamplingStrategy::read(i_prot)?)
                }
                4 => {
                    response.operation_sampling =
                        Some(PerOperationSamplingStrategies::read(i_prot)?)
                }
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(response)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("SamplingStrategyResponse"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("strategyType", TType::I32, 1))?;
        o_prot.write_i32(self.strategy_type)?;
        o_prot.write_field_end()?;
        if let Some(probabilistic) = &self.probabilistic_sampling {
            o_prot.write_field_begin(&TFieldIdentifier::new(
                "probabilisticSampling",
                TType::Struct,
                2,
            ))?;
            probabilistic.write(o_prot)?;
            o_prot.write_field_end()?;
        }
        if let Some(rate_limiting) = &self.rate_limiting_sampling {
            o_prot.write_field_begin(&TFieldIdentifier::new(
                "rateLimitingSampling",
                TType::Struct,
                3,
            ))?;
            rate_limiting.write(o_prot)?;
            o_prot.write_field_end()?;
        }
        if let Some(operation_sampling) = &self.operation_sampling {
            o_prot.write_field_begin(&TFieldIdentifier::new(
                "operationSampling",
                TType::Struct,
                4,
            ))?;
            operation_sampling.write(o_prot)?;
            o_prot.write_field_end()?;
        }
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }

    /// Lifts the wire struct into the domain strategy model. An unknown
    /// strategy type maps to `Probabilistic{0}`, matching what clients do
    /// with unrecognized variants.
    pub fn into_domain(self) -> strategy::SamplingStrategyResponse {
        let strategy_type = match self.strategy_type {
            STRATEGY_TYPE_RATE_LIMITING => strategy::SamplingStrategyType::RateLimiting,
            _ => strategy::SamplingStrategyType::Probabilistic,
        };
        let mut response = strategy::SamplingStrategyResponse {
            strategy_type,
            probabilistic_sampling: self.probabilistic_sampling.map(|p| {
                strategy::ProbabilisticSamplingStrategy {
                    sampling_rate: p.sampling_rate,
                }
            }),
            rate_limiting_sampling: self.rate_limiting_sampling.map(|r| {
                strategy::RateLimitingSamplingStrategy {
                    max_traces_per_second: r.max_traces_per_second as i32,
                }
            }),
            operation_sampling: self.operation_sampling.map(|o| {
                strategy::PerOperationSamplingStrategies {
                    default_sampling_probability: o.default_sampling_probability,
                    default_lower_bound_traces_per_second: o.default_lower_bound_traces_per_second,
                    per_operation_strategies: o
                        .per_operation_strategies
                        .into_iter()
                        .map(|s| strategy::OperationSamplingStrategy {
                            operation: s.operation,
                            probabilistic_sampling: strategy::ProbabilisticSamplingStrategy {
                                sampling_rate: s.probabilistic_sampling.sampling_rate,
                            },
                        })
                        .collect(),
                    default_upper_bound_traces_per_second: o.default_upper_bound_traces_per_second,
                }
            }),
        };
        if strategy_type == strategy::SamplingStrategyType::Probabilistic
            && response.probabilistic_sampling.is_none()
            && self.strategy_type != STRATEGY_TYPE_PROBABILISTIC
        {
            response.probabilistic_sampling =
                Some(strategy::ProbabilisticSamplingStrategy { sampling_rate: 0.0 });
        }
        response
    }

    pub fn from_domain(domain: &strategy::SamplingStrategyResponse) -> Self {
        Self {
            strategy_type: match domain.strategy_type {
                strategy::SamplingStrategyType::Probabilistic => STRATEGY_TYPE_PROBABILISTIC,
                strategy::SamplingStrategyType::RateLimiting => STRATEGY_TYPE_RATE_LIMITING,
            },
            probabilistic_sampling: domain.probabilistic_sampling.map(|p| {
                ProbabilisticSamplingStrategy {
                    sampling_rate: p.sampling_rate,
                }
            }),
            rate_limiting_sampling: domain.rate_limiting_sampling.map(|r| {
                RateLimitingSamplingStrategy {
                    max_traces_per_second: r.max_traces_per_second as i16,
                }
            }),
            operation_sampling: domain.operation_sampling.as_ref().map(|o| {
                PerOperationSamplingStrategies {
                    default_sampling_probability: o.default_sampling_probability,
                    default_lower_bound_traces_per_second: o.default_lower_bound_traces_per_second,
                    per_operation_strategies: o
                        .per_operation_strategies
                        .iter()
                        .map(|s| OperationSamplingStrategy {
                            operation: s.operation.clone(),
                            probabilistic_sampling: ProbabilisticSamplingStrategy {
                                sampling_rate: s.probabilistic_sampling.sampling_rate,
                            },
                        })
                        .collect(),
                    default_upper_bound_traces_per_second: o.default_upper_bound_traces_per_second,
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaggageRestriction {
    pub baggage_key: String,
    pub max_value_length: i32,
}

impl BaggageRestriction {
    pub fn read(i_prot: &mut dyn TInputProtocol) -> thrift::Result<Self> {
        let mut restriction = Self::default();
        i_prot.read_struct_begin()?;
        loop {
            let field = i_prot.read_field_begin()?;
            if field.field_type == TType::Stop {
                break;
            }
            match field_id(&field)? {
                1 => restriction.baggage_key = i_prot.read_string()?,
                2 => restriction.max_value_length = i_prot.read_i32()?,
                _ => i_prot.skip(field.field_type)?,
            }
            i_prot.read_field_end()?;
        }
        i_prot.read_struct_end()?;
        Ok(restriction)
    }

    pub fn write(&self, o_prot: &mut dyn TOutputProtocol) -> thrift::Result<()> {
        o_prot.write_struct_begin(&TStructIdentifier::new("BaggageRestriction"))?;
        o_prot.write_field_begin(&TFieldIdentifier::new("baggageKey", TType::String, 1))?;
        o_prot.write_string(&self.baggage_key)?;
        o_prot.write_field_end()?;
        o_prot.write_field_begin(&TFieldIdentifier::new("maxValueLength", TType::I32, 2))?;
        o_prot.write_i32(self.max_value_length)?;
        o_prot.write_field_end()?;
        o_prot.write_field_stop()?;
        o_prot.write_struct_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use thrift::protocol::{TBinaryInputProtocol, TBinaryOutputProtocol};

    #[test]
    fn response_round_trip_and_domain_lift() {
        let response = SamplingStrategyResponse {
            strategy_type: STRATEGY_TYPE_RATE_LIMITING,
            probabilistic_sampling: None,
            rate_limiting_sampling: Some(RateLimitingSamplingStrategy {
                max_traces_per_second: 50,
            }),
            operation_sampling: Some(PerOperationSamplingStrategies {
                default_sampling_probability: 0.01,
                default_lower_bound_traces_per_second: 1.0,
                per_operation_strategies: vec![OperationSamplingStrategy {
                    operation: "op".to_string(),
                    probabilistic_sampling: ProbabilisticSamplingStrategy { sampling_rate: 0.9 },
                }],
                default_upper_bound_traces_per_second: None,
            }),
        };
        let mut buf = Vec::new();
        response
            .write(&mut TBinaryOutputProtocol::new(&mut buf, true))
            .unwrap();
        let mut reader = buf.as_slice();
        let decoded =
            SamplingStrategyResponse::read(&mut TBinaryInputProtocol::new(&mut reader, true))
                .unwrap();
        assert_eq!(decoded, response);

        let domain = decoded.into_domain();
        assert_eq!(
            domain.strategy_type,
            strategy::SamplingStrategyType::RateLimiting
        );
        assert_eq!(
            domain.rate_limiting_sampling.unwrap().max_traces_per_second,
            50
        );
        assert_eq!(
            domain
                .operation_sampling
                .unwrap()
                .per_operation_strategies[0]
                .operation,
            "op"
        );
    }

    #[test]
    fn unknown_strategy_type_becomes_probabilistic_zero() {
        let response = SamplingStrategyResponse {
            strategy_type: 99,
            ..Default::default()
        };
        let domain = response.into_domain();
        assert_eq!(
            domain.strategy_type,
            strategy::SamplingStrategyType::Probabilistic
        );
        assert_eq!(domain.probabilistic_sampling.unwrap().sampling_rate, 0.0);
    }
}
