//! In-process collector double speaking the framed TCP protocol, used by
//! reporter, config-manager and agent tests.

use crate::tchannel::frame::{
    self, Frame, FrameCodec, TYPE_CALL_REQ, TYPE_CALL_RES, TYPE_ERROR, TYPE_INIT_REQ,
    TYPE_INIT_RES,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_util::codec::Framed;
use tracegate_thrift::{calls, jaeger, sampling, zipkin};

#[derive(Default)]
struct State {
    fail_submissions: bool,
    batches: Mutex<Vec<jaeger::Batch>>,
    zipkin_spans: Mutex<Vec<zipkin::Span>>,
    strategies: Mutex<HashMap<String, sampling::SamplingStrategyResponse>>,
}

pub struct MockCollector {
    addr: SocketAddr,
    state: Arc<State>,
}

impl MockCollector {
    pub async fn start(fail_submissions: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State {
            fail_submissions,
            ..Default::default()
        });
        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let mut framed = Framed::new(stream, FrameCodec);
                    while let Some(Ok(request)) = framed.next().await {
                        let response = handle_frame(&state, request);
                        if framed.send(response).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        Self { addr, state }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn batches(&self) -> Vec<jaeger::Batch> {
        self.state.batches.lock().unwrap().clone()
    }

    pub fn zipkin_spans(&self) -> Vec<zipkin::Span> {
        self.state.zipkin_spans.lock().unwrap().clone()
    }

    pub fn set_strategy(&self, service: &str, response: sampling::SamplingStrategyResponse) {
        self.state
            .strategies
            .lock()
            .unwrap()
            .insert(service.to_string(), response);
    }
}

fn handle_frame(state: &State, request: Frame) -> Frame {
    match request.frame_type {
        TYPE_INIT_REQ => Frame {
            frame_type: TYPE_INIT_RES,
            id: request.id,
            payload: frame::build_init_payload(&[
                ("host_port", "127.0.0.1:0"),
                ("process_name", "mock-collector"),
            ]),
        },
        TYPE_CALL_REQ => {
            let call = match frame::parse_call_req_payload(request.payload) {
                Ok(call) => call,
                Err(err) => return error_frame(request.id, &err.to_string()),
            };
            let method = String::from_utf8_lossy(&call.arg1).to_string();
            let arg3 = match method.as_str() {
                calls::SUBMIT_BATCHES => {
                    let batches = calls::decode_submit_batches_args(&call.arg3).unwrap();
                    let responses: Vec<_> = batches
                        .iter()
                        .map(|_| jaeger::BatchSubmitResponse {
                            ok: !state.fail_submissions,
                        })
                        .collect();
                    state.batches.lock().unwrap().extend(batches);
                    calls::encode_submit_batches_result(&responses).unwrap()
                }
                calls::SUBMIT_ZIPKIN_BATCH => {
                    let spans = calls::decode_submit_zipkin_batch_args(&call.arg3).unwrap();
                    let responses: Vec<_> = spans
                        .iter()
                        .map(|_| zipkin::Response {
                            ok: !state.fail_submissions,
                        })
                        .collect();
                    state.zipkin_spans.lock().unwrap().extend(spans);
                    calls::encode_submit_zipkin_batch_result(&responses).unwrap()
                }
                calls::GET_SAMPLING_STRATEGY => {
                    let service = calls::decode_get_sampling_strategy_args(&call.arg3).unwrap();
                    let response = state
                        .strategies
                        .lock()
                        .unwrap()
                        .get(&service)
                        .cloned()
                        .unwrap_or_else(|| sampling::SamplingStrategyResponse {
                            strategy_type: sampling::STRATEGY_TYPE_PROBABILISTIC,
                            probabilistic_sampling: Some(
                                sampling::ProbabilisticSamplingStrategy {
                                    sampling_rate: 0.001,
                                },
                            ),
                            ..Default::default()
                        });
                    calls::encode_get_sampling_strategy_result(&response).unwrap()
                }
                calls::GET_BAGGAGE_RESTRICTIONS => {
                    calls::encode_get_baggage_restrictions_result(&[]).unwrap()
                }
                other => return error_frame(request.id, &format!("bad method {other}")),
            };
            Frame {
                frame_type: TYPE_CALL_RES,
                id: request.id,
                payload: frame::build_call_res_payload(&frame::CallResponse {
                    code: 0,
                    headers: vec![(
                        frame::ARG_SCHEME_HEADER.to_string(),
                        frame::ARG_SCHEME_THRIFT.to_string(),
                    )],
                    arg1: Bytes::new(),
                    arg2: Bytes::new(),
                    arg3: arg3.into(),
                })
                .unwrap(),
            }
        }
        other => error_frame(request.id, &format!("unexpected frame type {other:#x}")),
    }
}

fn error_frame(id: u32, message: &str) -> Frame {
    Frame {
        frame_type: TYPE_ERROR,
        id,
        payload: frame::build_error_payload(0x06, message),
    }
}
