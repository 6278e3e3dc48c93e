use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::str::FromStr;
use tracegate_agent_server::{run, Settings};
use tracegate_launcher::test_server;

#[tokio::test]
async fn startup_works() {
    let (server_settings, base) = test_server::get_test_server_settings();
    let mut settings = Settings::default();
    settings.server = server_settings;
    settings.metrics.enabled = false;
    settings.agent.reporter.grpc.collector_endpoint = Some("127.0.0.1:14250".to_string());
    for processor in [
        &mut settings.agent.processors.jaeger_compact,
        &mut settings.agent.processors.jaeger_binary,
        &mut settings.agent.processors.zipkin_compact,
    ] {
        processor.addr = SocketAddr::from_str("127.0.0.1:0").unwrap();
    }

    test_server::init_server(move || async move { run(settings).await.unwrap() }, &base).await;

    let response: serde_json::Value = test_server::send_get_request(&base, "/health").await;
    assert_eq!(response, serde_json::json!({"status": "SERVING"}));
}
