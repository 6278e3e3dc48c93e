use pretty_assertions::assert_eq;
use tracegate_collector_server::{run, Settings};
use tracegate_launcher::test_server;

#[tokio::test]
async fn startup_works() {
    let (server_settings, base) = test_server::get_test_server_settings();
    let mut settings = Settings::default();
    settings.server = server_settings;
    settings.server.grpc.enabled = false;
    settings.metrics.enabled = false;

    test_server::init_server(move || async move { run(settings).await.unwrap() }, &base).await;

    let response: serde_json::Value = test_server::send_get_request(&base, "/health").await;
    assert_eq!(response, serde_json::json!({"status": "SERVING"}));
}
