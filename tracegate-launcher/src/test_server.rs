use crate::settings::ServerSettings;
use reqwest::Url;
use std::{future::Future, net::SocketAddr, str::FromStr, time::Duration};

pub fn get_test_server_settings() -> (ServerSettings, Url) {
    let mut server = ServerSettings::default();
    // Take a random port in range [10000..65535]
    let port = (rand::random::<u16>() % 55535) + 10000;
    server.http.addr = SocketAddr::from_str(&format!("127.0.0.1:{port}")).unwrap();
    server.grpc.enabled = false;
    let base = Url::parse(&format!("http://{}", server.http.addr)).unwrap();
    (server, base)
}

pub async fn init_server<F, R>(run: F, base: &Url)
where
    F: FnOnce() -> R + Send + 'static,
    R: Future<Output = ()> + Send,
{
    tokio::spawn(async move { run().await });

    let client = reqwest::Client::new();
    let health_endpoint = base.join("health").unwrap();
    // Wait for the server to start
    loop {
        if let Ok(response) = client.get(health_endpoint.clone()).send().await {
            if response.status().is_success() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

pub async fn send_get_request<Response: for<'a> serde::Deserialize<'a>>(
    url: &Url,
    route: &str,
) -> Response {
    let response = reqwest::Client::new()
        .get(url.join(route).unwrap())
        .send()
        .await
        .unwrap_or_else(|_| panic!("Failed to send request"));

    if !response.status().is_success() {
        let status = response.status();
        let message = response.text().await.expect("Read body as text");
        panic!("Invalid status code (success expected). Status: {status}. Message: {message}")
    }

    response
        .json()
        .await
        .unwrap_or_else(|_| panic!("Response deserialization failed"))
}
