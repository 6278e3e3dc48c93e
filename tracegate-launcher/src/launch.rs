use crate::{
    metrics::Metrics,
    router::{configure_router, route_health, HttpRouter},
    settings::{HttpServerSettings, MetricsSettings, ServerSettings},
};
use actix_web::{App, HttpServer};
use std::net::SocketAddr;

pub struct LaunchSettings {
    pub service_name: String,
    pub server: ServerSettings,
    pub metrics: MetricsSettings,
}

/// Runs the enabled listeners until the first one exits, then aborts the
/// rest. The metrics registry is created here and handed to the caller
/// through the `http` router builder beforehand, so `metrics` only controls
/// the exposition listener.
pub async fn launch<R>(
    settings: &LaunchSettings,
    metrics: Option<Metrics>,
    http: R,
    grpc: Option<tonic::transport::server::Router>,
) -> Result<(), anyhow::Error>
where
    R: HttpRouter + Send + Sync + Clone + 'static,
{
    let mut futures = vec![];

    if settings.server.http.enabled {
        let http_server = {
            let http_server_future = http_serve(http, &settings.server.http);
            tokio::spawn(async move { http_server_future.await.map_err(anyhow::Error::msg) })
        };
        futures.push(http_server)
    }

    if settings.server.grpc.enabled {
        let grpc = grpc.ok_or_else(|| anyhow::anyhow!("grpc is enabled but no router given"))?;
        let grpc_server = {
            let grpc_server_future = grpc_serve(grpc, settings.server.grpc.addr);
            tokio::spawn(async move { grpc_server_future.await.map_err(anyhow::Error::msg) })
        };
        futures.push(grpc_server)
    }

    if settings.metrics.enabled {
        let metrics =
            metrics.ok_or_else(|| anyhow::anyhow!("metrics are enabled but not built"))?;
        let addr = settings.metrics.addr;
        futures.push(tokio::spawn(async move {
            metrics.run_server(addr).await?;
            Ok(())
        }));
    }

    let (res, _, others) = futures::future::select_all(futures).await;
    for future in others.into_iter() {
        future.abort()
    }
    res?
}

fn http_serve<R>(http: R, settings: &HttpServerSettings) -> actix_web::dev::Server
where
    R: HttpRouter + Send + Sync + Clone + 'static,
{
    tracing::info!("starting http server on addr {}", settings.addr);

    let json_cfg = actix_web::web::JsonConfig::default().limit(settings.max_body_size);
    HttpServer::new(move || {
        App::new()
            .app_data(json_cfg.clone())
            .configure(configure_router(&http))
            .configure(route_health)
    })
    .bind(settings.addr)
    .expect("failed to bind server")
    .run()
}

fn grpc_serve(
    grpc: tonic::transport::server::Router,
    addr: SocketAddr,
) -> impl futures::Future<Output = Result<(), tonic::transport::Error>> {
    tracing::info!("starting grpc server on addr {addr}");
    grpc.serve(addr)
}
