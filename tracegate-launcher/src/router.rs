use actix_web::web::ServiceConfig;
use serde::Serialize;

pub trait HttpRouter {
    fn register_routes(&self, service_config: &mut ServiceConfig);
}

pub fn configure_router<R: HttpRouter>(router: &R) -> impl FnOnce(&mut ServiceConfig) + '_ {
    |service_config| router.register_routes(service_config)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> actix_web::web::Json<impl Serialize> {
    actix_web::web::Json(HealthResponse { status: "SERVING" })
}

/// Registers `GET /health`; test helpers poll it to await startup.
pub fn route_health(service_config: &mut ServiceConfig) {
    service_config.route("/health", actix_web::web::get().to(health));
}
