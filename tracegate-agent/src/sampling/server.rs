use super::ClientConfigManager;
use crate::throttle::Throttler;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state behind the client-facing HTTP routes.
pub struct SamplingState {
    pub manager: Arc<dyn ClientConfigManager>,
    pub throttler: Option<Arc<Throttler>>,
}

#[derive(Debug, Deserialize)]
struct SamplingQuery {
    service: Option<String>,
    // Legacy alias some client libraries still send.
    service_name: Option<String>,
}

async fn get_sampling(
    state: web::Data<SamplingState>,
    query: web::Query<SamplingQuery>,
) -> HttpResponse {
    let query = query.into_inner();
    let Some(service) = query.service.or(query.service_name) else {
        return HttpResponse::BadRequest()
            .content_type("text/plain")
            .body("'service' parameter must be provided");
    };
    match state.manager.get_sampling_strategy(&service).await {
        Ok(strategy) => HttpResponse::Ok().json(strategy),
        Err(err) => {
            tracing::error!(service, error = %err, "sampling strategy query failed");
            HttpResponse::InternalServerError()
                .content_type("text/plain")
                .body(format!("collector error: {err}"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreditsQuery {
    uuid: Option<String>,
    service: Option<String>,
    operations: Option<String>,
}

#[derive(Debug, Serialize)]
struct OperationBalance {
    operation: String,
    balance: f64,
}

#[derive(Debug, Serialize)]
struct CreditsResponse {
    balances: Vec<OperationBalance>,
}

async fn get_credits(
    state: web::Data<SamplingState>,
    query: web::Query<CreditsQuery>,
) -> HttpResponse {
    let Some(throttler) = &state.throttler else {
        return HttpResponse::ServiceUnavailable()
            .content_type("text/plain")
            .body("client throttling is not enabled");
    };
    let query = query.into_inner();
    let (Some(uuid), Some(service)) = (query.uuid, query.service) else {
        return HttpResponse::BadRequest()
            .content_type("text/plain")
            .body("'uuid' and 'service' parameters must be provided");
    };
    let operations = query.operations.unwrap_or_default();
    let balances = operations
        .split(',')
        .filter(|operation| !operation.is_empty())
        .map(|operation| OperationBalance {
            operation: operation.to_string(),
            balance: throttler.withdraw(&service, &uuid, operation),
        })
        .collect();
    HttpResponse::Ok().json(CreditsResponse { balances })
}

pub fn route_sampling(config: &mut web::ServiceConfig, state: Arc<SamplingState>) {
    config
        .app_data(web::Data::from(state))
        .route("/sampling", web::get().to(get_sampling))
        .route("/credits", web::get().to(get_credits));
}
