use super::collector::SpanIngest;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracegate_thrift::{convert, jaeger, zipkin};

/// HTTP counterpart of the gRPC ingest: thrift bodies on `/api/traces`
/// (jaeger batches) and `/api/v1/spans` (legacy zipkin lists).
pub fn route_thrift_ingest(config: &mut web::ServiceConfig, ingest: Arc<SpanIngest>) {
    config
        .app_data(web::Data::from(ingest))
        .route("/api/traces", web::post().to(post_traces))
        .route("/api/v1/spans", web::post().to(post_zipkin_spans));
}

async fn post_traces(ingest: web::Data<SpanIngest>, body: web::Bytes) -> HttpResponse {
    let batch = match jaeger::decode_binary_batch(&body)
        .map_err(tracegate_thrift::DecodeError::from)
        .and_then(convert::batch_to_domain)
    {
        Ok(batch) => batch,
        Err(err) => {
            tracing::error!(error = %err, "rejecting malformed thrift batch");
            return HttpResponse::BadRequest()
                .content_type("text/plain")
                .body(format!("malformed thrift batch: {err}"));
        }
    };
    match ingest.ingest(batch).await {
        Ok(_) => HttpResponse::Accepted().finish(),
        Err(status) => HttpResponse::InternalServerError()
            .content_type("text/plain")
            .body(status.message().to_string()),
    }
}

async fn post_zipkin_spans(ingest: web::Data<SpanIngest>, body: web::Bytes) -> HttpResponse {
    let batches = match zipkin::decode_binary_span_list(&body)
        .map_err(tracegate_thrift::DecodeError::from)
        .and_then(convert::zipkin_to_domain)
    {
        Ok(batches) => batches,
        Err(err) => {
            tracing::error!(error = %err, "rejecting malformed zipkin body");
            return HttpResponse::BadRequest()
                .content_type("text/plain")
                .body(format!("malformed zipkin spans: {err}"));
        }
    };
    for batch in batches {
        if let Err(status) = ingest.ingest(batch).await {
            return HttpResponse::InternalServerError()
                .content_type("text/plain")
                .body(status.message().to_string());
        }
    }
    HttpResponse::Accepted().finish()
}
