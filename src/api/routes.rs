use actix_cors::Cors;
use actix_web::{web, HttpResponse};
use prometheus::{Encoder, TextEncoder};

use super::error::{ApiError, MISSING_PARAMS_MESSAGE};
use super::handlers;
use super::state::ApiState;
use super::template_handler;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health checks
        .route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_endpoint))

        // API v1
        .service(
            web::scope("/api/v1")
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                        .allow_any_header()
                        .max_age(3600),
                )
                .app_data(
                    web::JsonConfig::default()
                        .error_handler(|err, _req| {
                            tracing::debug!(error = %err, "rejected request body");
                            ApiError::bad_request(MISSING_PARAMS_MESSAGE).into()
                        }),
                )
                .route("/categories", web::get().to(template_handler::list_categories))
                .service(
                    web::scope("/templates")
                        .route("", web::get().to(template_handler::list_templates))
                        .route("/{id}", web::get().to(template_handler::get_template)),
                )
                .service(
                    web::scope("/documents")
                        .route("/generate", web::post().to(handlers::generate_document))
                        .route("/export/pdf", web::post().to(handlers::export_pdf))
                        .route("/export/print", web::post().to(handlers::export_print)),
                ),
        );
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

async fn metrics_endpoint(state: web::Data<ApiState>) -> Result<HttpResponse, ApiError> {
    let encoder = TextEncoder::new();
    let mut metric_families = prometheus::gather();
    metric_families.extend(state.metrics.registry.gather());

    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer))
}
