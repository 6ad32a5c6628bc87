use actix_web::{http::header, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use serde::Deserialize;

use super::error::{ApiError, ApiResult, MISSING_PARAMS_MESSAGE};
use super::state::ApiState;
use crate::generators::{download_name, print_view};
use crate::prompt::{find_sensitive, rejection_message};
use crate::templates::FormData;

/// Body of a generate call. Every field is optional at the wire level so
/// that missing parameters get the service's own error message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub document_type: Option<String>,
    pub document_name: Option<String>,
    pub form_data: Option<FormData>,
    pub existing_document: Option<String>,
    pub follow_up_request: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportBody {
    #[serde(default)]
    pub title: String,
    pub text: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Streams a generated document back as `text/event-stream`.
pub async fn generate_document(
    req: HttpRequest,
    body: web::Json<GenerateBody>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let counter = &state.metrics.generations;

    let (Some(document_type), Some(document_name), Some(form)) = (
        non_empty(&body.document_type),
        non_empty(&body.document_name),
        body.form_data.as_ref(),
    ) else {
        counter.with_label_values(&["invalid"]).inc();
        return Err(ApiError::bad_request(MISSING_PARAMS_MESSAGE));
    };

    if state.rate_limiter.check_key(&client_key(&req)).is_err() {
        counter.with_label_values(&["rate_limited"]).inc();
        return Err(ApiError::too_many_requests());
    }

    let follow_up = body.follow_up_request.as_deref();
    if let Some(keyword) = find_sensitive(form, follow_up) {
        tracing::info!(document_type, keyword, "rejected sensitive request");
        counter.with_label_values(&["rejected"]).inc();
        return Err(ApiError::bad_request(rejection_message(keyword)));
    }

    let template = state.registry.find(document_type);
    let chat = state.prompts.build(
        document_name,
        form,
        template,
        body.existing_document.as_deref(),
        follow_up,
    );

    tracing::info!(
        document_type,
        fields = form.iter().count(),
        follow_up = follow_up.is_some(),
        "generating document"
    );

    let upstream = match state.backend.open_stream(&chat).await {
        Ok(stream) => stream,
        Err(e) => {
            counter.with_label_values(&["upstream_error"]).inc();
            return Err(e.into());
        }
    };
    counter.with_label_values(&["streamed"]).inc();

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(upstream.map(|chunk| chunk.map_err(actix_web::error::ErrorBadGateway))))
}

pub async fn export_pdf(
    body: web::Json<ExportBody>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let counter = &state.metrics.exports;
    let pdf = match state.pdf.generate(&body.text, &body.title).await {
        Ok(pdf) => pdf,
        Err(e) => {
            counter.with_label_values(&["pdf", "error"]).inc();
            return Err(e.into());
        }
    };
    counter.with_label_values(&["pdf", "ok"]).inc();

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(attachment(&download_name(&body.title, "pdf")))
        .body(pdf))
}

pub async fn export_print(
    body: web::Json<ExportBody>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let html = print_view(&body.text, &body.title)?;
    state.metrics.exports.with_label_values(&["print", "ok"]).inc();

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html))
}

fn attachment(file_name: &str) -> header::ContentDisposition {
    header::ContentDisposition {
        disposition: header::DispositionType::Attachment,
        parameters: vec![header::DispositionParam::FilenameExt(header::ExtendedValue {
            charset: header::Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: file_name.as_bytes().to_vec(),
        })],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::core::{AppConfig, GenerationError};
    use crate::gateway::chat::MockChatBackend;
    use actix_web::{http::StatusCode, test, App};
    use bytes::Bytes;
    use std::sync::Arc;

    const EVENTS: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"借款合同\"}}]}\n\ndata: [DONE]\n\n";

    fn state_with(backend: MockChatBackend, burst: u32) -> web::Data<ApiState> {
        let mut config = AppConfig::default();
        config.rate_limit.burst = burst;
        web::Data::new(ApiState::with_backend(config, Arc::new(backend)).unwrap())
    }

    fn streaming_backend() -> MockChatBackend {
        let mut backend = MockChatBackend::new();
        backend.expect_open_stream().returning(|_| {
            Ok(futures::stream::once(async { Ok(Bytes::from_static(EVENTS.as_bytes())) }).boxed())
        });
        backend
    }

    fn generate_request(body: serde_json::Value) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/v1/documents/generate")
            .peer_addr("10.0.0.1:5000".parse().unwrap())
            .set_json(body)
    }

    fn loan_body() -> serde_json::Value {
        serde_json::json!({
            "documentType": "loan-contract",
            "documentName": "借款合同",
            "formData": { "lenderName": "张三", "loanAmount": "100000" }
        })
    }

    #[actix_web::test]
    async fn proxies_event_stream() {
        let app = test::init_service(
            App::new().app_data(state_with(streaming_backend(), 10)).configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, generate_request(loan_body()).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        let body = test::read_body(resp).await;
        assert_eq!(body, Bytes::from_static(EVENTS.as_bytes()));
    }

    #[actix_web::test]
    async fn missing_parameters_are_rejected() {
        let mut backend = MockChatBackend::new();
        backend.expect_open_stream().never();
        let app = test::init_service(App::new().app_data(state_with(backend, 10)).configure(configure_routes)).await;

        let req = generate_request(serde_json::json!({ "documentType": "loan-contract", "formData": {} }));
        let resp = test::call_service(&app, req.to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "缺少必要参数");
    }

    #[actix_web::test]
    async fn sensitive_content_is_rejected_before_upstream() {
        let mut backend = MockChatBackend::new();
        backend.expect_open_stream().never();
        let app = test::init_service(App::new().app_data(state_with(backend, 10)).configure(configure_routes)).await;

        let req = generate_request(serde_json::json!({
            "documentType": "loan-contract",
            "documentName": "借款合同",
            "formData": { "loanPurpose": "用于赌博周转" }
        }));
        let resp = test::call_service(&app, req.to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "检测到敏感内容（\"赌博\"），无法生成相关文书。请修改后重试。");
    }

    #[actix_web::test]
    async fn per_client_rate_limit() {
        let app = test::init_service(
            App::new().app_data(state_with(streaming_backend(), 1)).configure(configure_routes),
        )
        .await;

        let first = test::call_service(&app, generate_request(loan_body()).to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = test::call_service(&app, generate_request(loan_body()).to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: serde_json::Value = test::read_body_json(second).await;
        assert_eq!(body["error"], "请求过于频繁，请稍后再试");

        let other = generate_request(loan_body()).peer_addr("10.0.0.2:5000".parse().unwrap());
        let third = test::call_service(&app, other.to_request()).await;
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn upstream_failures_map_to_fixed_messages() {
        let cases = [
            (GenerationError::QuotaExhausted("credits".into()), StatusCode::PAYMENT_REQUIRED, "服务额度已用完"),
            (GenerationError::RateLimited(String::new()), StatusCode::TOO_MANY_REQUESTS, "请求过于频繁，请稍后再试"),
            (
                GenerationError::Service { status: 503, message: "overloaded".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI生成服务暂时不可用",
            ),
        ];

        for (err, status, message) in cases {
            let mut backend = MockChatBackend::new();
            backend.expect_open_stream().return_once(move |_| Err(err));
            let app = test::init_service(App::new().app_data(state_with(backend, 10)).configure(configure_routes)).await;

            let resp = test::call_service(&app, generate_request(loan_body()).to_request()).await;
            assert_eq!(resp.status(), status);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], message);
        }
    }

    #[actix_web::test]
    async fn print_export_returns_html() {
        let app = test::init_service(
            App::new().app_data(state_with(MockChatBackend::new(), 10)).configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/documents/export/print")
            .set_json(serde_json::json!({ "title": "借款合同", "text": "借款合同\n第一条 <借款金额>" }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("<title>借款合同</title>"));
        assert!(html.contains("第一条 &lt;借款金额&gt;"));
    }
}
