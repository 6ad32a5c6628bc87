use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::error::{ApiError, ApiResult};
use super::state::ApiState;
use crate::templates::{categories, Category, NOT_FOUND_MESSAGE};

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
    pub q: Option<String>,
}

pub async fn list_categories() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "categories": categories() }))
}

/// Templates filtered by category id and search term. An unknown category
/// matches nothing.
pub async fn list_templates(
    query: web::Query<TemplateQuery>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let category = match query.category.as_deref().filter(|c| !c.is_empty()) {
        None => None,
        Some(id) => match Category::parse(id) {
            Some(category) => Some(category),
            None => return Ok(HttpResponse::Ok().json(serde_json::json!({ "templates": [] }))),
        },
    };

    let templates = state.registry.filter(category, query.q.as_deref());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "templates": templates })))
}

pub async fn get_template(
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let template = state.registry.find(&id).ok_or_else(|| {
        tracing::debug!(template_id = %id, "unknown template requested");
        ApiError::not_found(NOT_FOUND_MESSAGE)
    })?;

    Ok(HttpResponse::Ok().json(template))
}
