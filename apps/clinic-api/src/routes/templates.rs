//! Service template endpoints
//!
//! - `GET /api/serviceTemplates?category=`
//! - `POST /api/serviceTemplates`, `GET|DELETE /api/serviceTemplates/:id`

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use clinic_db::models::{NewServiceTemplate, ServiceCategory, ServiceTemplate};
use clinic_db::service_templates;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TemplateParams {
    pub category: Option<ServiceCategory>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<TemplateParams>,
) -> ApiResult<Json<Vec<ServiceTemplate>>> {
    let templates = match params.category {
        Some(category) => service_templates::templates_in_category(&state.pool, category).await?,
        None => service_templates::list_templates(&state.pool).await?,
    };
    Ok(Json(templates))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ServiceTemplate>> {
    Ok(Json(service_templates::get_template(&state.pool, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewServiceTemplate>,
) -> ApiResult<(StatusCode, Json<ServiceTemplate>)> {
    form.validate()?;
    let template = ServiceTemplate {
        id: Uuid::new_v4(),
        name: form.name.trim().to_string(),
        category: form.category,
        default_price: form.default_price,
        description: form.description,
    };
    service_templates::insert_template(&state.pool, &template).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    service_templates::delete_template(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
