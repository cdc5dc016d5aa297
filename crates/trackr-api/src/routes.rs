//! HTTP ハンドラーとルーター
//!
//! 成功時は `{"success": true, "data": ...}` で包む。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use trackr_core::ServiceError;
use trackr_core::domain::{Page, ProjectId, ReportId, ReportType};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::ApiState;

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(Envelope { success: true, data })).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReportBody {
    report_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    skip: Option<u32>,
    take: Option<u32>,
}

/// 空のボディは `{}` とみなす。reportType がなければ WEEKLY
fn parse_report_type(body: &[u8]) -> Result<ReportType, ServiceError> {
    let body: CreateReportBody = if body.iter().all(u8::is_ascii_whitespace) {
        CreateReportBody::default()
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::Validation(format!("Invalid request body: {e}")))?
    };

    match body.report_type {
        None => Ok(ReportType::default()),
        Some(raw) => raw
            .parse::<ReportType>()
            .map_err(|e| ServiceError::Validation(e.to_string())),
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/reports/projects/{project_id}/reports",
            get(list_reports).post(create_report),
        )
        .route("/reports/projects/{project_id}/summary", get(project_summary))
        .route("/reports/{report_id}", get(get_report))
        .fallback(not_found)
        .with_state(state)
}

/// `prefix` の下にルーターを載せる（`""` や `"/"` ならそのまま）
pub fn router_with_prefix(state: Arc<ApiState>, prefix: &str) -> Router {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        return router(state);
    }
    Router::new()
        .nest(&format!("/{prefix}"), router(state))
        .fallback(not_found)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn create_report(
    State(state): State<Arc<ApiState>>,
    user: AuthUser,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let report_type = parse_report_type(&body)?;
    let project_id = ProjectId::new(project_id);
    debug!(project_id = %project_id, user_id = %user.user_id, %report_type, "create report");

    let report = state
        .reports
        .create(&project_id, &user.user_id, report_type)
        .await?;
    Ok(ok(StatusCode::CREATED, report))
}

async fn list_reports(
    State(state): State<Arc<ApiState>>,
    user: AuthUser,
    Path(project_id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let page = Page::new(params.skip.unwrap_or(0), params.take.unwrap_or(0));

    let reports = state
        .reports
        .find_by_project(&ProjectId::new(project_id), &user.user_id, page)
        .await?;
    Ok(ok(StatusCode::OK, reports))
}

async fn get_report(
    State(state): State<Arc<ApiState>>,
    user: AuthUser,
    Path(report_id): Path<String>,
) -> Result<Response, ApiError> {
    let report = state
        .reports
        .find_by_id(&ReportId::new(report_id), &user.user_id)
        .await?;
    Ok(ok(StatusCode::OK, report))
}

async fn project_summary(
    State(state): State<Arc<ApiState>>,
    user: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Response, ApiError> {
    let summary = state
        .reports
        .get_project_summary(&ProjectId::new(project_id), &user.user_id)
        .await?;
    Ok(ok(StatusCode::OK, summary))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
