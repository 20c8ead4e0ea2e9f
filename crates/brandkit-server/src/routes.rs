use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use brandkit_core::error::AppError;

use crate::auth::require_api_key;
use crate::dto::{
    CreateProjectRequest, CreateProjectResponse, ErrorResponse, ExportQuery, GenerateRequest,
    GenerationReportResponse, HealthResponse, OutputListResponse, OutputResponse,
    ProfileResponse, ProjectListResponse, ProjectResponse,
};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/projects", post(create_project).get(list_projects))
        .route("/v1/projects/{id}", get(get_project).delete(delete_project))
        .route("/v1/projects/{id}/scan", post(scan_project))
        .route("/v1/projects/{id}/profile", get(get_profile))
        .route("/v1/projects/{id}/generate", post(generate_outputs))
        .route("/v1/projects/{id}/outputs", get(list_outputs))
        .route("/v1/projects/{id}/export", get(export_project))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = CreateProjectResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state
        .pipeline
        .create_project(&body.url, body.name.as_deref())
        .await?;

    let response = CreateProjectResponse {
        project_id: project.id,
    };
    Ok((StatusCode::CREATED, axum::Json(response)))
}

#[utoipa::path(
    get,
    path = "/v1/projects",
    responses(
        (status = 200, description = "All projects, oldest first", body = ProjectListResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.pipeline.list_projects().await?;
    let total = projects.len();

    let response = ProjectListResponse {
        projects: projects.into_iter().map(ProjectResponse::from).collect(),
        total,
    };
    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.pipeline.get_project(id).await?;
    Ok(axum::Json(ProjectResponse::from(project)))
}

#[utoipa::path(
    delete,
    path = "/v1/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project, profile and outputs deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.pipeline.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Scan & profile
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/projects/{id}/scan",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Fresh business profile", body = ProfileResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "A scan is already running", body = ErrorResponse),
        (status = 502, description = "Website unreachable or unusable", body = ErrorResponse),
        (status = 504, description = "Scan timed out", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "profile"
)]
pub async fn scan_project(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.pipeline.scan_website(id).await?;
    Ok(axum::Json(ProfileResponse::from(profile)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}/profile",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Current business profile", body = ProfileResponse),
        (status = 404, description = "Unknown project, or `not_scanned`", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "profile"
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.pipeline.find_profile(id).await? {
        Some(profile) => Ok(axum::Json(ProfileResponse::from(profile)).into_response()),
        None => {
            let body = ErrorResponse {
                error: "not_scanned".to_string(),
                reason: None,
                message: format!("Project {id} has not been scanned yet"),
            };
            Ok((StatusCode::NOT_FOUND, axum::Json(body)).into_response())
        }
    }
}

// ---------------------------------------------------------------------------
// Generation & outputs
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/projects/{id}/generate",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated outputs and per-type failures", body = GenerationReportResponse),
        (status = 400, description = "Unknown output type or language", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 412, description = "Project has no profile yet", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "outputs"
)]
pub async fn generate_outputs(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .pipeline
        .generate_outputs(
            id,
            &body.output_types,
            body.optional_details.unwrap_or_default(),
            &body.language,
        )
        .await?;

    Ok(axum::Json(GenerationReportResponse::from(report)))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}/outputs",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Current outputs by type and language", body = OutputListResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "outputs"
)]
pub async fn list_outputs(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outputs = state.pipeline.get_outputs(id).await?;
    let total = outputs.len();

    let response = OutputListResponse {
        outputs: outputs.into_iter().map(OutputResponse::from).collect(),
        total,
    };
    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/projects/{id}/export",
    params(("id" = Uuid, Path, description = "Project ID"), ExportQuery),
    responses(
        (status = 200, description = "Rendered document with content-disposition"),
        (status = 400, description = "Unsupported format", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 412, description = "Nothing to export", body = ErrorResponse),
        (status = 422, description = "An output cannot be embedded in the format", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer" = [])),
    tag = "outputs"
)]
pub async fn export_project(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let format = query.format.ok_or_else(|| {
        AppError::InvalidInput("Missing 'format' query parameter (pdf, html or docx)".into())
    })?;
    let document = state.pipeline.export_project(id, &format).await?;

    let headers = [
        (header::CONTENT_TYPE, document.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
    ];
    Ok((headers, document.bytes))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Project store unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store();
    let (status, label) = match store.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::warn!(error = %e, store = store.backend(), "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let response = HealthResponse {
        status: label,
        store: store.backend(),
    };
    (status, axum::Json(response))
}
