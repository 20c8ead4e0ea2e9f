use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Brandkit API",
        version = "0.1.0",
        description = "Scan a business website, generate marketing copy, export it as a document."
    ),
    paths(
        crate::routes::create_project,
        crate::routes::list_projects,
        crate::routes::get_project,
        crate::routes::delete_project,
        crate::routes::scan_project,
        crate::routes::get_profile,
        crate::routes::generate_outputs,
        crate::routes::list_outputs,
        crate::routes::export_project,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CreateProjectRequest,
        crate::dto::CreateProjectResponse,
        crate::dto::ProjectResponse,
        crate::dto::ProjectListResponse,
        crate::dto::StageFailureResponse,
        crate::dto::ProfileResponse,
        crate::dto::ProfileFactsResponse,
        crate::dto::GenerateRequest,
        crate::dto::GenerationReportResponse,
        crate::dto::FailureResponse,
        crate::dto::OutputResponse,
        crate::dto::OutputListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "projects", description = "Project lifecycle"),
        (name = "profile", description = "Website scanning and business profiles"),
        (name = "outputs", description = "Generation and export"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the bearer security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some("API key. Set via BRANDKIT_SERVER_API_KEY."))
                        .build(),
                ),
            );
        }
    }
}
