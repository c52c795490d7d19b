//! OpenAPI documentation, served at `/api/openapi.json` and browsable under `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use scanvault_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scanvault API",
        version = "0.1.0",
        description = "Document upload with content deduplication and asynchronous malware analysis. Uploaded documents start pending and become clean or infected once the scanner has answered."
    ),
    paths(
        handlers::documents::upload_document,
        handlers::documents::get_document,
        handlers::health::ping,
        handlers::health::health_check,
        handlers::health::stalled_analyses,
    ),
    components(
        schemas(
            models::AnalysisStatus,
            models::DocumentResponse,
            models::HealthReport,
            models::StalledAnalysis,
            handlers::documents::UploadResponse,
            handlers::documents::DocumentFound,
            handlers::health::PingResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "documents", description = "Upload documents and read their analysis status"),
        (name = "health", description = "Backend reachability and stalled analyses")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in ["/documents", "/documents/{id}", "/ping", "/health", "/analyses/stalled"] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
