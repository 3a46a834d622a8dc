use axum::Router;
use domain_finops::{FinopsState, handlers};
use utoipa::{Modify, OpenApi};

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix will be added by the `create_router` helper.
pub fn routes(state: FinopsState) -> Router {
    Router::new().merge(handlers::router(state))
}

/// OpenAPI documentation for everything under `/api`
#[derive(OpenApi)]
#[openapi(
    info(title = "Cost Assistant API", description = "Chat with an LLM about your AWS bill"),
    servers((url = "/api")),
    modifiers(&FinopsDocs)
)]
pub struct ApiDoc;

struct FinopsDocs;

impl Modify for FinopsDocs {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(domain_finops::ApiDoc::openapi());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_doc_includes_finops_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/chat"));
        assert!(doc.paths.paths.contains_key("/test-aws"));
        assert_eq!(doc.info.title, "Cost Assistant API");
    }
}
