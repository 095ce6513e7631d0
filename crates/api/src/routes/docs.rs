//! Interactive API documentation.
//!
//! The OpenAPI document is compiled into the binary and served as-is;
//! `/api-docs` renders it with Swagger UI loaded from a CDN.

use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse};
use axum::{routing::get, Router};

use crate::state::AppState;

/// OpenAPI 3 description of every route.
pub const OPENAPI_YAML: &str = include_str!("../../openapi.yaml");

const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Song Management API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        html { box-sizing: border-box; overflow-y: scroll; }
        *, *:before, *:after { box-sizing: inherit; }
        body { margin: 0; background: #fafafa; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: '/api-docs/openapi.yaml',
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                plugins: [
                    SwaggerUIBundle.plugins.DownloadUrl
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;

/// GET /api-docs
async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

/// GET /api-docs/openapi.yaml
async fn openapi_document() -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/yaml")], OPENAPI_YAML)
}

/// Mount documentation routes at root level.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api-docs", get(swagger_ui))
        .route("/api-docs/", get(swagger_ui))
        .route("/api-docs/openapi.yaml", get(openapi_document))
}
