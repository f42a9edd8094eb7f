use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

async fn health(State(state): State<AppState>) -> axum::response::Response {
    match state.service.ping().await {
        Ok(()) => Json(serde_json::json!({"status": "ok"})).into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unavailable", "error": e.to_string()})),
            )
                .into_response()
        },
    }
}

/// CORS for the configured browser origin. Credentials are only allowed for
/// a concrete origin; `*` opens the API to any origin without them.
fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origin == "*" {
        return cors.allow_origin(AllowOrigin::any());
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => cors.allow_origin(value).allow_credentials(true),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
            cors
        },
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
