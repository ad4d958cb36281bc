use crate::agents;
use crate::models::{AppState, ErrorResponse, QueryRequest, QueryResult};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::post,
    Json, Router,
};
use tracing::{error, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/query", post(post_query))
        .with_state(state)
}

pub async fn post_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<ResponseJson<QueryResult>, (StatusCode, Json<ErrorResponse>)> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Query is required".to_string(),
            }),
        ));
    }

    info!(query = %query, "Received artwork survey query");

    // Counts toward stats even if the pipeline fails below.
    state.stats.record_query(&query).await;

    match agents::process_query(&state, &query).await {
        Ok(results) => Ok(Json(results)),
        Err(e) => {
            error!(error = %e, query = %query, "Query pipeline failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to process query".to_string(),
                }),
            ))
        }
    }
}
