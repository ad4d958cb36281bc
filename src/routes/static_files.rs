//! Static File Serving
//!
//! Serves the built frontend. API routes take precedence; everything else
//! falls through to the asset directory, with index.html for SPA routing.

use axum::Router;
use std::path::PathBuf;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Locate the frontend build directory.
fn get_static_dir() -> PathBuf {
    let paths = [
        PathBuf::from("client/dist"),
        PathBuf::from("../client/dist"),
        PathBuf::from("static"),
    ];

    for path in paths {
        if path.exists() && path.is_dir() {
            info!(path = %path.display(), "Found static files directory");
            return path;
        }
    }

    warn!("Static files directory not found, frontend may not be built");
    PathBuf::from("client/dist")
}

pub fn router() -> Router {
    let static_dir = get_static_dir();

    let serve_dir = ServeDir::new(&static_dir).append_index_html_on_directories(true);

    Router::new().fallback_service(serve_dir)
}
