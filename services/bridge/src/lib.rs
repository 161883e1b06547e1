//! HTTP bridge in front of MinIO: audio resources in one bucket, device
//! firmware images and their manifests in another.

pub mod config;
pub mod error;
pub mod multipart;
pub mod routes_files;
pub mod routes_firmware;
pub mod state;
pub mod types_files;
pub mod types_firmware;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::{AppState, SharedState};

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(24 * 60 * 60))
}

pub fn app(state: SharedState) -> Router {
    // binary bodies go out as they are
    let raw = Router::new()
        .route("/upload", post(routes_files::upload_files))
        .route("/download", post(routes_files::download_file))
        .route("/previewFile", get(routes_files::preview_file));

    let compressed = Router::new()
        .route("/delete", delete(routes_files::delete_files))
        .route("/resourceList", post(routes_files::resource_list))
        .route("/createFolder", post(routes_files::create_folder))
        .route("/uploadFirmware", post(routes_firmware::upload_firmware))
        .route("/deleteFirmware", delete(routes_firmware::delete_firmware))
        .route("/getFirmwareList", post(routes_firmware::get_firmware_list))
        .route("/getLatestFirmwares", post(routes_firmware::get_latest_firmwares))
        .layer(CompressionLayer::new());

    let mut router = raw.merge(compressed);
    if let Some(dir) = &state.cfg.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(DefaultBodyLimit::max(state.cfg.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}
