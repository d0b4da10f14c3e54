// ABOUTME: HTTP server for the karaoke player
// ABOUTME: Song listing and presigned URL routes, plus static files for the browser UI

use crate::config::Config;
use crate::karaoke::{SongKeyQuery, SongLayout};
use crate::library::SongLibrary;
use crate::storage::S3SongStore;
use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::sync::Arc;
use tower::Service;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

// App state shared across handlers
struct AppState {
    library: SongLibrary,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    layout: SongLayout,
    prefix: String,
}

/// Build the application router. Anything that is not an API route is looked up in `static_dir`.
pub fn router(library: SongLibrary, static_dir: &str) -> Router {
    let state = Arc::new(AppState { library });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(86400));

    Router::new()
        .route("/api/songs", get(handle_list_songs))
        .route("/api/song-url", get(handle_song_url))
        .route("/api/get-song-urls", get(handle_song_urls))
        .route("/health", get(handle_health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(cors)
        .with_state(state)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(S3SongStore::new(&config.storage));
    let library = SongLibrary::new(store, config.layout, config.prefix.clone(), config.presign_expires);
    let app = router(library, &config.static_dir);

    info!(
        "Serving {} songs from s3://{}/{} (static files from {})",
        config.layout, config.storage.bucket, config.prefix, config.static_dir
    );

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Karaoke server running on http://{}", addr);

    // Use hyper's auto builder which supports both HTTP/1 and HTTP/2
    loop {
        let (stream, _) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        };
        let io = TokioIo::new(stream);
        let app = app.clone();

        tokio::spawn(async move {
            let builder = Builder::new(hyper_util::rt::TokioExecutor::new());
            if let Err(e) = builder
                .serve_connection(
                    io,
                    hyper::service::service_fn(move |req| {
                        let mut app = app.clone();
                        async move { app.call(req).await }
                    }),
                )
                .await
            {
                error!("Connection error: {}", e);
            }
        });
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        layout: state.library.layout(),
        prefix: state.library.prefix().to_string(),
    })
}

/// GET /api/songs
async fn handle_list_songs(State(state): State<Arc<AppState>>) -> Response {
    match state.library.list_songs().await {
        Ok(songs) => (StatusCode::OK, Json(songs)).into_response(),
        Err(e) => {
            error!("Error listing songs: {}", e);
            e.into_response()
        }
    }
}

/// GET /api/song-url?key=<archive key>
async fn handle_song_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SongKeyQuery>,
) -> Response {
    match state.library.song_url(query.key.as_deref()).await {
        Ok(signed) => (StatusCode::OK, Json(signed)).into_response(),
        Err(e) => {
            error!("Error generating signed URL: {}", e);
            e.into_response()
        }
    }
}

/// GET /api/get-song-urls?key=<base key>
async fn handle_song_urls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SongKeyQuery>,
) -> Response {
    match state.library.song_urls(query.key.as_deref()).await {
        Ok(signed) => (StatusCode::OK, Json(signed)).into_response(),
        Err(e) => {
            error!("Error generating signed URLs: {}", e);
            e.into_response()
        }
    }
}
