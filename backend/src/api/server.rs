//! HTTP Server for the swimroll API.
//!
//! Each upload opens a session that owns its roster until it is deleted.
//!
//! # API Endpoints
//!
//! | Method | Path                              | Description                     |
//! |--------|-----------------------------------|---------------------------------|
//! | GET    | `/health`                         | Health check                    |
//! | GET    | `/api/logs`                       | SSE stream for real-time logs   |
//! | GET    | `/api/template`                   | Blank roster template (xlsx)    |
//! | POST   | `/api/sessions`                   | Upload a roster                 |
//! | DELETE | `/api/sessions/{id}`              | Discard a session               |
//! | GET    | `/api/sessions/{id}/classes`      | Class list                      |
//! | GET    | `/api/sessions/{id}/rows`         | Filtered view of one class      |
//! | PUT    | `/api/sessions/{id}/rows/{row}`   | Edit participation and level    |
//! | GET    | `/api/sessions/{id}/stats`        | Per-class tallies               |
//! | GET    | `/api/sessions/{id}/export`       | One class as xlsx               |
//! | GET    | `/api/sessions/{id}/bundle`       | Every class as a zip archive    |

use axum::{
    extract::{
        multipart::Multipart,
        rejection::JsonRejection,
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{delete, get, post, put},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{
    error_response, ClassQuery, ClassesResponse, EditRequest, EditResponse, SelectorOptions,
    StatsResponse, UploadResponse, ViewQuery, ViewResponse,
};
use crate::config::{self, ServerConfig};
use crate::error::{ExportError, ServerError, ServerResult};
use crate::export::{export_bundle, export_class, write_template};
use crate::pipeline::load_roster_bytes;
use crate::session::{Session, SessionRegistry};
use crate::stats::{all_class_stats, class_stats, ClassStats};
use crate::view::{apply_edit, project, RowEdit};

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared handler state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            registry: SessionRegistry::new(),
            config,
        }
    }
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Parse(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Session(_) => StatusCode::NOT_FOUND,
            ServerError::Export(ExportError::EmptyClass(_)) => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Export(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_error(format!("{} {}", status.as_u16(), self));
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/logs", get(sse_logs))
        .route("/api/template", get(download_template))
        .route("/api/sessions", post(upload_roster))
        .route("/api/sessions/{id}", delete(delete_session))
        .route("/api/sessions/{id}/classes", get(list_classes))
        .route("/api/sessions/{id}/rows", get(view_rows))
        .route("/api/sessions/{id}/rows/{row}", put(edit_row))
        .route("/api/sessions/{id}/stats", get(session_stats))
        .route("/api/sessions/{id}/export", get(export_session_class))
        .route("/api/sessions/{id}/bundle", get(export_session_bundle))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let app = router(AppState::new(config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Swimroll server running on http://localhost:{}", port);
    println!("   POST /api/sessions              - Upload roster (xlsx/csv)");
    println!("   GET  /api/sessions/{{id}}/rows    - Class view");
    println!("   GET  /api/sessions/{{id}}/export  - Class xlsx");
    println!("   GET  /api/sessions/{{id}}/bundle  - All classes (zip)");
    println!("   GET  /api/template              - Blank template");
    println!("   GET  /api/logs                  - SSE log stream");
    println!("   GET  /health                    - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "swimroll",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len().await,
        "endpoints": {
            "upload": "POST /api/sessions",
            "template": "GET /api/template",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Blank template endpoint
async fn download_template(State(state): State<AppState>) -> ServerResult<Response> {
    let bytes = write_template(state.config.template_rows)?;
    download(bytes, config::XLSX_MIME, config::TEMPLATE_FILE_NAME)
}

/// Upload roster endpoint
async fn upload_roster(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let limit = state.config.max_upload_bytes;
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, limit))? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(field.bytes().await.map_err(|e| multipart_error(e, limit))?.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    Ok(Json(create_session(&state, &bytes, file_name).await?))
}

fn multipart_error(err: axum::extract::multipart::MultipartError, limit: usize) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(limit)
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", err.body_text()))
    }
}

/// Load uploaded bytes into a new session.
pub async fn create_session(
    state: &AppState,
    bytes: &[u8],
    file_name: Option<String>,
) -> ServerResult<UploadResponse> {
    if bytes.len() > state.config.max_upload_bytes {
        return Err(ServerError::PayloadTooLarge(state.config.max_upload_bytes));
    }

    log_info(format!(
        "📄 New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let loaded = load_roster_bytes(bytes, file_name.as_deref())?;
    let warnings = loaded.report.warnings();
    let session = state.registry.insert(Session::new(loaded, file_name)).await;

    Ok(UploadResponse {
        status: if warnings.is_empty() { "ready" } else { "warning" }.to_string(),
        session,
        warnings,
    })
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Value>> {
    state.registry.remove(&id).await?;
    log_info(format!("🗑️  Session {} closed", id));
    Ok(Json(json!({ "status": "ok", "sessionId": id })))
}

async fn list_classes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ClassesResponse>> {
    let classes = state
        .registry
        .with_session(&id, |s| s.roster.list_classes())
        .await?;
    Ok(Json(ClassesResponse {
        session_id: id,
        classes,
    }))
}

async fn view_rows(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ServerResult<Json<ViewResponse>> {
    let class_id = query
        .class
        .ok_or_else(|| ServerError::BadRequest("Missing 'class' parameter".into()))?;
    let response = state
        .registry
        .with_session(&id, |s| -> ServerResult<ViewResponse> {
            s.require_class(&class_id)?;
            Ok(ViewResponse {
                rows: project(&s.roster, &class_id, query.name.as_deref()),
                stats: class_stats(&s.roster.class_roster(&class_id)),
                options: SelectorOptions::default(),
                class_id: class_id.clone(),
            })
        })
        .await??;
    Ok(Json(response))
}

async fn edit_row(
    State(state): State<AppState>,
    Path((id, row)): Path<(String, usize)>,
    payload: Result<Json<EditRequest>, JsonRejection>,
) -> ServerResult<Json<EditResponse>> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let edit = RowEdit::from(request);

    let response = state
        .registry
        .with_session_mut(&id, |s| -> ServerResult<EditResponse> {
            let row = apply_edit(&mut s.roster, row, edit)?;
            let class_id = s
                .roster
                .get(row.row)
                .map(|r| r.class_id.clone())
                .unwrap_or_default();
            let stats = class_stats(&s.roster.class_roster(&class_id));
            Ok(EditResponse { row, stats })
        })
        .await??;

    log_info(format!(
        "✏️  Row {} set to {} / {}",
        response.row.row,
        response.row.participation,
        response.row.level.map(|l| l.to_string()).unwrap_or_else(|| "-".into())
    ));
    Ok(Json(response))
}

async fn session_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ClassQuery>,
) -> ServerResult<Json<StatsResponse>> {
    let classes = state
        .registry
        .with_session(&id, |s| -> ServerResult<Vec<ClassStats>> {
            match &query.class {
                Some(class_id) => {
                    s.require_class(class_id)?;
                    Ok(vec![class_stats(&s.roster.class_roster(class_id))])
                }
                None => Ok(all_class_stats(&s.roster)),
            }
        })
        .await??;
    Ok(Json(StatsResponse {
        session_id: id,
        classes,
    }))
}

async fn export_session_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ClassQuery>,
) -> ServerResult<Response> {
    let class_id = query
        .class
        .ok_or_else(|| ServerError::BadRequest("Missing 'class' parameter".into()))?;

    let bytes = state
        .registry
        .with_session(&id, |s| export_class(&s.roster, &class_id))
        .await??;
    download(bytes, config::XLSX_MIME, &config::class_file_name(&class_id))
}

async fn export_session_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Response> {
    let summary = state
        .registry
        .with_session(&id, |s| export_bundle(&s.roster))
        .await??;
    download(summary.bytes, config::ZIP_MIME, config::BUNDLE_FILE_NAME)
}

/// Attachment response with an RFC 5987 encoded file name.
fn download(bytes: Vec<u8>, mime: &'static str, file_name: &str) -> ServerResult<Response> {
    let disposition = format!("attachment; filename*=UTF-8''{}", urlencoding::encode(file_name));
    let disposition =
        HeaderValue::from_str(&disposition).map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(mime)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, SessionError};
    use crate::models::{Level, Participation};
    use crate::parser::parse_workbook;
    use axum::body::to_bytes;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    const ROSTER: &str = "班級,座號,姓名,參加意願,級數\n\
                          1A,5,Alice,參加,3\n\
                          1A,2,Bob,不參加,2\n\
                          2B,1,Cara,,1\n";

    async fn session(state: &AppState) -> String {
        create_session(state, ROSTER.as_bytes(), Some("roster.csv".into()))
            .await
            .unwrap()
            .session
            .session_id
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_upload_creates_session() {
        let state = AppState::default();
        let upload = create_session(&state, ROSTER.as_bytes(), None).await.unwrap();

        assert_eq!(upload.status, "ready");
        assert_eq!(upload.session.classes, vec!["1A", "2B"]);
        assert_eq!(upload.session.row_count, 3);
        assert_eq!(state.registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_upload_errors() {
        let state = AppState::default();
        let err = create_session(&state, b"", None).await.unwrap_err();
        assert!(matches!(err, ServerError::Parse(ParseError::EmptyFile)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let small = AppState::new(ServerConfig {
            max_upload_bytes: 8,
            ..ServerConfig::default()
        });
        let err = create_session(&small, ROSTER.as_bytes(), None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_view_filters_by_name() {
        let state = AppState::default();
        let id = session(&state).await;

        let Json(view) = view_rows(
            State(state.clone()),
            Path(id),
            Query(ViewQuery {
                class: Some("1A".into()),
                name: Some("ali".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].name, "Alice");
        assert_eq!(view.stats.total, 2);
        assert_eq!(view.stats.joined, 1);
    }

    #[tokio::test]
    async fn test_view_unknown_class_and_session() {
        let state = AppState::default();
        let id = session(&state).await;

        let err = view_rows(
            State(state.clone()),
            Path(id),
            Query(ViewQuery {
                class: Some("9Z".into()),
                name: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Session(SessionError::UnknownClass(_))));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = list_classes(State(state), Path("missing".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_updates_row_and_stats() {
        let state = AppState::default();
        let id = session(&state).await;

        let request = EditRequest {
            participation: Participation::Joining,
            level: Level::new(4),
        };
        let Json(edited) = edit_row(State(state.clone()), Path((id.clone(), 1)), Ok(Json(request)))
            .await
            .unwrap();

        assert_eq!(edited.row.name, "Bob");
        assert_eq!(edited.row.level, Level::new(4));
        assert_eq!(edited.stats.joined, 2);
        assert_eq!(edited.stats.level_counts, [0, 0, 0, 1, 1, 0]);

        let missing = edit_row(State(state), Path((id, 99)), Ok(Json(request)))
            .await
            .unwrap_err();
        assert!(matches!(missing, ServerError::Session(SessionError::RowNotFound(99))));
    }

    #[tokio::test]
    async fn test_stats_all_and_single() {
        let state = AppState::default();
        let id = session(&state).await;

        let Json(all) = session_stats(State(state.clone()), Path(id.clone()), Query(ClassQuery::default()))
            .await
            .unwrap();
        assert_eq!(all.classes.len(), 2);

        let Json(one) = session_stats(
            State(state),
            Path(id),
            Query(ClassQuery {
                class: Some("2B".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(one.classes.len(), 1);
        assert_eq!(one.classes[0].level_counts[1], 1);
    }

    #[tokio::test]
    async fn test_export_download() {
        let state = AppState::default();
        let id = session(&state).await;

        let response = export_session_class(
            State(state),
            Path(id),
            Query(ClassQuery {
                class: Some("1A".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], config::XLSX_MIME);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename*=UTF-8''1A.xlsx"
        );

        let (_, table) = parse_workbook(&body_bytes(response).await).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2][0], "合計");
    }

    #[tokio::test]
    async fn test_bundle_download() {
        let state = AppState::default();
        let id = session(&state).await;

        let response = export_session_bundle(State(state), Path(id)).await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], config::ZIP_MIME);

        let mut archive = ZipArchive::new(Cursor::new(body_bytes(response).await)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut bytes = Vec::new();
        archive.by_name("2B.xlsx").unwrap().read_to_end(&mut bytes).unwrap();
        let (_, table) = parse_workbook(&bytes).unwrap();
        assert_eq!(table.rows[0][2], "Cara");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = AppState::default();
        let id = session(&state).await;

        delete_session(State(state.clone()), Path(id.clone())).await.unwrap();
        let err = delete_session(State(state), Path(id)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_template_download() {
        let response = download_template(State(AppState::default())).await.unwrap();
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename*=UTF-8''%E5%AD%B8"));

        let (sheet, _) = parse_workbook(&body_bytes(response).await).unwrap();
        assert_eq!(sheet, config::TEMPLATE_SHEET_NAME);
    }

    #[test]
    fn test_download_disposition_encodes_file_name() {
        let resp = download(vec![], config::ZIP_MIME, "a b 班.xlsx").unwrap();

        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap(),
            "attachment; filename*=UTF-8''a%20b%20%E7%8F%AD.xlsx"
        );
        assert_eq!(resp.headers()[header::CONTENT_TYPE], config::ZIP_MIME);
    }
}
