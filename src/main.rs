use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use intake_core::intake::patient_intake_schema;
use intake_core::{
    CoreConfig, DraftKey, FieldPath, FileDraftStore, FormSchema, FormSession, IntakeError,
    RecordService, SubmitState,
};

/// Application state shared across REST API handlers
///
/// Sessions are kept in a registry keyed by form key, so submit status is
/// observable across requests. Each session carries its own lock; the
/// registry lock is only held to look a session up, never across an
/// operation, so a slow submission on one key cannot block other forms.
#[derive(Clone)]
struct AppState {
    sessions: Arc<Mutex<HashMap<DraftKey, Arc<Mutex<FormSession<FileDraftStore>>>>>>,
    schema: Arc<FormSchema>,
    config: CoreConfig,
    records: RecordService,
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    status: String,
}

/// Snapshot of one form session, returned by every form endpoint.
#[derive(Serialize, ToSchema)]
struct FormStateRes {
    key: String,
    section_index: usize,
    section_title: String,
    section_count: usize,
    progress: u8,
    is_first_section: bool,
    is_last_section: bool,
    submit_state: String,
    #[schema(value_type = Object)]
    data: serde_json::Value,
}

#[derive(Deserialize, ToSchema)]
struct SetFieldReq {
    /// Dotted field path, e.g. "emergencyContact.phone"
    path: String,
    /// The new value
    #[schema(value_type = Object)]
    value: serde_json::Value,
}

/// Outcome of a gated navigation attempt.
#[derive(Serialize, ToSchema)]
struct NextRes {
    ok: bool,
    errors: Vec<String>,
    state: FormStateRes,
}

#[derive(Serialize, ToSchema)]
struct SubmitRes {
    /// Identifier of the accepted record
    id: String,
}

#[derive(Serialize, ToSchema)]
struct RecordRes {
    id: String,
    schema: String,
    submitted_at: String,
    #[schema(value_type = Object)]
    data: serde_json::Value,
}

#[derive(Serialize, ToSchema)]
struct ListRecordsRes {
    records: Vec<RecordRes>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_form,
        set_field,
        next_section,
        previous_section,
        reset_form,
        submit_form,
        list_records
    ),
    components(schemas(
        HealthRes,
        FormStateRes,
        SetFieldReq,
        NextRes,
        SubmitRes,
        RecordRes,
        ListRecordsRes
    ))
)]
struct ApiDoc;

/// Main entry point for the Intake REST server
///
/// # Environment Variables
/// - `INTAKE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `INTAKE_DATA_DIR`: Directory for drafts and records (default: "/intake_data")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("intake=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("INTAKE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("INTAKE_DATA_DIR")
        .unwrap_or_else(|_| intake_core::constants::DEFAULT_DATA_DIR.into());

    tracing::info!("++ Starting Intake REST on {}", rest_addr);
    tracing::info!("++ Data directory: {}", data_dir);

    let config = CoreConfig::new(data_dir.into()).map_err(|e| anyhow::anyhow!(e))?;
    let schema = Arc::new(patient_intake_schema().map_err(|e| anyhow::anyhow!(e))?);
    let records = RecordService::new(&config, schema.slug());

    let app = Router::new()
        .route("/health", get(health))
        .route("/forms/:key", get(get_form))
        .route("/forms/:key/fields", put(set_field))
        .route("/forms/:key/next", post(next_section))
        .route("/forms/:key/back", post(previous_section))
        .route("/forms/:key/reset", post(reset_form))
        .route("/forms/:key/submit", post(submit_form))
        .route("/records", get(list_records))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            schema,
            config,
            records,
        });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

type ApiError = (StatusCode, String);

fn bad_key(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

fn map_error(e: IntakeError) -> ApiError {
    match e {
        IntakeError::SubmitInFlight => (StatusCode::CONFLICT, e.to_string()),
        IntakeError::SectionIncomplete { .. } | IntakeError::Submission(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        IntakeError::InvalidInput(_)
        | IntakeError::PathConflict { .. }
        | IntakeError::Key(_)
        | IntakeError::Path(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            tracing::error!("Internal error: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
        }
    }
}

fn state_of(session: &FormSession<FileDraftStore>) -> FormStateRes {
    let submit_state = match session.submit_state() {
        SubmitState::Idle => "idle".to_string(),
        SubmitState::Submitting => "submitting".to_string(),
        SubmitState::Succeeded => "succeeded".to_string(),
        SubmitState::Failed(message) => format!("failed: {message}"),
    };
    FormStateRes {
        key: session.key().to_string(),
        section_index: session.section_index(),
        section_title: session.current_section().title().to_string(),
        section_count: session.schema().section_count(),
        progress: session.progress(),
        is_first_section: session.is_first_section(),
        is_last_section: session.is_last_section(),
        submit_state,
        data: session.data().clone(),
    }
}

/// Looks up the session for `key`, opening it on first use.
async fn session_for(
    state: &AppState,
    key: &str,
) -> Result<Arc<Mutex<FormSession<FileDraftStore>>>, ApiError> {
    let key = DraftKey::new(key).map_err(bad_key)?;
    let mut sessions = state.sessions.lock().await;
    let session = sessions.entry(key.clone()).or_insert_with(|| {
        Arc::new(Mutex::new(FormSession::new(
            FileDraftStore::new(&state.config),
            state.schema.clone(),
            key,
        )))
    });
    Ok(session.clone())
}

/// Runs `f` against the session for `key`.
///
/// The per-session lock is only ever held across an await inside
/// `submit_form`, so contention here means a submission is in flight for
/// this key and the request is refused with 409 rather than queued.
async fn with_session<T>(
    state: &AppState,
    key: &str,
    f: impl FnOnce(&mut FormSession<FileDraftStore>) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let session = session_for(state, key).await?;
    let mut session = session
        .try_lock()
        .map_err(|_| map_error(IntakeError::SubmitInFlight))?;
    f(&mut session)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        status: "ok".into(),
    })
}

#[utoipa::path(
    get,
    path = "/forms/{key}",
    params(("key" = String, Path, description = "Form key")),
    responses(
        (status = 200, description = "Current form state", body = FormStateRes),
        (status = 400, description = "Invalid form key")
    )
)]
/// Current state of a form session
///
/// Opens the session on first access, resuming any persisted draft.
async fn get_form(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FormStateRes>, ApiError> {
    with_session(&state, &key, |session| Ok(Json(state_of(session)))).await
}

#[utoipa::path(
    put,
    path = "/forms/{key}/fields",
    params(("key" = String, Path, description = "Form key")),
    request_body = SetFieldReq,
    responses(
        (status = 200, description = "Field updated", body = FormStateRes),
        (status = 400, description = "Invalid key, path or value"),
        (status = 409, description = "Submission in flight")
    )
)]
/// Update a single field by dotted path
async fn set_field(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetFieldReq>,
) -> Result<Json<FormStateRes>, ApiError> {
    let path = FieldPath::new(&req.path).map_err(bad_key)?;
    with_session(&state, &key, |session| {
        session.update_field(&path, req.value).map_err(map_error)?;
        Ok(Json(state_of(session)))
    })
    .await
}

#[utoipa::path(
    post,
    path = "/forms/{key}/next",
    params(("key" = String, Path, description = "Form key")),
    responses(
        (status = 200, description = "Navigation outcome", body = NextRes),
        (status = 409, description = "Submission in flight")
    )
)]
/// Attempt to advance to the next section
///
/// Advancement is gated on the current section's required fields; the
/// response carries the validation messages either way.
async fn next_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<NextRes>, ApiError> {
    with_session(&state, &key, |session| {
        let outcome = session.next().map_err(map_error)?;
        Ok(Json(NextRes {
            ok: outcome.ok(),
            errors: outcome.errors().to_vec(),
            state: state_of(session),
        }))
    })
    .await
}

#[utoipa::path(
    post,
    path = "/forms/{key}/back",
    params(("key" = String, Path, description = "Form key")),
    responses(
        (status = 200, description = "Moved back", body = FormStateRes),
        (status = 409, description = "Submission in flight")
    )
)]
/// Move back one section
async fn previous_section(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FormStateRes>, ApiError> {
    with_session(&state, &key, |session| {
        session.previous().map_err(map_error)?;
        Ok(Json(state_of(session)))
    })
    .await
}

#[utoipa::path(
    post,
    path = "/forms/{key}/reset",
    params(("key" = String, Path, description = "Form key")),
    responses(
        (status = 200, description = "Form reset", body = FormStateRes)
    )
)]
/// Clear a form's draft and start over
async fn reset_form(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FormStateRes>, ApiError> {
    with_session(&state, &key, |session| {
        session.reset();
        Ok(Json(state_of(session)))
    })
    .await
}

#[utoipa::path(
    post,
    path = "/forms/{key}/submit",
    params(("key" = String, Path, description = "Form key")),
    responses(
        (status = 200, description = "Submission accepted", body = SubmitRes),
        (status = 409, description = "Submission in flight"),
        (status = 422, description = "Final section incomplete or submission rejected")
    )
)]
/// Submit a completed form
///
/// Runs the full pipeline: final-section validation, payload normalisation,
/// record creation, draft clearance. On failure the draft survives and the
/// rejection message is surfaced verbatim.
async fn submit_form(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SubmitRes>, ApiError> {
    let session = session_for(&state, &key).await?;
    let mut session = session
        .try_lock()
        .map_err(|_| map_error(IntakeError::SubmitInFlight))?;

    let record = session.submit(&state.records).await.map_err(map_error)?;
    Ok(Json(SubmitRes { id: record.id }))
}

#[utoipa::path(
    get,
    path = "/records",
    responses(
        (status = 200, description = "All submitted records, newest first", body = ListRecordsRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List all submitted records
async fn list_records(State(state): State<AppState>) -> Result<Json<ListRecordsRes>, ApiError> {
    let records = state.records.list_records().map_err(map_error)?;
    Ok(Json(ListRecordsRes {
        records: records
            .into_iter()
            .map(|r| RecordRes {
                id: r.id,
                schema: r.schema,
                submitted_at: r.submitted_at.to_rfc3339(),
                data: r.data,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_state(temp_dir: &TempDir) -> AppState {
        let config = CoreConfig::new(temp_dir.path().to_path_buf()).expect("config should build");
        let schema = Arc::new(patient_intake_schema().expect("schema should build"));
        let records = RecordService::new(&config, schema.slug());
        AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            schema,
            config,
            records,
        }
    }

    #[tokio::test]
    async fn test_busy_session_conflicts_without_blocking_other_keys() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir);

        // Hold one session's lock, as an in-flight submit would.
        let busy = session_for(&state, "f1").await.expect("session should open");
        let _guard = busy.try_lock().expect("lock should be free");

        let err = with_session(&state, "f1", |_| Ok(()))
            .await
            .expect_err("requests against a busy key should be refused");
        assert_eq!(err.0, StatusCode::CONFLICT);

        with_session(&state, "f2", |session| {
            assert_eq!(session.section_index(), 0);
            Ok(())
        })
        .await
        .expect("other keys should stay responsive");
    }

    #[tokio::test]
    async fn test_sessions_are_reused_across_requests() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir);

        let first = session_for(&state, "f1").await.expect("session should open");
        let second = session_for(&state, "f1").await.expect("session should open");
        assert!(
            Arc::ptr_eq(&first, &second),
            "the registry should hand out one session per key"
        );
    }
}
