//! # API REST
//!
//! REST API implementation for Perisentez.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation (served as JSON)
//! - REST-specific concerns (JSON serialization, CORS, session header)
//!
//! Uses `api-shared` for DTOs and sessions and `perisentez-core` for everything else.

#![warn(rust_2018_idioms)]

use api_shared::{
    AssessmentReq, AssessmentRes, ClassProbabilityDto, FindingsRes, HealthRes, HealthService,
    ListRecordsRes, LoginReq, LoginRes, LogoutRes, PredictionFormRes, PredictionReq, RecordRes,
    RegisterReq, RegisterRes, SessionStore, SyndromeScoreDto, SESSION_HEADER,
};
use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use perisentez_core::{
    classifier::ForestModel,
    credentials::CredentialStore,
    records::{NewRecord, RecordService},
    reference::ReferenceData,
    report::{render_prediction_pdf, PredictionReport},
    scoring::assess,
    validation::{validate_model_input, validate_observation},
    CoreConfig, CoreError, CoreResult, NonEmptyText, RecordId, Username,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};

type ApiError = (StatusCode, &'static str);

/// Application state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    reference: Arc<ReferenceData>,
    credentials: Arc<CredentialStore>,
    sessions: Arc<SessionStore>,
    records: RecordService,
    model: Option<Arc<ForestModel>>,
}

impl AppState {
    /// Builds the state from a resolved configuration, loading the classifier if one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured model file cannot be read or is malformed.
    pub fn new(cfg: Arc<CoreConfig>) -> CoreResult<Self> {
        let model = match cfg.model_path() {
            Some(path) => Some(Arc::new(ForestModel::load(path)?)),
            None => {
                tracing::warn!("no prediction model configured; /predictions is disabled");
                None
            }
        };

        Ok(Self {
            reference: Arc::new(ReferenceData::builtin()),
            credentials: Arc::new(CredentialStore::new(&cfg)),
            sessions: Arc::new(SessionStore::new()),
            records: RecordService::new(cfg),
            model,
        })
    }

    pub fn with_credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }

    pub fn with_model(mut self, model: Option<ForestModel>) -> Self {
        self.model = model.map(Arc::new);
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        register,
        login,
        logout,
        list_findings,
        create_assessment,
        create_prediction,
        prediction_form,
        list_records,
        get_record,
        delete_record,
        read_report,
    ),
    components(schemas(
        HealthRes,
        RegisterReq,
        RegisterRes,
        LoginReq,
        LoginRes,
        LogoutRes,
        FindingsRes,
        AssessmentReq,
        AssessmentRes,
        SyndromeScoreDto,
        PredictionReq,
        PredictionFormRes,
        ClassProbabilityDto,
        RecordRes,
        ListRecordsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with all routes, CORS and state attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/findings", get(list_findings))
        .route("/assessments", post(create_assessment))
        .route("/predictions", post(create_prediction))
        .route("/predictions/form", get(prediction_form))
        .route("/records", get(list_records))
        .route("/records/:id", get(get_record).delete(delete_record))
        .route("/records/:id/report", get(read_report))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the REST API until the server stops.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    tracing::info!("-- Starting Perisentez REST API on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Maps a core error onto a status and a client-safe message.
fn error_response(e: CoreError) -> ApiError {
    match e {
        CoreError::InvalidInput(_)
        | CoreError::Text(_)
        | CoreError::InvalidRecordId(_)
        | CoreError::Model(_) => {
            tracing::warn!("rejected request: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        CoreError::PasswordMismatch => (StatusCode::BAD_REQUEST, "Passwords do not match"),
        CoreError::UsernameTaken => (StatusCode::CONFLICT, "Username already taken"),
        CoreError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid username or password")
        }
        CoreError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "Record not found"),
        other => {
            tracing::error!("Request failed: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn session_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing session token"))
}

/// Resolves the clinician behind the request's session token.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Username, ApiError> {
    let token = session_token(headers)?;
    state
        .sessions
        .resolve(token)
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid session token"))
}

/// Runs blocking work (password hashing, record storage, PDF rendering) off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("blocking task failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        })?
        .map_err(error_response)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Clinician registered", body = RegisterRes),
        (status = 400, description = "Invalid username or passwords do not match"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    )
)]
/// Register a new clinician account.
#[axum::debug_handler]
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<RegisterRes>), ApiError> {
    let store = state.credentials.clone();
    let username = run_blocking(move || {
        store.register(&req.username, &req.password, &req.confirm_password)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterRes {
            username: username.to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Session started", body = LoginRes),
        (status = 401, description = "Invalid username or password")
    )
)]
/// Log in and receive a session token.
///
/// The token must be sent in the `x-session-token` header on every record or
/// prediction request.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let store = state.credentials.clone();
    let username = run_blocking(move || store.verify(&req.username, &req.password)).await?;

    let token = state.sessions.issue(username.clone());
    tracing::info!(username = %username, "clinician logged in");
    Ok(Json(LoginRes {
        username: username.to_string(),
        token,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    params(("x-session-token" = String, Header, description = "Session token")),
    responses(
        (status = 200, description = "Session ended", body = LogoutRes),
        (status = 401, description = "Missing or unknown session token")
    )
)]
#[axum::debug_handler]
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutRes>, ApiError> {
    let token = session_token(&headers)?;
    if !state.sessions.revoke(token) {
        return Err((StatusCode::UNAUTHORIZED, "Invalid session token"));
    }
    Ok(Json(LogoutRes { ok: true }))
}

#[utoipa::path(
    get,
    path = "/findings",
    responses(
        (status = 200, description = "Selectable structural findings", body = FindingsRes)
    )
)]
/// List the structural findings the scorer recognises, sorted.
#[axum::debug_handler]
async fn list_findings(State(state): State<AppState>) -> Json<FindingsRes> {
    let findings = state
        .reference
        .vocabulary()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(FindingsRes { findings })
}

#[utoipa::path(
    post,
    path = "/assessments",
    request_body = AssessmentReq,
    responses(
        (status = 200, description = "Ranked syndrome scores", body = AssessmentRes),
        (status = 400, description = "Invalid observation")
    )
)]
/// Score an observation against every syndrome profile.
///
/// Syndromes without any evidence are left out unless `include_all` is set.
#[axum::debug_handler]
async fn create_assessment(
    State(state): State<AppState>,
    Json(req): Json<AssessmentReq>,
) -> Result<Json<AssessmentRes>, ApiError> {
    let observation = req.observation();
    validate_observation(&observation).map_err(error_response)?;

    let scores = assess(&state.reference, &observation)
        .into_iter()
        .filter(|s| req.include_all || s.is_reportable())
        .map(SyndromeScoreDto::from)
        .collect();
    Ok(Json(AssessmentRes { scores }))
}

#[utoipa::path(
    post,
    path = "/predictions",
    request_body = PredictionReq,
    params(("x-session-token" = String, Header, description = "Session token")),
    responses(
        (status = 201, description = "Prediction saved with its report", body = RecordRes),
        (status = 400, description = "Invalid patient name or form answers"),
        (status = 401, description = "Missing or unknown session token"),
        (status = 503, description = "No prediction model configured"),
        (status = 500, description = "Internal server error")
    )
)]
/// Run the classifier, render the PDF report and save both as a patient record.
#[axum::debug_handler]
async fn create_prediction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PredictionReq>,
) -> Result<(StatusCode, Json<RecordRes>), ApiError> {
    let clinician = authenticate(&state, &headers)?;
    let model = state
        .model
        .clone()
        .ok_or((StatusCode::SERVICE_UNAVAILABLE, "No prediction model configured"))?;

    let patient_name = NonEmptyText::new(&req.patient_name)
        .map_err(|e| error_response(CoreError::Text(e)))?;
    validate_model_input(&req.features).map_err(error_response)?;

    let records = state.records.clone();
    let record = run_blocking(move || {
        let probabilities = model.predict_proba(&req.features)?;

        let generated_at = Utc::now();
        let report = PredictionReport {
            patient_name: patient_name.to_string(),
            clinician: clinician.to_string(),
            generated_at,
            probabilities: probabilities.clone(),
        };
        let pdf = render_prediction_pdf(&report)?;

        records.save(
            &clinician,
            NewRecord {
                patient_name,
                created_at: generated_at,
                probabilities,
            },
            Some(&pdf),
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(RecordRes::from(record))))
}

#[utoipa::path(
    get,
    path = "/predictions/form",
    responses(
        (status = 200, description = "Prediction form fields and allowed answers", body = PredictionFormRes)
    )
)]
/// Describe the fields the prediction form collects.
#[axum::debug_handler]
async fn prediction_form(State(_state): State<AppState>) -> Json<PredictionFormRes> {
    Json(PredictionFormRes::default())
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct RecordsQuery {
    /// Case-insensitive patient name filter.
    search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/records",
    params(
        RecordsQuery,
        ("x-session-token" = String, Header, description = "Session token")
    ),
    responses(
        (status = 200, description = "Clinician's records, newest first", body = ListRecordsRes),
        (status = 401, description = "Missing or unknown session token")
    )
)]
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<ListRecordsRes>, ApiError> {
    let clinician = authenticate(&state, &headers)?;
    let search = query.search.unwrap_or_default();
    let service = state.records.clone();
    let records = run_blocking(move || Ok(service.search(&clinician, &search)))
        .await?
        .into_iter()
        .map(RecordRes::from)
        .collect();
    Ok(Json(ListRecordsRes { records }))
}

#[utoipa::path(
    get,
    path = "/records/{id}",
    params(
        ("id" = String, Path, description = "Record id"),
        ("x-session-token" = String, Header, description = "Session token")
    ),
    responses(
        (status = 200, description = "Patient record", body = RecordRes),
        (status = 400, description = "Malformed record id"),
        (status = 401, description = "Missing or unknown session token"),
        (status = 404, description = "Record not found")
    )
)]
#[axum::debug_handler]
async fn get_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<RecordRes>, ApiError> {
    let clinician = authenticate(&state, &headers)?;
    let id = RecordId::parse(&id).map_err(error_response)?;
    let service = state.records.clone();
    let record = run_blocking(move || service.get(&clinician, &id)).await?;
    Ok(Json(RecordRes::from(record)))
}

#[utoipa::path(
    delete,
    path = "/records/{id}",
    params(
        ("id" = String, Path, description = "Record id"),
        ("x-session-token" = String, Header, description = "Session token")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 400, description = "Malformed record id"),
        (status = 401, description = "Missing or unknown session token"),
        (status = 404, description = "Record not found")
    )
)]
#[axum::debug_handler]
async fn delete_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    let clinician = authenticate(&state, &headers)?;
    let id = RecordId::parse(&id).map_err(error_response)?;
    let service = state.records.clone();
    run_blocking(move || service.delete(&clinician, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/records/{id}/report",
    params(
        ("id" = String, Path, description = "Record id"),
        ("x-session-token" = String, Header, description = "Session token")
    ),
    responses(
        (status = 200, description = "PDF report (application/pdf)"),
        (status = 401, description = "Missing or unknown session token"),
        (status = 404, description = "Record or report not found")
    )
)]
#[axum::debug_handler]
async fn read_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), ApiError> {
    let clinician = authenticate(&state, &headers)?;
    let id = RecordId::parse(&id).map_err(error_response)?;
    let service = state.records.clone();
    let bytes = run_blocking(move || service.read_report(&clinician, &id)).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}
