use crate::config::Config;
use crate::database::SharedRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::middleware::ClientIp;
use crate::middleware::rate_limit::RateLimit;
use crate::models::attendance::{MarkAttendanceRequest, MarkAttendanceResponse, ScanRequest};
use crate::models::qr_session::{GenerateSessionRequest, GenerateSessionResponse, SessionStatusResponse};
use crate::service::attendance::AttendanceService;
use crate::session_store::SessionStore;
use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use std::sync::Arc;

fn service<'a>(repository: &'a State<SharedRepository>, store: &'a State<Arc<SessionStore>>, config: &'a State<Config>) -> AttendanceService<'a> {
    AttendanceService::new(repository.inner().as_ref(), store.inner().as_ref(), &config.qr, &config.api.base_path)
}

/// Start an attendance session for a class and return its QR code
#[openapi(tag = "QR Attendance")]
#[post("/generate", data = "<payload>")]
pub async fn generate_session(
    repository: &State<SharedRepository>,
    store: &State<Arc<SessionStore>>,
    config: &State<Config>,
    _rate_limit: RateLimit,
    payload: JsonBody<GenerateSessionRequest>,
) -> Result<Json<GenerateSessionResponse>, AppError> {
    let generated = service(repository, store, config).generate_session(&payload, Utc::now()).await?;
    Ok(Json(generated))
}

/// Mark a student present in an active session
///
/// Fails with 404 when the session is unknown or expired, 403 when the
/// student cannot be identified and 409 when they are already marked.
#[openapi(tag = "QR Attendance")]
#[post("/mark/<session_id>", data = "<payload>")]
pub async fn mark_attendance(
    repository: &State<SharedRepository>,
    store: &State<Arc<SessionStore>>,
    config: &State<Config>,
    _rate_limit: RateLimit,
    client_ip: ClientIp,
    session_id: &str,
    payload: JsonBody<MarkAttendanceRequest>,
) -> Result<Json<MarkAttendanceResponse>, AppError> {
    tracing::debug!(session_id = %session_id, client_ip = %client_ip.as_str(), "attendance mark received");
    let marked = service(repository, store, config).mark_attendance(session_id, &payload, Utc::now()).await?;
    Ok(Json(marked))
}

/// Mark attendance from the raw contents of a scanned QR code
#[openapi(tag = "QR Attendance")]
#[post("/scan", data = "<payload>")]
pub async fn scan(
    repository: &State<SharedRepository>,
    store: &State<Arc<SessionStore>>,
    config: &State<Config>,
    _rate_limit: RateLimit,
    client_ip: ClientIp,
    payload: JsonBody<ScanRequest>,
) -> Result<Json<MarkAttendanceResponse>, AppError> {
    tracing::debug!(client_ip = %client_ip.as_str(), "qr scan received");
    let marked = service(repository, store, config).scan(&payload, Utc::now()).await?;
    Ok(Json(marked))
}

/// Current state of a session and the students marked so far
#[openapi(tag = "QR Attendance")]
#[get("/session/<session_id>")]
pub async fn session_status(
    repository: &State<SharedRepository>,
    store: &State<Arc<SessionStore>>,
    config: &State<Config>,
    _rate_limit: RateLimit,
    session_id: &str,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let status = service(repository, store, config).session_status(session_id, Utc::now()).await?;
    Ok(Json(status))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![generate_session, mark_attendance, scan, session_status]
}
