use crate::config::QrConfig;
use crate::database::Repository;
use crate::error::app_error::AppError;
use crate::models::attendance::{AttendanceStatus, Attendee, MarkAttendanceRequest, MarkAttendanceResponse, NewAttendanceRecord, ScanRequest};
use crate::models::qr_payload::{QrPayload, decode_scanned};
use crate::models::qr_session::{GenerateSessionRequest, GenerateSessionResponse, QrSession, SessionStatusResponse};
use crate::service::identity::{StudentIdentity, resolve_student};
use crate::service::qr_image::render_svg_data_url;
use crate::session_store::SessionStore;
use chrono::{DateTime, Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use tracing::{debug, info, warn};
use validator::Validate;

const SESSION_ID_LENGTH: usize = 24;
const SESSION_ID_ATTEMPTS: usize = 3;

pub struct AttendanceService<'a> {
    repository: &'a dyn Repository,
    store: &'a SessionStore,
    config: &'a QrConfig,
    base_path: &'a str,
}

impl<'a> AttendanceService<'a> {
    pub fn new(repository: &'a dyn Repository, store: &'a SessionStore, config: &'a QrConfig, base_path: &'a str) -> Self {
        AttendanceService {
            repository,
            store,
            config,
            base_path,
        }
    }

    pub async fn generate_session(&self, request: &GenerateSessionRequest, now: DateTime<Utc>) -> Result<GenerateSessionResponse, AppError> {
        request.validate()?;

        let ttl = self.config.session_ttl();
        let mut stored = None;
        for _ in 0..SESSION_ID_ATTEMPTS {
            let session = QrSession::new(
                new_session_id(),
                request.class_id.trim().to_string(),
                request.class_name.trim().to_string(),
                now,
                ttl,
                request.location(),
            );
            if self.store.insert(session.clone()).await {
                stored = Some(session);
                break;
            }
        }
        let session = stored.ok_or_else(|| AppError::Internal("Could not allocate a session id".to_string()))?;

        let payload = QrPayload::for_session(&session, self.mark_url(&session.id));
        let qr_data = payload.encode()?;
        let qr_image = render_svg_data_url(&qr_data)?;

        info!(
            session_id = %session.id,
            class_id = %session.class_id,
            expires_at = %session.expires_at,
            "attendance session generated"
        );

        Ok(GenerateSessionResponse {
            session_id: session.id.clone(),
            qr_data,
            qr_image,
            expires_in: session.time_left(now),
            class_name: session.class_name.clone(),
            expires_at: session.expires_at,
        })
    }

    /// Mark a student present in a session.
    ///
    /// The session lock is held from the duplicate check until the attendee is
    /// appended, and the attendee is only appended once the row is stored.
    pub async fn mark_attendance(&self, session_id: &str, request: &MarkAttendanceRequest, now: DateTime<Utc>) -> Result<MarkAttendanceResponse, AppError> {
        request.validate()?;

        let handle = self
            .store
            .get(session_id)
            .await
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;

        if !session.is_active(now) {
            return Err(AppError::SessionExpired(session_id.to_string()));
        }

        let identity = StudentIdentity::new(&request.student_id, request.student_name.as_deref());
        let Some((student, strategy)) = resolve_student(self.repository, &identity).await? else {
            warn!(session_id = %session_id, identifier = %identity.identifier, "student could not be resolved");
            return Err(AppError::StudentNotFound(identity.identifier.to_string()));
        };

        if session.has_attendee(&student.id) {
            warn!(session_id = %session_id, student_code = %student.student_code, "duplicate attendance mark");
            return Err(already_marked(session_id, &student.student_code));
        }

        let record = NewAttendanceRecord {
            student_id: student.id,
            class_id: session.class_id.clone(),
            session_id: session.id.clone(),
            status: AttendanceStatus::Present,
            marked_at: now,
            location: request.location(),
            distance_from_class: request.location().zip(session.location).map(|(scanned, classroom)| scanned.distance_meters(&classroom)),
        };
        self.repository.insert_attendance(&record).await.map_err(|e| match e {
            AppError::AlreadyMarked { .. } => already_marked(session_id, &student.student_code),
            other => other,
        })?;

        let attendee = Attendee {
            student_id: student.id,
            student_code: student.student_code.clone(),
            student_name: student.full_name.clone(),
            marked_at: now,
            status: record.status,
        };
        session.attendees.push(attendee.clone());

        info!(
            session_id = %session_id,
            student_code = %student.student_code,
            resolved_by = %strategy,
            total_marked = session.attendees.len(),
            "attendance marked"
        );

        Ok(MarkAttendanceResponse {
            message: format!("Attendance marked for {}", student.full_name),
            session_id: session.id.clone(),
            student: attendee,
            total_marked: session.attendees.len(),
        })
    }

    /// Mark attendance from raw QR contents, in either payload format.
    pub async fn scan(&self, request: &ScanRequest, now: DateTime<Utc>) -> Result<MarkAttendanceResponse, AppError> {
        request.validate()?;
        let scanned = decode_scanned(&request.qr_data)?;
        debug!(session_id = %scanned.session_id, class_name = ?scanned.class_name, "qr payload decoded");
        self.mark_attendance(&scanned.session_id, &request.student, now).await
    }

    pub async fn session_status(&self, session_id: &str, now: DateTime<Utc>) -> Result<SessionStatusResponse, AppError> {
        let handle = self
            .store
            .get(session_id)
            .await
            .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;
        let session = handle.lock().await;
        Ok(session.status(now))
    }

    fn mark_url(&self, session_id: &str) -> String {
        format!(
            "{}{}/qr/mark/{}",
            self.config.public_url.trim_end_matches('/'),
            self.base_path.trim_end_matches('/'),
            urlencoding::encode(session_id)
        )
    }
}

fn new_session_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), SESSION_ID_LENGTH)
}

fn already_marked(session_id: &str, student_code: &str) -> AppError {
    AppError::AlreadyMarked {
        session_id: session_id.to_string(),
        student: student_code.to_string(),
    }
}
