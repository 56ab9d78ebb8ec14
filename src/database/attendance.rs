use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::{AppError, is_unique_violation};
use crate::models::attendance::{AttendanceRecord, NewAttendanceRecord};

#[async_trait::async_trait]
pub trait AttendanceRepository {
    /// Store an attendance row. A second row for the same (session, student)
    /// is refused with [`AppError::AlreadyMarked`].
    async fn insert_attendance(&self, record: &NewAttendanceRecord) -> Result<AttendanceRecord, AppError>;
}

#[async_trait::async_trait]
impl AttendanceRepository for PostgresRepository {
    async fn insert_attendance(&self, record: &NewAttendanceRecord) -> Result<AttendanceRecord, AppError> {
        let (latitude, longitude) = match record.location {
            Some(point) => (Some(point.latitude), Some(point.longitude)),
            None => (None, None),
        };

        let result = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance (student_id, class_id, session_id, status, marked_at, latitude, longitude, distance_from_class)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, student_id, class_id, session_id, status, marked_at,
                      latitude, longitude, distance_from_class, location_verified
            "#,
        )
        .bind(record.student_id)
        .bind(&record.class_id)
        .bind(&record.session_id)
        .bind(record.status)
        .bind(record.marked_at)
        .bind(latitude)
        .bind(longitude)
        .bind(record.distance_from_class)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(e) if is_unique_violation(&e) => Err(AppError::AlreadyMarked {
                session_id: record.session_id.clone(),
                student: record.student_id.to_string(),
            }),
            Err(e) => Err(AppError::db("Failed to insert attendance", e)),
        }
    }
}
