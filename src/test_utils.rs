use crate::Config;
use crate::database::SharedRepository;
use crate::database::attendance::AttendanceRepository;
use crate::database::student::StudentRepository;
use crate::error::app_error::AppError;
use crate::models::attendance::{AttendanceRecord, NewAttendanceRecord};
use crate::models::student::Student;
use rocket::local::asynchronous::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub fn sample_student(student_code: &str, full_name: &str, email: Option<&str>) -> Student {
    Student {
        id: Uuid::new_v4(),
        student_code: student_code.to_string(),
        full_name: full_name.to_string(),
        email: email.map(str::to_string),
        department: Some("Computer Science".to_string()),
        class_name: Some("CS-3A".to_string()),
        section: Some("A".to_string()),
        year: Some(3),
        gpa: Some(3.4),
    }
}

/// Repository backed by plain vectors. Enforces the same
/// one-row-per-(session, student) rule as the database index.
#[derive(Default)]
pub struct InMemoryRepository {
    students: Vec<Student>,
    records: Mutex<Vec<AttendanceRecord>>,
    fail_inserts: Mutex<bool>,
}

impl InMemoryRepository {
    pub fn new(students: Vec<Student>) -> Self {
        Self {
            students,
            ..Self::default()
        }
    }

    pub fn with_sample_students() -> Self {
        Self::new(vec![
            sample_student("CS2024001", "Alice Johnson", Some("alice.johnson@uni.edu")),
            sample_student("CS2024002", "Bob Smith", Some("bob.smith@uni.edu")),
            sample_student("CS2024003", "Chris Lee", None),
            sample_student("CS2024004", "Chris Lee", None),
        ])
    }

    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().await.clone()
    }

    pub async fn fail_inserts(&self, fail: bool) {
        *self.fail_inserts.lock().await = fail;
    }
}

#[async_trait::async_trait]
impl StudentRepository for InMemoryRepository {
    async fn find_student_by_code(&self, student_code: &str) -> Result<Option<Student>, AppError> {
        Ok(self.students.iter().find(|s| s.student_code == student_code).cloned())
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        Ok(self
            .students
            .iter()
            .find(|s| s.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .cloned())
    }

    async fn find_students_by_name(&self, full_name: &str) -> Result<Vec<Student>, AppError> {
        Ok(self
            .students
            .iter()
            .filter(|s| s.full_name.to_lowercase() == full_name.to_lowercase())
            .take(2)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl AttendanceRepository for InMemoryRepository {
    async fn insert_attendance(&self, record: &NewAttendanceRecord) -> Result<AttendanceRecord, AppError> {
        if *self.fail_inserts.lock().await {
            return Err(AppError::db("Failed to insert attendance", sqlx::Error::PoolTimedOut));
        }

        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.session_id == record.session_id && r.student_id == record.student_id)
        {
            return Err(AppError::AlreadyMarked {
                session_id: record.session_id.clone(),
                student: record.student_id.to_string(),
            });
        }

        let row = AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: record.student_id,
            class_id: record.class_id.clone(),
            session_id: record.session_id.clone(),
            status: record.status,
            marked_at: record.marked_at,
            latitude: record.location.map(|p| p.latitude),
            longitude: record.location.map(|p| p.longitude),
            distance_from_class: record.distance_from_class,
            location_verified: false,
        };
        records.push(row.clone());
        Ok(row)
    }
}

/// Client for the full API backed by [`InMemoryRepository::with_sample_students`].
pub async fn test_client() -> (Client, Arc<InMemoryRepository>) {
    let repository = Arc::new(InMemoryRepository::with_sample_students());
    let shared: SharedRepository = repository.clone();

    let rocket = crate::assemble(Config::default()).manage(shared);
    let client = Client::tracked(rocket).await.expect("valid rocket instance");
    (client, repository)
}
