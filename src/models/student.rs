use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

/// A student as known to the student directory.
///
/// `email` comes from the linked user account and is absent for students
/// that were seeded without a login.
#[derive(Serialize, Debug, Clone, Default, PartialEq, sqlx::FromRow, JsonSchema)]
pub struct Student {
    pub id: Uuid,
    pub student_code: String,
    pub full_name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub year: Option<i32>,
    pub gpa: Option<f64>,
}
