use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::student::Student;

const STUDENT_COLUMNS: &str = r#"
    s.id,
    s.student_code,
    s.full_name,
    u.email,
    s.department,
    s.class_name,
    s.section,
    s.year,
    s.gpa
"#;

#[async_trait::async_trait]
pub trait StudentRepository {
    async fn find_student_by_code(&self, student_code: &str) -> Result<Option<Student>, AppError>;
    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError>;
    /// All students whose full name matches, ignoring case.
    async fn find_students_by_name(&self, full_name: &str) -> Result<Vec<Student>, AppError>;
}

#[async_trait::async_trait]
impl StudentRepository for PostgresRepository {
    async fn find_student_by_code(&self, student_code: &str) -> Result<Option<Student>, AppError> {
        let query = format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM students s
            LEFT JOIN users u ON u.id = s.user_id
            WHERE s.student_code = $1
            "#
        );

        let student = sqlx::query_as::<_, Student>(&query).bind(student_code).fetch_optional(&self.pool).await?;

        Ok(student)
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, AppError> {
        let query = format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM students s
            JOIN users u ON u.id = s.user_id
            WHERE lower(u.email) = lower($1)
            "#
        );

        let student = sqlx::query_as::<_, Student>(&query).bind(email).fetch_optional(&self.pool).await?;

        Ok(student)
    }

    async fn find_students_by_name(&self, full_name: &str) -> Result<Vec<Student>, AppError> {
        // Two rows are enough to tell a unique match from an ambiguous one.
        let query = format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM students s
            LEFT JOIN users u ON u.id = s.user_id
            WHERE lower(s.full_name) = lower($1)
            ORDER BY s.student_code
            LIMIT 2
            "#
        );

        let students = sqlx::query_as::<_, Student>(&query).bind(full_name).fetch_all(&self.pool).await?;

        Ok(students)
    }
}
