use crate::database::Repository;
use crate::error::app_error::AppError;
use crate::models::student::Student;
use validator::ValidateEmail;

/// Ways a scanned identifier can name a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    StudentCode,
    Email,
    DisplayName,
}

/// Strategies are tried in this order; the first match wins.
pub const RESOLUTION_ORDER: [IdentityStrategy; 3] = [IdentityStrategy::StudentCode, IdentityStrategy::Email, IdentityStrategy::DisplayName];

impl std::fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityStrategy::StudentCode => write!(f, "student_code"),
            IdentityStrategy::Email => write!(f, "email"),
            IdentityStrategy::DisplayName => write!(f, "display_name"),
        }
    }
}

/// What a scanner submitted about the student.
#[derive(Debug, Clone, Copy)]
pub struct StudentIdentity<'a> {
    pub identifier: &'a str,
    pub display_name: Option<&'a str>,
}

impl<'a> StudentIdentity<'a> {
    pub fn new(identifier: &'a str, display_name: Option<&'a str>) -> Self {
        Self {
            identifier: identifier.trim(),
            display_name: display_name.map(str::trim).filter(|name| !name.is_empty()),
        }
    }
}

impl IdentityStrategy {
    async fn lookup(self, repository: &dyn Repository, identity: &StudentIdentity<'_>) -> Result<Option<Student>, AppError> {
        match self {
            IdentityStrategy::StudentCode => repository.find_student_by_code(identity.identifier).await,
            IdentityStrategy::Email => {
                if !identity.identifier.validate_email() {
                    return Ok(None);
                }
                repository.find_student_by_email(identity.identifier).await
            }
            IdentityStrategy::DisplayName => {
                let name = identity.display_name.unwrap_or(identity.identifier);
                let mut matches = repository.find_students_by_name(name).await?;
                // An ambiguous name identifies nobody.
                if matches.len() == 1 { Ok(matches.pop()) } else { Ok(None) }
            }
        }
    }
}

/// Resolve a student by trying each strategy of [`RESOLUTION_ORDER`] in turn.
pub async fn resolve_student(repository: &dyn Repository, identity: &StudentIdentity<'_>) -> Result<Option<(Student, IdentityStrategy)>, AppError> {
    if identity.identifier.is_empty() && identity.display_name.is_none() {
        return Ok(None);
    }

    for strategy in RESOLUTION_ORDER {
        if let Some(student) = strategy.lookup(repository, identity).await? {
            return Ok(Some((student, strategy)));
        }
    }

    Ok(None)
}
