pub mod attendance;
pub mod postgres_repository;
pub mod student;

use crate::database::attendance::AttendanceRepository;
use crate::database::student::StudentRepository;
use std::sync::Arc;

/// Everything the attendance service needs from persistent storage.
pub trait Repository: StudentRepository + AttendanceRepository + Send + Sync {}

impl<T> Repository for T where T: StudentRepository + AttendanceRepository + Send + Sync {}

/// Repository handle managed as Rocket state.
pub type SharedRepository = Arc<dyn Repository>;
