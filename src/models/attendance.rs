use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, JsonSchema, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Absent => write!(f, "absent"),
            AttendanceStatus::Late => write!(f, "late"),
        }
    }
}

/// A point reported by a scanner or by the lecturer's device.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, JsonSchema)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

impl GeoPoint {
    /// Great-circle distance in meters (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + self.latitude.to_radians().cos() * other.latitude.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
    }
}

/// Persisted attendance row.
#[derive(Serialize, Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: String,
    pub session_id: String,
    pub status: AttendanceStatus,
    pub marked_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub distance_from_class: Option<f64>,
    pub location_verified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendanceRecord {
    pub student_id: Uuid,
    pub class_id: String,
    pub session_id: String,
    pub status: AttendanceStatus,
    pub marked_at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    /// Meters between the scanner and the classroom, when both are known.
    pub distance_from_class: Option<f64>,
}

/// Entry in a session's attendee list, as shown to polling clients.
#[derive(Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub student_id: Uuid,
    pub student_code: String,
    pub student_name: String,
    pub marked_at: DateTime<Utc>,
    pub status: AttendanceStatus,
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_mark_location"))]
pub struct MarkAttendanceRequest {
    /// Student code, email address or display name.
    #[validate(length(min = 1, max = 255))]
    pub student_id: String,
    #[validate(length(max = 255))]
    pub student_name: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl MarkAttendanceRequest {
    pub fn location(&self) -> Option<GeoPoint> {
        location_from(self.latitude, self.longitude)
    }
}

/// Body of a scan: the raw QR contents plus the scanning student.
#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 4096))]
    pub qr_data: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub student: MarkAttendanceRequest,
}

#[derive(Serialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub message: String,
    pub session_id: String,
    pub student: Attendee,
    pub total_marked: usize,
}

pub(crate) fn location_from(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
        _ => None,
    }
}

pub(crate) fn validate_coordinate_pair(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ValidationError> {
    if latitude.is_some() != longitude.is_some() {
        return Err(ValidationError::new("latitude_and_longitude_must_be_given_together"));
    }
    Ok(())
}

fn validate_mark_location(request: &MarkAttendanceRequest) -> Result<(), ValidationError> {
    validate_coordinate_pair(request.latitude, request.longitude)
}
