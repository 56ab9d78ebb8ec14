use crate::models::attendance::{Attendee, GeoPoint, location_from, validate_coordinate_pair};
use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A live QR attendance session.
///
/// A session is active while `now < expires_at`. Once expired it stays
/// readable, but accepts no more marks.
#[derive(Debug, Clone, PartialEq)]
pub struct QrSession {
    pub id: String,
    pub class_id: String,
    pub class_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub attendees: Vec<Attendee>,
}

impl QrSession {
    pub fn new(id: String, class_id: String, class_name: String, created_at: DateTime<Utc>, ttl: Duration, location: Option<GeoPoint>) -> Self {
        Self {
            id,
            class_id,
            class_name,
            created_at,
            expires_at: created_at + ttl,
            location,
            attendees: Vec::new(),
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whole seconds until expiry, rounded up, never negative.
    ///
    /// Rounding up keeps `time_left == 0` equivalent to `!is_active`.
    pub fn time_left(&self, now: DateTime<Utc>) -> i64 {
        let remaining = self.expires_at - now;
        if remaining <= Duration::zero() {
            return 0;
        }

        let whole_seconds = remaining.num_seconds();
        if remaining > Duration::seconds(whole_seconds) { whole_seconds + 1 } else { whole_seconds }
    }

    pub fn has_attendee(&self, student_id: &Uuid) -> bool {
        self.attendees.iter().any(|attendee| &attendee.student_id == student_id)
    }

    pub fn status(&self, now: DateTime<Utc>) -> SessionStatusResponse {
        SessionStatusResponse {
            session_id: self.id.clone(),
            class_id: self.class_id.clone(),
            class_name: self.class_name.clone(),
            is_active: self.is_active(now),
            time_left: self.time_left(now),
            expires_at: self.expires_at,
            attendees: self.attendees.clone(),
            total_marked: self.attendees.len(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_generate_location"))]
pub struct GenerateSessionRequest {
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub class_id: String,
    #[validate(length(min = 1, max = 255), custom(function = "validate_not_blank"))]
    pub class_name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl GenerateSessionRequest {
    pub fn location(&self) -> Option<GeoPoint> {
        location_from(self.latitude, self.longitude)
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

fn validate_generate_location(request: &GenerateSessionRequest) -> Result<(), ValidationError> {
    validate_coordinate_pair(request.latitude, request.longitude)
}

#[derive(Serialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSessionResponse {
    pub session_id: String,
    /// Payload to encode in the QR code.
    pub qr_data: String,
    /// SVG rendering of `qr_data` as a data URL.
    pub qr_image: String,
    /// Seconds until the session expires.
    pub expires_in: i64,
    pub class_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub class_id: String,
    pub class_name: String,
    pub is_active: bool,
    pub time_left: i64,
    pub expires_at: DateTime<Utc>,
    pub attendees: Vec<Attendee>,
    pub total_marked: usize,
}
