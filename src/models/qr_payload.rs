use crate::error::app_error::AppError;
use crate::models::qr_session::QrSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PAYLOAD_TYPE: &str = "attendance";

/// Contents of the QR code handed out for a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub session_id: String,
    pub class_id: String,
    pub class_name: String,
    pub api_url: String,
    pub expires_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

impl QrPayload {
    pub fn for_session(session: &QrSession, api_url: String) -> Self {
        Self {
            payload_type: PAYLOAD_TYPE.to_string(),
            session_id: session.id.clone(),
            class_id: session.class_id.clone(),
            class_name: session.class_name.clone(),
            api_url,
            expires_at: session.expires_at,
            timestamp: session.created_at,
        }
    }

    pub fn encode(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|e| AppError::Internal(format!("Failed to encode QR payload: {}", e)))
    }
}

/// The part of a JSON payload a scanner relies on. Other fields are
/// informational and may be missing from codes printed by older clients.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ScannedPayload {
    #[serde(rename = "type")]
    payload_type: String,
    session_id: String,
    #[serde(default)]
    class_name: Option<String>,
}

/// What a scanner learns from a QR code, whichever format it was in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSession {
    pub session_id: String,
    pub class_name: Option<String>,
}

/// Decode scanned QR contents.
///
/// Accepts the JSON payload and the older URL-query form
/// (`https://host/scan?session=<id>&class=<name>`).
pub fn decode_scanned(raw: &str) -> Result<ScannedSession, AppError> {
    let raw = raw.trim();

    if raw.starts_with('{') {
        let payload: ScannedPayload = serde_json::from_str(raw).map_err(|e| AppError::InvalidQrPayload(e.to_string()))?;
        if payload.payload_type != PAYLOAD_TYPE {
            return Err(AppError::InvalidQrPayload(format!("unsupported payload type '{}'", payload.payload_type)));
        }
        if payload.session_id.trim().is_empty() {
            return Err(AppError::InvalidQrPayload("missing session id".to_string()));
        }
        return Ok(ScannedSession {
            session_id: payload.session_id,
            class_name: payload.class_name,
        });
    }

    decode_legacy_query(raw)
}

fn decode_legacy_query(raw: &str) -> Result<ScannedSession, AppError> {
    let query = raw.split_once('?').map(|(_, query)| query).unwrap_or(raw);
    let query = query.split('#').next().unwrap_or_default();

    let mut session_id = None;
    let mut class_name = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = urlencoding::decode(&value.replace('+', " "))
            .map_err(|e| AppError::InvalidQrPayload(format!("malformed query value: {}", e)))?
            .into_owned();

        match key {
            "session" | "sessionId" => session_id = Some(value),
            "class" | "className" => class_name = Some(value),
            _ => {}
        }
    }

    match session_id {
        Some(session_id) if !session_id.trim().is_empty() => Ok(ScannedSession { session_id, class_name }),
        _ => Err(AppError::InvalidQrPayload("no session id in QR data".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn session() -> QrSession {
        QrSession::new(
            "k3J9x".to_string(),
            "CS301".to_string(),
            "Distributed Systems".to_string(),
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            Duration::seconds(300),
            None,
        )
    }

    #[test]
    fn json_payload_carries_session_fields() {
        let payload = QrPayload::for_session(&session(), "http://localhost:8000/api/qr/mark/k3J9x".to_string());
        let encoded = payload.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["type"], "attendance");
        assert_eq!(value["sessionId"], "k3J9x");
        assert_eq!(value["className"], "Distributed Systems");
        assert_eq!(value["apiUrl"], "http://localhost:8000/api/qr/mark/k3J9x");
        assert!(value.get("expiresAt").is_some());
        assert!(value.get("timestamp").is_some());

        let scanned = decode_scanned(&encoded).unwrap();
        assert_eq!(scanned.session_id, "k3J9x");
    }

    #[test]
    fn json_payload_needs_only_type_and_session() {
        let scanned = decode_scanned(
            r#"{"type":"attendance","sessionId":"k3J9x","className":"DS","apiUrl":"http://localhost:8000/api/qr/mark/k3J9x","expiresAt":"2026-03-02T09:05:00Z","timestamp":"2026-03-02T09:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(scanned.session_id, "k3J9x");
        assert_eq!(scanned.class_name.as_deref(), Some("DS"));

        let minimal = decode_scanned(r#"{"type":"attendance","sessionId":"k3J9x"}"#).unwrap();
        assert_eq!(minimal.class_name, None);

        assert!(matches!(decode_scanned(r#"{"type":"attendance"}"#), Err(AppError::InvalidQrPayload(_))));
    }

    #[test]
    fn legacy_url_payload_is_accepted() {
        let scanned = decode_scanned("https://attendance.example.edu/scan?session=k3J9x&class=Distributed%20Systems").unwrap();
        assert_eq!(
            scanned,
            ScannedSession {
                session_id: "k3J9x".to_string(),
                class_name: Some("Distributed Systems".to_string()),
            }
        );
    }

    #[test]
    fn bare_query_string_is_accepted() {
        let scanned = decode_scanned("session=abc&class=Intro+to+CS").unwrap();
        assert_eq!(scanned.session_id, "abc");
        assert_eq!(scanned.class_name.as_deref(), Some("Intro to CS"));
    }

    #[test]
    fn payload_without_session_is_rejected() {
        assert!(matches!(decode_scanned("https://example.edu/scan?class=CS301"), Err(AppError::InvalidQrPayload(_))));
        assert!(matches!(decode_scanned("hello world"), Err(AppError::InvalidQrPayload(_))));
    }

    #[test]
    fn foreign_json_type_is_rejected() {
        let mut payload = QrPayload::for_session(&session(), String::new());
        payload.payload_type = "wifi".to_string();
        let encoded = payload.encode().unwrap();
        assert!(matches!(decode_scanned(&encoded), Err(AppError::InvalidQrPayload(_))));
    }
}
