pub mod attendance;
pub mod health;
pub mod qr_payload;
pub mod qr_session;
pub mod student;
