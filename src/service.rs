pub mod attendance;
pub mod identity;
pub mod qr_image;
