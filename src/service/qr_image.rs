use crate::error::app_error::AppError;
use base64::{Engine as _, engine::general_purpose};
use qrcode::QrCode;

/// Render `data` as a QR code and return it as an SVG data URL.
pub fn render_svg_data_url(data: &str) -> Result<String, AppError> {
    let qr = QrCode::new(data.as_bytes()).map_err(|e| AppError::Internal(format!("Failed to generate QR code: {}", e)))?;

    let qr_svg = qr.render::<qrcode::render::svg::Color>().min_dimensions(256, 256).build();

    let base64_svg = general_purpose::STANDARD.encode(qr_svg.as_bytes());
    Ok(format!("data:image/svg+xml;base64,{}", base64_svg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_svg_data_url() {
        let url = render_svg_data_url(r#"{"type":"attendance","sessionId":"abc"}"#).unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").expect("data url prefix");
        let svg = general_purpose::STANDARD.decode(encoded).unwrap();
        assert!(String::from_utf8(svg).unwrap().contains("<svg"));
    }

    #[test]
    fn oversized_data_is_an_internal_error() {
        let result = render_svg_data_url(&"x".repeat(8000));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
