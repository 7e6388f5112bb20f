//! Renders login challenges as QR codes embedded in SVG data URLs.
//!
//! Observers drop the result straight into an `<img src>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use qrcode::render::svg;
use qrcode::QrCode;

use crate::ports::{ChallengeRenderer, RenderError};

const DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

#[derive(Debug, Clone, Copy)]
pub struct SvgQrRenderer {
    min_size: u32,
}

impl SvgQrRenderer {
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl Default for SvgQrRenderer {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ChallengeRenderer for SvgQrRenderer {
    fn render(&self, payload: &str) -> Result<String, RenderError> {
        if payload.is_empty() {
            return Err(RenderError::Empty);
        }

        let code =
            QrCode::new(payload.as_bytes()).map_err(|e| RenderError::Encoding(e.to_string()))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(self.min_size, self.min_size)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        Ok(format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(image)))
    }
}
