//! QR adapters - implementations of the ChallengeRenderer port.

mod svg_renderer;

pub use svg_renderer::SvgQrRenderer;
