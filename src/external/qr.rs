//! PNG QR rendering for check-in URLs.

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

use super::QrEncoder;

/// Renders check-in URLs as grayscale PNG QR codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngQrEncoder;

impl QrEncoder for PngQrEncoder {
    fn encode(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let code = QrCode::new(url.as_bytes())?;
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(320, 320)
            .build();

        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn produces_png_bytes() {
        let encoder = PngQrEncoder;
        let Ok(bytes) = encoder.encode("https://events.example.com/check-in/abc123") else {
            panic!("encoding failed");
        };
        // PNG signature
        assert_eq!(bytes.get(..4), Some(&[0x89, b'P', b'N', b'G'][..]));
    }
}
