use bytes::Bytes;

use crate::error::DecodeError;

/// Turns one frame payload into something the host can display.
///
/// The demultiplexer calls this at most once per poll, for the newest
/// complete frame only.
pub trait ImageDecoder {
    type Image;

    fn decode(&mut self, payload: &[u8]) -> Result<Self::Image, DecodeError>;
}

/// A decoded RGB8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB triplets, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// RGB value at `(x, y)`, if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]])
    }
}

/// Decoder for servers that send uncompressed RGB8 frames of a fixed size.
#[derive(Debug, Clone, Copy)]
pub struct RawRgbDecoder {
    width: u32,
    height: u32,
}

impl RawRgbDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ImageDecoder for RawRgbDecoder {
    type Image = DecodedImage;

    fn decode(&mut self, payload: &[u8]) -> Result<DecodedImage, DecodeError> {
        let expected = self.width as usize * self.height as usize * 3;
        if payload.len() < expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: payload.len(),
            });
        }
        if payload.len() > expected {
            return Err(DecodeError::Invalid(format!(
                "{} trailing bytes after {}x{} RGB frame",
                payload.len() - expected,
                self.width,
                self.height
            )));
        }
        Ok(DecodedImage {
            width: self.width,
            height: self.height,
            pixels: payload.to_vec(),
        })
    }
}

/// Hands the compressed payload through untouched.
///
/// Used when the host decodes (or just stores) the image itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadDecoder;

impl ImageDecoder for PayloadDecoder {
    type Image = Bytes;

    fn decode(&mut self, payload: &[u8]) -> Result<Bytes, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Invalid("empty payload".to_string()));
        }
        Ok(Bytes::copy_from_slice(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_rgb_decodes_exact_payload() {
        let mut decoder = RawRgbDecoder::new(2, 1);
        let image = decoder.decode(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(image.pixel(0, 0), Some([1, 2, 3]));
        assert_eq!(image.pixel(1, 0), Some([4, 5, 6]));
        assert_eq!(image.pixel(2, 0), None);
    }

    #[test]
    fn raw_rgb_rejects_wrong_sizes() {
        let mut decoder = RawRgbDecoder::new(2, 2);
        assert!(matches!(
            decoder.decode(&[0; 5]),
            Err(DecodeError::Truncated {
                expected: 12,
                actual: 5
            })
        ));
        assert!(matches!(
            decoder.decode(&[0; 13]),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn payload_decoder_copies_bytes() {
        let mut decoder = PayloadDecoder;
        let out = decoder.decode(b"\xff\xd8jpeg").unwrap();
        assert_eq!(out.as_ref(), b"\xff\xd8jpeg");
        assert!(decoder.decode(b"").is_err());
    }
}
