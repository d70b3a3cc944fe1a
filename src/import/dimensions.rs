//! Image dimensions and PNG encoding.

use std::io::Cursor;

use super::ImportError;

/// Read pixel dimensions from an encoded image without decoding pixels.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), ImportError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImportError::Decode(e.to_string()))?;
    reader
        .into_dimensions()
        .map_err(|e| ImportError::Decode(e.to_string()))
}

#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_dimensions() {
        let png = encode_png(37, 52);
        assert_eq!(read_dimensions(&png).unwrap(), (37, 52));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = read_dimensions(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImportError::Decode(_)));
    }
}
