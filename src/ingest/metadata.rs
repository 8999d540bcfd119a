use std::path::Path;

use super::IngestError;

/// Object id encoded in a file name: the stem (`42` for `42.jpg`) read as a
/// signed integer.
pub fn object_id_from_path(path: &Path) -> Result<i64, IngestError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.trim().parse::<i64>().ok())
        .ok_or_else(|| IngestError::InvalidObjectId(path.to_path_buf()))
}

/// Pixel width of an encoded image. The whole image is decoded, so truncated
/// or corrupt pixel data fails here even when the header is intact.
pub fn measure_width(path: &Path, bytes: &[u8]) -> Result<u32, IngestError> {
    let decoded = image::load_from_memory(bytes).map_err(|source| IngestError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.width())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 90])));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_object_id_from_path() {
        assert_eq!(object_id_from_path(Path::new("Images/42.jpg")).unwrap(), 42);
        assert_eq!(object_id_from_path(Path::new("-3.jpg")).unwrap(), -3);
        assert_eq!(object_id_from_path(Path::new("/a/b/007.JPG")).unwrap(), 7);
    }

    #[test]
    fn test_object_id_rejects_non_numeric() {
        for name in ["cat.jpg", "1.5.jpg", "12a.jpg", ".jpg"] {
            let err = object_id_from_path(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, IngestError::InvalidObjectId(ref p) if p == &PathBuf::from(name)),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_measure_width() {
        let bytes = jpeg_bytes(48, 20);
        assert_eq!(measure_width(Path::new("1.jpg"), &bytes).unwrap(), 48);
    }

    #[test]
    fn test_measure_width_rejects_garbage() {
        let err = measure_width(Path::new("bad.jpg"), b"definitely not a jpeg").unwrap_err();
        assert!(matches!(err, IngestError::Decode { .. }));
    }
}
