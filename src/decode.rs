//! Image decoding and embedded date lookup
//!
//! Decoding is a capability behind the [`ImageDecoder`] trait so the
//! classifier does not depend on a particular image library.
//! [`StandardDecoder`] uses the `image` crate to validate the file and
//! `kamadak-exif` to read its `DateTime` tag.

use exif::{Reader, Tag, Value};
use image::error::{ImageError, UnsupportedErrorKind};
use image::ImageReader;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, trace};

/// A successfully decoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Raw value of the embedded `DateTime` tag, if any
    pub date_time: Option<String>,
}

/// Why an image could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The format is not recognised at all
    #[error("unknown image format: {0}")]
    UnknownFormat(String),

    /// The format is recognised but the content breaks its rules
    #[error("invalid image content: {0}")]
    InvalidContent(String),

    /// The file could not be read
    #[error("unreadable: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ImageError> for DecodeError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Unsupported(e) => match e.kind() {
                UnsupportedErrorKind::Format(_) => DecodeError::UnknownFormat(e.to_string()),
                _ => DecodeError::InvalidContent(e.to_string()),
            },
            ImageError::IoError(e) => DecodeError::Io(e),
            ImageError::Decoding(e) => DecodeError::InvalidContent(e.to_string()),
            ImageError::Limits(e) => DecodeError::InvalidContent(e.to_string()),
            ImageError::Parameter(e) => DecodeError::InvalidContent(e.to_string()),
            ImageError::Encoding(e) => DecodeError::InvalidContent(e.to_string()),
        }
    }
}

/// Capability that turns a file into a decoded image
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` and `kamadak-exif` crates
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardDecoder;

impl ImageDecoder for StandardDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let bytes = fs::read(path)?;

        // Format comes from the content alone; the extension is never trusted
        let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
        trace!(?path, format = ?reader.format(), "Decoding image");

        let image = reader.decode()?;

        Ok(DecodedImage {
            width: image.width(),
            height: image.height(),
            date_time: read_date_time(path, &bytes),
        })
    }
}

/// Find the first `DateTime` field in the image's EXIF block
fn read_date_time(path: &Path, bytes: &[u8]) -> Option<String> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(?path, error = %e, "No EXIF data");
            return None;
        }
    };

    let field = exif.fields().find(|field| field.tag == Tag::DateTime)?;

    match &field.value {
        Value::Ascii(values) => values
            .first()
            .map(|value| String::from_utf8_lossy(value).into_owned()),
        _ => Some(field.display_value().to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_decode_jpeg_with_date() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, fixtures::jpeg_with_date("2020:01:15 08:00:00")).unwrap();

        let decoded = StandardDecoder.decode(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 4));
        assert_eq!(decoded.date_time.as_deref(), Some("2020:01:15 08:00:00"));
    }

    #[test]
    fn test_decode_png_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.png");
        fs::write(&path, fixtures::plain_png()).unwrap();

        let decoded = StandardDecoder.decode(&path).unwrap();
        assert!(decoded.date_time.is_none());
    }

    #[test]
    fn test_decode_misnamed_file_by_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.dat");
        fs::write(&path, fixtures::plain_jpeg()).unwrap();

        assert!(StandardDecoder.decode(&path).is_ok());
    }

    #[test]
    fn test_decode_text_is_unknown_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "shopping list: milk, eggs").unwrap();

        let err = StandardDecoder.decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownFormat(_)), "{err:?}");
    }

    #[test]
    fn test_decode_text_with_image_extension_is_unknown_format() {
        let dir = tempdir().unwrap();

        let path = dir.path().join("notes.jpg");
        fs::write(&path, "<html><body>not a photo</body></html>").unwrap();
        let err = StandardDecoder.decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownFormat(_)), "{err:?}");

        let path = dir.path().join("empty.png");
        fs::write(&path, b"").unwrap();
        let err = StandardDecoder.decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownFormat(_)), "{err:?}");
    }

    #[test]
    fn test_decode_broken_png_is_invalid_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, fixtures::corrupt_png()).unwrap();

        let err = StandardDecoder.decode(&path).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidContent(_)), "{err:?}");
    }

    #[test]
    fn test_decode_missing_file_is_io() {
        let dir = tempdir().unwrap();
        let err = StandardDecoder.decode(&dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn test_unsupported_error_mapping() {
        use image::error::{ImageFormatHint, UnsupportedError};

        let err = ImageError::Unsupported(UnsupportedError::from_format_and_kind(
            ImageFormatHint::Unknown,
            UnsupportedErrorKind::Format(ImageFormatHint::Unknown),
        ));
        assert!(matches!(DecodeError::from(err), DecodeError::UnknownFormat(_)));

        let err = ImageError::IoError(std::io::Error::other("disk gone"));
        assert!(matches!(DecodeError::from(err), DecodeError::Io(_)));
    }
}
