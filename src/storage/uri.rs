//! File URI helpers.
//!
//! Converts between filesystem paths and `file:` URIs per RFC 8089, with
//! percent-encoding per RFC 3986. Relative paths become `file:<segments>`,
//! absolute paths `file:///…`, Windows drive-letter paths `file:///C:/…`
//! (colon preserved), and UNC paths `file://<authority>/…`. Non-ASCII UTF-8
//! passes through unencoded and round-trips.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

/// Characters percent-encoded within a path segment.
///
/// The RFC 3986 reserved characters that cannot appear raw in a path
/// segment, plus characters invalid in URIs. `:` is left alone so Windows
/// drive letters survive.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|');

/// A file URI conversion error.
#[derive(Clone, Debug, Error)]
pub enum FileUriError {
    /// The URI does not have a `file:` scheme.
    #[error("{_0} is not a file: URI")]
    InvalidScheme(String),
    /// The URI percent-encoding does not decode to UTF-8.
    #[error("{_0} does not decode to UTF-8")]
    InvalidEncoding(String),
}

fn is_windows_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/')
}

fn encode_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_segments(path: &str) -> Result<String, FileUriError> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.to_string())
        .map_err(|_| FileUriError::InvalidEncoding(path.to_string()))
}

/// Convert a filesystem path to a `file:` URI.
///
/// Backslashes are treated as path separators, so Windows paths may be given
/// in either form.
#[must_use]
pub fn path_to_uri(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    if let Some(unc) = normalized.strip_prefix("//") {
        // //server/share/... keeps the authority after file://
        format!("file://{}", encode_segments(unc))
    } else if is_windows_drive(&normalized) {
        format!("file:///{}", encode_segments(&normalized))
    } else if normalized.starts_with('/') {
        format!("file://{}", encode_segments(&normalized))
    } else {
        format!("file:{}", encode_segments(&normalized))
    }
}

/// Convert a `file:` URI back to a filesystem path.
///
/// This is the inverse of [`path_to_uri`] up to separator normalization.
///
/// # Errors
/// Returns a [`FileUriError`] if the URI does not have a `file:` scheme or
/// does not decode to UTF-8.
pub fn uri_to_path(uri: &str) -> Result<String, FileUriError> {
    let rest = uri
        .strip_prefix("file:")
        .ok_or_else(|| FileUriError::InvalidScheme(uri.to_string()))?;
    if let Some(absolute) = rest.strip_prefix("///") {
        let decoded = decode_segments(absolute)?;
        if is_windows_drive(&decoded) {
            Ok(decoded)
        } else {
            Ok(format!("/{decoded}"))
        }
    } else if let Some(authority) = rest.strip_prefix("//") {
        Ok(format!("//{}", decode_segments(authority)?))
    } else {
        decode_segments(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_relative() {
        assert_eq!(path_to_uri("data/set.zarr"), "file:data/set.zarr");
        assert_eq!(uri_to_path("file:data/set.zarr").unwrap(), "data/set.zarr");
    }

    #[test]
    fn uri_absolute() {
        assert_eq!(path_to_uri("/tmp/my array.zarr"), "file:///tmp/my%20array.zarr");
        assert_eq!(
            uri_to_path("file:///tmp/my%20array.zarr").unwrap(),
            "/tmp/my array.zarr"
        );
    }

    #[test]
    fn uri_windows_drive() {
        assert_eq!(path_to_uri("C:\\data\\set.zarr"), "file:///C:/data/set.zarr");
        assert_eq!(
            uri_to_path("file:///C:/data/set.zarr").unwrap(),
            "C:/data/set.zarr"
        );
    }

    #[test]
    fn uri_unc() {
        assert_eq!(
            path_to_uri("\\\\server\\share\\set.zarr"),
            "file://server/share/set.zarr"
        );
        assert_eq!(
            uri_to_path("file://server/share/set.zarr").unwrap(),
            "//server/share/set.zarr"
        );
    }

    #[test]
    fn uri_utf8_round_trip() {
        for path in [
            "/tmp/Đà Lạt/東京.zarr",
            "relative/µs/árvíztűrő.zarr",
            "/percent%and#hash",
        ] {
            assert_eq!(uri_to_path(&path_to_uri(path)).unwrap(), path);
        }
    }

    #[test]
    fn uri_invalid() {
        assert!(uri_to_path("http://example.com").is_err());
        assert!(uri_to_path("file:%FF").is_err());
    }
}
