//! Range-aware content delivery.
//!
//! Only the single-range forms `bytes=start-end`, `bytes=start-` and
//! `bytes=-suffixLength` are accepted; everything else is answered with 416
//! and a `Content-Range: bytes */total`. Bodies stream from disk in
//! fixed-size blocks and are never buffered whole; a read failure mid-stream
//! aborts the response.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};

/// An effective (offset, length) window into a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

/// Parse a Range header against a file of `total` bytes.
///
/// `Ok(None)` means serve the whole file with 200; `bytes=0-` and a bare
/// `bytes=-` degrade to that. `bytes=-n` addresses the final `n` bytes.
/// A window with negative length or reaching past `total` is unsatisfiable.
pub fn parse_range(header: &str, total: u64) -> ApiResult<Option<ByteRange>> {
    let unsatisfiable = || ApiError::RangeNotSatisfiable { total };

    let spec = header.strip_prefix("bytes=").ok_or_else(unsatisfiable)?;
    if spec.contains(',') {
        // Multi-range requests are out of scope.
        return Err(unsatisfiable());
    }
    let (start, end) = spec.split_once('-').ok_or_else(unsatisfiable)?;

    match (start.is_empty(), end.is_empty()) {
        (true, true) => Ok(None),
        (true, false) => {
            let suffix: u64 = end.parse().map_err(|_| unsatisfiable())?;
            if suffix == 0 {
                return Err(unsatisfiable());
            }
            let offset = total.saturating_sub(suffix);
            let length = total - offset;
            // An empty file leaves no tail to serve.
            if length == 0 {
                return Err(unsatisfiable());
            }
            Ok(Some(ByteRange { offset, length }))
        }
        (false, true) => {
            let offset: u64 = start.parse().map_err(|_| unsatisfiable())?;
            if offset == 0 {
                return Ok(None);
            }
            if offset > total {
                return Err(unsatisfiable());
            }
            Ok(Some(ByteRange {
                offset,
                length: total - offset,
            }))
        }
        (false, false) => {
            let offset: u64 = start.parse().map_err(|_| unsatisfiable())?;
            let last: u64 = end.parse().map_err(|_| unsatisfiable())?;
            if last < offset {
                return Err(unsatisfiable());
            }
            let length = last - offset + 1;
            if offset + length > total {
                return Err(unsatisfiable());
            }
            Ok(Some(ByteRange { offset, length }))
        }
    }
}

/// Stream a file (or a window of it) as an HTTP response.
///
/// `content_type` is omitted for config responses; blob bodies are served as
/// `application/octet-stream`.
pub async fn serve_file(
    mut file: tokio::fs::File,
    total: u64,
    range_header: Option<&str>,
    block_size: usize,
    content_type: Option<&'static str>,
) -> ApiResult<Response> {
    let range = match range_header {
        Some(h) => parse_range(h, total)?,
        None => None,
    };

    let (status, length, extra) = match range {
        Some(r) => {
            file.seek(SeekFrom::Start(r.offset))
                .await
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            let content_range = format!(
                "bytes {}-{}/{}",
                r.offset,
                r.offset + r.length - 1,
                total
            );
            (StatusCode::PARTIAL_CONTENT, r.length, Some(content_range))
        }
        None => (StatusCode::OK, total, None),
    };

    let stream = ReaderStream::with_capacity(file.take(length), block_size);
    let mut response = (status, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_LENGTH, length.into());
    if let Some(content_range) = extra {
        headers.insert(
            header::CONTENT_RANGE,
            content_range
                .parse()
                .map_err(|_| ApiError::Internal("invalid content-range".into()))?,
        );
    }
    if let Some(ct) = content_type {
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(ct));
    }
    Ok(response)
}
