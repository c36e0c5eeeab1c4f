//! Request dispatch: route matching, policy checks, and operation glue.
//!
//! One fallback handler receives every request, matches it against the
//! ordered route table, applies private-repo and append-only policy, then
//! drives the blob store. Bodies stream through in both directions.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

use restbay_store::{BlobEntry, BlobKind, BlobStore, RepoId};

use crate::auth;
use crate::config::ServerConfig;
use crate::content;
use crate::error::{ApiError, ApiResult};
use crate::routes::{match_route, OpKind, RouteMatch};

/// Listing media type for the v1 API (plain names).
pub const MIME_V1: &str = "application/vnd.x.restic.rest.v1";
/// Listing media type for the v2 API ({name, size} entries).
pub const MIME_V2: &str = "application/vnd.x.restic.rest.v2";

const OCTET_STREAM: &str = "application/octet-stream";

/// Everything a handler needs, constructed once at startup and shared.
#[derive(Clone, Debug)]
pub struct ServerContext {
    pub config: ServerConfig,
    pub store: BlobStore,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        let store = BlobStore::new(config.path.clone(), config.max_repo_size);
        Self { config, store }
    }
}

/// Fallback handler for every request the server receives.
pub async fn dispatch(State(ctx): State<Arc<ServerContext>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let Some(route) = match_route(&parts.method, parts.uri.path()) else {
        tracing::debug!(method = %parts.method, path = parts.uri.path(), "no route matched");
        return StatusCode::NOT_FOUND.into_response();
    };
    match run(&ctx, route, &parts, body).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn run(
    ctx: &ServerContext,
    route: RouteMatch,
    parts: &Parts,
    body: Body,
) -> ApiResult<Response> {
    let repo = RepoId::from_segment(route.repo.as_deref()).map_err(ApiError::from)?;
    let identity = auth::identity_from_headers(&parts.headers);
    auth::check_private_access(&ctx.config, identity.as_ref(), &repo)?;

    match route.op {
        OpKind::CheckConfig => {
            let size = ctx.store.stat(&repo, &BlobKind::Config, "").await?;
            Ok(head_response(size))
        }
        OpKind::GetConfig => {
            let (file, total) = ctx.store.open(&repo, &BlobKind::Config, "").await?;
            content::serve_file(
                file,
                total,
                range_header(parts),
                ctx.config.block_size,
                None,
            )
            .await
        }
        OpKind::SaveConfig => save_body(ctx, &repo, &BlobKind::Config, "", parts, body).await,
        OpKind::DeleteConfig => {
            ensure_deletable(ctx, &BlobKind::Config)?;
            ctx.store.remove(&repo, &BlobKind::Config, "").await?;
            Ok(empty_ok())
        }
        OpKind::ListBlobs => {
            let kind = BlobKind::from_segment(required(route.kind.as_deref())?)?;
            let entries = ctx.store.list(&repo, &kind).await?;
            list_response(&parts.headers, entries)
        }
        OpKind::CheckBlob => {
            let kind = BlobKind::from_segment(required(route.kind.as_deref())?)?;
            let size = ctx
                .store
                .stat(&repo, &kind, required(route.name.as_deref())?)
                .await?;
            Ok(head_response(size))
        }
        OpKind::GetBlob => {
            let kind = BlobKind::from_segment(required(route.kind.as_deref())?)?;
            let (file, total) = ctx
                .store
                .open(&repo, &kind, required(route.name.as_deref())?)
                .await?;
            content::serve_file(
                file,
                total,
                range_header(parts),
                ctx.config.block_size,
                Some(OCTET_STREAM),
            )
            .await
        }
        OpKind::SaveBlob => {
            let kind = BlobKind::from_segment(required(route.kind.as_deref())?)?;
            save_body(
                ctx,
                &repo,
                &kind,
                required(route.name.as_deref())?,
                parts,
                body,
            )
            .await
        }
        OpKind::DeleteBlob => {
            let kind = BlobKind::from_segment(required(route.kind.as_deref())?)?;
            ensure_deletable(ctx, &kind)?;
            ctx.store
                .remove(&repo, &kind, required(route.name.as_deref())?)
                .await?;
            Ok(empty_ok())
        }
        OpKind::CreateRepo => {
            if !create_confirmed(parts.uri.query()) {
                return Err(ApiError::BadRequest(
                    "repository creation requires create=true".into(),
                ));
            }
            ctx.store.create_repo(&repo).await?;
            Ok(empty_ok())
        }
    }
}

/// A route placeholder the table guarantees to have bound.
fn required(param: Option<&str>) -> ApiResult<&str> {
    param.ok_or_else(|| ApiError::Internal("route placeholder not bound".into()))
}

fn range_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn empty_ok() -> Response {
    StatusCode::OK.into_response()
}

/// 200 with the blob size and no body or content type.
fn head_response(size: u64) -> Response {
    let mut resp = StatusCode::OK.into_response();
    resp.headers_mut()
        .insert(header::CONTENT_LENGTH, size.into());
    resp
}

fn ensure_deletable(ctx: &ServerContext, kind: &BlobKind) -> ApiResult<()> {
    if ctx.config.append_only && !kind.deletable_when_append_only() {
        tracing::warn!(%kind, "delete blocked by append-only policy");
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Stream a request body into a new blob.
async fn save_body(
    ctx: &ServerContext,
    repo: &RepoId,
    kind: &BlobKind,
    name: &str,
    parts: &Parts,
    body: Body,
) -> ApiResult<Response> {
    let declared = declared_length(&parts.headers);
    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(stream);
    ctx.store
        .save(repo, kind, name, &mut reader, declared)
        .await?;
    Ok(empty_ok())
}

/// Render a listing as v1 (names) or v2 ({name, size}) per the Accept header.
fn list_response(headers: &HeaderMap, entries: Vec<BlobEntry>) -> ApiResult<Response> {
    let wants_v2 = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains(MIME_V2));

    let (mime, payload) = if wants_v2 {
        (MIME_V2, serde_json::to_string(&entries))
    } else {
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        (MIME_V1, serde_json::to_string(&names))
    };
    let payload = payload.map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, mime)], payload).into_response())
}

/// Whether the request's query string confirms repository creation.
fn create_confirmed(query: Option<&str>) -> bool {
    query
        .unwrap_or_default()
        .split('&')
        .any(|pair| pair == "create=true")
}
