//! Caller identity and private-repository policy.
//!
//! The transport hands us an opaque identity string; here it comes from the
//! username of an `Authorization: Basic` header. Credential verification
//! itself belongs to the transport layer (a reverse proxy or httpd in front
//! of the server); this module only extracts the name and matches it against
//! the repository being accessed.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use restbay_store::RepoId;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};

/// The caller as seen by access policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Extract the caller identity from request headers, if present.
///
/// Understands `Authorization: Basic <base64(user:pass)>` and reduces it to
/// the user name. Anything malformed yields `None`.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, _pass) = decoded.split_once(':')?;
    if user.is_empty() {
        return None;
    }
    Some(Identity::user(user))
}

/// Enforce private-repo policy for one request.
///
/// In private mode a caller identity is required and must equal the matched
/// repo name. The default repository carries no name: it stays open unless
/// `private_default_repo` is set, in which case it is refused outright.
pub fn check_private_access(
    config: &ServerConfig,
    identity: Option<&Identity>,
    repo: &RepoId,
) -> ApiResult<()> {
    if !config.private_repos {
        return Ok(());
    }
    match repo.name() {
        None => {
            if config.private_default_repo {
                tracing::warn!("default repository refused under private-repo policy");
                return Err(ApiError::Unauthorized);
            }
            Ok(())
        }
        Some(repo_name) => match identity {
            Some(id) if id.name == repo_name => Ok(()),
            _ => {
                tracing::warn!(repo = repo_name, "caller identity does not match repository");
                Err(ApiError::Unauthorized)
            }
        },
    }
}
