//! Ordered route-template matching.
//!
//! Templates carry positional placeholders for repo, type, and name and are
//! tried top to bottom: the literal `config` routes and the two/three-segment
//! blob routes come before the catch-all create-repo templates, so
//! `/{repo}/config` can never be swallowed by `/{type}/{name}`. Trailing
//! slashes are significant: `GET /keys/` lists a type, `GET /keys/abc` reads
//! a blob. The optional repo segment is resolved here, once, at match time.

use axum::http::Method;

/// The operation a matched route dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    CheckConfig,
    GetConfig,
    SaveConfig,
    DeleteConfig,
    ListBlobs,
    CheckBlob,
    GetBlob,
    SaveBlob,
    DeleteBlob,
    CreateRepo,
}

/// A successful match: the operation plus its extracted parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub op: OpKind,
    pub repo: Option<String>,
    pub kind: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug)]
enum Seg {
    Lit(&'static str),
    Repo,
    Type,
    Name,
}

struct Template {
    method: Method,
    segs: &'static [Seg],
    trailing_slash: bool,
    op: OpKind,
}

const fn t(method: Method, segs: &'static [Seg], trailing_slash: bool, op: OpKind) -> Template {
    Template {
        method,
        segs,
        trailing_slash,
        op,
    }
}

/// The route table, in match order.
static TEMPLATES: &[Template] = &[
    // /config, /{repo}/config
    t(Method::HEAD, &[Seg::Lit("config")], false, OpKind::CheckConfig),
    t(Method::HEAD, &[Seg::Repo, Seg::Lit("config")], false, OpKind::CheckConfig),
    t(Method::GET, &[Seg::Lit("config")], false, OpKind::GetConfig),
    t(Method::GET, &[Seg::Repo, Seg::Lit("config")], false, OpKind::GetConfig),
    t(Method::POST, &[Seg::Lit("config")], false, OpKind::SaveConfig),
    t(Method::POST, &[Seg::Repo, Seg::Lit("config")], false, OpKind::SaveConfig),
    t(Method::DELETE, &[Seg::Lit("config")], false, OpKind::DeleteConfig),
    t(Method::DELETE, &[Seg::Repo, Seg::Lit("config")], false, OpKind::DeleteConfig),
    // /{type}/, /{repo}/{type}/
    t(Method::GET, &[Seg::Type], true, OpKind::ListBlobs),
    t(Method::GET, &[Seg::Repo, Seg::Type], true, OpKind::ListBlobs),
    // /{type}/{name}, /{repo}/{type}/{name}
    t(Method::HEAD, &[Seg::Type, Seg::Name], false, OpKind::CheckBlob),
    t(Method::HEAD, &[Seg::Repo, Seg::Type, Seg::Name], false, OpKind::CheckBlob),
    t(Method::GET, &[Seg::Type, Seg::Name], false, OpKind::GetBlob),
    t(Method::GET, &[Seg::Repo, Seg::Type, Seg::Name], false, OpKind::GetBlob),
    t(Method::POST, &[Seg::Type, Seg::Name], false, OpKind::SaveBlob),
    t(Method::POST, &[Seg::Repo, Seg::Type, Seg::Name], false, OpKind::SaveBlob),
    t(Method::DELETE, &[Seg::Type, Seg::Name], false, OpKind::DeleteBlob),
    t(Method::DELETE, &[Seg::Repo, Seg::Type, Seg::Name], false, OpKind::DeleteBlob),
    // Catch-alls last: /, /{repo}, /{repo}/
    t(Method::POST, &[], true, OpKind::CreateRepo),
    t(Method::POST, &[Seg::Repo], false, OpKind::CreateRepo),
    t(Method::POST, &[Seg::Repo], true, OpKind::CreateRepo),
];

/// Match a (method, path) pair against the route table.
///
/// `path` is the request path without the query string. Returns `None` when
/// nothing matches, which the handler turns into 404.
pub fn match_route(method: &Method, path: &str) -> Option<RouteMatch> {
    let rest = path.strip_prefix('/')?;
    let (rest, trailing_slash) = match rest.strip_suffix('/') {
        Some(r) => (r, true),
        None => (rest, rest.is_empty()), // "/" is the root with trailing slash
    };
    let parts: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    };
    // An empty segment inside the path (e.g. "//") matches nothing.
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    'template: for tpl in TEMPLATES {
        if tpl.method != *method
            || tpl.trailing_slash != trailing_slash
            || tpl.segs.len() != parts.len()
        {
            continue;
        }
        let mut m = RouteMatch {
            op: tpl.op,
            repo: None,
            kind: None,
            name: None,
        };
        for (seg, part) in tpl.segs.iter().zip(&parts) {
            match seg {
                Seg::Lit(lit) => {
                    if lit != part {
                        continue 'template;
                    }
                }
                Seg::Repo => m.repo = Some((*part).to_string()),
                Seg::Type => m.kind = Some((*part).to_string()),
                Seg::Name => m.name = Some((*part).to_string()),
            }
        }
        return Some(m);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(method: Method, path: &str) -> Option<RouteMatch> {
        match_route(&method, path)
    }

    #[test]
    fn config_routes_with_and_without_repo() {
        let r = m(Method::HEAD, "/config").unwrap();
        assert_eq!(r.op, OpKind::CheckConfig);
        assert_eq!(r.repo, None);

        let r = m(Method::GET, "/alice/config").unwrap();
        assert_eq!(r.op, OpKind::GetConfig);
        assert_eq!(r.repo.as_deref(), Some("alice"));

        let r = m(Method::DELETE, "/config").unwrap();
        assert_eq!(r.op, OpKind::DeleteConfig);
    }

    #[test]
    fn repo_config_beats_type_name() {
        // Two segments ending in "config" are a config route, not a blob.
        let r = m(Method::GET, "/alice/config").unwrap();
        assert_eq!(r.op, OpKind::GetConfig);
        assert_eq!(r.kind, None);
    }

    #[test]
    fn trailing_slash_selects_listing() {
        let r = m(Method::GET, "/keys/").unwrap();
        assert_eq!(r.op, OpKind::ListBlobs);
        assert_eq!(r.kind.as_deref(), Some("keys"));
        assert_eq!(r.repo, None);

        let r = m(Method::GET, "/alice/data/").unwrap();
        assert_eq!(r.op, OpKind::ListBlobs);
        assert_eq!(r.repo.as_deref(), Some("alice"));
        assert_eq!(r.kind.as_deref(), Some("data"));
    }

    #[test]
    fn blob_routes_extract_all_params() {
        let r = m(Method::POST, "/alice/data/ab11").unwrap();
        assert_eq!(r.op, OpKind::SaveBlob);
        assert_eq!(r.repo.as_deref(), Some("alice"));
        assert_eq!(r.kind.as_deref(), Some("data"));
        assert_eq!(r.name.as_deref(), Some("ab11"));

        let r = m(Method::GET, "/locks/l1").unwrap();
        assert_eq!(r.op, OpKind::GetBlob);
        assert_eq!(r.repo, None);
        assert_eq!(r.name.as_deref(), Some("l1"));
    }

    #[test]
    fn create_repo_forms() {
        let r = m(Method::POST, "/").unwrap();
        assert_eq!(r.op, OpKind::CreateRepo);
        assert_eq!(r.repo, None);

        let r = m(Method::POST, "/alice").unwrap();
        assert_eq!(r.op, OpKind::CreateRepo);
        assert_eq!(r.repo.as_deref(), Some("alice"));

        let r = m(Method::POST, "/alice/").unwrap();
        assert_eq!(r.op, OpKind::CreateRepo);
    }

    #[test]
    fn unmatched_pairs_return_none() {
        assert!(m(Method::GET, "/").is_none());
        assert!(m(Method::PUT, "/keys/k1").is_none());
        assert!(m(Method::DELETE, "/keys/").is_none());
        assert!(m(Method::GET, "/a/b/c/d").is_none());
        assert!(m(Method::GET, "//keys").is_none());
        assert!(m(Method::GET, "no-leading-slash").is_none());
    }

    #[test]
    fn head_on_blob_is_check_not_get() {
        let r = m(Method::HEAD, "/snapshots/s1").unwrap();
        assert_eq!(r.op, OpKind::CheckBlob);
    }
}
