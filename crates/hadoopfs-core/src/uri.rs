//! URI helpers for `scheme://authority/path` strings.
//!
//! Only separators are normalized. `.` and `..` are left alone because the
//! hadoop client passes them through untouched, and two URIs are equal iff
//! their normalized strings are equal.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FsError, FsResult};

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://([^/]*)(.*)$").expect("URI regex is valid")
});

/// A URI split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uri {
    /// Scheme, e.g. `hdfs`.
    pub scheme: String,
    /// Cluster identifier; empty means the client's default cluster.
    pub authority: String,
    /// Path component, including its leading `/` (empty if absent).
    pub path: String,
}

impl Uri {
    /// Parse a URI. Fails with [`FsError::MalformedUri`] if there's no scheme.
    pub fn parse(uri: &str) -> FsResult<Self> {
        let caps = URI_RE
            .captures(uri)
            .ok_or_else(|| FsError::malformed_uri(uri))?;
        Ok(Self {
            scheme: caps[1].to_string(),
            authority: caps[2].to_string(),
            path: caps[3].to_string(),
        })
    }

    /// `scheme://authority`, the prefix bare paths from the tool are hung on.
    pub fn prefix(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }

    /// Same URI with a normalized path.
    pub fn normalized(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: normalize_separators(&self.path),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.path)
    }
}

/// Split `uri` into scheme, authority and path.
pub fn split(uri: &str) -> FsResult<(String, String, String)> {
    let Uri {
        scheme,
        authority,
        path,
    } = Uri::parse(uri)?;
    Ok((scheme, authority, path))
}

/// Build a URI from parts. Redundant `/` are collapsed; `.`/`..` are kept.
pub fn join<S: AsRef<str>>(scheme: &str, authority: &str, segments: &[S]) -> String {
    let mut path = String::from("/");
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() {
            continue;
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(segment);
    }
    format!("{}://{}{}", scheme, authority, normalize_separators(&path))
}

/// True if `s` looks like `scheme://...`.
pub fn is_uri(s: &str) -> bool {
    URI_RE.is_match(s)
}

/// The scheme of `s`, or `None` for a plain path.
pub fn scheme_of(s: &str) -> Option<&str> {
    URI_RE
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Join `segment` onto `base` the way a path join would.
///
/// A full URI in `segment` replaces `base` outright; an absolute segment
/// keeps only the base's `scheme://authority`.
pub fn path_join(base: &str, segment: &str) -> String {
    if is_uri(segment) {
        return segment.to_string();
    }
    match Uri::parse(base) {
        Ok(uri) => {
            let path = if segment.starts_with('/') {
                segment.to_string()
            } else {
                format!("{}/{}", uri.path, segment)
            };
            format!("{}{}", uri.prefix(), normalize_separators(&path))
        }
        Err(_) if segment.starts_with('/') || base.is_empty() => segment.to_string(),
        Err(_) => normalize_separators(&format!("{}/{}", base, segment)),
    }
}

/// Collapse runs of `/` into one.
pub fn normalize_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}

/// Normalize the separators of a URI or plain path.
pub fn normalize(uri: &str) -> String {
    match Uri::parse(uri) {
        Ok(parsed) => parsed.normalized().to_string(),
        Err(_) => normalize_separators(uri),
    }
}
