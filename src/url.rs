//! Mirror URL parsing and redirect-location resolution.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// A mirror's wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
    Ftp,
}

impl Protocol {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "ftp" => Some(Self::Ftp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ftp => "ftp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when a string does not parse as a mirror URL.
#[derive(Debug, Error)]
#[error("not a valid http(s)/ftp URL: {0}")]
pub struct UrlError(pub String);

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?i)^(https?|ftp)://([\w.-]+(?::\d+)?)((?:/(.+?))?/([^/]+)?)?$").unwrap()
});

/// A parsed mirror address: protocol, host (with optional port), request path
/// and filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorUrl {
    pub url: String,
    pub protocol: Protocol,
    pub host: String,
    /// The request-target, e.g. `/dir/file.iso`. Defaults to `/` when absent.
    pub request: String,
    /// Path component without the leading/trailing slashes, e.g. `dir`.
    pub path: String,
    /// The final path segment, e.g. `file.iso`. Empty if the server decides it.
    pub filename: String,
}

impl MirrorUrl {
    /// Parses a URL string, returning [`UrlError`] if it does not match the
    /// supported `http(s)://` / `ftp://` shape.
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        let caps = URL_RE
            .captures(url)
            .ok_or_else(|| UrlError(url.to_string()))?;
        #[allow(clippy::unwrap_used)]
        let protocol_str = caps.get(1).unwrap().as_str();
        #[allow(clippy::unwrap_used)]
        let protocol = Protocol::parse(protocol_str).unwrap();
        #[allow(clippy::unwrap_used)]
        let host = caps.get(2).unwrap().as_str().to_string();
        let request = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/".to_string());
        let path = caps.get(4).map_or(String::new(), |m| m.as_str().to_string());
        let filename = caps.get(5).map_or(String::new(), |m| m.as_str().to_string());

        Ok(Self {
            url: url.to_string(),
            protocol,
            host,
            request,
            path,
            filename,
        })
    }

    /// Resolves an HTTP(S) `Location` redirect header against this URL, per
    /// RFC 7231: absolute, root-relative, or relative to the current request
    /// path.
    pub fn resolve_redirect(&self, location: &str) -> Result<Self, UrlError> {
        static REDIRECT_RE: LazyLock<Regex> = LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"(?i)^(https?://[^/]+)?((/)?(?:.*))$").unwrap()
        });
        let caps = REDIRECT_RE
            .captures(location)
            .ok_or_else(|| UrlError(location.to_string()))?;

        let resolved = if let Some(host_part) = caps.get(1).filter(|m| !m.as_str().is_empty()) {
            let _ = host_part;
            location.to_string()
        } else if caps.get(3).is_some() {
            format!("{}://{}{}", self.protocol, self.host, &caps[2])
        } else {
            let base = self.request.rsplit_once('/').map_or("/", |(head, _)| head);
            format!("{}://{}{}/{}", self.protocol, self.host, base, &caps[2])
        };

        Self::parse(&resolved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_http_url() {
        let url = MirrorUrl::parse("http://example.com/dir/file.iso").unwrap();
        assert_eq!(url.protocol, Protocol::Http);
        assert_eq!(url.host, "example.com");
        assert_eq!(url.request, "/dir/file.iso");
        assert_eq!(url.path, "dir");
        assert_eq!(url.filename, "file.iso");
    }

    #[test]
    fn parses_host_with_port_and_no_path() {
        let url = MirrorUrl::parse("ftp://mirror.example.com:2121").unwrap();
        assert_eq!(url.protocol, Protocol::Ftp);
        assert_eq!(url.host, "mirror.example.com:2121");
        assert_eq!(url.request, "/");
        assert_eq!(url.filename, "");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(MirrorUrl::parse("gopher://example.com/file").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(MirrorUrl::parse("not a url").is_err());
    }

    #[test]
    fn redirect_absolute() {
        let base = MirrorUrl::parse("http://a.example.com/dir/file.iso").unwrap();
        let redirected = base.resolve_redirect("https://b.example.com/other.iso").unwrap();
        assert_eq!(redirected.host, "b.example.com");
        assert_eq!(redirected.request, "/other.iso");
    }

    #[test]
    fn redirect_root_relative() {
        let base = MirrorUrl::parse("http://a.example.com/dir/file.iso").unwrap();
        let redirected = base.resolve_redirect("/new/place.iso").unwrap();
        assert_eq!(redirected.host, "a.example.com");
        assert_eq!(redirected.request, "/new/place.iso");
    }

    #[test]
    fn redirect_relative_to_current_directory() {
        let base = MirrorUrl::parse("http://a.example.com/dir/file.iso").unwrap();
        let redirected = base.resolve_redirect("moved.iso").unwrap();
        assert_eq!(redirected.host, "a.example.com");
        assert_eq!(redirected.request, "/dir/moved.iso");
    }
}
