//! Request resolution and file responses.
//!
//! Resolution is a pure table lookup: the URL prefix and leading slash are
//! stripped and the remainder is looked up as a public path. Responses are
//! written with `tiny_http` and support HEAD, `If-None-Match` and single
//! byte ranges.

use crate::error::Result;
use crate::registry::Registry;
use percent_encoding::percent_decode_str;
use std::fs::{File, Metadata};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::UNIX_EPOCH;
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::debug;

/// Cache policy for URLs that embed a content digest.
const IMMUTABLE: &str = "public, max-age=31536000, immutable";
/// Cache policy for content whose URL does not change with its bytes.
const REVALIDATE: &str = "no-cache";

/// Outcome of resolving a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Found(&'a Path),
    NotFound,
}

impl Registry {
    /// Resolve a request URL to the physical file serving it.
    pub fn resolve(&self, url: &str) -> Resolution<'_> {
        match self.lookup(url) {
            Some((_, physical)) => Resolution::Found(physical),
            None => Resolution::NotFound,
        }
    }

    /// Answer a request: the mapped file, or 404.
    pub fn serve(&self, request: Request) -> Result<()> {
        match self.lookup(request.url()) {
            Some((public, physical)) => {
                let cache_control = self.cache_control(&public);
                respond_file(request, physical, cache_control)
            }
            None => {
                debug!(url = request.url(), "no asset mapped");
                respond_status(request, 404, "404 Not Found")
            }
        }
    }

    fn lookup(&self, url: &str) -> Option<(String, &Path)> {
        let public = public_path_from_url(url, &self.config.url_prefix)?;
        let physical = self.physical_path(&public)?;
        Some((public, physical))
    }

    /// Only digest-bearing URLs are cached forever; the rest revalidate.
    fn cache_control(&self, public: &str) -> &'static str {
        if self.tables.is_fingerprinted(public) {
            IMMUTABLE
        } else {
            REVALIDATE
        }
    }
}

/// Strip query, fragment, mount prefix and leading slash; percent-decode the rest.
fn public_path_from_url(url: &str, url_prefix: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8().ok()?;

    let mut rest: &str = &decoded;
    if !url_prefix.is_empty()
        && let Some(stripped) = rest
            .strip_prefix('/')
            .and_then(|r| r.strip_prefix(url_prefix))
        && (stripped.is_empty() || stripped.starts_with('/'))
    {
        rest = stripped;
    }

    Some(rest.strip_prefix('/').unwrap_or(rest).to_string())
}

/// Byte range requested by a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    Full,
    Partial(u64, u64),
    Unsatisfiable,
}

/// Parse a single `bytes=` range. Multiple or malformed ranges fall back to the full body.
fn parse_range(value: &str, size: u64) -> ByteRange {
    let Some(ranges) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = ranges.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    // "-500" - last 500 bytes
    if start.is_empty() {
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial(size.saturating_sub(suffix), size - 1);
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= size {
        return ByteRange::Unsatisfiable;
    }

    // "0-" - from start to end
    if end.is_empty() {
        return ByteRange::Partial(start, size - 1);
    }

    match end.parse::<u64>() {
        Ok(end) if end >= start => ByteRange::Partial(start, end.min(size - 1)),
        _ => ByteRange::Full,
    }
}

fn respond_file(request: Request, path: &Path, cache_control: &'static str) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        let response = with_headers(
            Response::from_string("405 Method Not Allowed").with_status_code(405),
            &[("Allow", "GET, HEAD"), ("Content-Type", PLAIN)],
        );
        request.respond(response)?;
        return Ok(());
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "mapped file missing on disk");
            return respond_status(request, 404, "404 Not Found");
        }
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata()?;
    let size = metadata.len();
    let etag = entity_tag(&metadata);
    let mime = content_type(path);

    if let Some(candidates) = header_value(&request, "If-None-Match")
        && etag_matches(&candidates, &etag)
    {
        let response = with_headers(
            Response::empty(StatusCode(304)),
            &[("ETag", etag.as_str()), ("Cache-Control", cache_control)],
        );
        request.respond(response)?;
        return Ok(());
    }

    let range = header_value(&request, "Range")
        .map(|value| parse_range(&value, size))
        .unwrap_or(ByteRange::Full);

    match range {
        ByteRange::Full => {
            let response = with_headers(
                Response::from_file(file),
                &[
                    ("Content-Type", mime),
                    ("ETag", etag.as_str()),
                    ("Cache-Control", cache_control),
                    ("Accept-Ranges", "bytes"),
                ],
            );
            request.respond(response)?;
        }
        ByteRange::Partial(start, end) => {
            let mut file = file;
            file.seek(SeekFrom::Start(start))?;
            let length = end - start + 1;
            let content_range = format!("bytes {start}-{end}/{size}");

            let response = Response::new(
                StatusCode(206),
                Vec::new(),
                file.take(length),
                Some(length as usize),
                None,
            );
            let response = with_headers(
                response,
                &[
                    ("Content-Type", mime),
                    ("Content-Range", content_range.as_str()),
                    ("ETag", etag.as_str()),
                    ("Cache-Control", cache_control),
                    ("Accept-Ranges", "bytes"),
                ],
            );
            request.respond(response)?;
        }
        ByteRange::Unsatisfiable => {
            let content_range = format!("bytes */{size}");
            let response = with_headers(
                Response::empty(StatusCode(416)),
                &[("Content-Range", content_range.as_str())],
            );
            request.respond(response)?;
        }
    }

    Ok(())
}

fn respond_status(request: Request, status: u16, body: &str) -> Result<()> {
    let response = with_headers(
        Response::from_string(body).with_status_code(status),
        &[("Content-Type", PLAIN)],
    );
    request.respond(response)?;
    Ok(())
}

fn with_headers<R: Read>(mut response: Response<R>, headers: &[(&str, &str)]) -> Response<R> {
    for (field, value) in headers {
        // Only generated ASCII values reach here
        if let Ok(header) = Header::from_bytes(field.as_bytes(), value.as_bytes()) {
            response.add_header(header);
        }
    }
    response
}

fn header_value(request: &Request, field: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(field))
        .map(|h| h.value.as_str().to_string())
}

/// Weak validator from size and modification time.
fn entity_tag(metadata: &Metadata) -> String {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("\"{:x}-{:x}\"", metadata.len(), modified)
}

fn etag_matches(candidates: &str, etag: &str) -> bool {
    candidates.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

const PLAIN: &str = "text/plain; charset=utf-8";

/// Guess a Content-Type from the file extension.
fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("json" | "map") => "application/json",
        Some("txt") => PLAIN,
        Some("xml") => "application/xml",
        Some("wasm") => "application/wasm",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Matcher};
    use std::fs;
    use std::io::Write;
    use std::net::TcpStream;
    use std::path::PathBuf;
    use std::thread;
    use tempfile::TempDir;

    const SCRIPT: &str = "var code = 'test';\n";
    const SCRIPT_PUBLIC: &str = "js/file.bf5a6a7119046d97ee509d017080c6aa.js";

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("js")).unwrap();
        fs::create_dir_all(temp_dir.path().join("css")).unwrap();
        fs::write(temp_dir.path().join("js/file.js"), SCRIPT).unwrap();
        fs::write(temp_dir.path().join("css/file.css"), "body {}\n").unwrap();
        temp_dir
    }

    /// Serve exactly one raw HTTP request and return the raw response.
    fn round_trip(registry: Registry, raw: &str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let request = server.recv().unwrap();
            registry.serve(request).unwrap();
        });

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        handle.join().unwrap();
        response
    }

    fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
    }

    fn split(response: &str) -> (&str, &str) {
        response.split_once("\r\n\r\n").unwrap()
    }

    #[test]
    fn test_public_path_from_url() {
        assert_eq!(
            public_path_from_url("/assets/js/app.js", "assets").as_deref(),
            Some("js/app.js")
        );
        assert_eq!(
            public_path_from_url("/js/app.js", "").as_deref(),
            Some("js/app.js")
        );
        assert_eq!(
            public_path_from_url("/assets/js/app.js?v=1#top", "assets").as_deref(),
            Some("js/app.js")
        );
        assert_eq!(
            public_path_from_url("/assets/my%20file.js", "assets").as_deref(),
            Some("my file.js")
        );
        // Prefix only strips on a segment boundary
        assert_eq!(
            public_path_from_url("/assetsx/app.js", "assets").as_deref(),
            Some("assetsx/app.js")
        );
        // Prefix absent: remainder is used as-is
        assert_eq!(
            public_path_from_url("/js/app.js", "assets").as_deref(),
            Some("js/app.js")
        );
        assert_eq!(public_path_from_url("/%ff", ""), None);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("bytes=0-3", 10), ByteRange::Partial(0, 3));
        assert_eq!(parse_range("bytes=4-", 10), ByteRange::Partial(4, 9));
        assert_eq!(parse_range("bytes=-3", 10), ByteRange::Partial(7, 9));
        assert_eq!(parse_range("bytes=-30", 10), ByteRange::Partial(0, 9));
        assert_eq!(parse_range("bytes=5-100", 10), ByteRange::Partial(5, 9));
        assert_eq!(parse_range("bytes=10-", 10), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=-0", 10), ByteRange::Unsatisfiable);
        assert_eq!(parse_range("bytes=5-2", 10), ByteRange::Full);
        assert_eq!(parse_range("bytes=0-1,4-5", 10), ByteRange::Full);
        assert_eq!(parse_range("items=0-1", 10), ByteRange::Full);
        assert_eq!(parse_range("bytes=abc", 10), ByteRange::Full);
    }

    #[test]
    fn test_etag_matches() {
        assert!(etag_matches("\"a-b\"", "\"a-b\""));
        assert!(etag_matches("\"x\", W/\"a-b\"", "\"a-b\""));
        assert!(etag_matches("*", "\"a-b\""));
        assert!(!etag_matches("\"x\"", "\"a-b\""));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a.JS")), "text/javascript; charset=utf-8");
        assert_eq!(content_type(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
    }

    #[test]
    fn test_resolve() {
        let temp_dir = fixture();
        let config = Config::default()
            .with_fingerprint(true)
            .with_url_prefix("assets");
        let registry = Registry::with_roots(config, [temp_dir.path()]).unwrap();

        match registry.resolve(&format!("/assets/{SCRIPT_PUBLIC}")) {
            Resolution::Found(physical) => {
                assert_eq!(fs::read_to_string(physical).unwrap(), SCRIPT)
            }
            Resolution::NotFound => panic!("expected {SCRIPT_PUBLIC} to resolve"),
        }

        // Logical paths are not servable in fingerprint mode
        assert_eq!(registry.resolve("/assets/js/file.js"), Resolution::NotFound);
        assert_eq!(registry.resolve("/assets/../js/file.js"), Resolution::NotFound);
    }

    #[test]
    fn test_serve_fingerprinted() {
        let temp_dir = fixture();
        let config = Config::default()
            .with_fingerprint(true)
            .with_url_prefix("assets");
        let registry = Registry::with_roots(config, [temp_dir.path()]).unwrap();

        let response = round_trip(registry, &get(&format!("/assets/{SCRIPT_PUBLIC}")));
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("immutable"));
        assert!(head.contains("text/javascript"));
        assert_eq!(body, SCRIPT);
    }

    #[test]
    fn test_serve_without_fingerprint() {
        let temp_dir = fixture();
        let registry = Registry::with_roots(Config::default(), [temp_dir.path()]).unwrap();

        let response = round_trip(registry, &get("/js/file.js"));
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("no-cache"));
        assert_eq!(body, SCRIPT);
    }

    #[test]
    fn test_serve_unfingerprinted_cache_copy_revalidates() {
        let temp_dir = fixture();
        fs::write(temp_dir.path().join("LICENSE"), "MIT").unwrap();
        let config = Config::default()
            .with_fingerprint(true)
            .with_matcher(Matcher::new(|_, _| true));
        let registry = Registry::with_roots(config, [temp_dir.path()]).unwrap();

        let response = round_trip(registry, &get("/LICENSE"));
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("no-cache"), "{head}");
        assert!(!head.contains("immutable"), "{head}");
        assert_eq!(body, "MIT");
    }

    #[test]
    fn test_serve_not_found() {
        let temp_dir = fixture();
        let registry =
            Registry::with_roots(Config::default().with_fingerprint(true), [temp_dir.path()])
                .unwrap();

        let response = round_trip(registry, &get("/js/file.js"));
        assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    }

    #[test]
    fn test_serve_range() {
        let temp_dir = fixture();
        let registry = Registry::with_roots(Config::default(), [temp_dir.path()]).unwrap();

        let raw = "GET /js/file.js HTTP/1.1\r\nHost: localhost\r\nRange: bytes=4-7\r\nConnection: close\r\n\r\n";
        let response = round_trip(registry, raw);
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 206"), "{head}");
        assert!(head.contains(&format!("bytes 4-7/{}", SCRIPT.len())));
        assert_eq!(body, "code");
    }

    #[test]
    fn test_serve_if_none_match() {
        let temp_dir = fixture();
        let registry = Registry::with_roots(Config::default(), [temp_dir.path()]).unwrap();
        let metadata = fs::metadata(temp_dir.path().join("js/file.js")).unwrap();
        let etag = entity_tag(&metadata);

        let raw = format!(
            "GET /js/file.js HTTP/1.1\r\nHost: localhost\r\nIf-None-Match: {etag}\r\nConnection: close\r\n\r\n"
        );
        let response = round_trip(registry, &raw);
        assert!(response.starts_with("HTTP/1.1 304"), "{response}");
    }

    #[test]
    fn test_serve_rejects_post() {
        let temp_dir = fixture();
        let registry = Registry::with_roots(Config::default(), [temp_dir.path()]).unwrap();

        let raw = "POST /js/file.js HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let response = round_trip(registry, raw);
        assert!(response.starts_with("HTTP/1.1 405"), "{response}");
    }

    #[test]
    fn test_serve_from_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let public = "webpack/file.bf5a6a7119046d97ee509d017080c6aa.js";
        let served: PathBuf = temp_dir.path().join(public);
        fs::create_dir_all(served.parent().unwrap()).unwrap();
        fs::write(&served, SCRIPT).unwrap();

        let manifest = temp_dir.path().join("manifest.json");
        let value = serde_json::json!({
            "paths": { "webpack/file.js": public },
            "hostname": "http://test.com",
            "urlPrefix": "assets"
        });
        fs::write(&manifest, serde_json::to_vec(&value).unwrap()).unwrap();

        let registry = Registry::from_manifest(&manifest, temp_dir.path()).unwrap();
        assert_eq!(
            registry.asset_path("webpack/file.js"),
            format!("http://test.com/assets/{public}")
        );

        let response = round_trip(registry, &get(&format!("/assets/{public}")));
        let (head, body) = split(&response);
        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("immutable"), "{head}");
        assert_eq!(body, SCRIPT);
    }

    #[test]
    fn test_serve_manifest_identity_entry_revalidates() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("robots.txt"), "User-agent: *\n").unwrap();

        let manifest = temp_dir.path().join("manifest.json");
        let value = serde_json::json!({ "paths": { "robots.txt": "robots.txt" } });
        fs::write(&manifest, serde_json::to_vec(&value).unwrap()).unwrap();

        let registry = Registry::from_manifest(&manifest, temp_dir.path()).unwrap();
        let response = round_trip(registry, &get("/robots.txt"));
        let (head, body) = split(&response);

        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("no-cache"), "{head}");
        assert_eq!(body, "User-agent: *\n");
    }
}
