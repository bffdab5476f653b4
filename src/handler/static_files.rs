//! Static file serving module
//!
//! Maps request paths onto the served directory: files with conditional and
//! range support, `index.html` for directories, and a plain listing when a
//! directory has no index.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, IF_MODIFIED_SINCE, RANGE};
use hyper::{Method, Request, Response};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::fs;

use crate::http::{self, cache, mime, range::ByteRange};
use crate::logger;

const INDEX_FILE: &str = "index.html";

/// Escaped in listing links and trailing-slash redirects
const HREF_ESC_CHARSET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Serve the request path from `root`
pub async fn serve<B>(req: &Request<B>, root: &Path) -> Response<Full<Bytes>> {
    let url_path = percent_decode_str(req.uri().path())
        .decode_utf8_lossy()
        .into_owned();
    let query = req.uri().query();
    let is_head = req.method() == Method::HEAD;

    // Canonical URL of an index page is its directory
    if url_path.ends_with("/index.html") {
        return local_redirect("./", query);
    }

    let path = match resolve(root, &clean_path(&url_path)).await {
        Ok(path) => path,
        Err(e) => return error_response(&e, &url_path),
    };
    let metadata = match fs::metadata(&path).await {
        Ok(m) => m,
        Err(e) => return error_response(&e, &url_path),
    };

    if metadata.is_dir() {
        if !url_path.ends_with('/') {
            return local_redirect(&format!("{}/", base_name(&url_path)), query);
        }
        return serve_directory(req, &path, is_head).await;
    }

    if url_path.ends_with('/') {
        return local_redirect(&format!("../{}", base_name(&url_path)), query);
    }

    serve_file(req, &path, metadata.modified().ok(), is_head).await
}

/// Normalize a decoded URL path into a relative filesystem path
///
/// Empty and `.` segments are dropped; `..` removes the previous segment and
/// can never climb above the root.
fn clean_path(url_path: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for segment in url_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.iter().collect()
}

/// Last segment of a URL path, ignoring trailing slashes
fn base_name(url_path: &str) -> &str {
    url_path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(".")
}

/// Join and canonicalize, refusing anything that ends up outside the root
///
/// A symlink pointing out of the root reports `InvalidData`.
async fn resolve(root: &Path, relative: &Path) -> io::Result<PathBuf> {
    let root = fs::canonicalize(root).await?;
    let path = fs::canonicalize(root.join(relative)).await?;
    if path.starts_with(&root) {
        Ok(path)
    } else {
        Err(io::ErrorKind::InvalidData.into())
    }
}

async fn serve_directory<B>(req: &Request<B>, dir: &Path, is_head: bool) -> Response<Full<Bytes>> {
    let index = dir.join(INDEX_FILE);
    if let Ok(metadata) = fs::metadata(&index).await {
        if metadata.is_file() {
            return serve_file(req, &index, metadata.modified().ok(), is_head).await;
        }
    }

    match read_listing(dir).await {
        Ok(entries) => http::response::build_html_response(render_listing(&entries), is_head),
        Err(e) => {
            logger::log_error(&format!(
                "Error reading directory '{}': {e}",
                dir.display()
            ));
            http::build_500_response()
        }
    }
}

/// Directory entries as display names, directories suffixed with `/`,
/// ordered by file name
async fn read_listing(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        entries.push((name, is_dir));
    }
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    Ok(entries
        .into_iter()
        .map(|(name, is_dir)| if is_dir { name + "/" } else { name })
        .collect())
}

fn render_listing(entries: &[String]) -> String {
    let mut html = String::from(
        "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n",
    );
    for name in entries {
        let mut href = utf8_percent_encode(name, HREF_ESC_CHARSET).to_string();
        // "a:b" would be read as a scheme
        if name.contains(':') {
            href.insert_str(0, "./");
        }
        let _ = writeln!(
            html,
            "<a href=\"{href}\">{}</a>",
            http::response::escape_html(name)
        );
    }
    html.push_str("</pre>\n");
    html
}

async fn serve_file<B>(
    req: &Request<B>,
    path: &Path,
    modified: Option<SystemTime>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let last_modified = modified.and_then(cache::last_modified_header);
    let conditional = matches!(*req.method(), Method::GET | Method::HEAD);

    if let (true, Some(modified), Some(header)) = (conditional, modified, last_modified.as_deref()) {
        if cache::is_not_modified(header_str(req, IF_MODIFIED_SINCE), modified) {
            return http::build_304_response(header);
        }
    }

    let data = match fs::read(path).await {
        Ok(data) => Bytes::from(data),
        Err(e) => return error_response(&e, &path.display().to_string()),
    };
    let content_type = mime::content_type_for(path, &data);
    let total_size = data.len();

    match ByteRange::parse(header_str(req, RANGE), total_size) {
        ByteRange::Partial(range) => http::response::build_partial_response(
            data.slice(range.clone()),
            content_type,
            last_modified.as_deref(),
            range,
            total_size,
            is_head,
        ),
        ByteRange::Unsatisfiable => http::build_416_response(total_size),
        ByteRange::Full => http::response::build_file_response(
            data,
            content_type,
            last_modified.as_deref(),
            is_head,
        ),
    }
}

fn header_str<B>(req: &Request<B>, name: HeaderName) -> Option<&str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// 301 to a location relative to the request, keeping the query string
fn local_redirect(target: &str, query: Option<&str>) -> Response<Full<Bytes>> {
    let mut location = utf8_percent_encode(target, HREF_ESC_CHARSET).to_string();
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        location.push('?');
        location.push_str(q);
    }
    http::build_moved_response(&location)
}

/// Map a filesystem error to a status
fn error_response(err: &io::Error, what: &str) -> Response<Full<Bytes>> {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => http::build_404_response(),
        io::ErrorKind::PermissionDenied => {
            logger::log_warning(&format!("Permission denied: {what}"));
            http::build_403_response()
        }
        io::ErrorKind::InvalidData => {
            logger::log_warning(&format!("Path outside served directory blocked: {what}"));
            http::build_404_response()
        }
        _ => {
            logger::log_error(&format!("Failed to open '{what}': {err}"));
            http::build_500_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_RANGE, CONTENT_TYPE, LAST_MODIFIED, LOCATION};
    use hyper::StatusCode;

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello world\n").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        std::fs::create_dir(dir.path().join("empty dir")).unwrap();
        std::fs::create_dir(dir.path().join("files")).unwrap();
        std::fs::write(dir.path().join("files/b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("files/a<1>.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("files/sub")).unwrap();
        dir
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(resp: &Response<Full<Bytes>>) -> &str {
        resp.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a/b/c.txt"), PathBuf::from("a/b/c.txt"));
        assert_eq!(clean_path("/a/./b//c"), PathBuf::from("a/b/c"));
        assert_eq!(clean_path("/a/../../etc/passwd"), PathBuf::from("etc/passwd"));
        assert_eq!(clean_path("/"), PathBuf::new());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/docs"), "docs");
        assert_eq!(base_name("/a/hello.txt/"), "hello.txt");
        assert_eq!(base_name("/"), ".");
    }

    #[tokio::test]
    async fn test_serves_file() {
        let dir = site();
        let resp = serve(&get("/hello.txt"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert!(resp.headers().contains_key(LAST_MODIFIED));
        assert_eq!(body_string(resp).await, "hello world\n");
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let dir = site();
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/hello.txt")
            .body(())
            .unwrap();
        let resp = serve(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-length"], "12");
        assert_eq!(body_string(resp).await, "");
    }

    #[tokio::test]
    async fn test_any_method_is_served() {
        let dir = site();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/hello.txt")
            .body(())
            .unwrap();
        let resp = serve(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = site();
        let resp = serve(&get("/nope.txt"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "404 page not found\n");

        let resp = serve(&get("/hello.txt/child"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_stays_in_root() {
        let dir = site();
        let served = dir.path().join("files");
        let resp = serve(&get("/../hello.txt"), &served).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = serve(&get("/%2e%2e/hello.txt"), &served).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_root_is_blocked() {
        let dir = site();
        let served = dir.path().join("files");
        std::os::unix::fs::symlink(dir.path().join("hello.txt"), served.join("escape.txt")).unwrap();
        let resp = serve(&get("/escape.txt"), &served).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_directory_index() {
        let dir = site();
        let resp = serve(&get("/docs/"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "<h1>docs</h1>");
    }

    #[tokio::test]
    async fn test_trailing_slash_redirects() {
        let dir = site();

        let resp = serve(&get("/docs?x=1"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&resp), "docs/?x=1");

        let resp = serve(&get("/hello.txt/"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&resp), "../hello.txt");

        let resp = serve(&get("/docs/index.html"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location(&resp), "./");

        let resp = serve(&get("/empty%20dir"), dir.path()).await;
        assert_eq!(location(&resp), "empty%20dir/");
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = site();
        let resp = serve(&get("/files/"), dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(
            body_string(resp).await,
            "<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n\
             <a href=\"a%3C1%3E.txt\">a&lt;1&gt;.txt</a>\n\
             <a href=\"b.txt\">b.txt</a>\n\
             <a href=\"sub/\">sub/</a>\n\
             </pre>\n"
        );
    }

    #[test]
    fn test_listing_colon_names() {
        let html = render_listing(&["c:d".to_string()]);
        assert!(html.contains("<a href=\"./c:d\">c:d</a>"));
    }

    #[tokio::test]
    async fn test_if_modified_since() {
        let dir = site();
        let resp = serve(&get("/hello.txt"), dir.path()).await;
        let last_modified = resp.headers()[LAST_MODIFIED].clone();

        let req = Request::builder()
            .uri("/hello.txt")
            .header(IF_MODIFIED_SINCE, last_modified)
            .body(())
            .unwrap();
        let resp = serve(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        let req = Request::builder()
            .uri("/hello.txt")
            .header(IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT")
            .body(())
            .unwrap();
        let resp = serve(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_range_requests() {
        let dir = site();
        let req = Request::builder()
            .uri("/hello.txt")
            .header(RANGE, "bytes=0-4")
            .body(())
            .unwrap();
        let resp = serve(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 0-4/12");
        assert_eq!(body_string(resp).await, "hello");

        let req = Request::builder()
            .uri("/hello.txt")
            .header(RANGE, "bytes=50-")
            .body(())
            .unwrap();
        let resp = serve(&req, dir.path()).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    }
}
