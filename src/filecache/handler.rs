//! HTTP front of the file cache
//!
//! Resolves request paths below the serving root, serves `index.html` for
//! directories and answers conditional requests.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use hyper::{Method, Request, Response};
use std::fs::Metadata;
use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::FileCache;
use crate::handler::FileService;
use crate::http::{self, conditional};
use crate::logger;

const INDEX_FILE: &str = "index.html";

/// The parts of a request the file cache looks at
struct FileRequest {
    method: Method,
    path: String,
    if_none_match: Option<String>,
    if_modified_since: Option<String>,
}

impl FileRequest {
    fn from_request<B>(req: &Request<B>) -> Self {
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };
        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
        }
    }

    fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

impl FileService for FileCache {
    fn serve<B: Send>(
        &self,
        req: Request<B>,
    ) -> impl Future<Output = Response<Full<Bytes>>> + Send {
        let request = FileRequest::from_request(&req);
        self.serve_file(request)
    }
}

impl FileCache {
    async fn serve_file(&self, req: FileRequest) -> Response<Full<Bytes>> {
        if req.method != Method::GET && req.method != Method::HEAD {
            return http::build_405_response();
        }

        let Some((name, path)) = resolve(self.root(), &req.path) else {
            return http::build_404_response();
        };
        let Some((name, path, metadata)) = self.locate(name, path).await else {
            return http::build_404_response();
        };

        let file = match self.fetch(&name, &path, &metadata).await {
            Ok(file) => file,
            Err(e) => return error_response(&path, &e),
        };

        let etag = conditional::weak_etag(file.content.len() as u64, file.modified);
        let last_modified = conditional::last_modified(file.modified);
        if conditional::is_not_modified(
            req.if_none_match.as_deref(),
            req.if_modified_since.as_deref(),
            &etag,
            file.modified,
        ) {
            return http::build_304_response(&etag, &last_modified);
        }

        let content_type = mime_guess::from_path(&path).first_or_octet_stream();
        http::build_file_response(
            file.content,
            content_type.as_ref(),
            &etag,
            &last_modified,
            req.is_head(),
        )
    }

    /// Find the regular file to serve, following directories to their index
    async fn locate(&self, name: String, path: PathBuf) -> Option<(String, PathBuf, Metadata)> {
        let metadata = fs::metadata(&path).await.ok()?;
        let (name, path, metadata) = if metadata.is_dir() {
            let index_name = if name.is_empty() {
                INDEX_FILE.to_string()
            } else {
                format!("{}/{INDEX_FILE}", name.trim_end_matches('/'))
            };
            let index_path = path.join(INDEX_FILE);
            let index_metadata = fs::metadata(&index_path).await.ok()?;
            (index_name, index_path, index_metadata)
        } else {
            (name, path, metadata)
        };

        if !metadata.is_file() {
            return None;
        }

        // Symlinks may still point outside the root
        let canonical = fs::canonicalize(&path).await.ok()?;
        if !canonical.starts_with(self.root()) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {} -> {}",
                name,
                canonical.display()
            ));
            return None;
        }

        Some((name, path, metadata))
    }
}

/// Map a URL path to a cache key and a file below `root`
///
/// The path is percent-decoded; anything but plain components (`..`, roots,
/// drive prefixes) is refused. The key is built from the plain components
/// only, so `/a.txt`, `/./a.txt` and `//a.txt` share one cache entry.
fn resolve(root: &Path, url_path: &str) -> Option<(String, PathBuf)> {
    let decoded = urlencoding::decode(url_path).ok()?;
    let mut segments = Vec::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    let name = segments.join("/");
    let path = root.join(&name);
    Some((name, path))
}

fn error_response(path: &Path, err: &io::Error) -> Response<Full<Bytes>> {
    match err.kind() {
        io::ErrorKind::NotFound => http::build_404_response(),
        io::ErrorKind::PermissionDenied => http::build_403_response(),
        _ => {
            logger::log_error(&format!("Failed to read file '{}': {err}", path.display()));
            http::build_500_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filecache::tests::{scratch_dir, settings};
    use http_body_util::BodyExt;

    fn cache_with(files: &[(&str, &str)]) -> FileCache {
        let dir = scratch_dir("handler");
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, content).unwrap();
        }
        FileCache::new(dir, settings(10, 1024))
    }

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder().method(method).uri(uri).body(()).unwrap()
    }

    async fn body_of(resp: Response<Full<Bytes>>) -> Vec<u8> {
        resp.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_serves_file_and_caches_it() {
        let cache = cache_with(&[("img/a.png", "png-bytes")]);
        let resp = cache.serve(request(Method::GET, "/img/a.png")).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "image/png");
        assert_eq!(resp.headers()["content-length"], "9");
        assert_eq!(body_of(resp).await, b"png-bytes");
        assert!(cache.contains("img/a.png"));
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let cache = cache_with(&[]);
        let resp = cache.serve(request(Method::GET, "/nope.txt")).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let cache = cache_with(&[("index.html", "<h1>root</h1>"), ("docs/index.html", "docs")]);

        let resp = cache.serve(request(Method::GET, "/")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(body_of(resp).await, b"<h1>root</h1>");

        let resp = cache.serve(request(Method::GET, "/docs/")).await;
        assert_eq!(body_of(resp).await, b"docs");
        assert!(cache.contains("docs/index.html"));
    }

    #[tokio::test]
    async fn test_directory_without_index_is_404() {
        let cache = cache_with(&[("empty/.keep", "")]);
        let resp = cache.serve(request(Method::GET, "/empty")).await;
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn test_traversal_is_refused() {
        let cache = cache_with(&[("a.txt", "a")]);
        for uri in ["/../etc/passwd", "/%2e%2e/etc/passwd", "/a/../../x"] {
            let resp = cache.serve(request(Method::GET, uri)).await;
            assert_eq!(resp.status(), 404, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_percent_encoded_names() {
        let cache = cache_with(&[("my file.txt", "spaced")]);
        let resp = cache.serve(request(Method::GET, "/my%20file.txt")).await;
        assert_eq!(body_of(resp).await, b"spaced");
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let cache = cache_with(&[("a.txt", "hello")]);
        let resp = cache.serve(request(Method::HEAD, "/a.txt")).await;

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-length"], "5");
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_not_allowed() {
        let cache = cache_with(&[("a.txt", "hello")]);
        let resp = cache.serve(request(Method::POST, "/a.txt")).await;
        assert_eq!(resp.status(), 405);
    }

    #[tokio::test]
    async fn test_conditional_get() {
        let cache = cache_with(&[("a.txt", "hello")]);
        let first = cache.serve(request(Method::GET, "/a.txt")).await;
        let etag = first.headers()["etag"].to_str().unwrap().to_string();
        let last_modified = first.headers()["last-modified"].to_str().unwrap().to_string();

        let req = Request::builder()
            .uri("/a.txt")
            .header("If-None-Match", &etag)
            .body(())
            .unwrap();
        assert_eq!(cache.serve(req).await.status(), 304);

        let req = Request::builder()
            .uri("/a.txt")
            .header("If-Modified-Since", &last_modified)
            .body(())
            .unwrap();
        assert_eq!(cache.serve(req).await.status(), 304);
    }

    #[tokio::test]
    async fn test_path_aliases_share_one_entry() {
        let cache = cache_with(&[("a.txt", "hello")]);
        for uri in ["/a.txt", "/./a.txt", "/././a.txt", "/.//a.txt"] {
            let resp = cache.serve(request(Method::GET, uri)).await;
            assert_eq!(body_of(resp).await, b"hello", "{uri}");
        }
        assert_eq!(cache.stats().files, vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_resolve() {
        let root = Path::new("/srv");
        assert_eq!(
            resolve(root, "/css/site.css"),
            Some(("css/site.css".to_string(), PathBuf::from("/srv/css/site.css")))
        );
        assert_eq!(resolve(root, "/"), Some((String::new(), PathBuf::from("/srv"))));
        assert_eq!(
            resolve(root, "/./css//site.css"),
            Some(("css/site.css".to_string(), PathBuf::from("/srv/css/site.css")))
        );
        assert_eq!(resolve(root, "/a/../b"), None);
        assert_eq!(resolve(root, "/%2e%2e/b"), None);
    }
}
