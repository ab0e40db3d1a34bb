//! Network-first request policy.
//!
//! Pure functions: given the request, the cached match, the network outcome
//! and the shell document, decide what the caller gets and whether the live
//! response should be written to the runtime store.

use reqwest::Method;

use crate::app::ConfluenceError;
use crate::gateway::request::{Request, Response, ResponseKind, ResponseOrigin};

#[derive(Debug)]
pub enum Resolution {
    /// Live response. `store` is set when it should also be cached.
    Network { response: Response, store: bool },
    /// Network failed; previously cached response.
    Cached(Response),
    /// Network failed on a page request with no cached match.
    Shell(Response),
    /// Nothing can answer the request.
    Unavailable(ConfluenceError),
}

/// Whether the gateway handles a request at all. Everything else goes
/// straight to the network untouched.
pub fn intercepts(request: &Request) -> bool {
    request.method == Method::GET && matches!(request.url.scheme(), "http" | "https")
}

/// Only complete, non-error 200 responses are worth keeping.
pub fn is_cacheable(response: &Response) -> bool {
    response.status == 200 && response.kind != ResponseKind::Error
}

pub fn resolve(
    request: &Request,
    network: Result<Response, ConfluenceError>,
    cached: Option<Response>,
    shell: Option<Response>,
) -> Resolution {
    match network {
        Ok(response) => {
            let store = is_cacheable(&response);
            Resolution::Network { response, store }
        }
        Err(error) => {
            if let Some(response) = cached {
                return Resolution::Cached(Response {
                    origin: ResponseOrigin::Cache,
                    ..response
                });
            }

            match shell {
                Some(response) if request.accepts_html() => Resolution::Shell(Response {
                    origin: ResponseOrigin::Shell,
                    ..response
                }),
                _ => Resolution::Unavailable(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::gateway::request::RequestBody;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn offline() -> Result<Response, ConfluenceError> {
        Err(ConfluenceError::Other("connection refused".into()))
    }

    fn ok(body: &[u8]) -> Response {
        Response::new(200, Some("application/json".into()), body.to_vec())
    }

    #[test]
    fn test_intercepts_only_http_gets() {
        assert!(intercepts(&get("https://example.com/a")));
        assert!(intercepts(&get("http://example.com/a")));
        assert!(!intercepts(&get("chrome-extension://abc/page.html")));
        assert!(!intercepts(&get("file:///tmp/x")));

        let post = Request::post(
            Url::parse("https://example.com/a").unwrap(),
            RequestBody::Form(Vec::new()),
        );
        assert!(!intercepts(&post));
    }

    #[test]
    fn test_live_200_is_returned_and_stored() {
        let cached = Some(ok(b"old"));
        match resolve(&get("https://example.com/a"), Ok(ok(b"new")), cached, None) {
            Resolution::Network { response, store } => {
                assert_eq!(response.body, b"new");
                assert!(store);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_live_non_200_is_returned_but_not_stored() {
        let not_found = Response::new(404, None, b"missing".to_vec());
        match resolve(&get("https://example.com/a"), Ok(not_found), Some(ok(b"old")), None) {
            Resolution::Network { response, store } => {
                assert_eq!(response.status, 404);
                assert!(!store);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_error_kind_is_not_stored() {
        let mut response = ok(b"x");
        response.kind = ResponseKind::Error;
        match resolve(&get("https://example.com/a"), Ok(response), None, None) {
            Resolution::Network { store, .. } => assert!(!store),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_network_failure_serves_cached_body_unchanged() {
        let cached = ok(b"\x00\x01cached-bytes\xff");
        match resolve(&get("https://example.com/a"), offline(), Some(cached.clone()), None) {
            Resolution::Cached(response) => {
                assert_eq!(response.body, cached.body);
                assert_eq!(response.status, cached.status);
                assert_eq!(response.origin, ResponseOrigin::Cache);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_network_failure_serves_shell_for_pages() {
        let request = get("https://example.com/timeline").accept("text/html");
        let shell = Response::new(200, Some("text/html".into()), b"<html>".to_vec());
        match resolve(&request, offline(), None, Some(shell)) {
            Resolution::Shell(response) => {
                assert_eq!(response.body, b"<html>");
                assert_eq!(response.origin, ResponseOrigin::Shell);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_network_failure_without_html_accept_is_unavailable() {
        let request = get("https://example.com/api").accept("application/json");
        let shell = Response::new(200, Some("text/html".into()), b"<html>".to_vec());
        assert!(matches!(
            resolve(&request, offline(), None, Some(shell)),
            Resolution::Unavailable(_)
        ));
    }

    #[test]
    fn test_cached_match_beats_shell() {
        let request = get("https://example.com/page").accept("text/html");
        let shell = Response::new(200, None, b"shell".to_vec());
        match resolve(&request, offline(), Some(ok(b"page")), Some(shell)) {
            Resolution::Cached(response) => assert_eq!(response.body, b"page"),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }
}
