//! hyper hosting: one task per connection, dispatch on the blocking pool.

use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request as HyperRequest, Response as HyperResponse, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use oxide_front::{Dispatcher, Method, Request, Response};
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Reads a request body of at most `limit` bytes.
///
/// On failure returns the status the client should get.
pub async fn read_body<B>(body: B, limit: usize) -> Result<Vec<u8>, StatusCode>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes().to_vec()),
        Err(err) if err.is::<LengthLimitError>() => {
            warn!(limit, "request body too large");
            Err(StatusCode::PAYLOAD_TOO_LARGE)
        }
        Err(err) => {
            warn!(error = %err, "failed to read request body");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Converts the parts of a hyper request into a front controller request.
///
/// Returns `None` for verbs the front controller does not route.
pub fn convert_request(
    method: &hyper::Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Vec<u8>,
    context_path: &str,
) -> Option<Request> {
    let method = Method::parse(method.as_str())?;
    let mut request = Request::new(method, uri.path()).context_path(context_path);

    if let Some(query) = uri.query() {
        request.query = Request::parse_query_string(query);
    }
    for (key, value) in headers {
        if let Ok(value) = value.to_str() {
            request.headers.insert(key.to_string(), value.to_string());
        }
    }
    request.body = body;
    request.parse_form_body();

    Some(request)
}

/// Converts a front controller response into a hyper response.
///
/// Headers that are not valid HTTP are dropped.
pub fn into_hyper(response: Response) -> HyperResponse<Full<Bytes>> {
    let mut hyper_response = HyperResponse::new(Full::new(Bytes::from(response.body)));
    *hyper_response.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (key, value) in &response.headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                hyper_response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %key, "dropping invalid response header"),
        }
    }
    hyper_response
}

fn plain(status: StatusCode, message: &str) -> HyperResponse<Full<Bytes>> {
    into_hyper(Response::text(message).status(status.as_u16()))
}

/// Handles one hyper request.
pub async fn handle_request(
    req: HyperRequest<Incoming>,
    dispatcher: Dispatcher,
    context_path: Arc<str>,
) -> Result<HyperResponse<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match read_body(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(status) => {
            let reason = status.canonical_reason().unwrap_or("bad request");
            return Ok(plain(status, reason));
        }
    };

    let Some(mut request) =
        convert_request(&parts.method, &parts.uri, &parts.headers, body, &context_path)
    else {
        debug!(method = %parts.method, path = parts.uri.path(), "verb not routed");
        return Ok(plain(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"));
    };

    let response = tokio::task::spawn_blocking(move || dispatcher.handle(&mut request)).await;
    match response {
        Ok(response) => Ok(into_hyper(response)),
        Err(err) => {
            error!(error = %err, "dispatch task failed");
            Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
        }
    }
}

/// Accepts connections until the listener fails.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    context_path: &str,
) -> std::io::Result<()> {
    let context_path: Arc<str> = Arc::from(context_path);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let dispatcher = dispatcher.clone();
        let context_path = Arc::clone(&context_path);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                handle_request(req, dispatcher.clone(), Arc::clone(&context_path))
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(peer = %peer, error = %err, "error serving connection");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use hyper::body::Frame;

    use super::*;

    struct ResetBody;

    impl Body for ResetBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))))
        }
    }

    #[tokio::test]
    async fn test_read_body() {
        let body = read_body(Full::new(Bytes::from_static(b"name=Lamp")), 64)
            .await
            .unwrap();
        assert_eq!(body, b"name=Lamp");
    }

    #[tokio::test]
    async fn test_read_body_over_limit() {
        let status = read_body(Full::new(Bytes::from(vec![b'a'; 65])), 64)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_read_body_failure_is_bad_request() {
        let status = read_body(ResetBody, 64).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_convert_request() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let uri: Uri = "/app/items/7?sort=asc&tag=a&tag=b".parse().unwrap();
        let request = convert_request(
            &hyper::Method::POST,
            &uri,
            &headers,
            b"name=Lamp".to_vec(),
            "/app",
        )
        .unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.route_path(), "/items/7");
        assert_eq!(request.get_query("sort"), Some("asc"));
        assert_eq!(request.param_values("tag"), vec!["a", "b"]);
        assert_eq!(request.get_form("name"), Some("Lamp"));
    }

    #[test]
    fn test_convert_request_rejects_other_verbs() {
        let uri: Uri = "/".parse().unwrap();
        assert!(convert_request(&hyper::Method::DELETE, &uri, &HeaderMap::new(), Vec::new(), "")
            .is_none());
    }

    #[test]
    fn test_into_hyper() {
        let mut response = Response::ok();
        response.send_redirect("/home");
        let hyper_response = into_hyper(response);
        assert_eq!(hyper_response.status(), StatusCode::FOUND);
        assert_eq!(
            hyper_response.headers().get("location").unwrap(),
            "/home"
        );
    }
}
