use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Assigns a correlation id to every request, stashes it as a request
/// extension so handlers and error responses can log it, and echoes it
/// back as a response header.
pub async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = Uuid::new_v4();
    request.extensions_mut().insert(RequestId(id));

    let span = tracing::info_span!("request", correlation_id = %id, path = %request.uri().path());
    let _guard = span.enter();

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
