//! Keeps browsers and proxies from caching API answers

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub async fn no_cache(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await.into_response();

    let (mut parts, body) = response.into_parts();
    parts.headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    parts
        .headers
        .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    parts
        .headers
        .insert(header::EXPIRES, HeaderValue::from_static("0"));

    Response::from_parts(parts, body)
}
