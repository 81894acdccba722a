use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{FromRequestParts, ws::WebSocketUpgrade},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use tower::Service;

use murmur_interface::ListenParams;

use crate::session::handle_socket;

/// The listen endpoint: upgrades to a websocket and runs one merge session
/// per connection. Per-session knobs come from the query string.
#[derive(Debug, Clone, Default)]
pub struct ListenService;

impl ListenService {
    pub fn new() -> Self {
        Self
    }
}

impl Service<Request<Body>> for ListenService {
    type Response = Response;
    type Error = String;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        Box::pin(async move {
            let is_ws = req
                .headers()
                .get("upgrade")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.eq_ignore_ascii_case("websocket"))
                .unwrap_or(false);

            if !is_ws {
                return Ok(
                    (StatusCode::BAD_REQUEST, "websocket upgrade required").into_response()
                );
            }

            let query_string = req.uri().query().unwrap_or("").to_string();
            let params: ListenParams = match serde_qs::from_str(&query_string) {
                Ok(p) => p,
                Err(e) => {
                    return Ok((StatusCode::BAD_REQUEST, e.to_string()).into_response());
                }
            };

            let (mut parts, _body) = req.into_parts();
            let ws_upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
                Ok(ws) => ws,
                Err(e) => {
                    return Ok((StatusCode::BAD_REQUEST, e.to_string()).into_response());
                }
            };

            Ok(ws_upgrade
                .on_upgrade(move |socket| async move {
                    handle_socket(socket, params).await;
                })
                .into_response())
        })
    }
}
