//! SSR middleware: classify, then render or pass through.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::render::{IncomingRequest, ResponseWriter};
use crate::routing::RouteClassification;

pub async fn ssr_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let url = match state.classifier.classify(request.uri()) {
        RouteClassification::ApplicationRoute(url) => url,
        RouteClassification::PassThrough => {
            tracing::debug!(path = %request.uri().path(), "Not an application route; passing through");
            metrics::record_pass_through();
            return next.run(request).await;
        }
    };

    let (parts, _body) = request.into_parts();
    let incoming = IncomingRequest::from_parts(&parts);
    let mut response = ResponseWriter::new();
    state.dispatcher.dispatch(&url, &incoming, &mut response).await;
    response.into_response()
}
