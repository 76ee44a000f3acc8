use axum::http::{Request, Uri};
use tower_http::LatencyUnit;
use tower_http::trace::{
    DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, HttpMakeClassifier, MakeSpan,
    TraceLayer,
};
use tracing::{Level, Span};

/// Request span carrying the MCP session, so tool calls posted to
/// `/message?sessionId=...` can be told apart in the logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpSessionSpan;

impl<B> MakeSpan<B> for McpSessionSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "http",
            method = %request.method(),
            path = request.uri().path(),
            session = session_id(request.uri()).unwrap_or("-"),
        )
    }
}

fn session_id(uri: &Uri) -> Option<&str> {
    uri.query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("sessionId="))
}

pub fn http_trace_layer() -> TraceLayer<HttpMakeClassifier, McpSessionSpan> {
    TraceLayer::new_for_http()
        .make_span_with(McpSessionSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}
