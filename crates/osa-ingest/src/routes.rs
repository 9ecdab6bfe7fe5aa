//! HTTP surface of the ingestion service
//!
//! `POST`, `GET` and `OPTIONS` on `/api/opal/osa-workflow`. Every response
//! body is JSON; rejections that warp raises itself (unknown path, wrong
//! method) are turned into the same `{error, message, timestamp}` shape as
//! service errors.
//!
//! The POST body is read inside the handler, limit included, so every POST
//! outcome carries `X-Processing-Time`.

use crate::error::{ErrorBody, IngestError};
use crate::service::IngestService;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use warp::http::header::{HeaderValue, CACHE_CONTROL, WWW_AUTHENTICATE};
use warp::http::StatusCode;
use warp::hyper::body::Buf;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

/// Elapsed handling time, e.g. `12ms`, on every POST response
pub const PROCESSING_TIME_HEADER: &str = "x-processing-time";
/// Accepted workflow id
pub const WORKFLOW_ID_HEADER: &str = "x-workflow-id";

const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";
const CORS_MAX_AGE: &str = "86400";

/// All routes with rejections recovered into JSON responses
pub fn api(
    service: Arc<IngestService>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    workflow_routes(service, max_body_bytes).recover(handle_rejection)
}

/// The workflow endpoint without rejection handling
pub fn workflow_routes(
    service: Arc<IngestService>,
    max_body_bytes: u64,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let submit = endpoint()
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::stream())
        .and(warp::any().map(move || max_body_bytes))
        .and(with_service(service.clone()))
        .and_then(submit_workflow);

    let status = endpoint()
        .and(warp::get())
        .and(with_service(service))
        .and_then(service_status);

    let preflight = endpoint().and(warp::options()).map(preflight);

    submit.or(status).or(preflight)
}

fn endpoint() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path!("api" / "opal" / "osa-workflow")
}

fn with_service(
    service: Arc<IngestService>,
) -> impl Filter<Extract = (Arc<IngestService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn submit_workflow<S, B>(
    authorization: Option<String>,
    body: S,
    max_body_bytes: u64,
    service: Arc<IngestService>,
) -> Result<Response, Infallible>
where
    S: Stream<Item = Result<B, warp::Error>> + Send,
    B: Buf + Send,
{
    let started = Instant::now();

    let body = match read_body(body, max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            service.refuse(&err, started.elapsed());
            return Ok(stamp_processing_time(error_response(&err), started));
        }
    };

    let response = match service.ingest(authorization.as_deref(), &body).await {
        Ok(accepted) => {
            let mut response = warp::reply::json(&accepted.body()).into_response();
            if let Ok(value) = HeaderValue::from_str(accepted.run.workflow_id()) {
                response.headers_mut().insert(WORKFLOW_ID_HEADER, value);
            }
            response
        }
        Err(err) => error_response(&err),
    };
    Ok(stamp_processing_time(response, started))
}

/// Collect the body, stopping as soon as it passes `limit` bytes
async fn read_body<S, B>(body: S, limit: u64) -> Result<Vec<u8>, IngestError>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let limit_bytes = usize::try_from(limit).unwrap_or(usize::MAX);
    let mut bytes = Vec::new();

    futures::pin_mut!(body);
    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|e| IngestError::MalformedBody(e.to_string()))?;
        if chunk.remaining() > limit_bytes.saturating_sub(bytes.len()) {
            return Err(IngestError::PayloadTooLarge { limit });
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            let len = part.len();
            bytes.extend_from_slice(part);
            chunk.advance(len);
        }
    }
    Ok(bytes)
}

fn stamp_processing_time(mut response: Response, started: Instant) -> Response {
    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", started.elapsed().as_millis())) {
        response.headers_mut().insert(PROCESSING_TIME_HEADER, value);
    }
    response
}

async fn service_status(service: Arc<IngestService>) -> Result<Response, Infallible> {
    let snapshot = service.status().await;
    let code = if snapshot.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let mut response = warp::reply::with_status(warp::reply::json(&snapshot), code).into_response();
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

fn preflight() -> impl Reply {
    let reply = warp::reply::with_header(warp::reply(), "access-control-allow-origin", "*");
    let reply = warp::reply::with_header(reply, "access-control-allow-methods", CORS_ALLOW_METHODS);
    let reply = warp::reply::with_header(reply, "access-control-allow-headers", CORS_ALLOW_HEADERS);
    warp::reply::with_header(reply, "access-control-max-age", CORS_MAX_AGE)
}

fn error_response(err: &IngestError) -> Response {
    let mut response =
        warp::reply::with_status(warp::reply::json(&err.body()), err.status_code()).into_response();
    if err.status_code() == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

/// Map warp's own rejections onto JSON error bodies
pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (code, error, message) = if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            format!("allowed methods: {CORS_ALLOW_METHODS}"),
        )
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "no such route".to_string())
    } else {
        tracing::error!(?rejection, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "unhandled rejection".to_string(),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&ErrorBody::new(error, message)), code).into_response())
}
