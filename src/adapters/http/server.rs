//! Gateway HTTP server.
//!
//! Every route parses its body on the async worker, then runs the gateway
//! operation on the blocking pool so that signature service and validator
//! calls never stall the reactor.

use super::protocol::{
    BuildSignatureRequestBody, DataToSignRequestBody, DocumentResponse, ErrorResponse,
    SignRequestBody, SignResponse, StatusResponse, ValidationRequestBody,
};
use crate::domain::crypto::CertificateToken;
use crate::infra::config::ServerConfiguration;
use crate::infra::error::{SigningError, SigningResult};
use crate::pipelines::gateway::SigningGateway;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::Filter;

/// Error code for rejected bearer tokens.
pub const AUTH_FAILED: &str = "AUTH_FAILED";

type JsonReply = warp::reply::WithStatus<warp::reply::Json>;

/// Configuration for the gateway server.
#[derive(Debug, Clone)]
pub struct GatewayServerConfig {
    /// Address to bind to (e.g., "127.0.0.1:7200").
    pub bind_address: SocketAddr,
    /// Bearer token required from callers, if any.
    pub auth_token: Option<String>,
}

impl GatewayServerConfig {
    #[must_use]
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            auth_token: None,
        }
    }

    /// Require a bearer token on every signing route.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// # Errors
    /// Invalid bind address.
    pub fn from_configuration(config: &ServerConfiguration) -> SigningResult<Self> {
        Ok(Self {
            bind_address: config.bind_addr()?,
            auth_token: config.auth_token.clone(),
        })
    }
}

/// Shared state for the server handlers.
pub struct GatewayState {
    gateway: Arc<SigningGateway>,
    auth_token: Option<String>,
}

impl GatewayState {
    #[must_use]
    pub fn new(gateway: Arc<SigningGateway>, auth_token: Option<String>) -> Self {
        Self {
            gateway,
            auth_token,
        }
    }

    /// Constant-time comparison against the expected token.
    fn validate_auth(&self, token: &str) -> bool {
        let Some(expected) = self.auth_token.as_deref() else {
            return true;
        };
        let expected = expected.as_bytes();
        let provided = token.as_bytes();
        if expected.len() != provided.len() {
            return false;
        }
        expected
            .iter()
            .zip(provided)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Reply to send instead of handling the request, if it is not
    /// authorized.
    fn reject_unauthorized(&self, auth_header: Option<&str>) -> Option<JsonReply> {
        if self.auth_token.is_none() {
            return None;
        }
        let authorized = auth_header
            .and_then(extract_bearer_token)
            .is_some_and(|token| self.validate_auth(token));
        if authorized {
            return None;
        }
        log::warn!("Rejected request with missing or invalid bearer token");
        Some(warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new(
                AUTH_FAILED,
                "Missing or invalid Authorization header",
            )),
            StatusCode::UNAUTHORIZED,
        ))
    }
}

/// Extract bearer token from Authorization header value.
#[must_use]
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Build all API routes.
pub fn build_routes(
    state: Arc<GatewayState>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let info = warp::path!("info")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_info);

    let data_to_sign = post_route(warp::path!("datatosign"), state.clone()).and_then(handle_data_to_sign);
    let sign = post_route(warp::path!("sign"), state.clone()).and_then(handle_sign);
    let visualization =
        post_route(warp::path!("visualization"), state.clone()).and_then(handle_visualization);
    let validate_parameters = post_route(warp::path!("parameters" / "validate"), state.clone())
        .and_then(handle_validate_parameters);
    let validation = post_route(warp::path!("validation"), state).and_then(handle_validation);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type", "authorization"]);

    info.or(data_to_sign)
        .or(sign)
        .or(visualization)
        .or(validate_parameters)
        .or(validation)
        .with(cors)
        .with(warp::log("signing_gateway::http"))
}

/// Serve until `shutdown` resolves.
///
/// # Errors
/// `Configuration` when the address cannot be bound.
pub async fn serve(
    config: &GatewayServerConfig,
    gateway: Arc<SigningGateway>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> SigningResult<()> {
    let state = Arc::new(GatewayState::new(gateway, config.auth_token.clone()));
    let routes = build_routes(state);
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(config.bind_address, shutdown)
        .map_err(|e| {
            SigningError::Configuration(format!(
                "Failed to bind {}: {e}",
                config.bind_address
            ))
        })?;
    log::info!("Signing gateway listening on {addr}");
    server.await;
    log::info!("Signing gateway stopped");
    Ok(())
}

fn post_route<P>(
    path: P,
    state: Arc<GatewayState>,
) -> impl Filter<Extract = (Option<String>, Bytes, Arc<GatewayState>), Error = warp::Rejection> + Clone
where
    P: Filter<Extract = (), Error = warp::Rejection> + Clone,
{
    path.and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::bytes())
        .and(with_state(state))
}

/// Inject state into handlers.
fn with_state(
    state: Arc<GatewayState>,
) -> impl Filter<Extract = (Arc<GatewayState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> SigningResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(SigningError::EmptyBody);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Run a gateway operation on the blocking pool.
async fn run_blocking<T, F>(operation: F) -> SigningResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SigningResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| SigningError::Io(format!("Request worker failed: {e}")))?
}

fn respond<T: Serialize>(result: SigningResult<T>) -> JsonReply {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK),
        Err(error) => {
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                log::error!("Request failed: {error}");
            } else {
                log::warn!("Request rejected [{}]: {error}", error.error_code());
            }
            warp::reply::with_status(warp::reply::json(&ErrorResponse::from(&error)), status)
        }
    }
}

async fn handle_info(state: Arc<GatewayState>) -> Result<JsonReply, Infallible> {
    let response = StatusResponse {
        status: "READY".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        trust_list_ready: state.gateway.validation().is_ready(),
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&response),
        StatusCode::OK,
    ))
}

async fn handle_data_to_sign(
    auth: Option<String>,
    body: Bytes,
    state: Arc<GatewayState>,
) -> Result<JsonReply, Infallible> {
    if let Some(denied) = state.reject_unauthorized(auth.as_deref()) {
        return Ok(denied);
    }
    let result = async {
        let body: DataToSignRequestBody = parse_body(&body)?;
        let gateway = Arc::clone(&state.gateway);
        run_blocking(move || {
            let request = body.original_sign_request_body.into_request()?;
            let certificate = CertificateToken::from_base64(&body.signing_certificate)?;
            gateway.data_to_sign(&request, &certificate)
        })
        .await
    }
    .await;
    Ok(respond(result))
}

async fn handle_sign(
    auth: Option<String>,
    body: Bytes,
    state: Arc<GatewayState>,
) -> Result<JsonReply, Infallible> {
    if let Some(denied) = state.reject_unauthorized(auth.as_deref()) {
        return Ok(denied);
    }
    let result = async {
        let body: BuildSignatureRequestBody = parse_body(&body)?;
        let gateway = Arc::clone(&state.gateway);
        run_blocking(move || {
            let signature = body.signature_value()?;
            let request = body.original_sign_request_body.into_request()?;
            let signed = gateway.sign(&request, body.data_to_sign_structure, &signature)?;
            Ok(SignResponse::from(&signed))
        })
        .await
    }
    .await;
    Ok(respond(result))
}

async fn handle_visualization(
    auth: Option<String>,
    body: Bytes,
    state: Arc<GatewayState>,
) -> Result<JsonReply, Infallible> {
    if let Some(denied) = state.reject_unauthorized(auth.as_deref()) {
        return Ok(denied);
    }
    let result = async {
        let body: SignRequestBody = parse_body(&body)?;
        let gateway = Arc::clone(&state.gateway);
        run_blocking(move || {
            let request = body.into_request()?;
            let preview = gateway.visualize(&request)?.ok_or_else(|| {
                SigningError::Transformation(
                    "Visualization is not available for this document".to_string(),
                )
            })?;
            Ok(DocumentResponse::from(&preview))
        })
        .await
    }
    .await;
    Ok(respond(result))
}

async fn handle_validate_parameters(
    auth: Option<String>,
    body: Bytes,
    state: Arc<GatewayState>,
) -> Result<JsonReply, Infallible> {
    if let Some(denied) = state.reject_unauthorized(auth.as_deref()) {
        return Ok(denied);
    }
    let result = async {
        let body: SignRequestBody = parse_body(&body)?;
        let gateway = Arc::clone(&state.gateway);
        run_blocking(move || {
            let request = body.into_request()?;
            gateway.validate_parameters(&request)?;
            Ok(serde_json::json!({ "status": "OK" }))
        })
        .await
    }
    .await;
    Ok(respond(result))
}

async fn handle_validation(
    auth: Option<String>,
    body: Bytes,
    state: Arc<GatewayState>,
) -> Result<JsonReply, Infallible> {
    if let Some(denied) = state.reject_unauthorized(auth.as_deref()) {
        return Ok(denied);
    }
    let result = async {
        let body: ValidationRequestBody = parse_body(&body)?;
        let gateway = Arc::clone(&state.gateway);
        run_blocking(move || gateway.validate_signatures(&body.into_document()?)).await
    }
    .await;
    Ok(respond(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer xyz789"), Some("xyz789"));
        assert_eq!(extract_bearer_token("Basic auth"), None);
        assert_eq!(extract_bearer_token(""), None);
    }

    #[test]
    fn test_parse_body_errors() {
        let err = parse_body::<SignRequestBody>(b"  \n").unwrap_err();
        assert!(matches!(err, SigningError::EmptyBody));
        let err = parse_body::<SignRequestBody>(b"{not json").unwrap_err();
        assert!(matches!(err, SigningError::MalformedBody(_)));
    }
}
