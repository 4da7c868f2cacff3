//! Honeypot gate middleware
//!
//! Runs before every handler: rejects banned clients, then classifies
//! every POST. Urlencoded and multipart bodies are parsed into fields; any
//! other body is classified with no fields at all, so it fails closed.
//! Handlers only ever see allowed submissions.

use std::net::SocketAddr;

use axum::{
    body::{self, Body, Bytes},
    extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use formtrap_core::{ClientId, FormFields, GateDecision, RequestContext, TriggerAction, Verdict};

use crate::{AppError, AppState};

/// Largest form body the gate buffers
pub const MAX_FORM_BYTES: usize = 64 * 1024;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// How a POST body is turned into form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    UrlEncoded,
    Multipart,
    Other,
}

/// Client context resolved by the gate
#[derive(Debug, Clone)]
pub struct ClientContext(pub RequestContext);

impl ClientContext {
    pub fn client_id(&self) -> &ClientId {
        &self.0.client_id
    }
}

/// Middleware: enforce bans and classify form submissions
pub async fn honeypot_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = request_context(&req, state.config.trust_forwarded);
    req.extensions_mut().insert(ClientContext(ctx.clone()));

    match state.trap.gate(&ctx) {
        GateDecision::Bypass => return Ok(next.run(req).await),
        GateDecision::Banned => return Err(AppError::Forbidden),
        GateDecision::Pass => {}
    }

    let Some(kind) = post_body_kind(&req) else {
        return Ok(next.run(req).await);
    };

    let (parts, body) = req.into_parts();
    let bytes = body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|_| AppError::PayloadTooLarge)?;

    let fields = match kind {
        BodyKind::UrlEncoded => {
            FormFields::from_pairs(url::form_urlencoded::parse(&bytes).into_owned())
        }
        BodyKind::Multipart => match parts.headers.get(header::CONTENT_TYPE) {
            Some(content_type) => multipart_fields(content_type.clone(), bytes.clone()).await,
            None => FormFields::new(),
        },
        BodyKind::Other => {
            tracing::debug!(path = %ctx.path, "non-form POST classified without fields");
            FormFields::new()
        }
    };

    match state.trap.inspect(&fields, &ctx) {
        Verdict::Allow => {
            let req = Request::from_parts(parts, Body::from(bytes));
            Ok(next.run(req).await)
        }
        Verdict::Deny(_) => match state.trap.on_trigger() {
            TriggerAction::Redirect(location) => Ok(Redirect::to(&location).into_response()),
            TriggerAction::Deny => Err(AppError::Forbidden),
        },
    }
}

/// Resolve client address, path and user agent
pub fn request_context(req: &Request, trust_forwarded: bool) -> RequestContext {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientId::from(addr.ip()));

    let forwarded = if trust_forwarded {
        forwarded_for(req.headers())
    } else {
        None
    };

    let client_id = forwarded.or(peer).unwrap_or_else(ClientId::unknown);
    let ctx = RequestContext::new(client_id, req.uri().path());

    match req.headers().get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        Some(ua) => ctx.with_user_agent(ua),
        None => ctx,
    }
}

/// First hop of X-Forwarded-For
fn forwarded_for(headers: &HeaderMap) -> Option<ClientId> {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ClientId::from)
}

/// Body kind of a POST; `None` for every other method
fn post_body_kind(req: &Request) -> Option<BodyKind> {
    if req.method() != Method::POST {
        return None;
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    Some(if content_type.starts_with(FORM_CONTENT_TYPE) {
        BodyKind::UrlEncoded
    } else if content_type.starts_with(MULTIPART_CONTENT_TYPE) {
        BodyKind::Multipart
    } else {
        BodyKind::Other
    })
}

/// Text parts of a buffered multipart body. File parts are skipped and a
/// malformed body yields whatever parsed before the error.
async fn multipart_fields(content_type: HeaderValue, bytes: Bytes) -> FormFields {
    let mut fields = FormFields::new();

    let mut req = Request::new(Body::from(bytes));
    req.headers_mut().insert(header::CONTENT_TYPE, content_type);
    let mut multipart = match Multipart::from_request(req, &()).await {
        Ok(multipart) => multipart,
        Err(err) => {
            tracing::debug!(error = %err, "unreadable multipart body");
            return fields;
        }
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if let Ok(value) = field.text().await {
            fields.insert(name, value);
        }
    }
    fields
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<ClientContext>()
            .cloned()
            .ok_or(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)], peer: Option<[u8; 4]>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/contact?x=1");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(ip) = peer {
            req.extensions_mut().insert(ConnectInfo(SocketAddr::from((ip, 5000))));
        }
        req
    }

    #[test]
    fn test_peer_address_by_default() {
        let req = request(&[("X-Forwarded-For", "198.51.100.1")], Some([203, 0, 113, 4]));
        let ctx = request_context(&req, false);

        assert_eq!(ctx.client_id.as_str(), "203.0.113.4");
        assert_eq!(ctx.path, "/contact");
    }

    #[test]
    fn test_forwarded_header_when_trusted() {
        let req = request(
            &[("X-Forwarded-For", "198.51.100.1, 10.0.0.1"), ("User-Agent", "curl/8.0")],
            Some([127, 0, 0, 1]),
        );
        let ctx = request_context(&req, true);

        assert_eq!(ctx.client_id.as_str(), "198.51.100.1");
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_unknown_without_address() {
        let ctx = request_context(&request(&[], None), true);
        assert_eq!(ctx.client_id, ClientId::unknown());
    }

    #[test]
    fn test_post_body_kind() {
        let mut req = request(&[("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")], None);
        assert_eq!(post_body_kind(&req), None);

        *req.method_mut() = Method::POST;
        assert_eq!(post_body_kind(&req), Some(BodyKind::UrlEncoded));

        let mut multipart = request(&[("Content-Type", "Multipart/Form-Data; boundary=x")], None);
        *multipart.method_mut() = Method::POST;
        assert_eq!(post_body_kind(&multipart), Some(BodyKind::Multipart));

        let mut json = request(&[("Content-Type", "application/json")], None);
        *json.method_mut() = Method::POST;
        assert_eq!(post_body_kind(&json), Some(BodyKind::Other));

        let mut bare = request(&[], None);
        *bare.method_mut() = Method::POST;
        assert_eq!(post_body_kind(&bare), Some(BodyKind::Other));
    }

    #[tokio::test]
    async fn test_multipart_text_fields() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"name\"\r\n\r\n\
            Ada\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            file body\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"hp_field\"\r\n\r\n\
            gotcha\r\n\
            --XyZ--\r\n";
        let content_type = HeaderValue::from_static("multipart/form-data; boundary=XyZ");

        let fields = multipart_fields(content_type, Bytes::from(body)).await;

        assert_eq!(fields.get("name"), Some("Ada"));
        assert_eq!(fields.get("hp_field"), Some("gotcha"));
        assert_eq!(fields.get("upload"), None);
        assert_eq!(fields.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_multipart_yields_no_fields() {
        let content_type = HeaderValue::from_static("multipart/form-data; boundary=XyZ");
        let fields = multipart_fields(content_type, Bytes::from_static(b"not multipart")).await;
        assert!(fields.is_empty());
    }
}
