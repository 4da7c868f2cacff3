//! Administrative surface: bans, incident history, CSV export
//!
//! Served only when enabled, and only to loopback clients. State-changing
//! posts must also come from the admin page itself.

use std::fmt::Write as _;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use formtrap_core::decoy::escape_html;
use formtrap_core::ClientId;
use serde::Deserialize;
use validator::Validate;

use crate::middleware::gate::ClientContext;
use crate::{AppError, AppResult, AppState};

pub const ADMIN_PATH: &str = "/honeypot/admin";
pub const EXPORT_PATH: &str = "/honeypot/export";
pub const EXPORT_FILENAME: &str = "honeypot_ban_history.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Admin form submission; one of the two fields is set
#[derive(Debug, Deserialize, Validate)]
pub struct AdminAction {
    #[validate(ip)]
    pub unban_ip: Option<String>,
    #[validate(ip)]
    pub manual_ban_ip: Option<String>,
}

fn authorize(state: &AppState, client: &ClientContext) -> AppResult<()> {
    if !state.trap.config().enable_admin {
        return Err(AppError::NotFound("Not found".to_string()));
    }
    if !client.client_id().is_loopback() {
        tracing::warn!(client = %client.client_id(), "admin access from non-loopback client refused");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Reject posts a browser made on behalf of another site.
///
/// Requests carrying neither `Sec-Fetch-Site` nor `Origin` are let through.
fn require_same_origin(headers: &HeaderMap) -> AppResult<()> {
    if let Some(site) = headers.get("Sec-Fetch-Site") {
        return match site.to_str() {
            Ok("same-origin") | Ok("none") => Ok(()),
            _ => {
                tracing::warn!(site = ?site, "cross-site admin post refused");
                Err(AppError::Forbidden)
            }
        };
    }

    let Some(origin) = headers.get(header::ORIGIN) else {
        return Ok(());
    };
    let origin = origin.to_str().ok().and_then(|o| url::Url::parse(o).ok());
    let host = headers.get(header::HOST).and_then(|h| h.to_str().ok());

    let same = match (origin, host) {
        (Some(origin), Some(host)) => url::Url::parse(&format!("{}://{}", origin.scheme(), host))
            .map_or(false, |own| own.origin() == origin.origin()),
        _ => false,
    };
    if !same {
        tracing::warn!("admin post with foreign origin refused");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Admin page
pub async fn page(State(state): State<AppState>, client: ClientContext) -> AppResult<Html<String>> {
    authorize(&state, &client)?;

    let mut html = String::from(
        "<!doctype html>\n<html>\n<head><title>Honeypot admin</title></head>\n<body>\n<h1>Honeypot admin</h1>\n",
    );

    let bans = state.trap.active_bans();
    let _ = writeln!(html, "<h2>Active bans ({})</h2>", bans.len());
    if bans.is_empty() {
        html.push_str("<p>No active bans.</p>\n");
    } else {
        html.push_str("<table>\n<tr><th>IP</th><th>Expires</th><th>Remaining (s)</th><th></th></tr>\n");
        for ban in &bans {
            let ip = escape_html(ban.client_id.as_str());
            let _ = writeln!(
                html,
                r#"<tr><td>{ip}</td><td>{}</td><td>{}</td><td><form method="post" action="{ADMIN_PATH}"><input type="hidden" name="unban_ip" value="{ip}"><button type="submit">Unban</button></form></td></tr>"#,
                ban.expires_at.format(TIMESTAMP_FORMAT),
                ban.remaining_secs,
            );
        }
        html.push_str("</table>\n");
    }

    let _ = writeln!(
        html,
        r#"<h2>Manual ban</h2>
<form method="post" action="{ADMIN_PATH}"><input type="text" name="manual_ban_ip" placeholder="IP address"><button type="submit">Ban</button></form>"#
    );

    let incidents = state.trap.recent_incidents();
    let _ = writeln!(html, "<h2>Recent incidents ({})</h2>", incidents.len());
    html.push_str("<table>\n<tr><th>Time</th><th>IP</th><th>Path</th><th>Reason</th></tr>\n");
    for record in incidents.iter().rev() {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            record.timestamp.format(TIMESTAMP_FORMAT),
            escape_html(record.client_id.as_str()),
            escape_html(&record.path),
            escape_html(&record.reason.to_string()),
        );
    }
    html.push_str("</table>\n");

    let _ = writeln!(html, r#"<p><a href="{EXPORT_PATH}">Export history (CSV)</a></p>"#);
    html.push_str("</body>\n</html>\n");

    Ok(Html(html))
}

/// Unban or manually ban, then back to the page
pub async fn action(
    State(state): State<AppState>,
    client: ClientContext,
    headers: HeaderMap,
    Form(req): Form<AdminAction>,
) -> AppResult<Redirect> {
    authorize(&state, &client)?;
    require_same_origin(&headers)?;
    req.validate()?;

    if let Some(ip) = req.unban_ip.as_deref() {
        let removed = state.trap.unban(&ClientId::new(ip));
        tracing::info!(target_ip = ip, removed, "admin unban");
    } else if let Some(ip) = req.manual_ban_ip.as_deref() {
        let expires_at = state.trap.manual_ban(ClientId::new(ip));
        tracing::info!(target_ip = ip, %expires_at, "admin ban");
    } else {
        return Err(AppError::ValidationError("unban_ip or manual_ban_ip required".to_string()));
    }

    Ok(Redirect::to(ADMIN_PATH))
}

/// Full history as a CSV attachment
pub async fn export(State(state): State<AppState>, client: ClientContext) -> AppResult<Response> {
    authorize(&state, &client)?;

    let csv = state
        .trap
        .export_csv()
        .map_err(|e| AppError::InternalError(format!("csv export failed: {}", e)))?;

    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILENAME);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
