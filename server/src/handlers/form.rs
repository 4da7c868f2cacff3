//! Demo contact form
//!
//! The gate has already classified the POST by the time `submit` runs.

use axum::{extract::State, response::Html, Form};
use formtrap_core::decoy::escape_html;
use serde::Deserialize;

use crate::middleware::gate::ClientContext;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// Render the form with a fresh marker and the decoy fields
pub async fn show(State(state): State<AppState>) -> Html<String> {
    let issued = state.trap.render_form();

    Html(format!(
        r#"<!doctype html>
<html>
<head><title>Contact</title></head>
<body>
<h1>Contact us</h1>
<form method="post" action="/">
<label>Name <input type="text" name="name"></label>
<label>Message <textarea name="message"></textarea></label>
{}
<button type="submit">Send</button>
</form>
</body>
</html>"#,
        issued.markup
    ))
}

pub async fn submit(client: ClientContext, Form(form): Form<ContactForm>) -> Html<String> {
    tracing::info!(client = %client.client_id(), "contact form accepted");

    let name = if form.name.trim().is_empty() { "there" } else { form.name.trim() };
    Html(format!(
        "<!doctype html><html><body><p>Thanks, {}. We received {} characters.</p></body></html>",
        escape_html(name),
        form.message.chars().count()
    ))
}
