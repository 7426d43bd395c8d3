//! The root!
//!
//! Overview page of all aliases, with links to every lifecycle endpoint

use std::fmt::Write;

use axum::Extension;
use axum::http::StatusCode;
use axum::response::Html;

use crate::aliases::Alias;
use crate::aliases::Status;
use crate::lifecycle::Lifecycle;
use crate::provider::RuleProvider;

/// Format used for created/expires times
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// The root!
///
/// Active aliases first, newest first
pub async fn root<P: RuleProvider>(
    Extension(lifecycle): Extension<Lifecycle<P>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let aliases = lifecycle.list().await.map_err(internal_error)?;

    tracing::debug!("Rendering {} aliases", aliases.len());

    Ok(Html(render_page(&aliases)))
}

/// Utility function for mapping any error into a `500 Internal Server Error`
/// response.
fn internal_error<E>(err: E) -> (StatusCode, String)
where
    E: std::error::Error,
{
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// Render the full page
fn render_page(aliases: &[Alias]) -> String {
    let mut page = String::from(concat!(
        "<!DOCTYPE html>\n",
        "<html lang=\"en\">\n",
        "<head><meta charset=\"utf-8\"><title>Temporary aliases</title></head>\n",
        "<body>\n",
        "<h1>Temporary aliases</h1>\n",
        "<form method=\"post\" action=\"/api/generate\"><button type=\"submit\">Generate alias</button></form>\n",
    ));

    if aliases.is_empty() {
        page.push_str("<p>No aliases yet.</p>\n");
    } else {
        page.push_str(concat!(
            "<table>\n",
            "<thead><tr><th>Address</th><th>Status</th><th>Created</th><th>Expires</th><th></th></tr></thead>\n",
            "<tbody>\n",
        ));

        for alias in aliases {
            render_row(&mut page, alias);
        }

        page.push_str("</tbody>\n</table>\n");
    }

    page.push_str("</body>\n</html>\n");

    page
}

/// Render a single alias as table row
fn render_row(page: &mut String, alias: &Alias) {
    let expires_at = if alias.is_active() {
        alias.expires_at.format(TIME_FORMAT).to_string()
    } else {
        String::from("-")
    };

    // writing into a `String` can not fail
    let _ = write!(
        page,
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{expires_at}</td><td>",
        escape_html(&alias.address),
        alias.status,
        alias.created_at.format(TIME_FORMAT),
    );

    for (action, label) in actions(alias.status) {
        let _ = write!(
            page,
            "<a href=\"/api/{action}?id={id}\">{label}</a> ",
            id = alias.id
        );
    }

    page.push_str("</td></tr>\n");
}

/// Actions available for an alias in the given status
fn actions(status: Status) -> &'static [(&'static str, &'static str)] {
    match status {
        Status::Active => &[
            ("renew", "Renew"),
            ("toggle", "Disable"),
            ("recreate", "Recreate"),
            ("delete", "Delete"),
        ],
        Status::Inactive => &[
            ("toggle", "Enable"),
            ("recreate", "Recreate"),
            ("delete", "Delete"),
        ],
        Status::Deleted => &[("recreate", "Recreate")],
    }
}

/// Escape text for use in HTML
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            ch => escaped.push(ch),
        }
    }

    escaped
}
