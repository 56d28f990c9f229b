//! Consent page rendering and authorize URL construction.

use url::Url;

use super::AuthError;

pub const CALLBACK_PATH: &str = "/auth/callback";
pub const CANCEL_PATH: &str = "/auth/cancel";

/// Trim, drop empties and deduplicate scopes while keeping first-seen order.
pub fn normalize_scopes<I, S>(scopes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for scope in scopes {
        let scope = scope.as_ref().trim();
        if scope.is_empty() || normalized.iter().any(|seen| seen == scope) {
            continue;
        }
        normalized.push(scope.to_string());
    }
    normalized
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}{CALLBACK_PATH}")
}

/// Authorization endpoint URL for the code flow.
pub fn authorize_url(
    endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[String],
) -> Result<Url, AuthError> {
    let scope = scopes.join(" ");
    let url = Url::parse_with_params(
        endpoint,
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
        ],
    )?;
    Ok(url)
}

pub fn render_consent_page(
    client_id: &str,
    port: u16,
    scopes: &[String],
    authorize_url: &Url,
) -> String {
    let scope_list = scopes.join(" ");
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<h1>Authorize access</h1>
<p>Client ID: <code>{client_id}</code></p>
<p>Callback port: <code>{port}</code></p>
<p>Requested scopes: <code>{scopes}</code></p>
<p>
<a id="login" href="{login}">Login</a>
<a id="cancel" href="{cancel}">Cancel</a>
</p>
</body>
</html>
"#,
        client_id = escape_html(client_id),
        port = port,
        scopes = escape_html(&scope_list),
        login = escape_html(authorize_url.as_str()),
        cancel = CANCEL_PATH,
    )
}

pub fn render_message_page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<p>{message}</p>\n</body>\n</html>\n",
        title = escape_html(title),
        message = escape_html(message),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
