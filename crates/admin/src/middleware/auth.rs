//! HTTP Basic authentication for the whole admin panel.
//!
//! Every route, including uploaded images, sits behind one set of
//! credentials loaded from the environment. Failed attempts are logged with
//! the offered user name but never the password.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::state::AppState;

/// Challenge sent with every 401.
const WWW_AUTHENTICATE: &str = r#"Basic realm="Galeria admin", charset="UTF-8""#;

/// Decoded `Authorization: Basic` credentials.
#[derive(PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Parse an `Authorization` header value of the form `Basic <base64(user:pass)>`.
#[must_use]
pub fn parse_basic_auth(value: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Compare two byte strings without short-circuiting on the first mismatch.
#[must_use]
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

/// Reject requests without valid admin credentials.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let offered = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_auth);

    let Some(offered) = offered else {
        return unauthorized();
    };

    let credentials = state.credentials();
    let username_ok =
        constant_time_compare(credentials.username.as_bytes(), offered.username.as_bytes());
    let password_ok = credentials.password_matches(&offered.password);

    if username_ok && password_ok {
        next.run(request).await
    } else {
        tracing::warn!(username = %offered.username, "Admin authentication failed");
        unauthorized()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(WWW_AUTHENTICATE),
        )],
        "Vyžaduje sa prihlásenie",
    )
        .into_response()
}
