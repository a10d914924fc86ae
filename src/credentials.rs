//! Per-request credential resolution
//!
//! Credentials come from an `Authorization: Basic` header or, when no Basic header
//! is present, from the process-wide defaults. Header credentials always win; the
//! two sources are never merged.

use std::fmt;

use axum::http::HeaderValue;
use axum_extra::headers::{authorization::Basic, Authorization, Header};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no credentials in request and no defaults configured")]
    MissingCredentials,
    #[error("malformed basic credentials")]
    InvalidCredentials,
}

impl From<AuthFailure> for AppError {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::MissingCredentials => AppError::unauthorized(
                "Authentication required. Provide DataForSEO credentials.",
            ),
            AuthFailure::InvalidCredentials => AppError::unauthorized("Invalid credentials"),
        }
    }
}

/// Resolves the credentials for one request.
///
/// A header using a scheme other than Basic is treated as absent. A Basic header
/// that fails to decode, or decodes to an empty username or password, is a hard
/// failure and does not fall back to `defaults`.
pub fn resolve(
    header: Option<&HeaderValue>,
    defaults: Option<&Credentials>,
) -> Result<Credentials, AuthFailure> {
    match header.filter(|value| is_basic_scheme(value)) {
        Some(value) => decode_basic(value),
        None => defaults.cloned().ok_or(AuthFailure::MissingCredentials),
    }
}

fn is_basic_scheme(value: &HeaderValue) -> bool {
    let bytes = value.as_bytes();
    bytes.len() > "Basic".len()
        && bytes[.."Basic".len()].eq_ignore_ascii_case(b"Basic")
        && bytes["Basic".len()] == b' '
}

fn decode_basic(value: &HeaderValue) -> Result<Credentials, AuthFailure> {
    let auth = Authorization::<Basic>::decode(&mut std::iter::once(value))
        .map_err(|_| AuthFailure::InvalidCredentials)?;

    if auth.username().is_empty() || auth.password().is_empty() {
        return Err(AuthFailure::InvalidCredentials);
    }

    Ok(Credentials::new(auth.username(), auth.password()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(raw: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Basic {raw}")).expect("valid header value")
    }

    fn defaults() -> Credentials {
        Credentials::new("env-user", "env-pass")
    }

    #[test]
    fn decodes_basic_header() {
        // user:secret
        let header = basic("dXNlcjpzZWNyZXQ=");

        let credentials = resolve(Some(&header), None).expect("credentials");
        assert_eq!(credentials, Credentials::new("user", "secret"));
    }

    #[test]
    fn splits_on_first_colon_only() {
        // user:pa:ss
        let header = basic("dXNlcjpwYTpzcw==");

        let credentials = resolve(Some(&header), None).expect("credentials");
        assert_eq!(credentials.username, "user");
        assert_eq!(credentials.password, "pa:ss");
    }

    #[test]
    fn header_takes_precedence_over_defaults() {
        let header = basic("dXNlcjpzZWNyZXQ=");
        let defaults = defaults();

        let credentials = resolve(Some(&header), Some(&defaults)).expect("credentials");
        assert_eq!(credentials.username, "user");
    }

    #[test]
    fn falls_back_to_defaults_without_header() {
        let defaults = defaults();

        let credentials = resolve(None, Some(&defaults)).expect("credentials");
        assert_eq!(credentials, defaults);
    }

    #[test]
    fn missing_header_and_defaults_fails() {
        assert_eq!(resolve(None, None), Err(AuthFailure::MissingCredentials));
    }

    #[test]
    fn empty_password_is_invalid_even_with_defaults() {
        // user:
        let header = basic("dXNlcjo=");
        let defaults = defaults();

        assert_eq!(
            resolve(Some(&header), Some(&defaults)),
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn empty_username_is_invalid() {
        // :secret
        let header = basic("OnNlY3JldA==");

        assert_eq!(
            resolve(Some(&header), None),
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn payload_without_colon_is_invalid() {
        // usersecret
        let header = basic("dXNlcnNlY3JldA==");

        assert_eq!(
            resolve(Some(&header), None),
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn undecodable_payload_is_invalid() {
        let header = basic("!!not-base64!!");

        assert_eq!(
            resolve(Some(&header), Some(&defaults())),
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[test]
    fn non_basic_scheme_falls_back_to_defaults() {
        let header = HeaderValue::from_static("Bearer abc123");
        let defaults = defaults();

        let credentials = resolve(Some(&header), Some(&defaults)).expect("credentials");
        assert_eq!(credentials, defaults);
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("user", "hunter2"));

        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
