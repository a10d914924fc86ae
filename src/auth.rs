use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::{credentials, errors::AppError, AppState};

/// Resolves the request's credentials and attaches them to the request extensions.
pub async fn resolve_credentials(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credentials = credentials::resolve(
        request.headers().get(header::AUTHORIZATION),
        state.default_credentials.as_deref(),
    )
    .map_err(|failure| {
        warn!(%failure, "credential resolution failed");
        AppError::from(failure)
    })?;

    debug!(username = %credentials.username, "credentials resolved");
    request.extensions_mut().insert(credentials);
    Ok(next.run(request).await)
}
