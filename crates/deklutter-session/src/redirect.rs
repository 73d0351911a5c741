//! One-shot capture of the token delivered by the authorization redirect.

use url::Url;

use crate::token::{SessionToken, TokenStore};

/// Query parameter carrying the token on the redirect.
pub const TOKEN_PARAM: &str = "token";

/// Entry points the view layer navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry point.
    Landing,
    /// Authenticated entry point hosting the workflow controller.
    Dashboard,
}

/// Inspect `location` for a `token` parameter.
///
/// A non-empty token is saved and routes to [`Route::Dashboard`]. A missing
/// or blank token leaves the store untouched and routes to
/// [`Route::Landing`]; that is "not authorized", not an error.
pub fn capture_redirect(location: &Url, store: &dyn TokenStore) -> Route {
    let token = location
        .query_pairs()
        .find(|(name, _)| name == TOKEN_PARAM)
        .and_then(|(_, value)| SessionToken::new(value));

    match token {
        Some(token) => {
            store.save(&token);
            tracing::info!(path = location.path(), "authorization redirect captured");
            Route::Dashboard
        }
        None => {
            tracing::info!(path = location.path(), "authorization redirect carried no token");
            Route::Landing
        }
    }
}
