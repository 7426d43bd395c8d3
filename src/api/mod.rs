//! All API endpoint setup

use axum::Router;
use axum::routing::get;
use axum::routing::post;

pub use request::QueryParameters;
pub use response::Error;
pub use response::Success;

use crate::provider::RuleProvider;

mod aliases;
mod request;
mod response;

/// Get the Axum router for all API routes
///
/// The lifecycle endpoints are plain links and forms, they redirect back to `/` when done
pub fn router<P: RuleProvider>() -> Router {
    Router::new()
        .route("/aliases", get(aliases::list::<P>))
        .route("/generate", post(aliases::generate::<P>))
        .route("/toggle", get(aliases::toggle::<P>))
        .route("/delete", get(aliases::delete::<P>))
        .route("/recreate", get(aliases::recreate::<P>))
        .route("/renew", get(aliases::renew::<P>))
}
