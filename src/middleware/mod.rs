//! Request pipeline stages, listed outermost first as `app::build_app` mounts
//! them.

pub mod authentication;
pub mod authorization;
pub mod error_handling;
pub mod forwarded;
pub mod https_redirect;

pub use authentication::{Authentication, RejectedCredentials};
pub use authorization::{AccessPolicy, Authorization, Requirement};
pub use error_handling::ErrorHandling;
pub use forwarded::ForwardedHeaders;
pub use https_redirect::HttpsRedirect;
