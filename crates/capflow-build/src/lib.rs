//! capflow image builds
//!
//! Registry login, `docker build` and `docker push` for the services in a
//! manifest, plus image tag validation.

pub mod auth;
pub mod builder;
pub mod error;
pub mod tag;

pub use auth::{LoginMethod, registry_login};
pub use builder::ImageBuilder;
pub use error::{BuildError, Result};
pub use tag::validate_tag;
