//! Azure Container Apps provider for capflow
//!
//! Drives the `az` CLI: container app updates and creation, managed
//! identity wiring, ACR login and tag queries, role assignments, and the
//! rollout probe used by the convergence waiter.

mod az;
pub mod containerapp;
pub mod diagnostics;
pub mod error;
pub mod registry;
pub mod resource;

pub use az::AzCli;
pub use containerapp::{CreateApp, DEFAULT_TARGET_PORT, RegistryAuth};
pub use diagnostics::Diagnostics;
pub use error::{AzureError, Result};
pub use resource::env_name_from_id;
