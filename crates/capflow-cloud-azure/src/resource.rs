//! Azure resource id helpers

const MANAGED_ENVIRONMENTS: &str = "/managedEnvironments/";

/// Name of a Container Apps managed environment from its resource id.
///
/// The name is the final path segment after `/managedEnvironments/`.
pub fn env_name_from_id(env_id: &str) -> Option<&str> {
    let (_, name) = env_id.trim().rsplit_once(MANAGED_ENVIRONMENTS)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name)
}
