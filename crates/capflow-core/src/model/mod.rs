pub mod flag;
pub mod service;

pub use service::*;

/// Ordered mapping of service name to definition.
///
/// Order follows the `services` object of the manifest and drives the
/// order of every action in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceManifest {
    services: Vec<(String, ServiceDefinition)>,
}

impl ServiceManifest {
    pub fn new(services: Vec<(String, ServiceDefinition)>) -> Self {
        Self { services }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceDefinition)> {
        self.services.iter().map(|(name, svc)| (name.as_str(), svc))
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, svc)| svc)
    }

    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
