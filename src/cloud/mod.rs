// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Cloud-facing seams: the service registry and the client interface graph builders fetch through.

pub mod builder;
pub mod mapper;
pub mod parents;
pub mod records;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::ResourceType;

use self::records::ProviderRecord;

pub use builder::{fetch_by_type, fetch_resources, FetchError, GraphBuilder};

/// A cloud service and the resource collections fetched from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub api: &'static str,
    pub resource_types: &'static [ResourceType],
}

impl ServiceDefinition {
    pub fn serves(&self, kind: ResourceType) -> bool {
        self.resource_types.contains(&kind)
    }

    /// File name of the service's snapshot in the revision store.
    pub fn snapshot_file(&self) -> String {
        crate::repository::snapshot_file(self.name)
    }
}

pub const INFRA: ServiceDefinition = ServiceDefinition {
    name: "infra",
    api: "ec2",
    resource_types: &[
        ResourceType::Instance,
        ResourceType::Subnet,
        ResourceType::Vpc,
        ResourceType::Keypair,
        ResourceType::SecurityGroup,
        ResourceType::Volume,
        ResourceType::InternetGateway,
        ResourceType::RouteTable,
        ResourceType::Image,
    ],
};

pub const ACCESS: ServiceDefinition = ServiceDefinition {
    name: "access",
    api: "iam",
    resource_types: &[
        ResourceType::User,
        ResourceType::Group,
        ResourceType::Role,
        ResourceType::Policy,
    ],
};

pub const STORAGE: ServiceDefinition = ServiceDefinition {
    name: "storage",
    api: "s3",
    resource_types: &[ResourceType::Bucket, ResourceType::StorageObject],
};

pub const NOTIFICATION: ServiceDefinition = ServiceDefinition {
    name: "notification",
    api: "sns",
    resource_types: &[ResourceType::Subscription, ResourceType::Topic],
};

/// Immutable table of known services, built once and shared by reference.
#[derive(Clone, Debug)]
pub struct ServiceRegistry {
    services: Vec<ServiceDefinition>,
}

impl ServiceRegistry {
    pub fn new(services: Vec<ServiceDefinition>) -> Self {
        Self { services }
    }

    pub fn builtin() -> Self {
        Self::new(vec![INFRA, ACCESS, STORAGE, NOTIFICATION])
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn service_for_type(&self, kind: ResourceType) -> Option<&ServiceDefinition> {
        self.services.iter().find(|s| s.serves(kind))
    }

    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.to_string()).collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// One page of a paginated collection.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub records: Vec<ProviderRecord>,
    pub next_token: Option<String>,
}

impl Page {
    pub fn last(records: Vec<ProviderRecord>) -> Self {
        Self {
            records,
            next_token: None,
        }
    }
}

/// Provider client for one service in one region.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    fn service(&self) -> &ServiceDefinition;

    fn region(&self) -> &str;

    async fn fetch_page(
        &self,
        kind: ResourceType,
        token: Option<String>,
    ) -> Result<Page, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fetchable_type_belongs_to_one_service() {
        let registry = ServiceRegistry::builtin();
        for kind in ResourceType::ALL {
            let owners = registry.services().iter().filter(|s| s.serves(kind)).count();
            let expected = usize::from(kind != ResourceType::Region);
            assert_eq!(owners, expected, "{kind} owned by {owners} services");
        }
    }

    #[test]
    fn registry_lookups() {
        let registry = ServiceRegistry::builtin();
        assert_eq!(registry.get("access").map(|s| s.api), Some("iam"));
        assert_eq!(
            registry.service_for_type(ResourceType::Topic).map(|s| s.name),
            Some("notification")
        );
        assert_eq!(INFRA.snapshot_file(), "infra.triples");
        assert_eq!(registry.names(), vec!["infra", "access", "storage", "notification"]);
    }
}
