// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Graph builder: concurrent collection fetches followed by a sequential relationship pass.

use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::domain::{Graph, GraphError, Resource, ResourceType};

use super::mapper::{map_record, MappingError};
use super::parents::{self, Diagnostic, ResolveError};
use super::records::ProviderRecord;
use super::{ClientError, ServiceClient};

const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("access denied to cloud resource: {service} {kind}: {message}")]
    AccessDenied {
        service: String,
        kind: ResourceType,
        message: String,
    },
    #[error("fetching {service} {kind}: {source}")]
    Transport {
        service: String,
        kind: ResourceType,
        #[source]
        source: ClientError,
    },
    #[error("service {service} does not serve {kind} resources")]
    UnsupportedType { service: String, kind: ResourceType },
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl FetchError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    fn from_client(service: &str, kind: ResourceType, err: ClientError) -> Self {
        match err {
            ClientError::AccessDenied(message) => Self::AccessDenied {
                service: service.to_string(),
                kind,
                message,
            },
            source => Self::Transport {
                service: service.to_string(),
                kind,
                source,
            },
        }
    }
}

/// Records of one collection and the partial graph mapped from them.
struct Collection {
    kind: ResourceType,
    records: Vec<ProviderRecord>,
    graph: Graph,
}

#[derive(Clone, Copy, Debug)]
pub struct GraphBuilder {
    concurrency: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl GraphBuilder {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches every collection of the client's service and wires them under the region root.
    pub async fn fetch_resources(&self, client: &dyn ServiceClient) -> Result<Graph, FetchError> {
        let service = *client.service();

        let results: Vec<Result<Collection, FetchError>> =
            stream::iter(service.resource_types.iter().copied())
                .map(|kind| fetch_collection(client, kind))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        let mut collections = settle(results)?;
        collections.sort_by_key(|c| {
            service
                .resource_types
                .iter()
                .position(|kind| *kind == c.kind)
        });

        let mut graph = Graph::new();
        let mut records = Vec::new();
        for collection in collections {
            graph.add_graph(&collection.graph);
            records.extend(collection.records);
        }

        let (graph, diagnostics) = wire(client.region(), graph, &records)?;
        for diagnostic in &diagnostics {
            tracing::warn!(service = service.name, %diagnostic, "skipping unresolved reference");
        }
        tracing::info!(
            service = service.name,
            region = client.region(),
            records = records.len(),
            triples = graph.len(),
            "fetched service graph"
        );
        Ok(graph)
    }

    /// Fetches a single collection. The result holds nodes and properties only.
    pub async fn fetch_by_type(
        &self,
        client: &dyn ServiceClient,
        kind: ResourceType,
    ) -> Result<Graph, FetchError> {
        let service = client.service();
        if !service.serves(kind) {
            return Err(FetchError::UnsupportedType {
                service: service.name.to_string(),
                kind,
            });
        }
        Ok(fetch_collection(client, kind).await?.graph)
    }
}

pub async fn fetch_resources(client: &dyn ServiceClient) -> Result<Graph, FetchError> {
    GraphBuilder::default().fetch_resources(client).await
}

pub async fn fetch_by_type(client: &dyn ServiceClient, kind: ResourceType) -> Result<Graph, FetchError> {
    GraphBuilder::default().fetch_by_type(client, kind).await
}

/// Builds a service graph from already fetched records.
pub fn build(region: &str, records: &[ProviderRecord]) -> Result<(Graph, Vec<Diagnostic>), FetchError> {
    let mut graph = Graph::new();
    for record in records {
        graph.add_resource(&map_record(record.kind(), record)?)?;
    }
    wire(region, graph, records)
}

fn wire(
    region: &str,
    mut graph: Graph,
    records: &[ProviderRecord],
) -> Result<(Graph, Vec<Diagnostic>), FetchError> {
    graph.add_resource(&Resource::new(ResourceType::Region, region))?;

    let mut diagnostics = Vec::new();
    for record in records {
        diagnostics.extend(parents::apply(&mut graph, record)?);
    }
    Ok((graph, diagnostics))
}

async fn fetch_collection(client: &dyn ServiceClient, kind: ResourceType) -> Result<Collection, FetchError> {
    let service = client.service().name;

    let mut records = Vec::new();
    let mut token = None;
    loop {
        let page = client
            .fetch_page(kind, token.take())
            .await
            .map_err(|err| FetchError::from_client(service, kind, err))?;
        records.extend(page.records);
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    let mut graph = Graph::new();
    for record in &records {
        graph.add_resource(&map_record(kind, record)?)?;
    }

    tracing::debug!(service, %kind, records = records.len(), "fetched collection");
    Ok(Collection {
        kind,
        records,
        graph,
    })
}

/// Waits for every task's outcome; access denial wins over any other failure.
fn settle(results: Vec<Result<Collection, FetchError>>) -> Result<Vec<Collection>, FetchError> {
    let mut collections = Vec::with_capacity(results.len());
    let mut failure: Option<FetchError> = None;

    for result in results {
        match result {
            Ok(collection) => collections.push(collection),
            Err(err) => {
                let replace = match &failure {
                    None => true,
                    Some(current) => err.is_access_denied() && !current.is_access_denied(),
                };
                if replace {
                    failure = Some(err);
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(collections),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::records::{Policy, Vpc};
    use crate::cloud::{Page, ServiceDefinition, ACCESS, INFRA};
    use crate::domain::Node;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    struct PagedClient {
        service: ServiceDefinition,
        pages: HashMap<ResourceType, Vec<Page>>,
        denied: Vec<ResourceType>,
        calls: Mutex<Vec<(ResourceType, Option<String>)>>,
    }

    impl PagedClient {
        fn new(service: ServiceDefinition) -> Self {
            Self {
                service,
                pages: HashMap::new(),
                denied: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ServiceClient for PagedClient {
        fn service(&self) -> &ServiceDefinition {
            &self.service
        }

        fn region(&self) -> &str {
            "eu-west-1"
        }

        async fn fetch_page(
            &self,
            kind: ResourceType,
            token: Option<String>,
        ) -> Result<Page, ClientError> {
            self.calls.lock().push((kind, token.clone()));
            if self.denied.contains(&kind) {
                return Err(ClientError::AccessDenied(format!("not authorized to list {kind}")));
            }
            let pages = self.pages.get(&kind).cloned().unwrap_or_default();
            let index = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
            Ok(pages.get(index).cloned().unwrap_or_default())
        }
    }

    fn vpc(id: &str) -> ProviderRecord {
        ProviderRecord::Vpc(Vpc {
            vpc_id: Some(id.into()),
            ..Vpc::default()
        })
    }

    #[tokio::test]
    async fn drains_every_page() {
        let mut client = PagedClient::new(INFRA);
        client.pages.insert(
            ResourceType::Vpc,
            vec![
                Page {
                    records: vec![vpc("vpc_1")],
                    next_token: Some("1".into()),
                },
                Page::last(vec![vpc("vpc_2")]),
            ],
        );

        let graph = fetch_by_type(&client, ResourceType::Vpc)
            .await
            .expect("vpcs fetched");
        assert_eq!(
            graph.nodes_for_type(ResourceType::Vpc),
            vec![
                Node::new(ResourceType::Vpc, "vpc_1"),
                Node::new(ResourceType::Vpc, "vpc_2")
            ]
        );
        assert!(graph.nodes_for_type(ResourceType::Region).is_empty());
        assert_eq!(client.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn attaches_top_level_resources_to_the_region() {
        let mut client = PagedClient::new(INFRA);
        client
            .pages
            .insert(ResourceType::Vpc, vec![Page::last(vec![vpc("vpc_1")])]);

        let graph = GraphBuilder::new(2)
            .fetch_resources(&client)
            .await
            .expect("infra fetched");
        let region = graph.region_root().expect("one region");
        assert_eq!(region.id(), "eu-west-1");
        assert_eq!(graph.children_of(&region), vec![Node::new(ResourceType::Vpc, "vpc_1")]);
        assert_eq!(client.calls.lock().len(), INFRA.resource_types.len());
    }

    #[tokio::test]
    async fn access_denied_takes_precedence() {
        let mut client = PagedClient::new(ACCESS);
        client.denied.push(ResourceType::Role);
        client.pages.insert(
            ResourceType::Policy,
            vec![Page::last(vec![ProviderRecord::Policy(Policy::default())])],
        );

        let err = fetch_resources(&client).await.unwrap_err();
        assert!(err.is_access_denied(), "unexpected error: {err}");
        assert!(err.to_string().starts_with("access denied to cloud resource"));
        assert_eq!(client.calls.lock().len(), ACCESS.resource_types.len());
    }

    #[tokio::test]
    async fn rejects_types_outside_the_service() {
        let client = PagedClient::new(ACCESS);
        let err = fetch_by_type(&client, ResourceType::Vpc).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedType { .. }));
    }

    #[test]
    fn build_is_order_independent() {
        let records = vec![vpc("vpc_2"), vpc("vpc_1")];
        let reversed: Vec<ProviderRecord> = records.iter().rev().cloned().collect();

        let (first, _) = build("eu-west-1", &records).unwrap();
        let (second, _) = build("eu-west-1", &reversed).unwrap();
        assert_eq!(first.marshal(), second.marshal());
    }
}
