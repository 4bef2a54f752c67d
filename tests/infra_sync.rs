// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// End-to-end sync of scripted cloud services into an in-memory revision store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use skygraph::cloud::records::{AttachedPolicy, Instance, Policy, ProviderRecord, Subnet, User, Vpc};
use skygraph::cloud::{
    fetch_resources, ClientError, GraphBuilder, Page, ServiceClient, ServiceDefinition, ACCESS,
    INFRA, STORAGE,
};
use skygraph::domain::{compare, Graph, Node, ResourceType, Triple};
use skygraph::repository::{InMemoryRevisionRepository, RevisionRepository, RevisionRepositoryHandle};
use skygraph::state::ActivityLog;
use skygraph::sync::Syncer;

struct ScriptedClient {
    service: ServiceDefinition,
    records: HashMap<ResourceType, Vec<ProviderRecord>>,
    denied: bool,
}

impl ScriptedClient {
    fn new(service: ServiceDefinition, records: Vec<ProviderRecord>) -> Self {
        let mut by_kind: HashMap<ResourceType, Vec<ProviderRecord>> = HashMap::new();
        for record in records {
            by_kind.entry(record.kind()).or_default().push(record);
        }
        Self {
            service,
            records: by_kind,
            denied: false,
        }
    }

    fn denied(service: ServiceDefinition) -> Self {
        Self {
            denied: true,
            ..Self::new(service, Vec::new())
        }
    }
}

#[async_trait]
impl ServiceClient for ScriptedClient {
    fn service(&self) -> &ServiceDefinition {
        &self.service
    }

    fn region(&self) -> &str {
        "eu-west-1"
    }

    async fn fetch_page(&self, kind: ResourceType, token: Option<String>) -> Result<Page, ClientError> {
        if self.denied {
            return Err(ClientError::AccessDenied(format!("not allowed to list {kind}")));
        }
        // One record per page to exercise pagination.
        let records = self.records.get(&kind).cloned().unwrap_or_default();
        let index: usize = token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let next_token = (index + 1 < records.len()).then(|| (index + 1).to_string());
        Ok(Page {
            records: records.into_iter().skip(index).take(1).collect(),
            next_token,
        })
    }
}

fn instance(id: &str, subnet: Option<&str>, vpc: Option<&str>) -> ProviderRecord {
    ProviderRecord::Instance(Instance {
        instance_id: Some(id.into()),
        subnet_id: subnet.map(Into::into),
        vpc_id: vpc.map(Into::into),
        ..Instance::default()
    })
}

fn infra_records() -> Vec<ProviderRecord> {
    vec![
        instance("inst_1", Some("sub_1"), Some("vpc_1")),
        instance("inst_5", None, None),
        ProviderRecord::Vpc(Vpc {
            vpc_id: Some("vpc_1".into()),
            ..Vpc::default()
        }),
        ProviderRecord::Subnet(Subnet {
            subnet_id: Some("sub_1".into()),
            vpc_id: Some("vpc_1".into()),
            ..Subnet::default()
        }),
    ]
}

fn access_records() -> Vec<ProviderRecord> {
    vec![
        ProviderRecord::Policy(Policy {
            policy_id: Some("pol_1".into()),
            policy_name: Some("ReadOnly".into()),
            ..Policy::default()
        }),
        ProviderRecord::User(User {
            user_id: Some("usr_1".into()),
            user_name: Some("alice".into()),
            attached_managed_policies: vec![
                AttachedPolicy {
                    policy_name: Some("ReadOnly".into()),
                    policy_arn: None,
                },
                AttachedPolicy {
                    policy_name: Some("RenamedLongAgo".into()),
                    policy_arn: None,
                },
            ],
            ..User::default()
        }),
    ]
}

fn node(kind: ResourceType, id: &str) -> Node {
    Node::new(kind, id)
}

#[tokio::test]
async fn builds_the_infra_hierarchy() {
    let client = ScriptedClient::new(INFRA, infra_records());
    let graph = fetch_resources(&client).await.expect("infra graph builds");

    let region = graph.region_root().expect("single region");
    assert_eq!(region, node(ResourceType::Region, "eu-west-1"));
    assert_eq!(graph.children_of(&region), vec![node(ResourceType::Vpc, "vpc_1")]);
    assert_eq!(
        graph.children_of(&node(ResourceType::Vpc, "vpc_1")),
        vec![node(ResourceType::Subnet, "sub_1")]
    );
    assert_eq!(
        graph.children_of(&node(ResourceType::Subnet, "sub_1")),
        vec![node(ResourceType::Instance, "inst_1")]
    );

    let terminated = node(ResourceType::Instance, "inst_5");
    assert!(graph.has_node(&terminated));
    assert!(graph.parents_of(&terminated).is_empty());

    let reparsed = Graph::unmarshal(&graph.marshal()).expect("canonical text parses");
    assert_eq!(reparsed, graph);
}

#[tokio::test]
async fn unresolved_policy_alias_does_not_abort() {
    let client = ScriptedClient::new(ACCESS, access_records());
    let graph = fetch_resources(&client).await.expect("access graph builds");

    let user = node(ResourceType::User, "usr_1");
    assert!(graph.has_node(&user));

    let parents = graph.parents_of(&user);
    assert!(parents.contains(&node(ResourceType::Policy, "pol_1")));
    assert!(parents.contains(&node(ResourceType::Region, "eu-west-1")));
    assert_eq!(parents.len(), 2);
}

#[tokio::test]
async fn sync_commits_reachable_services_only() {
    let repo: RevisionRepositoryHandle = Arc::new(InMemoryRevisionRepository::in_memory(vec![
        "infra".into(),
        "access".into(),
        "storage".into(),
    ]));
    let activity = ActivityLog::new();
    let syncer = Syncer::new(repo.clone(), activity.clone(), GraphBuilder::new(4));

    let clients: Vec<Arc<dyn ServiceClient>> = vec![
        Arc::new(ScriptedClient::new(INFRA, infra_records())),
        Arc::new(ScriptedClient::new(ACCESS, access_records())),
        Arc::new(ScriptedClient::denied(STORAGE)),
    ];

    let report = syncer.sync(&clients).await.expect("sync runs");
    assert_eq!(report.denied, vec!["storage"]);
    assert!(report.failures.is_empty());
    assert_eq!(report.graphs.len(), 2);

    let revision = report.revision.expect("revision recorded");
    assert_eq!(revision.message, "syncing access, infra");

    let rev = repo.load_rev(&revision.id).await.expect("revision loads");
    assert_eq!(rev.graph("infra"), report.graphs.get("infra"));
    assert!(rev.graph("storage").is_some_and(Graph::is_empty));

    let overview = activity.overview();
    assert_eq!(overview.services_synced, 2);
    assert_eq!(overview.services_denied, 1);
    assert_eq!(overview.last_revision, Some(revision.id.to_string()));
}

#[tokio::test]
async fn local_snapshot_compares_against_remote_state() {
    let repo: RevisionRepositoryHandle =
        Arc::new(InMemoryRevisionRepository::in_memory(vec!["infra".into()]));
    let syncer = Syncer::new(repo.clone(), ActivityLog::new(), GraphBuilder::default());

    let clients: Vec<Arc<dyn ServiceClient>> =
        vec![Arc::new(ScriptedClient::new(INFRA, infra_records()))];
    syncer.sync(&clients).await.expect("first sync");

    let mut remote_records = infra_records();
    remote_records.push(ProviderRecord::Vpc(Vpc {
        vpc_id: Some("vpc_2".into()),
        ..Vpc::default()
    }));
    let remote = fetch_resources(&ScriptedClient::new(INFRA, remote_records))
        .await
        .expect("remote graph builds");

    let local = repo.load_current("infra").await.expect("current snapshot");
    let comparison = compare("eu-west-1", &local, &remote);
    assert!(comparison.has_diffs());
    assert!(comparison.extras.is_empty());
    assert_eq!(comparison.missings.len(), 1);
    assert!(comparison.missings.contains(&Triple::parent_of(
        &node(ResourceType::Region, "eu-west-1"),
        &node(ResourceType::Vpc, "vpc_2"),
    )));
}
