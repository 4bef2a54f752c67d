// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Relationship resolvers wiring parent_of edges from mapped records into the graph being built.

use std::fmt;

use thiserror::Error;

use crate::domain::{Graph, Node, ResourceType, Triple};

use super::records::ProviderRecord;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{child}: required parent {parent} reference {field} is empty")]
    ParentNotFound {
        child: Node,
        parent: ResourceType,
        field: RefField,
    },
    #[error("{child}: parent {parent} is not in the graph")]
    DanglingParent { child: Node, parent: Node },
    #[error("expect exactly one region in graph, but got {0}")]
    RegionCount(usize),
    #[error("{kind} records have no {field} reference")]
    UnsupportedField { kind: ResourceType, field: String },
    #[error("{0} record has no identifier")]
    MissingId(ResourceType),
}

/// Scalar reference fields read by single-reference resolvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefField {
    VpcId,
    SubnetId,
    KeyName,
    Bucket,
    TopicArn,
}

impl fmt::Display for RefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VpcId => "VpcId",
            Self::SubnetId => "SubnetId",
            Self::KeyName => "KeyName",
            Self::Bucket => "Bucket",
            Self::TopicArn => "TopicArn",
        };
        f.write_str(name)
    }
}

/// List fields whose elements each carry one reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefList {
    SecurityGroups,
    VpcAttachments,
    SubnetAssociations,
    InstanceAttachments,
}

impl fmt::Display for RefList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SecurityGroups => "SecurityGroups.GroupId",
            Self::VpcAttachments => "Attachments.VpcId",
            Self::SubnetAssociations => "Associations.SubnetId",
            Self::InstanceAttachments => "Attachments.InstanceId",
        };
        f.write_str(name)
    }
}

/// A reference that could not be wired. The edge is skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub child: Node,
    pub reason: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.child, self.reason)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Triple),
    Unresolved(Diagnostic),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentResolver {
    Required { parent: ResourceType, field: RefField },
    Optional { parent: ResourceType, field: RefField },
    List { parent: ResourceType, list: RefList },
    Region,
    ManagedPolicies,
    GroupMembership,
}

use ParentResolver::{GroupMembership, List, ManagedPolicies, Optional, Region, Required};

/// Ordered resolvers for each resource type.
pub fn resolvers_for(kind: ResourceType) -> &'static [ParentResolver] {
    match kind {
        ResourceType::Subnet => &[Optional {
            parent: ResourceType::Vpc,
            field: RefField::VpcId,
        }],
        ResourceType::Instance => &[
            Optional {
                parent: ResourceType::Subnet,
                field: RefField::SubnetId,
            },
            List {
                parent: ResourceType::SecurityGroup,
                list: RefList::SecurityGroups,
            },
            Optional {
                parent: ResourceType::Keypair,
                field: RefField::KeyName,
            },
        ],
        ResourceType::SecurityGroup => &[Required {
            parent: ResourceType::Vpc,
            field: RefField::VpcId,
        }],
        ResourceType::InternetGateway => &[
            Region,
            List {
                parent: ResourceType::Vpc,
                list: RefList::VpcAttachments,
            },
        ],
        ResourceType::RouteTable => &[
            List {
                parent: ResourceType::Subnet,
                list: RefList::SubnetAssociations,
            },
            Required {
                parent: ResourceType::Vpc,
                field: RefField::VpcId,
            },
        ],
        ResourceType::Volume => &[
            Region,
            List {
                parent: ResourceType::Instance,
                list: RefList::InstanceAttachments,
            },
        ],
        ResourceType::Vpc
        | ResourceType::Keypair
        | ResourceType::Image
        | ResourceType::Policy
        | ResourceType::Bucket
        | ResourceType::Topic => &[Region],
        ResourceType::User => &[Region, GroupMembership, ManagedPolicies],
        ResourceType::Role | ResourceType::Group => &[Region, ManagedPolicies],
        ResourceType::StorageObject => &[Required {
            parent: ResourceType::Bucket,
            field: RefField::Bucket,
        }],
        ResourceType::Subscription => &[Optional {
            parent: ResourceType::Topic,
            field: RefField::TopicArn,
        }],
        ResourceType::Region => &[],
    }
}

impl ParentResolver {
    pub fn resolve(&self, graph: &Graph, record: &ProviderRecord) -> Result<Vec<Resolution>, ResolveError> {
        let child = record_node(record)?;

        match *self {
            Required { parent, field } => {
                let id = reference(record, field)?.ok_or_else(|| ResolveError::ParentNotFound {
                    child: child.clone(),
                    parent,
                    field,
                })?;
                let parent = Node::new(parent, id);
                if !graph.has_node(&parent) {
                    return Err(ResolveError::DanglingParent { child, parent });
                }
                Ok(vec![Resolution::Resolved(Triple::parent_of(&parent, &child))])
            }
            Optional { parent, field } => Ok(reference(record, field)?
                .map(|id| link(graph, Node::new(parent, id), &child))
                .into_iter()
                .collect()),
            List { parent, list } => Ok(references(record, list)?
                .into_iter()
                .map(|id| link(graph, Node::new(parent, id), &child))
                .collect()),
            Region => {
                let region = single_region(graph)?;
                Ok(vec![Resolution::Resolved(Triple::parent_of(&region, &child))])
            }
            GroupMembership => {
                let ProviderRecord::User(user) = record else {
                    return Err(unsupported(record, "GroupList"));
                };
                Ok(user
                    .group_list
                    .iter()
                    .filter(|id| !id.is_empty())
                    .map(|id| link(graph, Node::new(ResourceType::Group, id.as_str()), &child))
                    .collect())
            }
            ManagedPolicies => {
                let attached = match record {
                    ProviderRecord::User(r) => &r.attached_managed_policies,
                    ProviderRecord::Role(r) => &r.attached_managed_policies,
                    ProviderRecord::Group(r) => &r.attached_managed_policies,
                    _ => return Err(unsupported(record, "AttachedManagedPolicies")),
                };
                Ok(attached
                    .iter()
                    .filter_map(|policy| policy.policy_name.as_deref())
                    .filter(|name| !name.is_empty())
                    .map(|name| match graph.resolve_alias(ResourceType::Policy, name) {
                        Some(id) => {
                            let policy = Node::new(ResourceType::Policy, id);
                            Resolution::Resolved(Triple::parent_of(&policy, &child))
                        }
                        None => Resolution::Unresolved(Diagnostic {
                            child: child.clone(),
                            reason: format!("cannot resolve managed policy '{name}'"),
                        }),
                    })
                    .collect())
            }
        }
    }
}

/// Runs every resolver of the record's type, inserts resolved edges and returns the diagnostics.
pub fn apply(graph: &mut Graph, record: &ProviderRecord) -> Result<Vec<Diagnostic>, ResolveError> {
    let mut diagnostics = Vec::new();
    for resolver in resolvers_for(record.kind()) {
        for resolution in resolver.resolve(graph, record)? {
            match resolution {
                Resolution::Resolved(edge) => {
                    graph.add(edge);
                }
                Resolution::Unresolved(diagnostic) => diagnostics.push(diagnostic),
            }
        }
    }
    Ok(diagnostics)
}

/// Attaches the record to the graph's single region node.
pub fn add_region_parent(graph: &mut Graph, record: &ProviderRecord) -> Result<(), ResolveError> {
    for resolution in Region.resolve(graph, record)? {
        if let Resolution::Resolved(edge) = resolution {
            graph.add(edge);
        }
    }
    Ok(())
}

fn record_node(record: &ProviderRecord) -> Result<Node, ResolveError> {
    let id = record.id().ok_or(ResolveError::MissingId(record.kind()))?;
    Ok(Node::new(record.kind(), id))
}

fn single_region(graph: &Graph) -> Result<Node, ResolveError> {
    let mut regions = graph.nodes_for_type(ResourceType::Region);
    if regions.len() != 1 {
        return Err(ResolveError::RegionCount(regions.len()));
    }
    Ok(regions.remove(0))
}

fn link(graph: &Graph, parent: Node, child: &Node) -> Resolution {
    if graph.has_node(&parent) {
        Resolution::Resolved(Triple::parent_of(&parent, child))
    } else {
        Resolution::Unresolved(Diagnostic {
            child: child.clone(),
            reason: format!("parent {parent} is not in the graph"),
        })
    }
}

fn unsupported(record: &ProviderRecord, field: impl fmt::Display) -> ResolveError {
    ResolveError::UnsupportedField {
        kind: record.kind(),
        field: field.to_string(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn reference(record: &ProviderRecord, field: RefField) -> Result<Option<&str>, ResolveError> {
    let value = match (record, field) {
        (ProviderRecord::Subnet(r), RefField::VpcId) => &r.vpc_id,
        (ProviderRecord::Instance(r), RefField::VpcId) => &r.vpc_id,
        (ProviderRecord::Instance(r), RefField::SubnetId) => &r.subnet_id,
        (ProviderRecord::Instance(r), RefField::KeyName) => &r.key_name,
        (ProviderRecord::SecurityGroup(r), RefField::VpcId) => &r.vpc_id,
        (ProviderRecord::RouteTable(r), RefField::VpcId) => &r.vpc_id,
        (ProviderRecord::StorageObject(r), RefField::Bucket) => &r.bucket,
        (ProviderRecord::Subscription(r), RefField::TopicArn) => &r.topic_arn,
        _ => return Err(unsupported(record, field)),
    };
    Ok(non_empty(value))
}

fn references(record: &ProviderRecord, list: RefList) -> Result<Vec<&str>, ResolveError> {
    let ids = match (record, list) {
        (ProviderRecord::Instance(r), RefList::SecurityGroups) => {
            r.security_groups.iter().filter_map(|g| non_empty(&g.group_id)).collect()
        }
        (ProviderRecord::InternetGateway(r), RefList::VpcAttachments) => {
            r.attachments.iter().filter_map(|a| non_empty(&a.vpc_id)).collect()
        }
        (ProviderRecord::RouteTable(r), RefList::SubnetAssociations) => {
            r.associations.iter().filter_map(|a| non_empty(&a.subnet_id)).collect()
        }
        (ProviderRecord::Volume(r), RefList::InstanceAttachments) => {
            r.attachments.iter().filter_map(|a| non_empty(&a.instance_id)).collect()
        }
        _ => return Err(unsupported(record, list)),
    };
    Ok(ids)
}
