// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Declarative extraction tables turning provider records into resources.

use std::net::IpAddr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Resource, ResourceType};

use super::records::{
    Bucket, Group, Image, Instance, InternetGateway, IpPermission, KeyPair, Policy, ProviderRecord,
    Role, Route, RouteTable, SecurityGroup, StorageObject, Subnet, Subscription, Tag, Topic, User,
    Volume, Vpc,
};

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("expected a {expected} record, got a {found} record")]
    UnexpectedRecord {
        expected: ResourceType,
        found: ResourceType,
    },
    #[error("record does not match the {kind} shape: {source}")]
    FieldType {
        kind: ResourceType,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} records are not fetched from a provider")]
    UnsupportedType(ResourceType),
    #[error("{0} record has no identifier")]
    MissingId(ResourceType),
    #[error("{kind} {id}: cannot extract {property} from {field}: {source}")]
    Extraction {
        kind: ResourceType,
        id: String,
        property: &'static str,
        field: &'static str,
        #[source]
        source: ExtractError,
    },
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Outcome of one extraction. `NotFound` omits the property without failing the record.
#[derive(Clone, Debug, PartialEq)]
pub enum Extraction {
    Found(Value),
    NotFound,
}

type Extracted = Result<Extraction, ExtractError>;

pub struct PropertyRule<R> {
    pub name: &'static str,
    pub source: &'static str,
    pub extract: fn(&R) -> Extracted,
}

macro_rules! rules {
    ($record:ty { $($name:literal, $source:literal => $extract:expr),* $(,)? }) => {
        &[$(PropertyRule::<$record> { name: $name, source: $source, extract: $extract }),*]
    };
}

const INSTANCE: &[PropertyRule<Instance>] = rules!(Instance {
    "Id", "InstanceId" => |r| value(&r.instance_id),
    "Name", "Tags" => |r| tag(&r.tags, "Name"),
    "Type", "InstanceType" => |r| value(&r.instance_type),
    "SubnetId", "SubnetId" => |r| value(&r.subnet_id),
    "VpcId", "VpcId" => |r| value(&r.vpc_id),
    "PublicIp", "PublicIpAddress" => |r| value(&r.public_ip_address),
    "PrivateIp", "PrivateIpAddress" => |r| value(&r.private_ip_address),
    "ImageId", "ImageId" => |r| value(&r.image_id),
    "LaunchTime", "LaunchTime" => |r| value(&r.launch_time),
    "State", "State.Name" => |r| field(&r.state, |s| &s.name),
    "KeyName", "KeyName" => |r| value(&r.key_name),
    "SecurityGroups", "SecurityGroups.GroupId" => |r| slice_values(&r.security_groups, |g| &g.group_id),
});

const VPC: &[PropertyRule<Vpc>] = rules!(Vpc {
    "Id", "VpcId" => |r| value(&r.vpc_id),
    "Name", "Tags" => |r| tag(&r.tags, "Name"),
    "IsDefault", "IsDefault" => |r| value(&r.is_default),
    "State", "State" => |r| value(&r.state),
    "CidrBlock", "CidrBlock" => |r| value(&r.cidr_block),
});

const SUBNET: &[PropertyRule<Subnet>] = rules!(Subnet {
    "Id", "SubnetId" => |r| value(&r.subnet_id),
    "Name", "Tags" => |r| tag(&r.tags, "Name"),
    "VpcId", "VpcId" => |r| value(&r.vpc_id),
    "MapPublicIpOnLaunch", "MapPublicIpOnLaunch" => |r| value(&r.map_public_ip_on_launch),
    "State", "State" => |r| value(&r.state),
    "CidrBlock", "CidrBlock" => |r| value(&r.cidr_block),
    "AvailabilityZone", "AvailabilityZone" => |r| value(&r.availability_zone),
    "DefaultForAz", "DefaultForAz" => |r| value(&r.default_for_az),
});

const SECURITY_GROUP: &[PropertyRule<SecurityGroup>] = rules!(SecurityGroup {
    "Id", "GroupId" => |r| value(&r.group_id),
    "Name", "GroupName" => |r| value(&r.group_name),
    "Description", "Description" => |r| value(&r.description),
    "InboundRules", "IpPermissions" => |r| firewall_rules(&r.ip_permissions),
    "OutboundRules", "IpPermissionsEgress" => |r| firewall_rules(&r.ip_permissions_egress),
    "OwnerId", "OwnerId" => |r| value(&r.owner_id),
    "VpcId", "VpcId" => |r| value(&r.vpc_id),
});

const KEYPAIR: &[PropertyRule<KeyPair>] = rules!(KeyPair {
    "Id", "KeyName" => |r| value(&r.key_name),
    "Name", "KeyName" => |r| value(&r.key_name),
    "Fingerprint", "KeyFingerprint" => |r| value(&r.key_fingerprint),
});

const VOLUME: &[PropertyRule<Volume>] = rules!(Volume {
    "Id", "VolumeId" => |r| value(&r.volume_id),
    "Name", "Tags" => |r| tag(&r.tags, "Name"),
    "Type", "VolumeType" => |r| value(&r.volume_type),
    "State", "State" => |r| value(&r.state),
    "Size", "Size" => |r| value(&r.size),
    "Encrypted", "Encrypted" => |r| value(&r.encrypted),
    "Created", "CreateTime" => |r| value(&r.create_time),
    "AvailabilityZone", "AvailabilityZone" => |r| value(&r.availability_zone),
});

const INTERNET_GATEWAY: &[PropertyRule<InternetGateway>] = rules!(InternetGateway {
    "Id", "InternetGatewayId" => |r| value(&r.internet_gateway_id),
    "Name", "Tags" => |r| tag(&r.tags, "Name"),
    "Vpcs", "Attachments.VpcId" => |r| slice_values(&r.attachments, |a| &a.vpc_id),
});

const ROUTE_TABLE: &[PropertyRule<RouteTable>] = rules!(RouteTable {
    "Id", "RouteTableId" => |r| value(&r.route_table_id),
    "Name", "Tags" => |r| tag(&r.tags, "Name"),
    "VpcId", "VpcId" => |r| value(&r.vpc_id),
    "Routes", "Routes" => |r| routes(&r.routes),
    "Main", "Associations.Main" => |r| any_true(&r.associations, |a| a.main),
});

const IMAGE: &[PropertyRule<Image>] = rules!(Image {
    "Id", "ImageId" => |r| value(&r.image_id),
    "Name", "Name" => |r| value(&r.name),
    "Architecture", "Architecture" => |r| value(&r.architecture),
    "Hypervisor", "Hypervisor" => |r| value(&r.hypervisor),
    "Created", "CreationDate" => |r| value(&r.creation_date),
    "State", "State" => |r| value(&r.state),
    "Public", "Public" => |r| value(&r.public),
});

const USER: &[PropertyRule<User>] = rules!(User {
    "Id", "UserId" => |r| value(&r.user_id),
    "Name", "UserName" => |r| value(&r.user_name),
    "Arn", "Arn" => |r| value(&r.arn),
    "Path", "Path" => |r| value(&r.path),
    "Created", "CreateDate" => |r| value(&r.create_date),
    "PasswordLastUsed", "PasswordLastUsed" => |r| value(&r.password_last_used),
    "InlinePolicies", "UserPolicyList.PolicyName" => |r| slice_values(&r.user_policy_list, |p| &p.policy_name),
});

const ROLE: &[PropertyRule<Role>] = rules!(Role {
    "Id", "RoleId" => |r| value(&r.role_id),
    "Name", "RoleName" => |r| value(&r.role_name),
    "Arn", "Arn" => |r| value(&r.arn),
    "Path", "Path" => |r| value(&r.path),
    "Created", "CreateDate" => |r| value(&r.create_date),
    "InlinePolicies", "RolePolicyList.PolicyName" => |r| slice_values(&r.role_policy_list, |p| &p.policy_name),
});

const GROUP: &[PropertyRule<Group>] = rules!(Group {
    "Id", "GroupId" => |r| value(&r.group_id),
    "Name", "GroupName" => |r| value(&r.group_name),
    "Arn", "Arn" => |r| value(&r.arn),
    "Path", "Path" => |r| value(&r.path),
    "Created", "CreateDate" => |r| value(&r.create_date),
    "InlinePolicies", "GroupPolicyList.PolicyName" => |r| slice_values(&r.group_policy_list, |p| &p.policy_name),
});

const POLICY: &[PropertyRule<Policy>] = rules!(Policy {
    "Id", "PolicyId" => |r| value(&r.policy_id),
    "Name", "PolicyName" => |r| value(&r.policy_name),
    "Arn", "Arn" => |r| value(&r.arn),
    "Path", "Path" => |r| value(&r.path),
    "Created", "CreateDate" => |r| value(&r.create_date),
    "Updated", "UpdateDate" => |r| value(&r.update_date),
    "Description", "Description" => |r| value(&r.description),
    "Attachable", "IsAttachable" => |r| value(&r.is_attachable),
});

const BUCKET: &[PropertyRule<Bucket>] = rules!(Bucket {
    "Id", "Name" => |r| value(&r.name),
    "Name", "Name" => |r| value(&r.name),
    "Created", "CreationDate" => |r| value(&r.creation_date),
});

const STORAGE_OBJECT: &[PropertyRule<StorageObject>] = rules!(StorageObject {
    "Id", "Key" => |r| value(&r.key),
    "Name", "Key" => |r| value(&r.key),
    "Bucket", "Bucket" => |r| value(&r.bucket),
    "Modified", "LastModified" => |r| value(&r.last_modified),
    "Owner", "Owner.ID" => |r| field(&r.owner, |o| &o.id),
    "Size", "Size" => |r| value(&r.size),
    "Class", "StorageClass" => |r| value(&r.storage_class),
});

const SUBSCRIPTION: &[PropertyRule<Subscription>] = rules!(Subscription {
    "Id", "Endpoint" => |r| value(&r.endpoint),
    "Owner", "Owner" => |r| value(&r.owner),
    "Protocol", "Protocol" => |r| value(&r.protocol),
    "Arn", "SubscriptionArn" => |r| value(&r.subscription_arn),
    "TopicArn", "TopicArn" => |r| value(&r.topic_arn),
});

const TOPIC: &[PropertyRule<Topic>] = rules!(Topic {
    "Id", "TopicArn" => |r| value(&r.topic_arn),
    "Name", "TopicArn" => |r| value(&r.topic_arn),
});

/// Maps one record declared as `kind` into its resource projection.
pub fn map_record(kind: ResourceType, record: &ProviderRecord) -> Result<Resource, MappingError> {
    if record.kind() != kind {
        return Err(MappingError::UnexpectedRecord {
            expected: kind,
            found: record.kind(),
        });
    }
    let id = record.id().ok_or(MappingError::MissingId(kind))?;

    let mut resource = Resource::new(kind, id);
    match record {
        ProviderRecord::Instance(r) => apply(&mut resource, r, INSTANCE),
        ProviderRecord::Vpc(r) => apply(&mut resource, r, VPC),
        ProviderRecord::Subnet(r) => apply(&mut resource, r, SUBNET),
        ProviderRecord::SecurityGroup(r) => apply(&mut resource, r, SECURITY_GROUP),
        ProviderRecord::Keypair(r) => apply(&mut resource, r, KEYPAIR),
        ProviderRecord::Volume(r) => apply(&mut resource, r, VOLUME),
        ProviderRecord::InternetGateway(r) => apply(&mut resource, r, INTERNET_GATEWAY),
        ProviderRecord::RouteTable(r) => apply(&mut resource, r, ROUTE_TABLE),
        ProviderRecord::Image(r) => apply(&mut resource, r, IMAGE),
        ProviderRecord::User(r) => apply(&mut resource, r, USER),
        ProviderRecord::Role(r) => apply(&mut resource, r, ROLE),
        ProviderRecord::Group(r) => apply(&mut resource, r, GROUP),
        ProviderRecord::Policy(r) => apply(&mut resource, r, POLICY),
        ProviderRecord::Bucket(r) => apply(&mut resource, r, BUCKET),
        ProviderRecord::StorageObject(r) => apply(&mut resource, r, STORAGE_OBJECT),
        ProviderRecord::Subscription(r) => apply(&mut resource, r, SUBSCRIPTION),
        ProviderRecord::Topic(r) => apply(&mut resource, r, TOPIC),
    }?;

    Ok(resource)
}

fn apply<R>(resource: &mut Resource, record: &R, rules: &[PropertyRule<R>]) -> Result<(), MappingError> {
    for rule in rules {
        let extracted = (rule.extract)(record).map_err(|source| MappingError::Extraction {
            kind: resource.kind(),
            id: resource.id().to_string(),
            property: rule.name,
            field: rule.source,
            source,
        })?;
        if let Extraction::Found(value) = extracted {
            resource.set(rule.name, value);
        }
    }
    Ok(())
}

fn value<T: Serialize>(field: &Option<T>) -> Extracted {
    match field {
        Some(v) => Ok(Extraction::Found(serde_json::to_value(v)?)),
        None => Ok(Extraction::NotFound),
    }
}

fn field<S, T: Serialize>(parent: &Option<S>, get: impl Fn(&S) -> &Option<T>) -> Extracted {
    match parent {
        Some(parent) => value(get(parent)),
        None => Ok(Extraction::NotFound),
    }
}

fn tag(tags: &[Tag], key: &str) -> Extracted {
    let found = tags
        .iter()
        .find(|t| t.key.as_deref() == Some(key))
        .and_then(|t| t.value.clone());
    Ok(found.map_or(Extraction::NotFound, |v| Extraction::Found(Value::String(v))))
}

fn slice_values<S>(items: &[S], get: impl Fn(&S) -> &Option<String>) -> Extracted {
    let values: Vec<Value> = items
        .iter()
        .filter_map(|item| get(item).as_deref())
        .filter(|v| !v.is_empty())
        .map(|v| Value::String(v.to_string()))
        .collect();
    if values.is_empty() {
        return Ok(Extraction::NotFound);
    }
    Ok(Extraction::Found(Value::Array(values)))
}

fn any_true<S>(items: &[S], get: impl Fn(&S) -> Option<bool>) -> Extracted {
    let any = items.iter().any(|item| get(item).unwrap_or(false));
    Ok(Extraction::Found(Value::Bool(any)))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortRange {
    pub from_port: i64,
    pub to_port: i64,
    pub any: bool,
}

impl PortRange {
    fn any() -> Self {
        Self {
            from_port: -1,
            to_port: -1,
            any: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FirewallRule {
    pub port_range: PortRange,
    pub protocol: String,
    #[serde(rename = "IPRanges")]
    pub ip_ranges: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

fn firewall_rules(permissions: &[IpPermission]) -> Extracted {
    let mut rules = Vec::with_capacity(permissions.len());
    for permission in permissions {
        let protocol = permission.ip_protocol.as_deref().unwrap_or("-1");
        let (protocol, port_range) = match protocol {
            "-1" => ("any", PortRange::any()),
            "tcp" | "udp" | "icmp" | "58" => match (permission.from_port, permission.to_port) {
                (Some(from), Some(to)) if from != -1 && to != -1 => (
                    protocol,
                    PortRange {
                        from_port: from,
                        to_port: to,
                        any: false,
                    },
                ),
                _ => (protocol, PortRange::any()),
            },
            other => (other, PortRange::any()),
        };

        let mut ip_ranges = Vec::new();
        let v4 = permission.ip_ranges.iter().filter_map(|r| r.cidr_ip.as_deref());
        let v6 = permission.ipv6_ranges.iter().filter_map(|r| r.cidr_ipv6.as_deref());
        for cidr in v4.chain(v6) {
            validate_cidr(cidr)?;
            ip_ranges.push(cidr.to_string());
        }

        let sources = permission
            .user_id_group_pairs
            .iter()
            .filter_map(|pair| pair.group_id.clone())
            .collect();

        rules.push(FirewallRule {
            port_range,
            protocol: protocol.to_string(),
            ip_ranges,
            sources,
        });
    }

    if rules.is_empty() {
        return Ok(Extraction::NotFound);
    }
    Ok(Extraction::Found(serde_json::to_value(rules)?))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTarget {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// A route keeps every target the provider reports; instance routes name both the instance and its ENI.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(rename = "DestinationIPv6", skip_serializing_if = "Option::is_none")]
    pub destination_ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_prefix_list_id: Option<String>,
    pub targets: Vec<RouteTarget>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

fn routes(routes: &[Route]) -> Extracted {
    let mut entries = Vec::with_capacity(routes.len());
    for route in routes {
        let mut entry = RouteEntry::default();
        if let Some(cidr) = non_empty(&route.destination_cidr_block) {
            validate_cidr(cidr)?;
            entry.destination = Some(cidr.to_string());
        }
        if let Some(cidr) = non_empty(&route.destination_ipv6_cidr_block) {
            validate_cidr(cidr)?;
            entry.destination_ipv6 = Some(cidr.to_string());
        }
        entry.destination_prefix_list_id =
            non_empty(&route.destination_prefix_list_id).map(str::to_string);

        let candidates = [
            ("egress_only_internet_gateway", &route.egress_only_internet_gateway_id),
            ("gateway", &route.gateway_id),
            ("instance", &route.instance_id),
            ("nat_gateway", &route.nat_gateway_id),
            ("network_interface", &route.network_interface_id),
            ("vpc_peering_connection", &route.vpc_peering_connection_id),
        ];
        for (kind, id) in candidates {
            let Some(reference) = non_empty(id) else {
                continue;
            };
            let owner = match kind {
                "instance" => non_empty(&route.instance_owner_id).map(str::to_string),
                _ => None,
            };
            entry.targets.push(RouteTarget {
                kind: kind.to_string(),
                reference: reference.to_string(),
                owner,
            });
        }

        entries.push(entry);
    }

    if entries.is_empty() {
        return Ok(Extraction::NotFound);
    }
    Ok(Extraction::Found(serde_json::to_value(entries)?))
}

fn validate_cidr(cidr: &str) -> Result<(), ExtractError> {
    let invalid = || ExtractError::Invalid(format!("invalid cidr '{cidr}'"));

    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::records::{
        GroupIdentifier, InstanceState, IpRange, RouteTableAssociation, UserIdGroupPair,
    };
    use serde_json::json;

    fn name_tag(value: &str) -> Tag {
        Tag {
            key: Some("Name".into()),
            value: Some(value.into()),
        }
    }

    #[test]
    fn maps_instance_fields() {
        let record = ProviderRecord::Instance(Instance {
            instance_id: Some("inst_1".into()),
            tags: vec![name_tag("redis")],
            instance_type: Some("t2.micro".into()),
            subnet_id: Some("sub_1".into()),
            launch_time: Some("2017-01-10T16:47:18Z".parse().unwrap()),
            state: Some(InstanceState {
                code: Some(16),
                name: Some("running".into()),
            }),
            security_groups: vec![GroupIdentifier {
                group_id: Some("sg-1".into()),
                group_name: Some("default".into()),
            }],
            ..Instance::default()
        });

        let resource = map_record(ResourceType::Instance, &record).expect("instance maps");
        assert_eq!(resource.id(), "inst_1");
        assert_eq!(resource.property("Id"), Some(&json!("inst_1")));
        assert_eq!(resource.property("Name"), Some(&json!("redis")));
        assert_eq!(resource.property("Type"), Some(&json!("t2.micro")));
        assert_eq!(resource.property("State"), Some(&json!("running")));
        assert_eq!(resource.property("LaunchTime"), Some(&json!("2017-01-10T16:47:18Z")));
        assert_eq!(resource.property("SecurityGroups"), Some(&json!(["sg-1"])));
        assert_eq!(resource.property("VpcId"), None);
        assert_eq!(resource.property("PublicIp"), None);
    }

    #[test]
    fn missing_tag_does_not_abort_mapping() {
        let record = ProviderRecord::Vpc(Vpc {
            vpc_id: Some("vpc_1".into()),
            tags: vec![Tag {
                key: Some("Env".into()),
                value: Some("prod".into()),
            }],
            is_default: Some(true),
            ..Vpc::default()
        });

        let resource = map_record(ResourceType::Vpc, &record).expect("vpc maps");
        assert_eq!(resource.name(), None);
        assert_eq!(resource.property("IsDefault"), Some(&json!(true)));
        assert_eq!(resource.properties().len(), 2);
    }

    #[test]
    fn mismatched_record_is_rejected() {
        let record = ProviderRecord::Vpc(Vpc {
            vpc_id: Some("vpc_1".into()),
            ..Vpc::default()
        });
        assert!(matches!(
            map_record(ResourceType::Subnet, &record),
            Err(MappingError::UnexpectedRecord {
                expected: ResourceType::Subnet,
                found: ResourceType::Vpc
            })
        ));

        let anonymous = ProviderRecord::Subnet(Subnet::default());
        assert!(matches!(
            map_record(ResourceType::Subnet, &anonymous),
            Err(MappingError::MissingId(ResourceType::Subnet))
        ));
    }

    #[test]
    fn normalises_firewall_rules() {
        let record = ProviderRecord::SecurityGroup(SecurityGroup {
            group_id: Some("sg-1".into()),
            group_name: Some("web".into()),
            vpc_id: Some("vpc_1".into()),
            ip_permissions: vec![
                IpPermission {
                    ip_protocol: Some("tcp".into()),
                    from_port: Some(22),
                    to_port: Some(22),
                    ip_ranges: vec![IpRange {
                        cidr_ip: Some("10.0.0.0/16".into()),
                    }],
                    ..IpPermission::default()
                },
                IpPermission {
                    ip_protocol: Some("-1".into()),
                    user_id_group_pairs: vec![UserIdGroupPair {
                        group_id: Some("sg-2".into()),
                    }],
                    ..IpPermission::default()
                },
            ],
            ..SecurityGroup::default()
        });

        let resource = map_record(ResourceType::SecurityGroup, &record).expect("group maps");
        assert_eq!(resource.name(), Some("web"));
        assert_eq!(
            resource.property("InboundRules"),
            Some(&json!([
                {
                    "PortRange": {"FromPort": 22, "ToPort": 22, "Any": false},
                    "Protocol": "tcp",
                    "IPRanges": ["10.0.0.0/16"]
                },
                {
                    "PortRange": {"FromPort": -1, "ToPort": -1, "Any": true},
                    "Protocol": "any",
                    "IPRanges": [],
                    "Sources": ["sg-2"]
                }
            ]))
        );
        assert_eq!(resource.property("OutboundRules"), None);
    }

    #[test]
    fn invalid_cidr_is_a_hard_error() {
        let record = ProviderRecord::SecurityGroup(SecurityGroup {
            group_id: Some("sg-1".into()),
            ip_permissions: vec![IpPermission {
                ip_protocol: Some("tcp".into()),
                ip_ranges: vec![IpRange {
                    cidr_ip: Some("10.0.0.0/99".into()),
                }],
                ..IpPermission::default()
            }],
            ..SecurityGroup::default()
        });

        let err = map_record(ResourceType::SecurityGroup, &record).unwrap_err();
        assert!(matches!(
            err,
            MappingError::Extraction {
                property: "InboundRules",
                ..
            }
        ));
    }

    #[test]
    fn maps_route_tables() {
        let record = ProviderRecord::RouteTable(RouteTable {
            route_table_id: Some("rtb-1".into()),
            vpc_id: Some("vpc_1".into()),
            routes: vec![Route {
                destination_cidr_block: Some("10.0.0.0/16".into()),
                gateway_id: Some("local".into()),
                ..Route::default()
            }],
            associations: vec![RouteTableAssociation {
                route_table_association_id: Some("rtbassoc-1".into()),
                subnet_id: Some("sub_1".into()),
                main: Some(false),
            }],
            ..RouteTable::default()
        });

        let resource = map_record(ResourceType::RouteTable, &record).expect("route table maps");
        assert_eq!(resource.property("Main"), Some(&json!(false)));
        assert_eq!(
            resource.property("Routes"),
            Some(&json!([{"Destination": "10.0.0.0/16", "Targets": [{"Type": "gateway", "Ref": "local"}]}]))
        );
    }

    #[test]
    fn keeps_every_route_target() {
        let record = ProviderRecord::RouteTable(RouteTable {
            route_table_id: Some("rtb-1".into()),
            vpc_id: Some("vpc_1".into()),
            routes: vec![
                Route {
                    destination_cidr_block: Some("0.0.0.0/0".into()),
                    instance_id: Some("i-nat".into()),
                    instance_owner_id: Some("123456789012".into()),
                    network_interface_id: Some("eni-1".into()),
                    ..Route::default()
                },
                Route {
                    destination_prefix_list_id: Some("pl-63a5400a".into()),
                    gateway_id: Some("vpce-1".into()),
                    ..Route::default()
                },
                Route {
                    destination_ipv6_cidr_block: Some("::/0".into()),
                    ..Route::default()
                },
            ],
            ..RouteTable::default()
        });

        let resource = map_record(ResourceType::RouteTable, &record).expect("route table maps");
        assert_eq!(
            resource.property("Routes"),
            Some(&json!([
                {
                    "Destination": "0.0.0.0/0",
                    "Targets": [
                        {"Type": "instance", "Ref": "i-nat", "Owner": "123456789012"},
                        {"Type": "network_interface", "Ref": "eni-1"}
                    ]
                },
                {
                    "DestinationPrefixListId": "pl-63a5400a",
                    "Targets": [{"Type": "gateway", "Ref": "vpce-1"}]
                },
                {"DestinationIPv6": "::/0", "Targets": []}
            ]))
        );

        let invalid = ProviderRecord::RouteTable(RouteTable {
            route_table_id: Some("rtb-2".into()),
            routes: vec![Route {
                destination_cidr_block: Some("0.0.0.0/33".into()),
                gateway_id: Some("igw-1".into()),
                ..Route::default()
            }],
            ..RouteTable::default()
        });
        assert!(matches!(
            map_record(ResourceType::RouteTable, &invalid),
            Err(MappingError::Extraction {
                property: "Routes",
                ..
            })
        ));
    }

    #[test]
    fn maps_nested_owner_of_storage_objects() {
        let record = ProviderRecord::from_json(
            ResourceType::StorageObject,
            json!({
                "Key": "logs/app.log",
                "Bucket": "my-bucket",
                "Size": 1024,
                "Owner": {"ID": "owner-1", "DisplayName": "ops"},
                "StorageClass": "STANDARD"
            }),
        )
        .unwrap();

        let resource = map_record(ResourceType::StorageObject, &record).unwrap();
        assert_eq!(resource.property("Owner"), Some(&json!("owner-1")));
        assert_eq!(resource.property("Size"), Some(&json!(1024)));
        assert_eq!(resource.property("Bucket"), Some(&json!("my-bucket")));
    }
}
