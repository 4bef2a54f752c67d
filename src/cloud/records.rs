// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Provider record shapes as returned by the cloud APIs, one variant per resource collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ResourceType;

use super::mapper::MappingError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceState {
    pub code: Option<i64>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupIdentifier {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Instance {
    pub instance_id: Option<String>,
    pub tags: Vec<Tag>,
    pub instance_type: Option<String>,
    pub subnet_id: Option<String>,
    pub vpc_id: Option<String>,
    pub public_ip_address: Option<String>,
    pub private_ip_address: Option<String>,
    pub image_id: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
    pub state: Option<InstanceState>,
    pub key_name: Option<String>,
    pub security_groups: Vec<GroupIdentifier>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Vpc {
    pub vpc_id: Option<String>,
    pub tags: Vec<Tag>,
    pub is_default: Option<bool>,
    pub state: Option<String>,
    pub cidr_block: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Subnet {
    pub subnet_id: Option<String>,
    pub tags: Vec<Tag>,
    pub vpc_id: Option<String>,
    pub map_public_ip_on_launch: Option<bool>,
    pub state: Option<String>,
    pub cidr_block: Option<String>,
    pub availability_zone: Option<String>,
    pub default_for_az: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IpRange {
    pub cidr_ip: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ipv6Range {
    pub cidr_ipv6: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserIdGroupPair {
    pub group_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IpPermission {
    pub ip_protocol: Option<String>,
    pub from_port: Option<i64>,
    pub to_port: Option<i64>,
    pub ip_ranges: Vec<IpRange>,
    pub ipv6_ranges: Vec<Ipv6Range>,
    pub user_id_group_pairs: Vec<UserIdGroupPair>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SecurityGroup {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<String>,
    pub vpc_id: Option<String>,
    pub ip_permissions: Vec<IpPermission>,
    pub ip_permissions_egress: Vec<IpPermission>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct KeyPair {
    pub key_name: Option<String>,
    pub key_fingerprint: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeAttachment {
    pub instance_id: Option<String>,
    pub device: Option<String>,
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Volume {
    pub volume_id: Option<String>,
    pub tags: Vec<Tag>,
    pub volume_type: Option<String>,
    pub state: Option<String>,
    pub size: Option<i64>,
    pub encrypted: Option<bool>,
    pub create_time: Option<DateTime<Utc>>,
    pub availability_zone: Option<String>,
    pub attachments: Vec<VolumeAttachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VpcAttachment {
    pub vpc_id: Option<String>,
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InternetGateway {
    pub internet_gateway_id: Option<String>,
    pub tags: Vec<Tag>,
    pub attachments: Vec<VpcAttachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route {
    pub destination_cidr_block: Option<String>,
    pub destination_ipv6_cidr_block: Option<String>,
    pub destination_prefix_list_id: Option<String>,
    pub egress_only_internet_gateway_id: Option<String>,
    pub gateway_id: Option<String>,
    pub instance_id: Option<String>,
    pub instance_owner_id: Option<String>,
    pub nat_gateway_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub vpc_peering_connection_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RouteTableAssociation {
    pub route_table_association_id: Option<String>,
    pub subnet_id: Option<String>,
    pub main: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouteTable {
    pub route_table_id: Option<String>,
    pub tags: Vec<Tag>,
    pub vpc_id: Option<String>,
    pub routes: Vec<Route>,
    pub associations: Vec<RouteTableAssociation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Image {
    pub image_id: Option<String>,
    pub name: Option<String>,
    pub architecture: Option<String>,
    pub hypervisor: Option<String>,
    pub creation_date: Option<String>,
    pub state: Option<String>,
    pub public: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDetail {
    pub policy_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedPolicy {
    pub policy_name: Option<String>,
    pub policy_arn: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct User {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub arn: Option<String>,
    pub path: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub password_last_used: Option<DateTime<Utc>>,
    pub user_policy_list: Vec<PolicyDetail>,
    pub group_list: Vec<String>,
    pub attached_managed_policies: Vec<AttachedPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Role {
    pub role_id: Option<String>,
    pub role_name: Option<String>,
    pub arn: Option<String>,
    pub path: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub role_policy_list: Vec<PolicyDetail>,
    pub attached_managed_policies: Vec<AttachedPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Group {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub arn: Option<String>,
    pub path: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub group_policy_list: Vec<PolicyDetail>,
    pub attached_managed_policies: Vec<AttachedPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Policy {
    pub policy_id: Option<String>,
    pub policy_name: Option<String>,
    pub arn: Option<String>,
    pub path: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
    pub update_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub is_attachable: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Bucket {
    pub name: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "ID")]
    pub id: Option<String>,
    #[serde(rename = "DisplayName")]
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StorageObject {
    pub key: Option<String>,
    pub bucket: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub owner: Option<Owner>,
    pub size: Option<i64>,
    pub storage_class: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Subscription {
    pub endpoint: Option<String>,
    pub owner: Option<String>,
    pub protocol: Option<String>,
    pub subscription_arn: Option<String>,
    pub topic_arn: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Topic {
    pub topic_arn: Option<String>,
}

/// One record of any collection the inventory fetches.
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderRecord {
    Instance(Instance),
    Vpc(Vpc),
    Subnet(Subnet),
    SecurityGroup(SecurityGroup),
    Keypair(KeyPair),
    Volume(Volume),
    InternetGateway(InternetGateway),
    RouteTable(RouteTable),
    Image(Image),
    User(User),
    Role(Role),
    Group(Group),
    Policy(Policy),
    Bucket(Bucket),
    StorageObject(StorageObject),
    Subscription(Subscription),
    Topic(Topic),
}

impl ProviderRecord {
    pub fn kind(&self) -> ResourceType {
        match self {
            Self::Instance(_) => ResourceType::Instance,
            Self::Vpc(_) => ResourceType::Vpc,
            Self::Subnet(_) => ResourceType::Subnet,
            Self::SecurityGroup(_) => ResourceType::SecurityGroup,
            Self::Keypair(_) => ResourceType::Keypair,
            Self::Volume(_) => ResourceType::Volume,
            Self::InternetGateway(_) => ResourceType::InternetGateway,
            Self::RouteTable(_) => ResourceType::RouteTable,
            Self::Image(_) => ResourceType::Image,
            Self::User(_) => ResourceType::User,
            Self::Role(_) => ResourceType::Role,
            Self::Group(_) => ResourceType::Group,
            Self::Policy(_) => ResourceType::Policy,
            Self::Bucket(_) => ResourceType::Bucket,
            Self::StorageObject(_) => ResourceType::StorageObject,
            Self::Subscription(_) => ResourceType::Subscription,
            Self::Topic(_) => ResourceType::Topic,
        }
    }

    /// Provider identifier of the record, if it carries a non-empty one.
    pub fn id(&self) -> Option<&str> {
        let id = match self {
            Self::Instance(r) => r.instance_id.as_deref(),
            Self::Vpc(r) => r.vpc_id.as_deref(),
            Self::Subnet(r) => r.subnet_id.as_deref(),
            Self::SecurityGroup(r) => r.group_id.as_deref(),
            Self::Keypair(r) => r.key_name.as_deref(),
            Self::Volume(r) => r.volume_id.as_deref(),
            Self::InternetGateway(r) => r.internet_gateway_id.as_deref(),
            Self::RouteTable(r) => r.route_table_id.as_deref(),
            Self::Image(r) => r.image_id.as_deref(),
            Self::User(r) => r.user_id.as_deref(),
            Self::Role(r) => r.role_id.as_deref(),
            Self::Group(r) => r.group_id.as_deref(),
            Self::Policy(r) => r.policy_id.as_deref(),
            Self::Bucket(r) => r.name.as_deref(),
            Self::StorageObject(r) => r.key.as_deref(),
            Self::Subscription(r) => r.endpoint.as_deref(),
            Self::Topic(r) => r.topic_arn.as_deref(),
        };
        id.filter(|id| !id.is_empty())
    }

    /// Decodes a record from the provider's JSON payload for a declared resource type.
    pub fn from_json(kind: ResourceType, value: Value) -> Result<Self, MappingError> {
        fn decode<T: serde::de::DeserializeOwned>(
            kind: ResourceType,
            value: Value,
        ) -> Result<T, MappingError> {
            serde_json::from_value(value).map_err(|source| MappingError::FieldType { kind, source })
        }

        let record = match kind {
            ResourceType::Instance => Self::Instance(decode(kind, value)?),
            ResourceType::Vpc => Self::Vpc(decode(kind, value)?),
            ResourceType::Subnet => Self::Subnet(decode(kind, value)?),
            ResourceType::SecurityGroup => Self::SecurityGroup(decode(kind, value)?),
            ResourceType::Keypair => Self::Keypair(decode(kind, value)?),
            ResourceType::Volume => Self::Volume(decode(kind, value)?),
            ResourceType::InternetGateway => Self::InternetGateway(decode(kind, value)?),
            ResourceType::RouteTable => Self::RouteTable(decode(kind, value)?),
            ResourceType::Image => Self::Image(decode(kind, value)?),
            ResourceType::User => Self::User(decode(kind, value)?),
            ResourceType::Role => Self::Role(decode(kind, value)?),
            ResourceType::Group => Self::Group(decode(kind, value)?),
            ResourceType::Policy => Self::Policy(decode(kind, value)?),
            ResourceType::Bucket => Self::Bucket(decode(kind, value)?),
            ResourceType::StorageObject => Self::StorageObject(decode(kind, value)?),
            ResourceType::Subscription => Self::Subscription(decode(kind, value)?),
            ResourceType::Topic => Self::Topic(decode(kind, value)?),
            ResourceType::Region => return Err(MappingError::UnsupportedType(kind)),
        };
        Ok(record)
    }
}
