// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Node identity: a resource type paired with the provider's opaque identifier.

use std::fmt::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::graph::GraphError;

/// Every kind of resource the inventory knows how to model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Region,
    Vpc,
    Subnet,
    Instance,
    SecurityGroup,
    Keypair,
    Volume,
    InternetGateway,
    RouteTable,
    Image,
    User,
    Role,
    Group,
    Policy,
    Bucket,
    StorageObject,
    Subscription,
    Topic,
}

impl ResourceType {
    pub const ALL: [ResourceType; 18] = [
        Self::Region,
        Self::Vpc,
        Self::Subnet,
        Self::Instance,
        Self::SecurityGroup,
        Self::Keypair,
        Self::Volume,
        Self::InternetGateway,
        Self::RouteTable,
        Self::Image,
        Self::User,
        Self::Role,
        Self::Group,
        Self::Policy,
        Self::Bucket,
        Self::StorageObject,
        Self::Subscription,
        Self::Topic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::Instance => "instance",
            Self::SecurityGroup => "securitygroup",
            Self::Keypair => "keypair",
            Self::Volume => "volume",
            Self::InternetGateway => "internetgateway",
            Self::RouteTable => "routetable",
            Self::Image => "image",
            Self::User => "user",
            Self::Role => "role",
            Self::Group => "group",
            Self::Policy => "policy",
            Self::Bucket => "bucket",
            Self::StorageObject => "storageobject",
            Self::Subscription => "subscription",
            Self::Topic => "topic",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GraphError::UnknownResourceType(s.to_string()))
    }
}

/// A graph vertex. Two nodes are the same node iff kind and id match.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Node {
    kind: ResourceType,
    id: String,
}

impl Node {
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Ids are opaque provider strings; separators of the line format are escaped.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}<", self.kind)?;
        for c in self.id.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\t' => f.write_str("\\t")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('>')
    }
}

fn unescape_id(raw: &str) -> Option<String> {
    let mut id = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            id.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => id.push('\\'),
            't' => id.push('\t'),
            'n' => id.push('\n'),
            'r' => id.push('\r'),
            _ => return None,
        }
    }
    Some(id)
}

impl FromStr for Node {
    type Err = GraphError;

    /// Parses the `/type<id>` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GraphError::MalformedNode(s.to_string());

        let body = s.strip_prefix('/').ok_or_else(malformed)?;
        let body = body.strip_suffix('>').ok_or_else(malformed)?;
        let (kind, raw_id) = body.split_once('<').ok_or_else(malformed)?;
        if raw_id.is_empty() {
            return Err(malformed());
        }
        let id = unescape_id(raw_id).ok_or_else(malformed)?;

        Ok(Node::new(kind.parse()?, id))
    }
}
