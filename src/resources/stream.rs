use crate::build::Build;
use crate::error::GrantError;
use crate::grant::{Grant, GrantResolver};
use crate::key_grant::DataAccess;
use crate::traits::{Encryptable, Grantee, Resource};

use super::{format_arn, grant_data, Key, ResourceCore};

pub const READ_ACTIONS: &[&str] = &[
    "kinesis:DescribeStreamSummary",
    "kinesis:GetRecords",
    "kinesis:GetShardIterator",
    "kinesis:ListShards",
    "kinesis:SubscribeToShard",
    "kinesis:DescribeStream",
];
pub const WRITE_ACTIONS: &[&str] = &[
    "kinesis:ListShards",
    "kinesis:PutRecord",
    "kinesis:PutRecords",
];

pub const KEY_READ_ACTIONS: &[&str] = &["kms:Decrypt"];
pub const KEY_WRITE_ACTIONS: &[&str] = &["kms:Encrypt", "kms:ReEncrypt*", "kms:GenerateDataKey*"];

#[derive(Debug, Clone, Default)]
pub struct StreamProps {
    pub stream_name: Option<String>,
    pub encryption_key: Option<Key>,
}

/// A data stream. Streams have no resource policy, so every grant goes to
/// the grantee's identity policy.
#[derive(Debug)]
pub struct Stream {
    core: ResourceCore,
    encryption_key: Option<Key>,
}

impl Stream {
    pub fn new(build: &Build, id: &str, props: StreamProps) -> Self {
        let name = props.stream_name.unwrap_or_else(|| id.to_string());
        let arn = format_arn(build.config(), "kinesis", &format!("stream/{name}"));
        Stream {
            core: ResourceCore::owned(build, id, arn),
            encryption_key: props.encryption_key,
        }
    }

    pub fn from_arn(id: &str, arn: &str, encryption_key: Option<Key>) -> Result<Self, GrantError> {
        Ok(Stream {
            core: ResourceCore::imported(id, arn, "kinesis")?,
            encryption_key,
        })
    }

    pub fn grant<A, S>(&self, grantee: &dyn Grantee, actions: A) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GrantResolver::resolve(grantee, actions, [self.arn()], None)
    }

    pub fn grant_read(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::Read, READ_ACTIONS.to_vec())
    }

    pub fn grant_write(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::Write, WRITE_ACTIONS.to_vec())
    }

    pub fn grant_read_write(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        let actions = READ_ACTIONS.iter().chain(WRITE_ACTIONS).copied().collect();
        self.grant_data(grantee, DataAccess::ReadWrite, actions)
    }

    fn grant_data(
        &self,
        grantee: &dyn Grantee,
        access: DataAccess,
        actions: Vec<&str>,
    ) -> Result<Grant, GrantError> {
        grant_data(
            self,
            None,
            grantee,
            access,
            actions,
            vec![self.core.arn.clone()],
            (KEY_READ_ACTIONS, KEY_WRITE_ACTIONS),
        )
    }
}

impl Resource for Stream {
    fn node_id(&self) -> &str {
        &self.core.id
    }

    fn arn(&self) -> &str {
        &self.core.arn
    }

    fn account(&self) -> Option<&str> {
        self.core.account.as_deref()
    }
}

impl Encryptable for Stream {
    fn encryption_key(&self) -> Option<&Key> {
        self.encryption_key.as_ref()
    }
}
