use crate::attachment::{AddToResourcePolicyResult, ResourcePolicyAttachment};
use crate::build::Build;
use crate::error::GrantError;
use crate::grant::{Grant, GrantMode, GrantResolver};
use crate::key_grant::{DataAccess, KeyGrantPropagator};
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::traits::{Encryptable, Grantee, Resource, ResourcePolicyCapable};

use super::{format_arn, grant_data, Key, ResourceCore};

pub const READ_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:DescribeTable",
];
pub const WRITE_DATA_ACTIONS: &[&str] = &[
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];
pub const STREAM_ACTIONS: &[&str] = &[
    "dynamodb:DescribeStream",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
];
pub const LIST_STREAMS_ACTION: &str = "dynamodb:ListStreams";
pub const INDEX_READ_ACTIONS: &[&str] = &["dynamodb:Query", "dynamodb:Scan"];

pub const KEY_READ_ACTIONS: &[&str] = &["kms:Decrypt", "kms:DescribeKey"];
pub const KEY_WRITE_ACTIONS: &[&str] = &["kms:Encrypt", "kms:ReEncrypt*", "kms:GenerateDataKey*"];
/// Change stream records only need decrypting.
pub const STREAM_KEY_ACTIONS: &[&str] = &["kms:Decrypt"];

#[derive(Debug, Clone, Default)]
pub struct TableProps {
    pub table_name: Option<String>,
    /// Enable the change stream.
    pub stream: bool,
    /// Names of global/local secondary indexes.
    pub indexes: Vec<String>,
    pub encryption_key: Option<Key>,
}

/// What is known about a table defined elsewhere.
#[derive(Debug, Clone, Default)]
pub struct TableAttributes {
    pub table_arn: String,
    pub stream_arn: Option<String>,
    pub indexes: Vec<String>,
    pub encryption_key: Option<Key>,
}

#[derive(Debug)]
pub struct Table {
    core: ResourceCore,
    policy: ResourcePolicyAttachment,
    stream_arn: Option<String>,
    indexes: Vec<String>,
    encryption_key: Option<Key>,
}

impl Table {
    pub fn new(build: &Build, id: &str, props: TableProps) -> Self {
        let name = props.table_name.unwrap_or_else(|| id.to_string());
        let arn = format_arn(build.config(), "dynamodb", &format!("table/{name}"));
        Table {
            policy: ResourcePolicyAttachment::new(build, id, arn.as_str(), true),
            stream_arn: props.stream.then(|| format!("{arn}/stream/*")),
            core: ResourceCore::owned(build, id, arn),
            indexes: props.indexes,
            encryption_key: props.encryption_key,
        }
    }

    pub fn from_arn(build: &Build, id: &str, arn: &str) -> Result<Self, GrantError> {
        Self::from_attributes(
            build,
            id,
            TableAttributes {
                table_arn: arn.to_string(),
                ..TableAttributes::default()
            },
        )
    }

    pub fn from_attributes(
        build: &Build,
        id: &str,
        attributes: TableAttributes,
    ) -> Result<Self, GrantError> {
        Ok(Table {
            core: ResourceCore::imported(id, &attributes.table_arn, "dynamodb")?,
            policy: ResourcePolicyAttachment::new(build, id, attributes.table_arn.as_str(), false),
            stream_arn: attributes.stream_arn,
            indexes: attributes.indexes,
            encryption_key: attributes.encryption_key,
        })
    }

    pub fn table_policy(&self) -> Option<&PolicyObject> {
        self.policy.policy()
    }

    pub fn stream_arn(&self) -> Option<&str> {
        self.stream_arn.as_deref()
    }

    /// Table ARN, plus `<arn>/index/*` when the table has indexes.
    fn data_arns(&self) -> Vec<String> {
        let mut arns = vec![self.core.arn.clone()];
        if !self.indexes.is_empty() {
            arns.push(format!("{}/index/*", self.core.arn));
        }
        arns
    }

    /// Grant arbitrary actions on the table and its indexes. No key grant.
    pub fn grant<A, S>(&self, grantee: &dyn Grantee, actions: A) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GrantResolver::resolve(grantee, actions, self.data_arns(), Some(self))
    }

    pub fn grant_read_data(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::Read, READ_DATA_ACTIONS.to_vec())
    }

    pub fn grant_write_data(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::Write, WRITE_DATA_ACTIONS.to_vec())
    }

    pub fn grant_read_write_data(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        let actions = READ_DATA_ACTIONS
            .iter()
            .chain(WRITE_DATA_ACTIONS)
            .copied()
            .collect();
        self.grant_data(grantee, DataAccess::ReadWrite, actions)
    }

    pub fn grant_full_access(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::ReadWrite, vec!["dynamodb:*"])
    }

    /// Read the change stream. Fails when the table has no stream.
    ///
    /// Stream access only ever goes through the identity policy.
    pub fn grant_stream_read(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        let Some(stream_arn) = self.stream_arn.as_deref() else {
            return Err(GrantError::MissingCapability(format!(
                "stream must be enabled on table '{}' to grant stream read",
                self.core.id
            )));
        };

        let list = GrantResolver::resolve(grantee, [LIST_STREAMS_ACTION], ["*"], None)?;
        let read = GrantResolver::resolve(grantee, STREAM_ACTIONS.iter().copied(), [stream_arn], None)?;
        let grant = list.combine(read);
        KeyGrantPropagator::propagate(&grant, self, grantee, STREAM_KEY_ACTIONS)?;
        Ok(grant)
    }

    /// Read one secondary index. Fails when no index has that name.
    pub fn grant_index_read(&self, grantee: &dyn Grantee, index: &str) -> Result<Grant, GrantError> {
        if !self.indexes.iter().any(|i| i == index) {
            return Err(GrantError::MissingCapability(format!(
                "no such index '{index}' on table '{}'",
                self.core.id
            )));
        }
        grant_data(
            self,
            Some(self),
            grantee,
            DataAccess::Read,
            INDEX_READ_ACTIONS.to_vec(),
            vec![format!("{}/index/{index}", self.core.arn)],
            (KEY_READ_ACTIONS, KEY_WRITE_ACTIONS),
        )
    }

    fn grant_data(
        &self,
        grantee: &dyn Grantee,
        access: DataAccess,
        actions: Vec<&str>,
    ) -> Result<Grant, GrantError> {
        grant_data(
            self,
            Some(self),
            grantee,
            access,
            actions,
            self.data_arns(),
            (KEY_READ_ACTIONS, KEY_WRITE_ACTIONS),
        )
    }
}

impl Resource for Table {
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

impl ResourcePolicyCapable for Table {
    fn add_to_resource_policy(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToResourcePolicyResult, GrantError> {
        self.policy.add_statement(statement)
    }

    fn auto_create_policy(&self) -> bool {
        self.policy.auto_create_policy()
    }

    fn grant_mode(&self, _grantee: &dyn Grantee) -> GrantMode {
        GrantMode::PrincipalOrResource
    }
}

impl Encryptable for Table {
    fn encryption_key(&self) -> Option<&Key> {
        self.encryption_key.as_ref()
    }
}
