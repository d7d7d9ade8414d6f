use crate::attachment::{AddToResourcePolicyResult, ResourcePolicyAttachment};
use crate::build::Build;
use crate::error::GrantError;
use crate::grant::{Grant, GrantMode, GrantResolver};
use crate::key_grant::DataAccess;
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::traits::{Encryptable, Grantee, Resource, ResourcePolicyCapable};

use super::{format_arn, grant_data, Key, ResourceCore};

pub const CONSUME_ACTIONS: &[&str] = &[
    "sqs:ReceiveMessage",
    "sqs:ChangeMessageVisibility",
    "sqs:GetQueueUrl",
    "sqs:DeleteMessage",
    "sqs:GetQueueAttributes",
];
pub const SEND_ACTIONS: &[&str] = &["sqs:SendMessage", "sqs:GetQueueAttributes", "sqs:GetQueueUrl"];
pub const PURGE_ACTIONS: &[&str] = &["sqs:PurgeQueue", "sqs:GetQueueAttributes", "sqs:GetQueueUrl"];

pub const KEY_READ_ACTIONS: &[&str] = &["kms:Decrypt"];
pub const KEY_WRITE_ACTIONS: &[&str] = &["kms:Encrypt", "kms:ReEncrypt*", "kms:GenerateDataKey*"];

#[derive(Debug, Clone, Default)]
pub struct QueueProps {
    /// Defaults to the construct id.
    pub queue_name: Option<String>,
    pub encryption_key: Option<Key>,
}

/// A message queue.
///
/// Queues always carry a resource policy, created on first use. Grants to
/// identities in the queue's account only touch the grantee's identity policy.
#[derive(Debug)]
pub struct Queue {
    core: ResourceCore,
    policy: ResourcePolicyAttachment,
    encryption_key: Option<Key>,
}

impl Queue {
    pub fn new(build: &Build, id: &str, props: QueueProps) -> Self {
        let name = props.queue_name.unwrap_or_else(|| id.to_string());
        let arn = format_arn(build.config(), "sqs", &name);
        Queue {
            policy: ResourcePolicyAttachment::new(build, id, arn.as_str(), true),
            core: ResourceCore::owned(build, id, arn),
            encryption_key: props.encryption_key,
        }
    }

    pub fn from_arn(build: &Build, id: &str, arn: &str) -> Result<Self, GrantError> {
        Self::from_attributes(build, id, arn, None)
    }

    /// Import a queue, optionally with the key that encrypts it.
    pub fn from_attributes(
        build: &Build,
        id: &str,
        arn: &str,
        encryption_key: Option<Key>,
    ) -> Result<Self, GrantError> {
        Ok(Queue {
            core: ResourceCore::imported(id, arn, "sqs")?,
            policy: ResourcePolicyAttachment::new(build, id, arn, false),
            encryption_key,
        })
    }

    /// The queue policy, once a statement has been added to it.
    pub fn queue_policy(&self) -> Option<&PolicyObject> {
        self.policy.policy()
    }

    pub fn grant<A, S>(&self, grantee: &dyn Grantee, actions: A) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GrantResolver::resolve(grantee, actions, [self.arn()], Some(self))
    }

    /// Receive, change visibility of and delete messages.
    pub fn grant_consume_messages(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::Read, CONSUME_ACTIONS)
    }

    pub fn grant_send_messages(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant_data(grantee, DataAccess::Write, SEND_ACTIONS)
    }

    pub fn grant_purge(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant(grantee, PURGE_ACTIONS.iter().copied())
    }

    fn grant_data(
        &self,
        grantee: &dyn Grantee,
        access: DataAccess,
        actions: &[&str],
    ) -> Result<Grant, GrantError> {
        grant_data(
            self,
            Some(self),
            grantee,
            access,
            actions.to_vec(),
            vec![self.core.arn.clone()],
            (KEY_READ_ACTIONS, KEY_WRITE_ACTIONS),
        )
    }
}

impl Resource for Queue {
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

impl ResourcePolicyCapable for Queue {
    fn add_to_resource_policy(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToResourcePolicyResult, GrantError> {
        self.policy.add_statement(statement)
    }

    fn auto_create_policy(&self) -> bool {
        self.policy.auto_create_policy()
    }

    /// Identities in the queue's own account are granted through their
    /// identity policy only. Service principals and identities from other
    /// accounts also need the queue policy.
    fn grant_mode(&self, grantee: &dyn Grantee) -> GrantMode {
        match (grantee.principal_account(), self.account()) {
            (Some(principal), Some(queue)) if principal != queue => GrantMode::PrincipalOrResource,
            (Some(_), _) => GrantMode::PrincipalOnly,
            (None, _) => GrantMode::PrincipalOrResource,
        }
    }
}

impl Encryptable for Queue {
    fn encryption_key(&self) -> Option<&Key> {
        self.encryption_key.as_ref()
    }
}
