use std::cell::RefCell;

use tracing::debug;

use crate::attachment::{AddToResourcePolicyResult, ResourcePolicyAttachment};
use crate::build::Build;
use crate::error::GrantError;
use crate::grant::{Grant, GrantMode, GrantResolver};
use crate::key_grant::DataAccess;
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::targets::{Target, TargetEntry, TargetList};
use crate::traits::{Encryptable, Grantee, Resource, ResourcePolicyCapable};
use crate::types::{Condition, PrincipalDescriptor};

use super::{format_arn, grant_data, Key, Queue, ResourceCore};

pub const PUBLISH_ACTIONS: &[&str] = &["sns:Publish"];
pub const SUBSCRIBE_ACTIONS: &[&str] = &["sns:Subscribe"];

/// Publishing needs the key to produce data keys; there is no key read side.
pub const KEY_READ_ACTIONS: &[&str] = &[];
pub const KEY_WRITE_ACTIONS: &[&str] = &["kms:Decrypt", "kms:GenerateDataKey*"];

const SERVICE_PRINCIPAL: &str = "sns.amazonaws.com";

#[derive(Debug, Clone, Default)]
pub struct TopicProps {
    pub topic_name: Option<String>,
    pub encryption_key: Option<Key>,
}

/// A subscription endpoint: `protocol` is e.g. `sqs`, `lambda`, `email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub protocol: String,
    pub endpoint: String,
}

impl Subscription {
    pub fn new(protocol: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Subscription {
            protocol: protocol.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// A notification topic.
#[derive(Debug)]
pub struct Topic {
    core: ResourceCore,
    policy: ResourcePolicyAttachment,
    encryption_key: Option<Key>,
    subscriptions: RefCell<TargetList>,
}

impl Topic {
    pub fn new(build: &Build, id: &str, props: TopicProps) -> Self {
        let name = props.topic_name.unwrap_or_else(|| id.to_string());
        let arn = format_arn(build.config(), "sns", &name);
        Topic {
            policy: ResourcePolicyAttachment::new(build, id, arn.as_str(), true),
            core: ResourceCore::owned(build, id, arn),
            encryption_key: props.encryption_key,
            subscriptions: RefCell::new(TargetList::new(id, "Subscription")),
        }
    }

    pub fn from_arn(build: &Build, id: &str, arn: &str) -> Result<Self, GrantError> {
        Ok(Topic {
            core: ResourceCore::imported(id, arn, "sns")?,
            policy: ResourcePolicyAttachment::new(build, id, arn, false),
            encryption_key: None,
            subscriptions: RefCell::new(TargetList::new(id, "Subscription")),
        })
    }

    pub fn topic_policy(&self) -> Option<&PolicyObject> {
        self.policy.policy()
    }

    pub fn grant<A, S>(&self, grantee: &dyn Grantee, actions: A) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GrantResolver::resolve(grantee, actions, [self.arn()], Some(self))
    }

    pub fn grant_publish(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        grant_data(
            self,
            Some(self),
            grantee,
            DataAccess::Write,
            PUBLISH_ACTIONS.to_vec(),
            vec![self.core.arn.clone()],
            (KEY_READ_ACTIONS, KEY_WRITE_ACTIONS),
        )
    }

    pub fn grant_subscribe(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant(grantee, SUBSCRIBE_ACTIONS.iter().copied())
    }

    /// Register a subscription. Returns false when an equal
    /// `(protocol, endpoint)` pair is already subscribed.
    pub fn add_subscription(&self, subscription: Subscription) -> bool {
        let added = self
            .subscriptions
            .borrow_mut()
            .add(Target::new(subscription.protocol, subscription.endpoint));
        debug!(
            event = "Topic",
            phase = "Subscription",
            topic = self.core.id.as_str(),
            added
        );
        added
    }

    /// Subscribe `queue`, allowing the topic to deliver to it.
    ///
    /// The queue policy gets a statement for the notification service scoped
    /// to this topic, and the queue's key, if any, lets the service encrypt.
    /// Nothing is granted when the queue was already subscribed.
    pub fn subscribe_queue(&self, queue: &Queue) -> Result<bool, GrantError> {
        let subscription = Subscription::new("sqs", queue.arn());
        let target = Target::new(subscription.protocol.as_str(), subscription.endpoint.as_str());
        if self.subscriptions.borrow().contains(&target) {
            return Ok(false);
        }

        let statement = PolicyStatement::builder()
            .action("sqs:SendMessage")
            .resource(queue.arn())
            .principal(PrincipalDescriptor::service(SERVICE_PRINCIPAL))
            .condition(Condition::new("ArnEquals", "aws:SourceArn", [self.arn()]))
            .build();
        queue.add_to_resource_policy(statement)?;

        if let Some(key) = queue.encryption_key() {
            key.grant(
                &PrincipalDescriptor::service(SERVICE_PRINCIPAL),
                ["kms:Decrypt", "kms:GenerateDataKey*"],
            )?;
        }

        Ok(self.add_subscription(subscription))
    }

    pub fn subscriptions(&self) -> Vec<TargetEntry> {
        self.subscriptions.borrow().entries().to_vec()
    }
}

impl Resource for Topic {
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

impl ResourcePolicyCapable for Topic {
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

impl Encryptable for Topic {
    fn encryption_key(&self) -> Option<&Key> {
        self.encryption_key.as_ref()
    }
}
