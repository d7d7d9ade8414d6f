//! Resource families that delegate their grants to the engine.
//!
//! Each family supplies its ARN, its action constants and its choice of
//! [`crate::grant::GrantMode`]; everything else goes through
//! [`crate::grant::GrantResolver`] and [`crate::key_grant::KeyGrantPropagator`].

mod bucket;
mod key;
mod queue;
mod stream;
mod table;
mod topic;

pub use bucket::{Bucket, BucketProps};
pub use key::Key;
pub use queue::{Queue, QueueProps};
pub use stream::{Stream, StreamProps};
pub use table::{Table, TableAttributes, TableProps};
pub use topic::{Subscription, Topic, TopicProps};

use std::str::FromStr;

use crate::build::{Build, BuildConfig};
use crate::error::GrantError;
use crate::grant::{Grant, GrantResolver};
use crate::key_grant::{DataAccess, KeyGrantPropagator};
use crate::traits::{Encryptable, Grantee, ResourcePolicyCapable};
use crate::types::Arn;

/// `arn:<partition>:<service>:<region>:<account>:<resource>` for a resource
/// declared in this build.
pub(crate) fn format_arn(config: &BuildConfig, service: &str, resource: &str) -> String {
    Arn::new(
        config.partition.as_str(),
        service,
        config.region.as_deref().unwrap_or_default(),
        config.account.as_deref().unwrap_or_default(),
        resource,
    )
    .to_string()
}

/// Identity shared by every family.
#[derive(Debug, Clone)]
pub(crate) struct ResourceCore {
    pub(crate) id: String,
    pub(crate) arn: String,
    pub(crate) account: Option<String>,
}

impl ResourceCore {
    pub(crate) fn owned(build: &Build, id: &str, arn: String) -> Self {
        ResourceCore {
            id: id.to_string(),
            arn,
            account: build.config().account.clone(),
        }
    }

    /// Parse an imported ARN, checking it belongs to `service`.
    pub(crate) fn imported(id: &str, arn: &str, service: &str) -> Result<Self, GrantError> {
        let parsed = Arn::from_str(arn)?;
        if parsed.service() != service {
            return Err(GrantError::InvalidFormat(format!(
                "Failed to parse {service} ARN: '{arn}' belongs to service '{}'",
                parsed.service()
            )));
        }
        Ok(ResourceCore {
            id: id.to_string(),
            arn: arn.to_string(),
            account: parsed.account().map(str::to_string),
        })
    }
}

/// Grant data actions on `resource`, then the matching actions on its key.
///
/// Returns the primary grant; the key grant is recorded independently.
pub(crate) fn grant_data<R>(
    resource: &R,
    policy_resource: Option<&dyn ResourcePolicyCapable>,
    grantee: &dyn Grantee,
    access: DataAccess,
    actions: Vec<&str>,
    resource_arns: Vec<String>,
    key_actions: (&[&str], &[&str]),
) -> Result<Grant, GrantError>
where
    R: Encryptable + ?Sized,
{
    let (key_read, key_write) = key_actions;
    let grant = GrantResolver::resolve(grantee, actions, resource_arns, policy_resource)?;
    KeyGrantPropagator::propagate(
        &grant,
        resource,
        grantee,
        &access.key_actions(key_read, key_write),
    )?;
    Ok(grant)
}
