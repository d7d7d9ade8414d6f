use std::rc::Rc;

use crate::attachment::{AddToResourcePolicyResult, ResourcePolicyAttachment};
use crate::build::Build;
use crate::error::GrantError;
use crate::grant::{Grant, GrantMode, GrantRequest, GrantResolver};
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::traits::{Grantee, Resource, ResourcePolicyCapable};

use super::{format_arn, ResourceCore};

pub const DECRYPT_ACTIONS: &[&str] = &["kms:Decrypt"];
pub const ENCRYPT_ACTIONS: &[&str] = &["kms:Encrypt", "kms:ReEncrypt*", "kms:GenerateDataKey*"];

#[derive(Debug)]
struct KeyInner {
    core: ResourceCore,
    policy: ResourcePolicyAttachment,
}

/// An encryption key. Cheap to clone; clones refer to the same key, so one
/// key can protect several resources and still own a single key policy.
#[derive(Debug, Clone)]
pub struct Key {
    inner: Rc<KeyInner>,
}

impl Key {
    pub fn new(build: &Build, id: &str) -> Self {
        let arn = format_arn(build.config(), "kms", &format!("key/{id}"));
        Key {
            inner: Rc::new(KeyInner {
                policy: ResourcePolicyAttachment::new(build, id, arn.as_str(), true),
                core: ResourceCore::owned(build, id, arn),
            }),
        }
    }

    /// Reference a key defined elsewhere. Its key policy is never modified.
    pub fn from_arn(build: &Build, id: &str, arn: &str) -> Result<Self, GrantError> {
        let core = ResourceCore::imported(id, arn, "kms")?;
        Ok(Key {
            inner: Rc::new(KeyInner {
                policy: ResourcePolicyAttachment::new(build, id, arn, false),
                core,
            }),
        })
    }

    /// The key policy, once a statement has been added to it.
    pub fn key_policy(&self) -> Option<&PolicyObject> {
        self.inner.policy.policy()
    }

    /// Grant `actions` on this key.
    ///
    /// Key policy statements name `*` as resource, which means "this key".
    pub fn grant<A, S>(&self, grantee: &dyn Grantee, actions: A) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request =
            GrantRequest::new(grantee, actions, [self.arn()]).with_resource_self_arns(["*"]);
        GrantResolver::resolve_request(&request, Some(self))
    }

    pub fn grant_decrypt(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant(grantee, DECRYPT_ACTIONS.iter().copied())
    }

    pub fn grant_encrypt(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant(grantee, ENCRYPT_ACTIONS.iter().copied())
    }

    pub fn grant_encrypt_decrypt(&self, grantee: &dyn Grantee) -> Result<Grant, GrantError> {
        self.grant(
            grantee,
            DECRYPT_ACTIONS.iter().chain(ENCRYPT_ACTIONS).copied(),
        )
    }
}

impl Resource for Key {
    fn node_id(&self) -> &str {
        &self.inner.core.id
    }

    fn arn(&self) -> &str {
        &self.inner.core.arn
    }

    fn account(&self) -> Option<&str> {
        self.inner.core.account.as_deref()
    }
}

impl ResourcePolicyCapable for Key {
    fn add_to_resource_policy(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToResourcePolicyResult, GrantError> {
        self.inner.policy.add_statement(statement)
    }

    fn auto_create_policy(&self) -> bool {
        self.inner.policy.auto_create_policy()
    }

    /// A principal in another account needs both its identity policy and the
    /// key policy to allow the call.
    fn grant_mode(&self, grantee: &dyn Grantee) -> GrantMode {
        match (grantee.principal_account(), self.account()) {
            (Some(principal), Some(key)) if principal != key => GrantMode::PrincipalAndResource,
            _ => GrantMode::PrincipalOrResource,
        }
    }
}
