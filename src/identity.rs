//! Controllable identities.

use std::str::FromStr;

use crate::attachment::{AddToPrincipalPolicyResult, PrincipalPolicyAttachment};
use crate::build::Build;
use crate::error::GrantError;
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::traits::Grantee;
use crate::types::{Arn, PrincipalDescriptor};

/// An IAM role.
///
/// Roles declared in the build own a default identity policy, created on the
/// first statement added to it. Imported roles keep that ability only when
/// imported as mutable.
#[derive(Debug)]
pub struct Role {
    id: String,
    arn: String,
    account: Option<String>,
    policy: PrincipalPolicyAttachment,
}

impl Role {
    pub fn new(build: &Build, id: &str) -> Self {
        let config = build.config();
        let account = config.account.clone();
        let arn = Arn::new(
            config.partition.as_str(),
            "iam",
            "",
            account.as_deref().unwrap_or_default(),
            format!("role/{id}"),
        )
        .to_string();

        Role {
            id: id.to_string(),
            policy: PrincipalPolicyAttachment::new(build, id, arn.as_str(), true),
            arn,
            account,
        }
    }

    /// Import an existing role. `mutable` decides whether statements may be
    /// added to a default policy on it.
    pub fn from_arn(build: &Build, id: &str, arn: &str, mutable: bool) -> Result<Self, GrantError> {
        let parsed = Arn::from_str(arn)?;
        if parsed.service() != "iam" {
            return Err(GrantError::InvalidFormat(format!(
                "Failed to parse role ARN: '{arn}' is not an iam ARN"
            )));
        }

        Ok(Role {
            id: id.to_string(),
            arn: arn.to_string(),
            account: parsed.account().map(str::to_string),
            policy: PrincipalPolicyAttachment::new(build, id, arn, mutable),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }

    /// The default policy, once a statement has been added to it.
    pub fn default_policy(&self) -> Option<&PolicyObject> {
        self.policy.policy()
    }
}

impl Grantee for Role {
    fn grant_principal(&self) -> PrincipalDescriptor {
        PrincipalDescriptor::arn(self.arn.as_str())
    }

    fn principal_account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    fn add_to_principal_policy(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToPrincipalPolicyResult, GrantError> {
        self.policy.add_statement(statement)
    }
}
