//! Grant resolution: deciding where an authorization rule is recorded.
//!
//! Every resource helper (`grant_read`, `grant_publish`, ...) funnels into
//! [`GrantResolver::resolve_request`], which picks the attachment targets
//! from the resource family's [`GrantMode`]:
//!
//! - no resource policy capability: the grantee's identity policy only;
//! - [`GrantMode::PrincipalOnly`]: the identity policy only, even though the
//!   resource could carry a policy;
//! - [`GrantMode::PrincipalOrResource`]: the identity policy when the grantee
//!   has one in the resource's account, otherwise the resource policy;
//! - [`GrantMode::PrincipalAndResource`]: both sides.

use itertools::Itertools;
use strum_macros::{AsRefStr, Display};
use tracing::{debug, warn};

use crate::build::Build;
use crate::error::GrantError;
use crate::statement::PolicyStatement;
use crate::token::DependencyToken;
use crate::traits::{Grantee, ResourcePolicyCapable};
use crate::types::{Condition, PrincipalDescriptor};

/// How a resource family records grants made against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum GrantMode {
    PrincipalOnly,
    PrincipalOrResource,
    PrincipalAndResource,
}

/// The inputs of one grant.
pub struct GrantRequest<'a> {
    grantee: &'a dyn Grantee,
    actions: Vec<String>,
    resource_arns: Vec<String>,
    resource_self_arns: Option<Vec<String>>,
    conditions: Vec<Condition>,
}

impl<'a> GrantRequest<'a> {
    pub fn new<A, S, R, T>(grantee: &'a dyn Grantee, actions: A, resource_arns: R) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = T>,
        T: Into<String>,
    {
        GrantRequest {
            grantee,
            actions: actions.into_iter().map(Into::into).collect(),
            resource_arns: resource_arns.into_iter().map(Into::into).collect(),
            resource_self_arns: None,
            conditions: Vec::new(),
        }
    }

    /// Use a different resource list for the resource-policy statement.
    pub fn with_resource_self_arns<R, T>(mut self, arns: R) -> Self
    where
        R: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.resource_self_arns = Some(arns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn grantee(&self) -> &dyn Grantee {
        self.grantee
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resource_arns(&self) -> &[String] {
        &self.resource_arns
    }

    fn check(&self) -> Result<(), GrantError> {
        if self.actions.is_empty() {
            return Err(GrantError::InvalidGrant(format!(
                "no actions requested for '{}'",
                self.grantee.grant_principal()
            )));
        }
        if self.resource_arns.is_empty() {
            return Err(GrantError::InvalidGrant(format!(
                "no resources given for [{}]",
                self.actions.join(", ")
            )));
        }
        Ok(())
    }

    fn principal_statement(&self) -> PolicyStatement {
        PolicyStatement::builder()
            .actions(self.actions.iter().cloned())
            .resources(self.resource_arns.iter().cloned())
            .conditions(self.conditions.iter().cloned())
            .build()
    }

    fn resource_statement(&self, principal: PrincipalDescriptor) -> PolicyStatement {
        let resources = self
            .resource_self_arns
            .as_ref()
            .unwrap_or(&self.resource_arns);
        PolicyStatement::builder()
            .actions(self.actions.iter().cloned())
            .resources(resources.iter().cloned())
            .principal(principal)
            .conditions(self.conditions.iter().cloned())
            .build()
    }

    fn summary(&self) -> String {
        format!(
            "'{}' to call [{}] on [{}]",
            self.grantee.grant_principal(),
            self.actions.iter().join(", "),
            self.resource_arns.iter().join(", ")
        )
    }
}

/// Result of a grant: which statements landed and what to depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grant {
    principal_statement: Option<PolicyStatement>,
    resource_statement: Option<PolicyStatement>,
    dependency_token: Option<DependencyToken>,
    summary: String,
}

impl Grant {
    /// Record the grant on the grantee's identity policy only.
    pub fn add_to_principal(request: &GrantRequest<'_>) -> Result<Grant, GrantError> {
        request.check()?;
        let statement = request.principal_statement();
        statement.validate()?;

        let result = request
            .grantee
            .add_to_principal_policy(statement.clone())?;

        debug!(
            event = "Grant",
            phase = "Principal",
            principal = %request.grantee.grant_principal(),
            actions = ?request.actions,
            added = result.statement_added()
        );

        Ok(Grant {
            principal_statement: result.statement_added().then_some(statement),
            dependency_token: result.into_token(),
            summary: request.summary(),
            ..Grant::default()
        })
    }

    /// Record on the identity policy when that suffices, otherwise on the
    /// resource policy.
    ///
    /// The identity policy suffices when the grantee has one and does not
    /// live in a different account from the resource.
    pub fn add_to_principal_or_resource(
        request: &GrantRequest<'_>,
        resource: &dyn ResourcePolicyCapable,
    ) -> Result<Grant, GrantError> {
        request.check()?;
        let resource_statement = request.resource_statement(request.grantee.grant_principal());
        resource_statement.validate()?;

        let principal_grant = Grant::add_to_principal(request)?;
        let cross_account = is_cross_account(request.grantee.principal_account(), resource.account());
        if principal_grant.statement_added() && !cross_account {
            return Ok(principal_grant);
        }

        let result = resource.add_to_resource_policy(resource_statement.clone())?;
        debug!(
            event = "Grant",
            phase = "Resource",
            resource = resource.node_id(),
            principal = %request.grantee.grant_principal(),
            cross_account,
            added = result.statement_added()
        );

        Ok(Grant {
            principal_statement: principal_grant.principal_statement,
            resource_statement: result.statement_added().then_some(resource_statement),
            dependency_token: DependencyToken::merge(
                principal_grant.dependency_token,
                result.into_token(),
            ),
            summary: principal_grant.summary,
        })
    }

    /// Record on both the identity policy and the resource policy.
    ///
    /// `resource_policy_principal` overrides the principal named in the
    /// resource-policy statement.
    pub fn add_to_principal_and_resource(
        request: &GrantRequest<'_>,
        resource: &dyn ResourcePolicyCapable,
        resource_policy_principal: Option<PrincipalDescriptor>,
    ) -> Result<Grant, GrantError> {
        request.check()?;
        if !resource.auto_create_policy() {
            return Err(GrantError::UnsupportedOperation(format!(
                "cannot grant {} on both sides: the policy of imported resource '{}' is not managed by this build",
                request.summary(),
                resource.node_id()
            )));
        }
        let principal = resource_policy_principal.unwrap_or_else(|| request.grantee.grant_principal());
        let resource_statement = request.resource_statement(principal);
        resource_statement.validate()?;

        let principal_grant = Grant::add_to_principal(request)?;
        let result = resource.add_to_resource_policy(resource_statement.clone())?;
        debug!(
            event = "Grant",
            phase = "PrincipalAndResource",
            resource = resource.node_id(),
            added = result.statement_added()
        );

        Ok(Grant {
            principal_statement: principal_grant.principal_statement,
            resource_statement: result.statement_added().then_some(resource_statement),
            dependency_token: DependencyToken::merge(
                principal_grant.dependency_token,
                result.into_token(),
            ),
            summary: principal_grant.summary,
        })
    }

    /// A grant that records nothing, for callers that decided no statement is
    /// needed.
    pub fn drop(request: &GrantRequest<'_>) -> Grant {
        Grant {
            summary: request.summary(),
            ..Grant::default()
        }
    }

    /// Merge two grants. The result succeeded if either did.
    pub fn combine(self, other: Grant) -> Grant {
        Grant {
            principal_statement: self.principal_statement.or(other.principal_statement),
            resource_statement: self.resource_statement.or(other.resource_statement),
            dependency_token: DependencyToken::merge(self.dependency_token, other.dependency_token),
            summary: if other.summary.is_empty() {
                self.summary
            } else if self.summary.is_empty() {
                other.summary
            } else {
                format!("{} and {}", self.summary, other.summary)
            },
        }
    }

    /// Whether a statement landed on at least one policy.
    pub fn statement_added(&self) -> bool {
        self.principal_statement.is_some() || self.resource_statement.is_some()
    }

    pub fn principal_statement(&self) -> Option<&PolicyStatement> {
        self.principal_statement.as_ref()
    }

    pub fn resource_statement(&self) -> Option<&PolicyStatement> {
        self.resource_statement.as_ref()
    }

    pub fn dependency_token(&self) -> Option<&DependencyToken> {
        self.dependency_token.as_ref()
    }

    pub fn assert_success(&self) -> Result<(), GrantError> {
        if self.statement_added() {
            return Ok(());
        }
        Err(GrantError::UnsupportedOperation(format!(
            "permissions for {} could not be added on either identity or resource policy",
            self.summary
        )))
    }

    /// Order `construct` after the policies this grant touched.
    pub fn apply_before(&self, build: &Build, construct: &str) -> Result<(), GrantError> {
        match &self.dependency_token {
            Some(token) => build.add_dependency(construct, token),
            None => Ok(()),
        }
    }
}

fn is_cross_account(principal: Option<&str>, resource: Option<&str>) -> bool {
    matches!((principal, resource), (Some(p), Some(r)) if p != r)
}

/// Entry point used by every resource helper.
pub struct GrantResolver;

impl GrantResolver {
    /// Grant `actions` on `resource_arns` to `grantee`.
    pub fn resolve<A, S, R, T>(
        grantee: &dyn Grantee,
        actions: A,
        resource_arns: R,
        resource: Option<&dyn ResourcePolicyCapable>,
    ) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let request = GrantRequest::new(grantee, actions, resource_arns);
        Self::resolve_request(&request, resource)
    }

    pub fn resolve_request(
        request: &GrantRequest<'_>,
        resource: Option<&dyn ResourcePolicyCapable>,
    ) -> Result<Grant, GrantError> {
        request.check()?;

        let grant = match resource {
            None => Grant::add_to_principal(request)?,
            Some(resource) => match resource.grant_mode(request.grantee) {
                GrantMode::PrincipalOnly => Grant::add_to_principal(request)?,
                GrantMode::PrincipalOrResource => {
                    Grant::add_to_principal_or_resource(request, resource)?
                }
                GrantMode::PrincipalAndResource => {
                    Grant::add_to_principal_and_resource(request, resource, None)?
                }
            },
        };

        if !grant.statement_added() {
            warn!(
                event = "Grant",
                phase = "Resolve",
                grant = grant.summary.as_str(),
                "grant was not recorded on any policy"
            );
        }
        Ok(grant)
    }
}
