//! Lazy policy attachments.
//!
//! A resource or role owns exactly one attachment. No policy object exists
//! until the first statement arrives; it is then created once, registered with
//! the build and reused for every later statement.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::build::Build;
use crate::error::GrantError;
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::token::DependencyToken;
use crate::types::PolicyKind;

/// Outcome of `add_to_resource_policy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToResourcePolicyResult {
    statement_added: bool,
    policy_dependable: Option<DependencyToken>,
}

impl AddToResourcePolicyResult {
    pub(crate) fn from_token(token: Option<DependencyToken>) -> Self {
        AddToResourcePolicyResult {
            statement_added: token.is_some(),
            policy_dependable: token,
        }
    }

    pub fn not_added() -> Self {
        Self::from_token(None)
    }

    pub fn statement_added(&self) -> bool {
        self.statement_added
    }

    pub fn policy_dependable(&self) -> Option<&DependencyToken> {
        self.policy_dependable.as_ref()
    }

    pub(crate) fn into_token(self) -> Option<DependencyToken> {
        self.policy_dependable
    }
}

/// Outcome of `add_to_principal_policy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToPrincipalPolicyResult {
    statement_added: bool,
    policy_dependable: Option<DependencyToken>,
}

impl AddToPrincipalPolicyResult {
    pub(crate) fn from_token(token: Option<DependencyToken>) -> Self {
        AddToPrincipalPolicyResult {
            statement_added: token.is_some(),
            policy_dependable: token,
        }
    }

    pub fn not_added() -> Self {
        Self::from_token(None)
    }

    pub fn statement_added(&self) -> bool {
        self.statement_added
    }

    pub fn policy_dependable(&self) -> Option<&DependencyToken> {
        self.policy_dependable.as_ref()
    }

    pub(crate) fn into_token(self) -> Option<DependencyToken> {
        self.policy_dependable
    }
}

#[derive(Debug)]
struct LazyPolicy {
    build: Build,
    policy_id: String,
    attached_to: String,
    kind: PolicyKind,
    enabled: bool,
    policy: OnceCell<Rc<PolicyObject>>,
}

impl LazyPolicy {
    fn ensure(&self) -> Result<Option<Rc<PolicyObject>>, GrantError> {
        if !self.enabled {
            return Ok(None);
        }
        let policy = self.policy.get_or_try_init(|| {
            debug!(
                event = "Attachment",
                phase = "Create",
                id = self.policy_id.as_str(),
                kind = %self.kind
            );
            self.build
                .create_policy(&self.policy_id, self.kind, &self.attached_to)
        })?;
        Ok(Some(Rc::clone(policy)))
    }

    fn add_statement(
        &self,
        statement: PolicyStatement,
    ) -> Result<Option<DependencyToken>, GrantError> {
        // An invalid statement must not leave an empty policy object behind.
        statement.validate()?;
        match self.ensure()? {
            Some(policy) => {
                policy.add_statements([statement])?;
                Ok(Some(DependencyToken::new(policy)))
            }
            None => {
                debug!(
                    event = "Attachment",
                    phase = "Skip",
                    id = self.policy_id.as_str(),
                    reason = "policy not managed by this build"
                );
                Ok(None)
            }
        }
    }
}

/// The resource-side policy of one resource instance.
#[derive(Debug)]
pub struct ResourcePolicyAttachment {
    inner: LazyPolicy,
}

impl ResourcePolicyAttachment {
    /// `auto_create` is false for imported resources, whose policy lives
    /// outside this build; such an attachment never accepts statements.
    pub fn new(
        build: &Build,
        owner_id: &str,
        resource_arn: impl Into<String>,
        auto_create: bool,
    ) -> Self {
        ResourcePolicyAttachment {
            inner: LazyPolicy {
                build: build.clone(),
                policy_id: format!("{owner_id}/Policy"),
                attached_to: resource_arn.into(),
                kind: PolicyKind::Resource,
                enabled: auto_create,
                policy: OnceCell::new(),
            },
        }
    }

    pub fn auto_create_policy(&self) -> bool {
        self.inner.enabled
    }

    /// The policy object, creating it on first use. `None` when the policy is
    /// not managed by this build.
    pub fn ensure(&self) -> Result<Option<Rc<PolicyObject>>, GrantError> {
        self.inner.ensure()
    }

    /// The policy object if one has been created.
    pub fn policy(&self) -> Option<&PolicyObject> {
        self.inner.policy.get().map(|p| p.as_ref())
    }

    pub fn is_attached(&self) -> bool {
        self.inner.policy.get().is_some()
    }

    pub fn add_statement(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToResourcePolicyResult, GrantError> {
        let token = self.inner.add_statement(statement)?;
        Ok(AddToResourcePolicyResult::from_token(token))
    }
}

/// The identity-side policy of a principal this build controls.
#[derive(Debug)]
pub struct PrincipalPolicyAttachment {
    inner: LazyPolicy,
}

impl PrincipalPolicyAttachment {
    /// `mutable` is false for imported principals whose policies are managed
    /// elsewhere.
    pub fn new(
        build: &Build,
        owner_id: &str,
        principal_arn: impl Into<String>,
        mutable: bool,
    ) -> Self {
        PrincipalPolicyAttachment {
            inner: LazyPolicy {
                build: build.clone(),
                policy_id: format!("{owner_id}/DefaultPolicy"),
                attached_to: principal_arn.into(),
                kind: PolicyKind::Identity,
                enabled: mutable,
                policy: OnceCell::new(),
            },
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.inner.enabled
    }

    pub fn policy(&self) -> Option<&PolicyObject> {
        self.inner.policy.get().map(|p| p.as_ref())
    }

    pub fn add_statement(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToPrincipalPolicyResult, GrantError> {
        let token = self.inner.add_statement(statement)?;
        Ok(AddToPrincipalPolicyResult::from_token(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildConfig;
    use crate::types::PrincipalDescriptor;

    const BUCKET_ARN: &str = "arn:aws:s3:::assets";

    fn statement(sid: &str) -> PolicyStatement {
        PolicyStatement::builder()
            .sid(sid)
            .action("s3:GetObject")
            .resource(format!("{BUCKET_ARN}/*"))
            .principal(PrincipalDescriptor::account("444455556666"))
            .build()
    }

    #[test]
    fn test_resource_policy_created_once() {
        let build = Build::new(BuildConfig::default());
        let attachment = ResourcePolicyAttachment::new(&build, "Assets", BUCKET_ARN, true);
        assert!(!attachment.is_attached());

        let results: Vec<AddToResourcePolicyResult> = ["a", "b", "c"]
            .into_iter()
            .map(|sid| attachment.add_statement(statement(sid)).unwrap())
            .collect();

        assert!(results.iter().all(|r| r.statement_added()));
        assert_eq!(build.policy_count(), 1);

        let policy = attachment.policy().unwrap();
        assert_eq!(policy.id(), "Assets/Policy");
        assert_eq!(policy.kind(), PolicyKind::Resource);
        let sids: Vec<String> = policy
            .document()
            .statements()
            .iter()
            .filter_map(|s| s.sid().map(str::to_string))
            .collect();
        assert_eq!(sids, vec!["a", "b", "c"]);

        let first = results[0].policy_dependable().unwrap();
        assert!(results.iter().all(|r| r.policy_dependable() == Some(first)));
    }

    #[test]
    fn test_imported_resource_never_creates_policy() {
        let build = Build::new(BuildConfig::default());
        let attachment = ResourcePolicyAttachment::new(&build, "Imported", BUCKET_ARN, false);

        for sid in ["a", "b"] {
            let result = attachment.add_statement(statement(sid)).unwrap();
            assert!(!result.statement_added());
            assert!(result.policy_dependable().is_none());
        }
        assert!(attachment.ensure().unwrap().is_none());
        assert!(!attachment.is_attached());
        assert_eq!(build.policy_count(), 0);
    }

    #[test]
    fn test_invalid_statement_creates_nothing() {
        let build = Build::new(BuildConfig::default());
        let attachment = ResourcePolicyAttachment::new(&build, "Assets", BUCKET_ARN, true);

        let result = attachment.add_statement(PolicyStatement::builder().resource("*").build());

        assert!(matches!(result, Err(GrantError::InvalidStatement(_))));
        assert!(!attachment.is_attached());
        assert_eq!(build.policy_count(), 0);
    }

    #[test]
    fn test_attachments_are_instance_scoped() {
        let build = Build::new(BuildConfig::default());
        let first = ResourcePolicyAttachment::new(&build, "First", BUCKET_ARN, true);
        let second = ResourcePolicyAttachment::new(&build, "Second", BUCKET_ARN, true);

        first.add_statement(statement("a")).unwrap();
        second.add_statement(statement("b")).unwrap();

        assert_eq!(build.policy_count(), 2);
        assert_eq!(first.policy().unwrap().statement_count(), 1);
        assert_eq!(second.policy().unwrap().statement_count(), 1);
    }

    #[test]
    fn test_principal_policy_respects_mutability() {
        let build = Build::new(BuildConfig::default());
        let role_arn = "arn:aws:iam::111122223333:role/worker";
        let owned = PrincipalPolicyAttachment::new(&build, "Worker", role_arn, true);
        let imported = PrincipalPolicyAttachment::new(&build, "External", role_arn, false);

        let identity_statement = PolicyStatement::builder()
            .action("sqs:SendMessage")
            .resource("*")
            .build();

        assert!(owned
            .add_statement(identity_statement.clone())
            .unwrap()
            .statement_added());
        assert!(!imported
            .add_statement(identity_statement)
            .unwrap()
            .statement_added());
        assert_eq!(owned.policy().unwrap().id(), "Worker/DefaultPolicy");
        assert!(imported.policy().is_none());
    }
}
