use crate::attachment::{AddToPrincipalPolicyResult, AddToResourcePolicyResult};
use crate::error::GrantError;
use crate::grant::GrantMode;
use crate::resources::Key;
use crate::statement::PolicyStatement;
use crate::types::PrincipalDescriptor;

/// Anything that can receive permissions, e.g. a role or a service principal.
pub trait Grantee {
    /// The principal to name in resource-policy statements.
    fn grant_principal(&self) -> PrincipalDescriptor;

    /// The account the principal lives in, when known.
    fn principal_account(&self) -> Option<&str>;

    /// Record `statement` on the principal's own identity policy.
    ///
    /// Principals without an identity policy this build controls return a
    /// result with `statement_added() == false`.
    fn add_to_principal_policy(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToPrincipalPolicyResult, GrantError>;
}

/// A resource declared in (or imported into) a build.
pub trait Resource {
    /// Construct id, e.g. `Jobs`.
    fn node_id(&self) -> &str;

    fn arn(&self) -> &str;

    /// Owning account, when known.
    fn account(&self) -> Option<&str>;
}

/// A resource family that carries its own resource policy.
pub trait ResourcePolicyCapable: Resource {
    /// Append a statement to this resource's policy, creating the policy on
    /// first use when the resource manages one.
    fn add_to_resource_policy(
        &self,
        statement: PolicyStatement,
    ) -> Result<AddToResourcePolicyResult, GrantError>;

    /// Whether this build owns the resource's policy (false for imports).
    fn auto_create_policy(&self) -> bool;

    /// Where grants against this resource are recorded for `grantee`.
    fn grant_mode(&self, grantee: &dyn Grantee) -> GrantMode;
}

/// A resource whose data is protected by an encryption key.
pub trait Encryptable {
    fn encryption_key(&self) -> Option<&Key>;
}
