//! Principal descriptors as they appear inside statements.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attachment::AddToPrincipalPolicyResult;
use crate::error::GrantError;
use crate::statement::PolicyStatement;
use crate::traits::Grantee;

/// Who a resource-policy statement applies to.
///
/// A bare descriptor is also a [`Grantee`], one without an identity policy of
/// its own, so grants to it can only land on a resource policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PrincipalDescriptor {
    /// A specific IAM entity, e.g. `arn:aws:iam::111122223333:role/worker`.
    Arn(String),
    /// Every identity in an account, rendered as the account root ARN.
    Account { account_id: String, partition: String },
    /// A service principal such as `sns.amazonaws.com`.
    Service(String),
    /// Anyone.
    Any,
}

impl PrincipalDescriptor {
    pub fn arn(arn: impl Into<String>) -> Self {
        PrincipalDescriptor::Arn(arn.into())
    }

    pub fn account(account_id: impl Into<String>) -> Self {
        PrincipalDescriptor::Account {
            account_id: account_id.into(),
            partition: "aws".to_string(),
        }
    }

    pub fn account_in_partition(account_id: impl Into<String>, partition: impl Into<String>) -> Self {
        PrincipalDescriptor::Account {
            account_id: account_id.into(),
            partition: partition.into(),
        }
    }

    pub fn service(name: impl Into<String>) -> Self {
        PrincipalDescriptor::Service(name.into())
    }

    /// The account this principal belongs to, when it has one.
    pub fn account_id(&self) -> Option<&str> {
        match self {
            PrincipalDescriptor::Arn(arn) => arn.split(':').nth(4).filter(|a| !a.is_empty()),
            PrincipalDescriptor::Account { account_id, .. } => Some(account_id),
            PrincipalDescriptor::Service(_) | PrincipalDescriptor::Any => None,
        }
    }

    /// The `(key, value)` pair used under a statement's `Principal` block.
    pub(crate) fn json_entry(&self) -> (&'static str, String) {
        match self {
            PrincipalDescriptor::Arn(arn) => ("AWS", arn.clone()),
            PrincipalDescriptor::Account {
                account_id,
                partition,
            } => ("AWS", format!("arn:{partition}:iam::{account_id}:root")),
            PrincipalDescriptor::Service(name) => ("Service", name.clone()),
            PrincipalDescriptor::Any => ("AWS", "*".to_string()),
        }
    }
}

impl Display for PrincipalDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let (_, value) = self.json_entry();
        write!(f, "{value}")
    }
}

impl FromStr for PrincipalDescriptor {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(PrincipalDescriptor::Any);
        }
        if s.len() == 12 && s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(PrincipalDescriptor::account(s));
        }
        if s.starts_with("arn:") {
            return Ok(PrincipalDescriptor::arn(s));
        }
        if s.contains('.') && !s.contains(char::is_whitespace) {
            return Ok(PrincipalDescriptor::service(s));
        }
        Err(GrantError::InvalidFormat(format!(
            "Failed to parse principal: '{s}' (expected '*', an account id, an ARN or a service name)"
        )))
    }
}

impl Grantee for PrincipalDescriptor {
    fn grant_principal(&self) -> PrincipalDescriptor {
        self.clone()
    }

    fn principal_account(&self) -> Option<&str> {
        self.account_id()
    }

    fn add_to_principal_policy(
        &self,
        _statement: PolicyStatement,
    ) -> Result<AddToPrincipalPolicyResult, GrantError> {
        Ok(AddToPrincipalPolicyResult::not_added())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        any = { "*", PrincipalDescriptor::Any },
        account = { "111122223333", PrincipalDescriptor::account("111122223333") },
        role = { "arn:aws:iam::111122223333:role/worker", PrincipalDescriptor::arn("arn:aws:iam::111122223333:role/worker") },
        service = { "events.amazonaws.com", PrincipalDescriptor::service("events.amazonaws.com") },
    )]
    fn test_principal_from_str(input: &str, expected: PrincipalDescriptor) {
        assert_eq!(PrincipalDescriptor::from_str(input).unwrap(), expected);
    }

    #[parameterized(
        empty = { "" },
        word = { "alice" },
        short_number = { "12345" },
    )]
    fn test_principal_rejects_unknown(input: &str) {
        assert!(matches!(
            PrincipalDescriptor::from_str(input),
            Err(GrantError::InvalidFormat(_))
        ));
    }

    #[parameterized(
        arn = { PrincipalDescriptor::arn("arn:aws:iam::111122223333:role/worker"), Some("111122223333") },
        account = { PrincipalDescriptor::account("444455556666"), Some("444455556666") },
        service = { PrincipalDescriptor::service("sns.amazonaws.com"), None },
        any = { PrincipalDescriptor::Any, None },
    )]
    fn test_principal_account(principal: PrincipalDescriptor, expected: Option<&str>) {
        assert_eq!(principal.account_id(), expected);
    }

    #[test]
    fn test_account_renders_root_arn() {
        let principal = PrincipalDescriptor::account_in_partition("111122223333", "aws-cn");
        assert_eq!(
            principal.json_entry(),
            ("AWS", "arn:aws-cn:iam::111122223333:root".to_string())
        );
        assert_eq!(PrincipalDescriptor::Any.to_string(), "*");
    }

    #[test]
    fn test_descriptor_has_no_identity_policy() {
        let principal = PrincipalDescriptor::service("sns.amazonaws.com");
        let statement = PolicyStatement::builder()
            .action("sqs:SendMessage")
            .resource("*")
            .build();
        let result = principal.add_to_principal_policy(statement).unwrap();
        assert!(!result.statement_added());
        assert!(result.policy_dependable().is_none());
    }
}
