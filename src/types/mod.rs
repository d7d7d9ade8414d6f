//! Value types shared by statements, documents and grants.
//!
//! Canonical string forms:
//! - Effect: `Allow` / `Deny`
//! - Principal: `*`, a 12-digit account id, an ARN, or a service name such
//!   as `sns.amazonaws.com`
//! - ARN: `arn:<partition>:<service>:<region>:<account>:<resource>`

mod arn;
mod condition;
mod effect;
mod policy_kind;
mod principal;

pub use arn::Arn;
pub use condition::Condition;
pub use effect::Effect;
pub use policy_kind::PolicyKind;
pub use principal::PrincipalDescriptor;
