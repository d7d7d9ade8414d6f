// src/lib.rs
pub use attachment::{
    AddToPrincipalPolicyResult, AddToResourcePolicyResult, PrincipalPolicyAttachment,
    ResourcePolicyAttachment,
};
pub use build::{Build, BuildConfig, BuildDependency, BuildOutput, RenderedPolicy};
pub use document::{DocumentOptions, PolicyDocument, POLICY_VERSION};
pub use error::GrantError;
pub use grant::{Grant, GrantMode, GrantRequest, GrantResolver};
pub use identity::Role;
pub use key_grant::{DataAccess, KeyGrantPropagator};
pub use policy::PolicyObject;
pub use resources::{
    Bucket, BucketProps, Key, Queue, QueueProps, Stream, StreamProps, Subscription, Table,
    TableAttributes, TableProps, Topic, TopicProps,
};
pub use statement::{PolicyStatement, PolicyStatementBuilder};
pub use targets::{Target, TargetEntry, TargetList};
pub use token::DependencyToken;
pub use traits::{Encryptable, Grantee, Resource, ResourcePolicyCapable};
pub use types::{Arn, Condition, Effect, PolicyKind, PrincipalDescriptor};

mod attachment;
mod build;
mod document;
mod error;
mod grant;
mod identity;
mod key_grant;
mod policy;
mod resources;
mod statement;
mod targets;
mod token;
mod traits;
mod types;

#[cfg(test)]
mod tests;
