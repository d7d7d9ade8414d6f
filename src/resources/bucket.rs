use crate::attachment::{AddToResourcePolicyResult, ResourcePolicyAttachment};
use crate::build::Build;
use crate::error::GrantError;
use crate::grant::{Grant, GrantMode, GrantResolver};
use crate::key_grant::DataAccess;
use crate::policy::PolicyObject;
use crate::statement::PolicyStatement;
use crate::traits::{Encryptable, Grantee, Resource, ResourcePolicyCapable};
use crate::types::{Arn, PrincipalDescriptor};

use super::{grant_data, Key, ResourceCore};

pub const READ_ACTIONS: &[&str] = &["s3:GetObject*", "s3:GetBucket*", "s3:List*"];
pub const PUT_ACTIONS: &[&str] = &[
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];
pub const DELETE_ACTIONS: &[&str] = &["s3:DeleteObject*"];

pub const KEY_READ_ACTIONS: &[&str] = &["kms:Decrypt"];
pub const KEY_WRITE_ACTIONS: &[&str] = &["kms:Encrypt", "kms:ReEncrypt*", "kms:GenerateDataKey*"];

#[derive(Debug, Clone, Default)]
pub struct BucketProps {
    /// Defaults to the lower-cased construct id.
    pub bucket_name: Option<String>,
    pub encryption_key: Option<Key>,
}

/// An object store bucket. Bucket ARNs carry neither region nor account.
#[derive(Debug)]
pub struct Bucket {
    core: ResourceCore,
    policy: ResourcePolicyAttachment,
    encryption_key: Option<Key>,
}

impl Bucket {
    pub fn new(build: &Build, id: &str, props: BucketProps) -> Self {
        let name = props.bucket_name.unwrap_or_else(|| id.to_lowercase());
        let arn = Arn::new(build.config().partition.as_str(), "s3", "", "", name).to_string();
        Bucket {
            policy: ResourcePolicyAttachment::new(build, id, arn.as_str(), true),
            core: ResourceCore::owned(build, id, arn),
            encryption_key: props.encryption_key,
        }
    }

    /// Import a bucket. The owning account cannot be read from a bucket ARN,
    /// so it is unknown.
    pub fn from_arn(build: &Build, id: &str, arn: &str) -> Result<Self, GrantError> {
        Ok(Bucket {
            core: ResourceCore::imported(id, arn, "s3")?,
            policy: ResourcePolicyAttachment::new(build, id, arn, false),
            encryption_key: None,
        })
    }

    pub fn bucket_policy(&self) -> Option<&PolicyObject> {
        self.policy.policy()
    }

    /// ARN of the objects matching `key_pattern` (default `*`).
    pub fn arn_for_objects(&self, key_pattern: &str) -> String {
        format!("{}/{key_pattern}", self.core.arn)
    }

    pub fn grant<A, S>(&self, grantee: &dyn Grantee, actions: A) -> Result<Grant, GrantError>
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GrantResolver::resolve(
            grantee,
            actions,
            [self.core.arn.clone(), self.arn_for_objects("*")],
            Some(self),
        )
    }

    pub fn grant_read(&self, grantee: &dyn Grantee, key_pattern: Option<&str>) -> Result<Grant, GrantError> {
        self.grant_objects(grantee, DataAccess::Read, READ_ACTIONS.to_vec(), key_pattern, true)
    }

    pub fn grant_write(&self, grantee: &dyn Grantee, key_pattern: Option<&str>) -> Result<Grant, GrantError> {
        let actions = DELETE_ACTIONS.iter().chain(PUT_ACTIONS).copied().collect();
        self.grant_objects(grantee, DataAccess::Write, actions, key_pattern, true)
    }

    pub fn grant_read_write(&self, grantee: &dyn Grantee, key_pattern: Option<&str>) -> Result<Grant, GrantError> {
        let actions = READ_ACTIONS
            .iter()
            .chain(DELETE_ACTIONS)
            .chain(PUT_ACTIONS)
            .copied()
            .collect();
        self.grant_objects(grantee, DataAccess::ReadWrite, actions, key_pattern, true)
    }

    /// Object-level put only; the bucket ARN itself is not included.
    pub fn grant_put(&self, grantee: &dyn Grantee, key_pattern: Option<&str>) -> Result<Grant, GrantError> {
        self.grant_objects(grantee, DataAccess::Write, PUT_ACTIONS.to_vec(), key_pattern, false)
    }

    pub fn grant_delete(&self, grantee: &dyn Grantee, key_pattern: Option<&str>) -> Result<Grant, GrantError> {
        let arns = vec![self.arn_for_objects(key_pattern.unwrap_or("*"))];
        GrantResolver::resolve(grantee, DELETE_ACTIONS.iter().copied(), arns, Some(self))
    }

    /// Allow anyone to call `actions` (default `s3:GetObject`) on matching
    /// objects. Always lands on the bucket policy.
    pub fn grant_public_access(&self, key_prefix: &str, actions: &[&str]) -> Result<Grant, GrantError> {
        let actions = if actions.is_empty() { &["s3:GetObject"][..] } else { actions };
        GrantResolver::resolve(
            &PrincipalDescriptor::Any,
            actions.iter().copied(),
            [self.arn_for_objects(&format!("{key_prefix}*"))],
            Some(self),
        )
    }

    fn grant_objects(
        &self,
        grantee: &dyn Grantee,
        access: DataAccess,
        actions: Vec<&str>,
        key_pattern: Option<&str>,
        include_bucket: bool,
    ) -> Result<Grant, GrantError> {
        let mut arns = Vec::with_capacity(2);
        if include_bucket {
            arns.push(self.core.arn.clone());
        }
        arns.push(self.arn_for_objects(key_pattern.unwrap_or("*")));
        grant_data(
            self,
            Some(self),
            grantee,
            access,
            actions,
            arns,
            (KEY_READ_ACTIONS, KEY_WRITE_ACTIONS),
        )
    }
}

impl Resource for Bucket {
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

impl ResourcePolicyCapable for Bucket {
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

impl Encryptable for Bucket {
    fn encryption_key(&self) -> Option<&Key> {
        self.encryption_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildConfig;
    use crate::identity::Role;
    use insta::assert_json_snapshot;

    fn build() -> Build {
        Build::new(BuildConfig {
            account: Some("111122223333".to_string()),
            region: Some("eu-west-1".to_string()),
            ..BuildConfig::default()
        })
    }

    #[test]
    fn test_read_covers_bucket_and_objects() {
        let build = build();
        let bucket = Bucket::new(&build, "Assets", BucketProps::default());
        let role = Role::new(&build, "Reader");

        let grant = bucket.grant_read(&role, Some("public/*")).unwrap();

        assert_eq!(
            grant.principal_statement().unwrap().resources(),
            &["arn:aws:s3:::assets", "arn:aws:s3:::assets/public/*"]
        );
        assert!(bucket.bucket_policy().is_none());
    }

    #[test]
    fn test_put_is_object_level_only() {
        let build = build();
        let bucket = Bucket::new(&build, "Assets", BucketProps::default());
        let role = Role::new(&build, "Writer");

        let grant = bucket.grant_put(&role, None).unwrap();

        assert_eq!(
            grant.principal_statement().unwrap().resources(),
            &["arn:aws:s3:::assets/*"]
        );
    }

    #[test]
    fn test_public_access_renders_any_principal() {
        let build = build();
        let bucket = Bucket::new(
            &build,
            "Site",
            BucketProps {
                bucket_name: Some("www.example.com".to_string()),
                ..BucketProps::default()
            },
        );

        let grant = bucket.grant_public_access("static/", &[]).unwrap();
        grant.assert_success().unwrap();

        let output = build.resolve().unwrap();
        assert_json_snapshot!(output.policy("Site/Policy").unwrap().document, @r#"
        {
          "Statement": [
            {
              "Action": "s3:GetObject",
              "Effect": "Allow",
              "Principal": {
                "AWS": "*"
              },
              "Resource": "arn:aws:s3:::www.example.com/static/*"
            }
          ],
          "Version": "2012-10-17"
        }
        "#);
    }

    #[test]
    fn test_write_with_key() {
        let build = build();
        let key = Key::new(&build, "Key");
        let bucket = Bucket::new(
            &build,
            "Assets",
            BucketProps {
                encryption_key: Some(key.clone()),
                ..BucketProps::default()
            },
        );
        let role = Role::new(&build, "Writer");

        bucket.grant_write(&role, None).unwrap();

        let policy = role.default_policy().unwrap();
        let document = policy.document();
        assert_eq!(document.statements()[0].actions()[0], "s3:DeleteObject*");
        assert_eq!(document.statements()[1].actions(), KEY_WRITE_ACTIONS);
        assert!(key.key_policy().is_none());
    }

    #[test]
    fn test_imported_bucket_with_service_principal() {
        let build = build();
        let bucket = Bucket::from_arn(&build, "Logs", "arn:aws:s3:::central-logs").unwrap();

        let grant = bucket
            .grant_put(&PrincipalDescriptor::service("delivery.logs.amazonaws.com"), Some("AWSLogs/*"))
            .unwrap();

        assert!(!grant.statement_added());
        assert_eq!(bucket.account(), None);
        assert_eq!(build.policy_count(), 0);
    }
}
