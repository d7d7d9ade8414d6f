//! Minimal ARN handling.
//!
//! ARNs arrive pre-formatted from the resource layer; the engine only needs
//! to split them to learn which account owns a resource or principal.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GrantError;

/// A parsed `arn:<partition>:<service>:<region>:<account>:<resource>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arn {
    partition: String,
    service: String,
    region: String,
    account: String,
    resource: String,
}

impl Arn {
    pub fn new(
        partition: impl Into<String>,
        service: impl Into<String>,
        region: impl Into<String>,
        account: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Arn {
            partition: partition.into(),
            service: service.into(),
            region: region.into(),
            account: account.into(),
            resource: resource.into(),
        }
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// The owning account, `None` for account-less ARNs such as S3 buckets.
    pub fn account(&self) -> Option<&str> {
        if self.account.is_empty() {
            None
        } else {
            Some(&self.account)
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The last path segment of the resource part (`role/app/worker` -> `worker`).
    pub fn resource_name(&self) -> &str {
        self.resource
            .rsplit(|c: char| c == '/' || c == ':')
            .next()
            .unwrap_or(&self.resource)
    }
}

impl FromStr for Arn {
    type Err = GrantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(6, ':').collect();
        if parts.len() != 6 || parts[0] != "arn" {
            return Err(GrantError::InvalidFormat(format!(
                "Failed to parse ARN: '{s}' (expected format: arn:partition:service:region:account:resource)"
            )));
        }
        if parts[1].is_empty() || parts[2].is_empty() || parts[5].is_empty() {
            return Err(GrantError::InvalidFormat(format!(
                "Failed to parse ARN: '{s}' has an empty partition, service or resource"
            )));
        }
        Ok(Arn::new(parts[1], parts[2], parts[3], parts[4], parts[5]))
    }
}

impl Display for Arn {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}
