//! Secondary grants on the key protecting a resource.

use itertools::Itertools;
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::error::GrantError;
use crate::grant::Grant;
use crate::traits::{Encryptable, Grantee, Resource};

/// Which kind of data access a helper grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DataAccess {
    Read,
    Write,
    ReadWrite,
}

impl DataAccess {
    /// Select key actions for this access from a family's read/write sets.
    /// The read-write union keeps first-seen order without duplicates.
    pub fn key_actions<'a>(&self, read: &[&'a str], write: &[&'a str]) -> Vec<&'a str> {
        match self {
            DataAccess::Read => read.to_vec(),
            DataAccess::Write => write.to_vec(),
            DataAccess::ReadWrite => read.iter().chain(write).copied().unique().collect(),
        }
    }
}

pub struct KeyGrantPropagator;

impl KeyGrantPropagator {
    /// Grant `key_actions` on the resource's key to `grantee`.
    ///
    /// Runs whenever the resource has a key, whatever became of `primary`.
    /// Returns `None` when there is no key or nothing to grant on it.
    pub fn propagate<R>(
        primary: &Grant,
        resource: &R,
        grantee: &dyn Grantee,
        key_actions: &[&str],
    ) -> Result<Option<Grant>, GrantError>
    where
        R: Encryptable + ?Sized,
    {
        let Some(key) = resource.encryption_key() else {
            return Ok(None);
        };
        if key_actions.is_empty() {
            return Ok(None);
        }

        debug!(
            event = "Grant",
            phase = "Key",
            key = key.node_id(),
            primary_added = primary.statement_added(),
            actions = ?key_actions
        );
        key.grant(grantee, key_actions.iter().copied()).map(Some)
    }
}
