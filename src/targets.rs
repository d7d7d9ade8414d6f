//! Target lists with identity de-duplication.
//!
//! Used for notification fan-out such as topic subscriptions. Each list owns
//! the counter that numbers its entries, so ids are unique under the parent
//! without looking at any other construct.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One destination, identified by `(target_type, address)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub target_type: String,
    pub address: String,
}

impl Target {
    pub fn new(target_type: impl Into<String>, address: impl Into<String>) -> Self {
        Target {
            target_type: target_type.into(),
            address: address.into(),
        }
    }
}

/// A stored target and the id it was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub id: String,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetList {
    parent_id: String,
    prefix: String,
    next: usize,
    entries: Vec<TargetEntry>,
}

impl TargetList {
    /// Ids are `<parent_id>/<prefix><n>`, numbered from 1.
    pub fn new(parent_id: impl Into<String>, prefix: impl Into<String>) -> Self {
        TargetList {
            parent_id: parent_id.into(),
            prefix: prefix.into(),
            next: 1,
            entries: Vec::new(),
        }
    }

    /// Register `target`. Returns false, storing nothing, when an equal
    /// target is already present.
    pub fn add(&mut self, target: Target) -> bool {
        if self.contains(&target) {
            debug!(
                event = "Targets",
                phase = "Duplicate",
                parent = self.parent_id.as_str(),
                target_type = target.target_type.as_str(),
                address = target.address.as_str()
            );
            return false;
        }

        let id = format!("{}/{}{}", self.parent_id, self.prefix, self.next);
        self.next += 1;
        self.entries.push(TargetEntry { id, target });
        true
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.entries.iter().any(|e| &e.target == target)
    }

    pub fn entries(&self) -> &[TargetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_target_is_rejected() {
        let mut list = TargetList::new("Events", "Subscription");
        assert!(list.add(Target::new("sqs", "arn:aws:sqs:eu-west-1:111122223333:jobs")));
        assert!(!list.add(Target::new("sqs", "arn:aws:sqs:eu-west-1:111122223333:jobs")));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_same_address_other_type_is_distinct() {
        let mut list = TargetList::new("Events", "Subscription");
        assert!(list.add(Target::new("email", "ops@example.com")));
        assert!(list.add(Target::new("email-json", "ops@example.com")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_ids_are_scoped_to_parent_and_skip_nothing() {
        let mut first = TargetList::new("Events", "Subscription");
        let mut second = TargetList::new("Alerts", "Subscription");

        first.add(Target::new("email", "a@example.com"));
        first.add(Target::new("email", "a@example.com"));
        first.add(Target::new("email", "b@example.com"));
        second.add(Target::new("email", "a@example.com"));

        let ids: Vec<&str> = first.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Events/Subscription1", "Events/Subscription2"]);
        assert_eq!(second.entries()[0].id, "Alerts/Subscription1");
    }
}
