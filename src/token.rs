//! Dependency tokens returned with grants.

use std::rc::Rc;

use crate::policy::PolicyObject;

/// Opaque handle on the policy objects that carry a grant's statements.
///
/// Anything that needs "the permission already exists" can be ordered after
/// every policy referenced here via [`crate::Build::add_dependency`].
#[derive(Debug, Clone)]
pub struct DependencyToken {
    targets: Vec<Rc<PolicyObject>>,
}

impl DependencyToken {
    pub(crate) fn new(target: Rc<PolicyObject>) -> Self {
        DependencyToken {
            targets: vec![target],
        }
    }

    /// Union of two tokens, keeping first-seen order.
    pub fn combine(&self, other: &DependencyToken) -> DependencyToken {
        let mut targets = self.targets.clone();
        for target in &other.targets {
            if !targets.iter().any(|t| Rc::ptr_eq(t, target)) {
                targets.push(Rc::clone(target));
            }
        }
        DependencyToken { targets }
    }

    pub(crate) fn merge(
        left: Option<DependencyToken>,
        right: Option<DependencyToken>,
    ) -> Option<DependencyToken> {
        match (left, right) {
            (Some(l), Some(r)) => Some(l.combine(&r)),
            (l, r) => l.or(r),
        }
    }

    pub fn policy_ids(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.id()).collect()
    }

    pub fn policies(&self) -> impl Iterator<Item = &PolicyObject> {
        self.targets.iter().map(|t| t.as_ref())
    }

    /// True once every referenced policy has been produced.
    pub fn is_satisfied(&self) -> bool {
        self.targets.iter().all(|t| t.rendered().is_some())
    }
}

impl PartialEq for DependencyToken {
    fn eq(&self, other: &Self) -> bool {
        self.targets.len() == other.targets.len()
            && self
                .targets
                .iter()
                .zip(&other.targets)
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

impl Eq for DependencyToken {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentOptions;
    use crate::types::PolicyKind;

    fn object(id: &str) -> Rc<PolicyObject> {
        Rc::new(PolicyObject::new(
            id,
            PolicyKind::Identity,
            "arn:aws:iam::111122223333:role/worker",
            DocumentOptions::default(),
        ))
    }

    #[test]
    fn test_combine_deduplicates_by_identity() {
        let a = object("Worker/DefaultPolicy");
        let b = object("Jobs/Policy");

        let left = DependencyToken::new(Rc::clone(&a));
        let right = DependencyToken::new(Rc::clone(&b)).combine(&DependencyToken::new(a));
        let combined = left.combine(&right);

        assert_eq!(
            combined.policy_ids(),
            vec!["Worker/DefaultPolicy", "Jobs/Policy"]
        );
    }

    #[test]
    fn test_same_id_different_object_is_not_equal() {
        let left = DependencyToken::new(object("Worker/DefaultPolicy"));
        let right = DependencyToken::new(object("Worker/DefaultPolicy"));
        assert_ne!(left, right);
        assert_eq!(left, left.clone());
    }

    #[test]
    fn test_merge_options() {
        let token = DependencyToken::new(object("Worker/DefaultPolicy"));
        assert!(DependencyToken::merge(None, None).is_none());
        assert_eq!(
            DependencyToken::merge(Some(token.clone()), None),
            Some(token.clone())
        );
        assert_eq!(DependencyToken::merge(None, Some(token.clone())), Some(token));
    }

    #[test]
    fn test_unproduced_token_is_not_satisfied() {
        let policy = object("Worker/DefaultPolicy");
        let token = DependencyToken::new(Rc::clone(&policy));
        assert!(!token.is_satisfied());
        policy.produce(false).unwrap();
        assert!(token.is_satisfied());
    }
}
