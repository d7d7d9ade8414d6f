//! The build driver: configuration, policy registry and resolution phase.
//!
//! A [`Build`] goes through two phases. During construction, resources,
//! roles and grants append statements to policy objects, which register
//! themselves here when first created. [`Build::resolve`] then runs exactly
//! once: it produces every registered policy in registration order and seals
//! the build against further mutation.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::document::DocumentOptions;
use crate::error::GrantError;
use crate::policy::PolicyObject;
use crate::token::DependencyToken;
use crate::types::PolicyKind;

/// Settings shared by everything declared in one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Account that owned resources and roles are created in.
    pub account: Option<String>,
    pub region: Option<String>,
    pub partition: String,
    /// Auto-number statements in every policy this build produces.
    pub assign_sids: bool,
    /// Check identity/resource policy shape during resolution.
    pub validate_policies: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            account: None,
            region: None,
            partition: "aws".to_string(),
            assign_sids: false,
            validate_policies: true,
        }
    }
}

impl BuildConfig {
    pub fn from_json(text: &str) -> Result<Self, GrantError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            assign_sids: self.assign_sids,
        }
    }
}

/// One produced policy, ready for emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RenderedPolicy {
    pub id: String,
    pub kind: PolicyKind,
    pub attached_to: String,
    #[schema(value_type = Object)]
    pub document: Value,
}

/// A construct that must be ordered after the listed policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BuildDependency {
    pub construct: String,
    pub policies: Vec<String>,
}

/// Everything the resolution phase produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BuildOutput {
    pub policies: Vec<RenderedPolicy>,
    pub dependencies: Vec<BuildDependency>,
}

impl BuildOutput {
    pub fn policy(&self, id: &str) -> Option<&RenderedPolicy> {
        self.policies.iter().find(|p| p.id == id)
    }

    pub fn to_json(&self) -> Result<String, GrantError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug)]
struct BuildState {
    config: BuildConfig,
    policies: RefCell<Vec<Rc<PolicyObject>>>,
    dependencies: RefCell<Vec<BuildDependency>>,
    resolved: Cell<bool>,
}

/// Handle on one build. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Build {
    state: Rc<BuildState>,
}

impl Default for Build {
    fn default() -> Self {
        Build::new(BuildConfig::default())
    }
}

impl Build {
    pub fn new(config: BuildConfig) -> Self {
        Build {
            state: Rc::new(BuildState {
                config,
                policies: RefCell::new(Vec::new()),
                dependencies: RefCell::new(Vec::new()),
                resolved: Cell::new(false),
            }),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.state.config
    }

    pub fn is_resolved(&self) -> bool {
        self.state.resolved.get()
    }

    /// Number of policy objects created so far.
    pub fn policy_count(&self) -> usize {
        self.state.policies.borrow().len()
    }

    pub fn policy_ids(&self) -> Vec<String> {
        self.state
            .policies
            .borrow()
            .iter()
            .map(|p| p.id().to_string())
            .collect()
    }

    fn ensure_open(&self, what: &str) -> Result<(), GrantError> {
        if self.is_resolved() {
            return Err(GrantError::Sealed(format!(
                "cannot {what} after the build has been resolved"
            )));
        }
        Ok(())
    }

    pub(crate) fn create_policy(
        &self,
        id: &str,
        kind: PolicyKind,
        attached_to: &str,
    ) -> Result<Rc<PolicyObject>, GrantError> {
        self.ensure_open(&format!("create policy '{id}'"))?;
        if self.state.policies.borrow().iter().any(|p| p.id() == id) {
            return Err(GrantError::UnsupportedOperation(format!(
                "policy '{id}' already exists; construct ids must be unique within a build"
            )));
        }
        let policy = Rc::new(PolicyObject::new(
            id,
            kind,
            attached_to,
            self.state.config.document_options(),
        ));
        self.state.policies.borrow_mut().push(Rc::clone(&policy));
        Ok(policy)
    }

    /// Order `construct` after every policy `token` references.
    pub fn add_dependency(
        &self,
        construct: impl Into<String>,
        token: &DependencyToken,
    ) -> Result<(), GrantError> {
        let construct = construct.into();
        self.ensure_open(&format!("add a dependency for '{construct}'"))?;

        let mut dependencies = self.state.dependencies.borrow_mut();
        let index = match dependencies.iter().position(|d| d.construct == construct) {
            Some(index) => index,
            None => {
                dependencies.push(BuildDependency {
                    construct: construct.clone(),
                    policies: Vec::new(),
                });
                dependencies.len() - 1
            }
        };
        let entry = &mut dependencies[index];
        for id in token.policy_ids() {
            if !entry.policies.iter().any(|p| p == id) {
                entry.policies.push(id.to_string());
            }
        }

        debug!(
            event = "Build",
            phase = "Dependency",
            construct = construct.as_str(),
            policies = ?entry.policies
        );
        Ok(())
    }

    /// Run the resolution phase. Succeeds at most once per build.
    pub fn resolve(&self) -> Result<BuildOutput, GrantError> {
        if self.state.resolved.replace(true) {
            return Err(GrantError::Sealed(
                "resolve() has already run for this build".to_string(),
            ));
        }

        let policies = self.state.policies.borrow();
        let mut rendered = Vec::with_capacity(policies.len());
        for policy in policies.iter() {
            let document = policy.produce(self.state.config.validate_policies)?;
            rendered.push(RenderedPolicy {
                id: policy.id().to_string(),
                kind: policy.kind(),
                attached_to: policy.attached_to().to_string(),
                document: document.clone(),
            });
        }

        let dependencies = self.state.dependencies.borrow().clone();
        info!(
            event = "Build",
            phase = "Resolved",
            policies = rendered.len(),
            dependencies = dependencies.len()
        );

        Ok(BuildOutput {
            policies: rendered,
            dependencies,
        })
    }
}
