//! Policy objects: a document plus where it is attached.

use std::cell::{Ref, RefCell};

use once_cell::unsync::OnceCell;
use serde_json::Value;
use tracing::debug;

use crate::document::{DocumentOptions, PolicyDocument};
use crate::error::GrantError;
use crate::statement::PolicyStatement;
use crate::types::PolicyKind;

/// A policy object registered with a build.
///
/// The document stays open for appends during construction. Its body is
/// produced once, by [`crate::Build::resolve`], and kept for emission.
#[derive(Debug)]
pub struct PolicyObject {
    id: String,
    kind: PolicyKind,
    attached_to: String,
    document: RefCell<PolicyDocument>,
    rendered: OnceCell<Value>,
}

impl PolicyObject {
    pub(crate) fn new(
        id: impl Into<String>,
        kind: PolicyKind,
        attached_to: impl Into<String>,
        options: DocumentOptions,
    ) -> Self {
        PolicyObject {
            id: id.into(),
            kind,
            attached_to: attached_to.into(),
            document: RefCell::new(PolicyDocument::with_options(options)),
            rendered: OnceCell::new(),
        }
    }

    /// Construct path of the policy, e.g. `Jobs/Policy` or `Worker/DefaultPolicy`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// ARN of the role or resource this policy belongs to.
    pub fn attached_to(&self) -> &str {
        &self.attached_to
    }

    pub fn document(&self) -> Ref<'_, PolicyDocument> {
        self.document.borrow()
    }

    pub fn statement_count(&self) -> usize {
        self.document.borrow().statement_count()
    }

    /// The produced body, once the build has been resolved.
    pub fn rendered(&self) -> Option<&Value> {
        self.rendered.get()
    }

    pub(crate) fn add_statements<I>(&self, statements: I) -> Result<(), GrantError>
    where
        I: IntoIterator<Item = PolicyStatement>,
    {
        self.document.borrow_mut().add_statements(statements)
    }

    /// Seal the document and produce its body. Runs at most once.
    pub(crate) fn produce(&self, validate: bool) -> Result<&Value, GrantError> {
        if self.rendered.get().is_some() {
            return Err(GrantError::Sealed(format!(
                "policy '{}' has already been produced",
                self.id
            )));
        }

        let mut document = self.document.borrow_mut();
        document.seal();

        if validate {
            let errors = document.validation_errors(self.kind);
            if !errors.is_empty() {
                return Err(GrantError::InvalidPolicy(format!(
                    "{} policy '{}': {}",
                    self.kind,
                    self.id,
                    errors.join("; ")
                )));
            }
        }

        let body = document.to_serializable();
        debug!(
            event = "Policy",
            phase = "Produce",
            id = self.id.as_str(),
            kind = %self.kind,
            statements = document.statement_count()
        );
        Ok(self.rendered.get_or_init(|| body))
    }
}
