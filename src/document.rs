//! Append-only policy documents.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GrantError;
use crate::statement::PolicyStatement;
use crate::types::PolicyKind;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOptions {
    /// Number statements without an explicit sid `"0"`, `"1"`, ... on render.
    #[serde(default)]
    pub assign_sids: bool,
}

/// An ordered collection of statements belonging to one policy object.
///
/// Statements are only ever appended, never merged or removed. Once the
/// owning build has been resolved the document is sealed and further appends
/// fail with [`GrantError::Sealed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
    assign_sids: bool,
    sealed: bool,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DocumentOptions) -> Self {
        PolicyDocument {
            assign_sids: options.assign_sids,
            ..Self::default()
        }
    }

    /// Append statements in order. Every statement is validated first; if any
    /// is invalid nothing is appended.
    pub fn add_statements<I>(&mut self, statements: I) -> Result<(), GrantError>
    where
        I: IntoIterator<Item = PolicyStatement>,
    {
        if self.sealed {
            return Err(GrantError::Sealed(
                "cannot add statements to a document after resolution".to_string(),
            ));
        }

        let statements: Vec<PolicyStatement> = statements.into_iter().collect();
        for statement in &statements {
            statement.validate()?;
        }

        debug!(
            event = "Document",
            phase = "Append",
            added = statements.len(),
            total = self.statements.len() + statements.len()
        );
        self.statements.extend(statements);
        Ok(())
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn assigns_sids(&self) -> bool {
        self.assign_sids
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn seal(&mut self) {
        self.sealed = true;
    }

    /// Render the current contents.
    ///
    /// Pure: repeated calls without intervening appends give identical output.
    /// Auto sids are computed here from insertion order: a statement without
    /// a sid gets its index, moved up past numbers taken by explicit sids.
    pub fn to_serializable(&self) -> Value {
        let taken: HashSet<&str> = self
            .statements
            .iter()
            .filter_map(PolicyStatement::sid)
            .collect();
        let mut next = 0;
        let statements: Vec<Value> = self
            .statements
            .iter()
            .enumerate()
            .map(|(index, statement)| {
                let auto_sid = (self.assign_sids && statement.sid().is_none()).then(|| {
                    let mut candidate = index.max(next);
                    while taken.contains(candidate.to_string().as_str()) {
                        candidate += 1;
                    }
                    next = candidate + 1;
                    candidate.to_string()
                });
                statement.to_json(auto_sid)
            })
            .collect();

        let mut out = Map::new();
        out.insert("Statement".to_string(), Value::Array(statements));
        out.insert("Version".to_string(), Value::from(POLICY_VERSION));
        Value::Object(out)
    }

    pub fn to_json_string(&self) -> Result<String, GrantError> {
        Ok(serde_json::to_string(&self.to_serializable())?)
    }

    /// Problems that make this document unusable as a policy of `kind`.
    ///
    /// Resource policies need a principal on every statement; identity
    /// policies must not name one.
    pub fn validation_errors(&self, kind: PolicyKind) -> Vec<String> {
        self.statements
            .iter()
            .enumerate()
            .filter_map(|(index, statement)| match kind {
                PolicyKind::Resource if !statement.has_principal() => Some(format!(
                    "statement {index} in a resource policy must specify at least one principal"
                )),
                PolicyKind::Identity if statement.has_principal() => Some(format!(
                    "statement {index} in an identity policy cannot specify any principals"
                )),
                _ => None,
            })
            .collect()
    }
}
