//! Policy statements.
//!
//! A [`PolicyStatement`] is assembled with a [`PolicyStatementBuilder`] and is
//! immutable afterwards. Validation is deferred to the moment a statement is
//! appended to a document, so a document never holds an invalid statement.

use std::collections::HashSet;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::GrantError;
use crate::types::{Condition, Effect, PrincipalDescriptor};

/// `*`, or `service:Name` where the name may carry `*` / `?` wildcards.
static ACTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\*|[a-z0-9][a-z0-9-]*:[A-Za-z0-9*?]+)$").expect("action pattern is valid")
});

/// One allow/deny rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<String>,
    principals: Vec<PrincipalDescriptor>,
    conditions: Vec<Condition>,
}

impl PolicyStatement {
    pub fn builder() -> PolicyStatementBuilder {
        PolicyStatementBuilder::default()
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Actions in first-seen order, duplicates collapsed.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn principals(&self) -> &[PrincipalDescriptor] {
        &self.principals
    }

    pub fn has_principal(&self) -> bool {
        !self.principals.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Check the statement can be placed in a document.
    pub fn validate(&self) -> Result<(), GrantError> {
        if self.actions.is_empty() {
            return Err(GrantError::InvalidStatement(
                "a statement must have at least one action".to_string(),
            ));
        }
        if self.resources.is_empty() {
            return Err(GrantError::InvalidStatement(format!(
                "statement for [{}] must have at least one resource",
                self.actions.join(", ")
            )));
        }
        if let Some(bad) = self.actions.iter().find(|a| !ACTION_PATTERN.is_match(a)) {
            return Err(GrantError::InvalidStatement(format!(
                "action '{bad}' is not of the form 'service:Action' or '*'"
            )));
        }

        let mut seen = HashSet::new();
        for condition in &self.conditions {
            if !seen.insert((condition.test(), condition.variable())) {
                return Err(GrantError::InvalidStatement(format!(
                    "condition {} on '{}' is given more than once",
                    condition.test(),
                    condition.variable()
                )));
            }
        }
        Ok(())
    }

    /// Render as a JSON statement, using `auto_sid` when no explicit sid is set.
    pub(crate) fn to_json(&self, auto_sid: Option<String>) -> Value {
        let mut out = Map::new();

        out.insert("Effect".to_string(), Value::from(self.effect.as_ref()));
        out.insert("Action".to_string(), scalar_or_list(&self.actions));
        out.insert("Resource".to_string(), scalar_or_list(&self.resources));

        if let Some(sid) = self.sid.clone().or(auto_sid) {
            out.insert("Sid".to_string(), Value::from(sid));
        }

        if !self.principals.is_empty() {
            let grouped = self
                .principals
                .iter()
                .map(PrincipalDescriptor::json_entry)
                .into_group_map();
            let block: Map<String, Value> = grouped
                .into_iter()
                .map(|(key, values)| (key.to_string(), scalar_or_list(&values)))
                .collect();
            out.insert("Principal".to_string(), Value::Object(block));
        }

        if !self.conditions.is_empty() {
            let mut block = Map::new();
            for condition in &self.conditions {
                let entry = block
                    .entry(condition.test().to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(vars) = entry {
                    vars.insert(
                        condition.variable().to_string(),
                        scalar_or_list(condition.values()),
                    );
                }
            }
            out.insert("Condition".to_string(), Value::Object(block));
        }

        Value::Object(out)
    }
}

fn scalar_or_list(values: &[String]) -> Value {
    match values {
        [single] => Value::from(single.as_str()),
        _ => Value::from(values.to_vec()),
    }
}

/// Accumulates the parts of a [`PolicyStatement`].
#[derive(Debug, Clone, Default)]
pub struct PolicyStatementBuilder {
    statement: PolicyStatement,
}

impl PolicyStatementBuilder {
    pub fn sid(mut self, sid: impl Into<String>) -> Self {
        self.statement.sid = Some(sid.into());
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.statement.effect = effect;
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.statement.actions.push(action.into());
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement
            .actions
            .extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.statement.resources.push(resource.into());
        self
    }

    pub fn resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statement
            .resources
            .extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn principal(mut self, principal: PrincipalDescriptor) -> Self {
        self.statement.principals.push(principal);
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.statement.conditions.push(condition);
        self
    }

    pub fn conditions(mut self, conditions: impl IntoIterator<Item = Condition>) -> Self {
        self.statement.conditions.extend(conditions);
        self
    }

    pub fn build(self) -> PolicyStatement {
        let PolicyStatement {
            sid,
            effect,
            actions,
            resources,
            principals,
            conditions,
        } = self.statement;

        PolicyStatement {
            sid,
            effect,
            actions: actions.into_iter().unique().collect(),
            resources: resources.into_iter().unique().collect(),
            principals: principals.into_iter().unique().collect(),
            conditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yare::parameterized;

    #[test]
    fn test_builder_collapses_duplicates_in_order() {
        let statement = PolicyStatement::builder()
            .actions(["sqs:SendMessage", "sqs:GetQueueUrl", "sqs:SendMessage"])
            .resource("arn:aws:sqs:eu-west-1:111122223333:jobs")
            .resource("arn:aws:sqs:eu-west-1:111122223333:jobs")
            .build();

        assert_eq!(statement.actions(), &["sqs:SendMessage", "sqs:GetQueueUrl"]);
        assert_eq!(statement.resources().len(), 1);
        assert_eq!(statement.effect(), Effect::Allow);
        assert!(statement.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_actions() {
        let statement = PolicyStatement::builder().resource("*").build();
        assert!(matches!(
            statement.validate(),
            Err(GrantError::InvalidStatement(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_resources() {
        let statement = PolicyStatement::builder().action("s3:GetObject").build();
        let err = statement.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid statement: statement for [s3:GetObject] must have at least one resource"
        );
    }

    #[parameterized(
        wildcard = { "*", true },
        plain = { "sqs:SendMessage", true },
        trailing_wildcard = { "kms:GenerateDataKey*", true },
        dashed_service = { "execute-api:Invoke", true },
        no_service = { "SendMessage", false },
        empty = { "", false },
        spaces = { "sqs: SendMessage", false },
    )]
    fn test_action_format(action: &str, valid: bool) {
        let statement = PolicyStatement::builder()
            .action(action)
            .resource("*")
            .build();
        assert_eq!(statement.validate().is_ok(), valid);
    }

    #[test]
    fn test_validate_rejects_repeated_condition_key() {
        let statement = PolicyStatement::builder()
            .action("sns:Publish")
            .resource("*")
            .condition(Condition::new("ArnEquals", "aws:SourceArn", ["a"]))
            .condition(Condition::new("ArnEquals", "aws:SourceArn", ["b"]))
            .build();
        assert!(matches!(
            statement.validate(),
            Err(GrantError::InvalidStatement(_))
        ));
    }

    #[test]
    fn test_to_json_collapses_single_values() {
        let statement = PolicyStatement::builder()
            .action("sqs:SendMessage")
            .resource("arn:aws:sqs:eu-west-1:111122223333:jobs")
            .principal(PrincipalDescriptor::service("sns.amazonaws.com"))
            .condition(Condition::new(
                "ArnEquals",
                "aws:SourceArn",
                ["arn:aws:sns:eu-west-1:111122223333:events"],
            ))
            .build();

        assert_eq!(
            statement.to_json(None),
            json!({
                "Action": "sqs:SendMessage",
                "Condition": {
                    "ArnEquals": {"aws:SourceArn": "arn:aws:sns:eu-west-1:111122223333:events"}
                },
                "Effect": "Allow",
                "Principal": {"Service": "sns.amazonaws.com"},
                "Resource": "arn:aws:sqs:eu-west-1:111122223333:jobs",
            })
        );
    }

    #[test]
    fn test_to_json_groups_principals() {
        let statement = PolicyStatement::builder()
            .effect(Effect::Deny)
            .actions(["s3:GetObject*", "s3:List*"])
            .resource("*")
            .principal(PrincipalDescriptor::arn("arn:aws:iam::111122223333:role/a"))
            .principal(PrincipalDescriptor::account("444455556666"))
            .principal(PrincipalDescriptor::service("logs.amazonaws.com"))
            .sid("DenyRead")
            .build();

        assert_eq!(
            statement.to_json(Some("7".to_string())),
            json!({
                "Action": ["s3:GetObject*", "s3:List*"],
                "Effect": "Deny",
                "Principal": {
                    "AWS": ["arn:aws:iam::111122223333:role/a", "arn:aws:iam::444455556666:root"],
                    "Service": "logs.amazonaws.com"
                },
                "Resource": "*",
                "Sid": "DenyRead",
            })
        );
    }

    #[test]
    fn test_to_json_uses_auto_sid_when_unset() {
        let statement = PolicyStatement::builder()
            .action("kms:Decrypt")
            .resource("*")
            .build();
        assert_eq!(statement.to_json(Some("3".to_string()))["Sid"], "3");
        assert!(statement.to_json(None).get("Sid").is_none());
    }
}
