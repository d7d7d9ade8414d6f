//! Statement conditions.

use serde::{Deserialize, Serialize};

/// One `{test, variable, values}` triple. Conditions on a statement are ANDed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    test: String,
    variable: String,
    values: Vec<String>,
}

impl Condition {
    pub fn new<I, S>(test: impl Into<String>, variable: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition {
            test: test.into(),
            variable: variable.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The operator, e.g. `StringEquals` or `ArnLike`.
    pub fn test(&self) -> &str {
        &self.test
    }

    /// The context key, e.g. `aws:SourceArn`.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_accessors() {
        let condition = Condition::new("ArnLike", "aws:SourceArn", ["arn:aws:sns:*"]);
        assert_eq!(condition.test(), "ArnLike");
        assert_eq!(condition.variable(), "aws:SourceArn");
        assert_eq!(condition.values(), &["arn:aws:sns:*".to_string()]);
    }
}
