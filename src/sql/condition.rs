//! The condition expression tree.
//!
//! A small WHERE-predicate language: column comparisons at the leaves,
//! AND/OR/NOT combinators above them. Trees are immutable; the combinators
//! consume their inputs and return new trees, flattening nested same-kind
//! combinations as they go, so policy code can conjoin filters without
//! caring what shape the existing tree has.

use serde_json::Value as JsonValue;

/// Comparison operator for a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Le,
    Ge,
    Gt,
    /// Operand: two-element array (low, high)
    Between,
    /// Operand: array of values, or a comma-joined string
    In,
    /// Operand ignored
    IsNull,
    Contains,
    StartsWith,
    EndsWith,
}

/// A WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The empty predicate; renders to no WHERE clause at all.
    None,
    Column {
        column: String,
        operator: Operator,
        operand: JsonValue,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    fn leaf(column: impl Into<String>, operator: Operator, operand: JsonValue) -> Self {
        Self::Column {
            column: column.into(),
            operator,
            operand,
        }
    }

    pub fn eq(column: impl Into<String>, value: JsonValue) -> Self {
        Self::leaf(column, Operator::Eq, value)
    }

    pub fn neq(column: impl Into<String>, value: JsonValue) -> Self {
        Self::leaf(column, Operator::Neq, value)
    }

    pub fn lt(column: impl Into<String>, value: JsonValue) -> Self {
        Self::leaf(column, Operator::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: JsonValue) -> Self {
        Self::leaf(column, Operator::Le, value)
    }

    pub fn ge(column: impl Into<String>, value: JsonValue) -> Self {
        Self::leaf(column, Operator::Ge, value)
    }

    pub fn gt(column: impl Into<String>, value: JsonValue) -> Self {
        Self::leaf(column, Operator::Gt, value)
    }

    pub fn between(column: impl Into<String>, low: JsonValue, high: JsonValue) -> Self {
        Self::leaf(column, Operator::Between, JsonValue::Array(vec![low, high]))
    }

    pub fn in_list(column: impl Into<String>, values: Vec<JsonValue>) -> Self {
        Self::leaf(column, Operator::In, JsonValue::Array(values))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::leaf(column, Operator::IsNull, JsonValue::Null)
    }

    pub fn contains(column: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::leaf(column, Operator::Contains, JsonValue::String(fragment.into()))
    }

    pub fn starts_with(column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::leaf(
            column,
            Operator::StartsWith,
            JsonValue::String(prefix.into()),
        )
    }

    pub fn ends_with(column: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self::leaf(column, Operator::EndsWith, JsonValue::String(suffix.into()))
    }

    /// True for the empty predicate.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Conjoin with another condition. The empty predicate is the neutral
    /// element; nested ANDs flatten.
    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::None, other) => other,
            (this, Condition::None) => this,
            (Condition::And(mut children), Condition::And(more)) => {
                children.extend(more);
                Condition::And(children)
            }
            (Condition::And(mut children), other) => {
                children.push(other);
                Condition::And(children)
            }
            (this, Condition::And(mut children)) => {
                children.insert(0, this);
                Condition::And(children)
            }
            (this, other) => Condition::And(vec![this, other]),
        }
    }

    /// Disjoin with another condition; same flattening rules as [`and`].
    ///
    /// [`and`]: Condition::and
    pub fn or(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::None, other) => other,
            (this, Condition::None) => this,
            (Condition::Or(mut children), Condition::Or(more)) => {
                children.extend(more);
                Condition::Or(children)
            }
            (Condition::Or(mut children), other) => {
                children.push(other);
                Condition::Or(children)
            }
            (this, Condition::Or(mut children)) => {
                children.insert(0, this);
                Condition::Or(children)
            }
            (this, other) => Condition::Or(vec![this, other]),
        }
    }

    /// Negate. Negating the empty predicate stays empty.
    pub fn not(self) -> Condition {
        match self {
            Condition::None => Condition::None,
            Condition::Not(inner) => *inner,
            other => Condition::Not(Box::new(other)),
        }
    }
}
