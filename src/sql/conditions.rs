//! Rendering condition trees into WHERE clauses.
//!
//! Produces the clause text (with a leading ` WHERE `, or nothing for the
//! empty predicate) and appends the bound parameters in placeholder order.
//! Every leaf column is checked against the table descriptor before any
//! SQL leaves this module.

use crate::config::Driver;
use crate::error::{GatewayError, GatewayResult};
use crate::records::SqlParam;
use crate::schema::TableDescriptor;
use crate::sql::condition::{Condition, Operator};
use crate::sql::quote;
use serde_json::Value as JsonValue;

pub struct ConditionsBuilder {
    driver: Driver,
}

impl ConditionsBuilder {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    /// Render ` WHERE <predicate>` for a non-empty tree, `""` otherwise.
    /// Parameters are appended to `params` in the order their placeholders
    /// appear in the returned text.
    pub fn where_clause(
        &self,
        table: &TableDescriptor,
        condition: &Condition,
        params: &mut Vec<SqlParam>,
    ) -> GatewayResult<String> {
        let rendered = self.render(table, condition, params)?;
        if rendered.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(" WHERE {}", rendered))
    }

    fn render(
        &self,
        table: &TableDescriptor,
        condition: &Condition,
        params: &mut Vec<SqlParam>,
    ) -> GatewayResult<String> {
        match condition {
            Condition::None => Ok(String::new()),
            Condition::Column {
                column,
                operator,
                operand,
            } => self.render_leaf(table, column, *operator, operand, params),
            Condition::And(children) => self.render_join(table, children, " AND ", params),
            Condition::Or(children) => self.render_join(table, children, " OR ", params),
            Condition::Not(inner) => {
                let rendered = self.render(table, inner, params)?;
                if rendered.is_empty() {
                    return Ok(String::new());
                }
                Ok(format!("(NOT {})", rendered))
            }
        }
    }

    fn render_join(
        &self,
        table: &TableDescriptor,
        children: &[Condition],
        separator: &str,
        params: &mut Vec<SqlParam>,
    ) -> GatewayResult<String> {
        let mut rendered = Vec::with_capacity(children.len());
        for child in children {
            let text = self.render(table, child, params)?;
            if !text.is_empty() {
                rendered.push(text);
            }
        }
        match rendered.len() {
            0 => Ok(String::new()),
            1 => Ok(rendered.remove(0)),
            _ => Ok(format!("({})", rendered.join(separator))),
        }
    }

    fn render_leaf(
        &self,
        table: &TableDescriptor,
        column: &str,
        operator: Operator,
        operand: &JsonValue,
        params: &mut Vec<SqlParam>,
    ) -> GatewayResult<String> {
        if !table.has_column(column) {
            return Err(GatewayError::invalid_operation(format!(
                "condition on unknown column '{}' of table '{}'",
                column,
                table.name()
            )));
        }
        let quoted = quote(column);
        match operator {
            Operator::Eq => Ok(self.comparison(&quoted, "=", operand, params)),
            Operator::Neq => Ok(self.comparison(&quoted, "<>", operand, params)),
            Operator::Lt => Ok(self.comparison(&quoted, "<", operand, params)),
            Operator::Le => Ok(self.comparison(&quoted, "<=", operand, params)),
            Operator::Ge => Ok(self.comparison(&quoted, ">=", operand, params)),
            Operator::Gt => Ok(self.comparison(&quoted, ">", operand, params)),
            Operator::IsNull => Ok(format!("{} IS NULL", quoted)),
            Operator::Between => {
                let values = operand_list(operand);
                if values.len() != 2 {
                    return Err(GatewayError::invalid_operation(format!(
                        "BETWEEN on '{}' needs exactly two operands, got {}",
                        column,
                        values.len()
                    )));
                }
                params.push(SqlParam::from_value(&values[0]));
                params.push(SqlParam::from_value(&values[1]));
                Ok(format!("{} BETWEEN ? AND ?", quoted))
            }
            Operator::In => {
                let values = operand_list(operand);
                if values.is_empty() {
                    // IN () is invalid SQL; the gateway short-circuits empty
                    // id lists before it gets here.
                    return Err(GatewayError::invalid_operation(format!(
                        "IN on '{}' with an empty value list",
                        column
                    )));
                }
                let placeholders = vec!["?"; values.len()].join(",");
                for value in &values {
                    params.push(SqlParam::from_value(value));
                }
                Ok(format!("{} IN ({})", quoted, placeholders))
            }
            Operator::Contains => {
                let text = operand_text(operand);
                params.push(SqlParam::String(format!(
                    "%{}%",
                    self.escape_like(&text)
                )));
                Ok(format!("{} LIKE ?", quoted))
            }
            Operator::StartsWith => {
                let text = operand_text(operand);
                params.push(SqlParam::String(format!("{}%", self.escape_like(&text))));
                Ok(format!("{} LIKE ?", quoted))
            }
            Operator::EndsWith => {
                let text = operand_text(operand);
                params.push(SqlParam::String(format!("%{}", self.escape_like(&text))));
                Ok(format!("{} LIKE ?", quoted))
            }
        }
    }

    fn comparison(
        &self,
        quoted: &str,
        op: &str,
        operand: &JsonValue,
        params: &mut Vec<SqlParam>,
    ) -> String {
        params.push(SqlParam::from_value(operand));
        format!("{} {} ?", quoted, op)
    }

    /// Escape LIKE wildcards in a literal fragment. SQL Server has no
    /// default escape character, so wildcards are bracketed there instead.
    fn escape_like(&self, fragment: &str) -> String {
        match self.driver {
            Driver::SqlSrv => fragment
                .replace('[', "[[]")
                .replace('%', "[%]")
                .replace('_', "[_]"),
            _ => fragment
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_"),
        }
    }
}

/// Operand of a list operator: a JSON array as-is, or a comma-joined
/// string split into string elements.
fn operand_list(operand: &JsonValue) -> Vec<JsonValue> {
    match operand {
        JsonValue::Array(values) => values.clone(),
        JsonValue::String(joined) => joined
            .split(',')
            .map(|part| JsonValue::String(part.trim().to_string()))
            .collect(),
        JsonValue::Null => Vec::new(),
        single => vec![single.clone()],
    }
}

fn operand_text(operand: &JsonValue) -> String {
    match operand {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;
    use serde_json::json;

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "books",
            vec![
                ColumnDescriptor::new("id", "integer", false),
                ColumnDescriptor::new("title", "varchar", false),
                ColumnDescriptor::new("qty", "integer", true),
            ],
            "id",
        )
    }

    fn render(condition: &Condition) -> (String, Vec<SqlParam>) {
        let builder = ConditionsBuilder::new(Driver::MySql);
        let mut params = Vec::new();
        let clause = builder
            .where_clause(&table(), condition, &mut params)
            .unwrap();
        (clause, params)
    }

    #[test]
    fn test_empty_condition_renders_nothing() {
        let (clause, params) = render(&Condition::None);
        assert_eq!(clause, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_equality_leaf() {
        let (clause, params) = render(&Condition::eq("id", json!(12)));
        assert_eq!(clause, " WHERE \"id\" = ?");
        assert_eq!(params, vec![SqlParam::Int(12)]);
    }

    #[test]
    fn test_in_list_one_placeholder_per_element() {
        let (clause, params) =
            render(&Condition::in_list("id", vec![json!(1), json!(2), json!(3)]));
        assert_eq!(clause, " WHERE \"id\" IN (?,?,?)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_in_accepts_comma_joined_string() {
        let (clause, params) = render(&Condition::Column {
            column: "id".to_string(),
            operator: Operator::In,
            operand: json!("1, 2"),
        });
        assert_eq!(clause, " WHERE \"id\" IN (?,?)");
        assert_eq!(
            params,
            vec![
                SqlParam::String("1".to_string()),
                SqlParam::String("2".to_string())
            ]
        );
    }

    #[test]
    fn test_empty_in_list_is_rejected() {
        let builder = ConditionsBuilder::new(Driver::MySql);
        let mut params = Vec::new();
        let err = builder
            .where_clause(&table(), &Condition::in_list("id", vec![]), &mut params)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidOperation { .. }));
    }

    #[test]
    fn test_and_or_not_nesting() {
        let condition = Condition::eq("id", json!(1))
            .and(Condition::gt("qty", json!(5)).or(Condition::is_null("qty")))
            .and(Condition::eq("title", json!("A")).not());
        let (clause, params) = render(&condition);
        assert_eq!(
            clause,
            " WHERE (\"id\" = ? AND (\"qty\" > ? OR \"qty\" IS NULL) AND (NOT \"title\" = ?))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_between_two_parameters() {
        let (clause, params) = render(&Condition::between("qty", json!(1), json!(9)));
        assert_eq!(clause, " WHERE \"qty\" BETWEEN ? AND ?");
        assert_eq!(params, vec![SqlParam::Int(1), SqlParam::Int(9)]);
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let (_, params) = render(&Condition::contains("title", "50%_off"));
        assert_eq!(params, vec![SqlParam::String("%50\\%\\_off%".to_string())]);

        let builder = ConditionsBuilder::new(Driver::SqlSrv);
        let mut params = Vec::new();
        builder
            .where_clause(&table(), &Condition::contains("title", "50%"), &mut params)
            .unwrap();
        assert_eq!(params, vec![SqlParam::String("%50[%]%".to_string())]);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let builder = ConditionsBuilder::new(Driver::PgSql);
        let mut params = Vec::new();
        let err = builder
            .where_clause(&table(), &Condition::eq("missing", json!(1)), &mut params)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidOperation { .. }));
    }
}
