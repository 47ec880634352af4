//! Predicate assembly from parallel condition lists.
//!
//! Leaves are rendered per operator and joined left to right with the
//! supplied AND/OR connectors. Operand text is templated verbatim: predicates
//! are SQL fragments by contract.

use crate::error::{DbError, DbResult};
use crate::models::ConditionSet;

/// Operators accepted in a leaf, after normalization.
const COMPARISON_OPERATORS: &[&str] = &["=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator<'a> {
    Comparison(&'a str),
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl<'a> Operator<'a> {
    fn parse(normalized: &'a str) -> Option<Self> {
        match normalized {
            "BETWEEN" => Some(Self::Between),
            "IN" => Some(Self::In),
            "NOT IN" => Some(Self::NotIn),
            "IS NULL" => Some(Self::IsNull),
            "IS NOT NULL" => Some(Self::IsNotNull),
            op if COMPARISON_OPERATORS.contains(&op) => Some(Self::Comparison(op)),
            _ => None,
        }
    }

    fn takes_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

/// Uppercase and collapse internal whitespace: `" is  not null "` -> `"IS NOT NULL"`.
fn normalize_operator(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render one leaf predicate.
pub fn render_leaf(column: &str, operator: &str, value: &str) -> DbResult<String> {
    let column = column.trim();
    if column.is_empty() {
        return Err(DbError::validation("columns", "Undefined Condition Column"));
    }

    let normalized = normalize_operator(operator);
    let op = Operator::parse(&normalized).ok_or_else(|| {
        DbError::validation(
            "operators",
            format!("Unsupported operator '{}' for column {}", operator.trim(), column),
        )
    })?;

    let value = value.trim();
    if op.takes_value() && value.is_empty() {
        return Err(DbError::validation(
            "values",
            format!("Missing value for column {}", column),
        ));
    }

    let rendered = match op {
        Operator::Comparison(sym) => format!("{} {} {}", column, sym, value),
        Operator::Between => {
            let bounds = split_between(value).ok_or_else(|| {
                DbError::validation(
                    "values",
                    format!("BETWEEN for column {} expects '<low> AND <high>'", column),
                )
            })?;
            format!("{} BETWEEN {} AND {}", column, bounds.0, bounds.1)
        }
        Operator::In | Operator::NotIn => {
            let items: Vec<&str> = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            let keyword = if op == Operator::In { "IN" } else { "NOT IN" };
            format!("{} {} ({})", column, keyword, items.join(", "))
        }
        Operator::IsNull => format!("{} IS NULL", column),
        Operator::IsNotNull => format!("{} IS NOT NULL", column),
    };
    Ok(rendered)
}

/// Split `"18 and 30"` into `("18", "30")`. The separator is a standalone
/// `AND` token in any case.
fn split_between(value: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let pos = tokens.iter().position(|t| t.eq_ignore_ascii_case("and"))?;
    let low = tokens[..pos].join(" ");
    let high = tokens[pos + 1..].join(" ");
    if low.is_empty() || high.is_empty() {
        return None;
    }
    Some((low, high))
}

/// Combine every leaf of `set` into one predicate.
pub fn assemble_conditions(set: &ConditionSet) -> DbResult<String> {
    let leaves = set.columns.len();
    if set.operators.len() != leaves || set.values.len() != leaves {
        return Err(DbError::validation(
            "conditions",
            format!(
                "Condition lists differ in length: {} columns, {} operators, {} values",
                leaves,
                set.operators.len(),
                set.values.len()
            ),
        ));
    }
    if leaves == 0 {
        return Err(DbError::validation("conditions", "Undefined Conditions"));
    }
    if set.logical_operators.len() != leaves - 1 {
        return Err(DbError::validation(
            "logical_operators",
            format!(
                "Expected {} logical operators, got {}",
                leaves - 1,
                set.logical_operators.len()
            ),
        ));
    }

    let mut predicate = String::new();
    for (i, ((column, operator), value)) in set
        .columns
        .iter()
        .zip(&set.operators)
        .zip(&set.values)
        .enumerate()
    {
        if i > 0 {
            let connector = set.logical_operators[i - 1].trim().to_ascii_uppercase();
            if connector != "AND" && connector != "OR" {
                return Err(DbError::validation(
                    "logical_operators",
                    format!("Unknown logical operator '{}'", set.logical_operators[i - 1].trim()),
                ));
            }
            predicate.push(' ');
            predicate.push_str(&connector);
            predicate.push(' ');
        }
        predicate.push_str(&render_leaf(column, operator, value)?);
    }
    Ok(predicate)
}
