//! Structured statement requests.
//!
//! Every DDL/DML shape the engine can build is a variant of [`Statement`]
//! with its own request struct. Requests carry user-supplied identifiers and
//! fragments; the `sql` module turns them into SQL text.

use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// A single statement to build and run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Statement {
    CreateTable(CreateTableRequest),
    DropTable(DropTableRequest),
    AlterTable(AlterTableRequest),
    Insert(InsertRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    JoinSelect(JoinSelectRequest),
    SortSelect(SortSelectRequest),
    RawExec(RawExecRequest),
}

impl Statement {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "create_table",
            Self::DropTable(_) => "drop_table",
            Self::AlterTable(_) => "alter_table",
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::JoinSelect(_) => "join_select",
            Self::SortSelect(_) => "sort_select",
            Self::RawExec(_) => "raw_exec",
        }
    }
}

// =============================================================================
// Create Table
// =============================================================================

/// Column constraint vocabulary accepted from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "NOT NULL")]
    NotNull,
    #[serde(rename = "NULL")]
    Null,
    #[serde(rename = "DEFAULT")]
    Default,
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "PRIMARY KEY")]
    PrimaryKey,
    #[serde(rename = "AUTO_INCREMENT", alias = "AUTOINCREMENT")]
    AutoIncrement,
    #[serde(rename = "FOREIGN KEY")]
    ForeignKey,
    #[serde(rename = "CHECK")]
    Check,
    #[serde(rename = "ON UPDATE")]
    OnUpdate,
    #[serde(rename = "COMMENT")]
    Comment,
    #[serde(rename = "COLLATION", alias = "COLLATE")]
    Collation,
    #[serde(rename = "CHARACTER SET", alias = "CHARSET")]
    CharacterSet,
}

impl ConstraintKind {
    /// Emission order of column-level fragments. FOREIGN KEY is table-level.
    pub const EMISSION_ORDER: [ConstraintKind; 11] = [
        Self::NotNull,
        Self::Null,
        Self::Default,
        Self::Unique,
        Self::PrimaryKey,
        Self::AutoIncrement,
        Self::Check,
        Self::OnUpdate,
        Self::Comment,
        Self::Collation,
        Self::CharacterSet,
    ];
}

impl FromStr for ConstraintKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase()
            .replace('_', " ");
        match token.as_str() {
            "NOT NULL" => Ok(Self::NotNull),
            "NULL" => Ok(Self::Null),
            "DEFAULT" => Ok(Self::Default),
            "UNIQUE" => Ok(Self::Unique),
            "PRIMARY KEY" => Ok(Self::PrimaryKey),
            "AUTO INCREMENT" | "AUTOINCREMENT" => Ok(Self::AutoIncrement),
            "FOREIGN KEY" => Ok(Self::ForeignKey),
            "CHECK" => Ok(Self::Check),
            "ON UPDATE" => Ok(Self::OnUpdate),
            "COMMENT" => Ok(Self::Comment),
            "COLLATION" | "COLLATE" => Ok(Self::Collation),
            "CHARACTER SET" | "CHARSET" => Ok(Self::CharacterSet),
            _ => Err(DbError::validation(
                "constraints",
                format!("Unknown constraint '{}'", s.trim()),
            )),
        }
    }
}

/// Referenced table/column of a FOREIGN KEY column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

/// One column of a CREATE TABLE request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub constraints: Vec<ConstraintKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ForeignKeyTarget>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    pub fn with_constraint(mut self, kind: ConstraintKind) -> Self {
        self.constraints.push(kind);
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self.with_constraint(ConstraintKind::Default)
    }

    pub fn with_check(mut self, expression: impl Into<String>) -> Self {
        self.check = Some(expression.into());
        self.with_constraint(ConstraintKind::Check)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self.with_constraint(ConstraintKind::Comment)
    }

    /// Mark the column as a foreign key to `table(column)`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKeyTarget {
            table: table.into(),
            column: column.into(),
        });
        self.with_constraint(ConstraintKind::ForeignKey)
    }

    pub fn has(&self, kind: ConstraintKind) -> bool {
        self.constraints.contains(&kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableRequest {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropTableRequest {
    pub table: String,
}

// =============================================================================
// Alter Table
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlterCommand {
    Add,
    Drop,
    Modify,
    Rename,
}

impl AlterCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Drop => "DROP",
            Self::Modify => "MODIFY",
            Self::Rename => "RENAME",
        }
    }
}

impl FromStr for AlterCommand {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADD" | "ADD COLUMN" => Ok(Self::Add),
            "DROP" | "DROP COLUMN" => Ok(Self::Drop),
            "MODIFY" | "MODIFY COLUMN" | "ALTER" => Ok(Self::Modify),
            "RENAME" | "RENAME COLUMN" => Ok(Self::Rename),
            _ => Err(DbError::validation("command", "Wrong Command")),
        }
    }
}

impl TryFrom<String> for AlterCommand {
    type Error = DbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlterCommand> for String {
    fn from(value: AlterCommand) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlterTableRequest {
    pub table: String,
    pub command: AlterCommand,
    pub column: String,
    /// Required for ADD and MODIFY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Required for RENAME
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
}

// =============================================================================
// Data Manipulation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertRequest {
    pub table: String,
    pub columns: Vec<String>,
    /// One map per row; absent or blank cells are inserted as NULL
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
}

impl InsertRequest {
    /// Build rows from per-column comma-separated value strings, as submitted
    /// by the insert form. Shorter columns are padded with NULL.
    pub fn from_column_values(
        table: impl Into<String>,
        columns: Vec<String>,
        values: &[String],
    ) -> Self {
        let split: Vec<Vec<&str>> = values
            .iter()
            .map(|v| v.split(',').map(str::trim).collect())
            .collect();
        let row_count = split.iter().map(Vec::len).max().unwrap_or(0);

        let rows = (0..row_count)
            .map(|i| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(c, name)| {
                        let cell = split
                            .get(c)
                            .and_then(|vals| vals.get(i))
                            .filter(|v| !v.is_empty())
                            .map(|v| JsonValue::String(v.to_string()))
                            .unwrap_or(JsonValue::Null);
                        (name.clone(), cell)
                    })
                    .collect()
            })
            .collect();

        Self {
            table: table.into(),
            columns,
            rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnValue {
    pub column: String,
    pub value: JsonValue,
}

impl ColumnValue {
    pub fn new(column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub table: String,
    pub set: Vec<ColumnValue>,
    /// Single equality condition selecting the rows to update
    #[serde(rename = "where")]
    pub condition: ColumnValue,
}

/// Parallel condition lists as submitted by the filter form.
///
/// `logical_operators` interleave the leaves left to right, so there is
/// exactly one fewer connector than leaves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionSet {
    pub columns: Vec<String>,
    pub operators: Vec<String>,
    pub values: Vec<String>,
    #[serde(default)]
    pub logical_operators: Vec<String>,
}

impl ConditionSet {
    /// A set holding one leaf predicate.
    pub fn single(column: &str, operator: &str, value: &str) -> Self {
        Self::default().push(None, column, operator, value)
    }

    /// Append a leaf; `connector` joins it to the previous leaf.
    pub fn push(mut self, connector: Option<&str>, column: &str, operator: &str, value: &str) -> Self {
        if let Some(c) = connector {
            self.logical_operators.push(c.to_string());
        }
        self.columns.push(column.to_string());
        self.operators.push(operator.to_string());
        self.values.push(value.to_string());
        self
    }

    pub fn and(self, column: &str, operator: &str, value: &str) -> Self {
        self.push(Some("AND"), column, operator, value)
    }

    pub fn or(self, column: &str, operator: &str, value: &str) -> Self {
        self.push(Some("OR"), column, operator, value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub table: String,
    pub conditions: ConditionSet,
}

// =============================================================================
// Selects
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

impl FromStr for JoinType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let word = upper.strip_suffix(" JOIN").unwrap_or(&upper).trim();
        match word {
            "INNER" | "" => Ok(Self::Inner),
            "LEFT" | "LEFT OUTER" => Ok(Self::Left),
            "RIGHT" | "RIGHT OUTER" => Ok(Self::Right),
            "FULL" | "FULL OUTER" => Ok(Self::Full),
            "CROSS" => Ok(Self::Cross),
            _ => Err(DbError::validation(
                "join_type",
                format!("Unknown join type '{}'", s.trim()),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    /// ON condition; ignored for CROSS joins
    #[serde(default)]
    pub on: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSelectRequest {
    pub base_table: String,
    /// Empty selects every column
    #[serde(default)]
    pub columns: Vec<String>,
    pub joins: Vec<JoinClause>,
    /// Conditions joined with AND
    #[serde(default)]
    pub where_conditions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" | "ASCENDING" | "" => Ok(Self::Asc),
            "DESC" | "DESCENDING" => Ok(Self::Desc),
            _ => Err(DbError::validation(
                "direction",
                format!("Unknown sort direction '{}'", s.trim()),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSelectRequest {
    pub table: String,
    #[serde(default)]
    pub columns: Vec<String>,
    pub order_by: Vec<SortKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExecRequest {
    pub sql: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_kind_from_tokens() {
        assert_eq!(
            "not null".parse::<ConstraintKind>().unwrap(),
            ConstraintKind::NotNull
        );
        assert_eq!(
            "AUTO_INCREMENT".parse::<ConstraintKind>().unwrap(),
            ConstraintKind::AutoIncrement
        );
        assert_eq!(
            " primary   key ".parse::<ConstraintKind>().unwrap(),
            ConstraintKind::PrimaryKey
        );
        assert_eq!(
            "COLLATE".parse::<ConstraintKind>().unwrap(),
            ConstraintKind::Collation
        );
        assert!("SPARSE".parse::<ConstraintKind>().is_err());
    }

    #[test]
    fn test_constraint_kind_serde_tokens() {
        let kinds: Vec<ConstraintKind> =
            serde_json::from_str(r#"["PRIMARY KEY", "AUTO_INCREMENT", "COLLATE"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::PrimaryKey,
                ConstraintKind::AutoIncrement,
                ConstraintKind::Collation
            ]
        );
    }

    #[test]
    fn test_alter_command_rejects_unknown_token() {
        assert_eq!("modify".parse::<AlterCommand>().unwrap(), AlterCommand::Modify);
        let err = "TRUNCATE".parse::<AlterCommand>().unwrap_err();
        assert_eq!(err.to_string(), "Wrong Command");

        let parsed: Result<AlterTableRequest, _> = serde_json::from_str(
            r#"{"table": "t", "command": "TRUNCATE", "column": "c"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_statement_is_tagged_by_op() {
        let statement: Statement =
            serde_json::from_str(r#"{"op": "drop_table", "table": "orders"}"#).unwrap();
        assert!(matches!(statement, Statement::DropTable(ref r) if r.table == "orders"));
        assert_eq!(statement.kind(), "drop_table");
    }

    #[test]
    fn test_insert_from_column_values_pads_with_null() {
        let request = InsertRequest::from_column_values(
            "people",
            vec!["name".to_string(), "age".to_string()],
            &["Ada, Alan, Grace".to_string(), "36,41".to_string()],
        );
        assert_eq!(request.rows.len(), 3);
        assert_eq!(request.rows[0]["name"], "Ada");
        assert_eq!(request.rows[1]["age"], "41");
        assert!(request.rows[2]["age"].is_null());
    }

    #[test]
    fn test_join_type_and_direction_parse() {
        assert_eq!("left join".parse::<JoinType>().unwrap(), JoinType::Left);
        assert_eq!("FULL OUTER".parse::<JoinType>().unwrap(), JoinType::Full);
        assert!("sideways".parse::<JoinType>().is_err());
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
    }

    #[test]
    fn test_condition_set_builder() {
        let set = ConditionSet::single("a", "=", "1").and("b", "IS NULL", "");
        assert_eq!(set.columns, vec!["a", "b"]);
        assert_eq!(set.logical_operators, vec!["AND"]);
    }
}
