//! Statement rendering.
//!
//! Pure functions from request structs to SQL text. Nothing here touches a
//! connection; catalog lookups (foreign-key targets, PostgreSQL column types)
//! are done by the caller and passed in.

use std::collections::HashMap;

use crate::error::{DbError, DbResult};
use crate::models::{
    AlterCommand, AlterTableRequest, CreateTableRequest, DatabaseType, DeleteRequest,
    DropTableRequest, InsertRequest, JoinSelectRequest, JoinType, QueryParam, SortSelectRequest,
    UpdateRequest,
};
use crate::sql::conditions::assemble_conditions;
use crate::sql::constraints::{column_definition, foreign_key_fragment, foreign_key_target};
use crate::sql::dialect::{modify_column_clause, placeholder};

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltStatement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl BuiltStatement {
    /// A statement without bound values.
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

/// Declared column types, keyed by column name. Used for PostgreSQL casts.
pub type ColumnTypes = HashMap<String, String>;

fn require_table(table: &str) -> DbResult<&str> {
    let table = table.trim();
    if table.is_empty() {
        return Err(DbError::validation("table", "Undefined Table Name"));
    }
    Ok(table)
}

fn select_list(columns: &[String]) -> String {
    let cols: Vec<&str> = columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if cols.is_empty() {
        "*".to_string()
    } else {
        cols.join(", ")
    }
}

/// Appends placeholders to a statement, numbering them for PostgreSQL.
struct Binder<'a> {
    db: DatabaseType,
    types: &'a ColumnTypes,
    params: Vec<QueryParam>,
}

impl<'a> Binder<'a> {
    fn new(db: DatabaseType, types: &'a ColumnTypes) -> Self {
        Self {
            db,
            types,
            params: Vec::new(),
        }
    }

    /// Placeholder for `value` bound to `column`, or a `NULL` literal.
    fn bind(&mut self, column: &str, value: &serde_json::Value) -> String {
        match QueryParam::from_cell(value) {
            Some(param) => {
                self.params.push(param);
                placeholder(
                    self.db,
                    self.params.len(),
                    self.types.get(column).map(String::as_str),
                )
            }
            None => "NULL".to_string(),
        }
    }
}

/// `CREATE TABLE t (col defs..., fk fragments...)`.
///
/// Foreign-key targets must already have been validated against the catalog.
pub fn create_table_sql(req: &CreateTableRequest, db: DatabaseType) -> DbResult<String> {
    let table = require_table(&req.table)?;
    if req.columns.is_empty() {
        return Err(DbError::validation("columns", "Undefined Table Columns"));
    }

    let mut fragments = Vec::with_capacity(req.columns.len());
    let mut foreign_keys = Vec::new();
    for spec in &req.columns {
        fragments.push(column_definition(spec, db)?);
        if let Some(target) = foreign_key_target(spec)? {
            foreign_keys.push(foreign_key_fragment(&spec.name, target));
        }
    }
    fragments.extend(foreign_keys);

    Ok(format!("CREATE TABLE {} ({})", table, fragments.join(", ")))
}

pub fn drop_table_sql(req: &DropTableRequest) -> DbResult<String> {
    Ok(format!("DROP TABLE {}", require_table(&req.table)?))
}

pub fn alter_table_sql(req: &AlterTableRequest, db: DatabaseType) -> DbResult<String> {
    let table = require_table(&req.table)?;
    let column = req.column.trim();
    if column.is_empty() {
        return Err(DbError::validation("column", "Undefined Column Name"));
    }
    let data_type = || {
        req.data_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                DbError::validation("data_type", format!("Undefined Column Type for column {}", column))
            })
    };

    let clause = match req.command {
        AlterCommand::Add => format!("ADD COLUMN {} {}", column, data_type()?),
        AlterCommand::Drop => format!("DROP COLUMN {}", column),
        AlterCommand::Modify => modify_column_clause(db, column, data_type()?).ok_or_else(|| {
            DbError::validation(
                "command",
                format!("{} cannot change the type of an existing column", db),
            )
        })?,
        AlterCommand::Rename => {
            let new_name = req
                .new_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| DbError::validation("new_name", "Undefined New Column Name"))?;
            format!("RENAME COLUMN {} TO {}", column, new_name)
        }
    };
    Ok(format!("ALTER TABLE {} {}", table, clause))
}

/// One multi-row `INSERT ... VALUES (...), (...)`.
pub fn insert_sql(
    req: &InsertRequest,
    db: DatabaseType,
    types: &ColumnTypes,
) -> DbResult<BuiltStatement> {
    let table = require_table(&req.table)?;
    let columns: Vec<&str> = req.columns.iter().map(|c| c.trim()).collect();
    if columns.is_empty() || columns.iter().any(|c| c.is_empty()) {
        return Err(DbError::validation("columns", "Undefined Insert Columns"));
    }
    if req.rows.is_empty() {
        return Err(DbError::validation("rows", "No Rows to Insert"));
    }

    let mut binder = Binder::new(db, types);
    let null = serde_json::Value::Null;
    let tuples: Vec<String> = req
        .rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = columns
                .iter()
                .map(|col| binder.bind(col, row.get(*col).unwrap_or(&null)))
                .collect();
            format!("({})", cells.join(", "))
        })
        .collect();

    Ok(BuiltStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.join(", "),
            tuples.join(", ")
        ),
        params: binder.params,
    })
}

/// `UPDATE t SET ... WHERE col = ?`; a null condition value matches with `IS NULL`.
pub fn update_sql(
    req: &UpdateRequest,
    db: DatabaseType,
    types: &ColumnTypes,
) -> DbResult<BuiltStatement> {
    let table = require_table(&req.table)?;
    if req.set.is_empty() {
        return Err(DbError::validation("set", "Undefined Update Columns"));
    }
    let where_column = req.condition.column.trim();
    if where_column.is_empty() {
        return Err(DbError::validation("where", "Undefined Condition Column"));
    }

    let mut binder = Binder::new(db, types);
    let mut assignments = Vec::with_capacity(req.set.len());
    for item in &req.set {
        let column = item.column.trim();
        if column.is_empty() {
            return Err(DbError::validation("set", "Undefined Column Name"));
        }
        assignments.push(format!("{} = {}", column, binder.bind(column, &item.value)));
    }

    let predicate = match binder.bind(where_column, &req.condition.value).as_str() {
        "NULL" => format!("{} IS NULL", where_column),
        ph => format!("{} = {}", where_column, ph),
    };

    Ok(BuiltStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            assignments.join(", "),
            predicate
        ),
        params: binder.params,
    })
}

pub fn delete_sql(req: &DeleteRequest) -> DbResult<String> {
    let table = require_table(&req.table)?;
    let predicate = assemble_conditions(&req.conditions)?;
    Ok(format!("DELETE FROM {} WHERE {}", table, predicate))
}

pub fn join_select_sql(req: &JoinSelectRequest) -> DbResult<String> {
    let base = require_table(&req.base_table)?;
    if req.joins.is_empty() {
        return Err(DbError::validation("joins", "Undefined Join Tables"));
    }

    let mut sql = format!("SELECT {} FROM {}", select_list(&req.columns), base);
    for join in &req.joins {
        let table = join.table.trim();
        if table.is_empty() {
            return Err(DbError::validation("joins", "Undefined Join Table"));
        }
        sql.push(' ');
        sql.push_str(join.join_type.keyword());
        sql.push(' ');
        sql.push_str(table);
        if join.join_type != JoinType::Cross {
            let on = join.on.trim();
            if on.is_empty() {
                return Err(DbError::validation(
                    "on",
                    format!("Undefined Join Condition for table {}", table),
                ));
            }
            sql.push_str(" ON ");
            sql.push_str(on);
        }
    }

    let conditions: Vec<&str> = req
        .where_conditions
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    Ok(sql)
}

pub fn sort_select_sql(req: &SortSelectRequest) -> DbResult<String> {
    let table = require_table(&req.table)?;
    if req.order_by.is_empty() {
        return Err(DbError::validation("order_by", "Undefined Sort Columns"));
    }
    let mut keys = Vec::with_capacity(req.order_by.len());
    for key in &req.order_by {
        let column = key.column.trim();
        if column.is_empty() {
            return Err(DbError::validation("order_by", "Undefined Sort Column"));
        }
        keys.push(format!("{} {}", column, key.direction.keyword()));
    }
    Ok(format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_list(&req.columns),
        table,
        keys.join(", ")
    ))
}
