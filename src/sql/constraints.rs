//! Column constraint assembly.
//!
//! Expands a [`ColumnSpec`] into its column definition. Fragments are emitted
//! in [`ConstraintKind::EMISSION_ORDER`], whatever order the caller listed
//! them in; FOREIGN KEY never appears inline and becomes a table-level
//! fragment instead.

use crate::error::{DbError, DbResult};
use crate::models::{ColumnSpec, ConstraintKind, DatabaseType, ForeignKeyTarget};
use crate::sql::dialect::{auto_increment_keyword, quote_literal};

/// Render `name type [constraints...]` for one column.
pub fn column_definition(spec: &ColumnSpec, db: DatabaseType) -> DbResult<String> {
    let name = spec.name.trim();
    let data_type = spec.data_type.trim();
    if name.is_empty() {
        return Err(DbError::validation("name", "Undefined Column Name"));
    }
    if data_type.is_empty() {
        return Err(DbError::validation(
            "data_type",
            format!("Undefined Column Type for column {}", name),
        ));
    }
    if spec.has(ConstraintKind::Null) && spec.has(ConstraintKind::NotNull) {
        return Err(DbError::validation(
            "constraints",
            format!("Column {} cannot be both NULL and NOT NULL", name),
        ));
    }

    let mut parts = vec![name.to_string(), data_type.to_string()];
    for kind in ConstraintKind::EMISSION_ORDER {
        if !spec.has(kind) {
            continue;
        }
        if let Some(fragment) = fragment(spec, kind, db) {
            parts.push(fragment);
        }
    }
    Ok(parts.join(" "))
}

/// One constraint fragment; `None` for a value constraint with a blank value.
fn fragment(spec: &ColumnSpec, kind: ConstraintKind, db: DatabaseType) -> Option<String> {
    let value = |v: &Option<String>| -> Option<String> {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match kind {
        ConstraintKind::NotNull => Some("NOT NULL".to_string()),
        ConstraintKind::Null => Some("NULL".to_string()),
        ConstraintKind::Unique => Some("UNIQUE".to_string()),
        ConstraintKind::PrimaryKey => Some("PRIMARY KEY".to_string()),
        ConstraintKind::AutoIncrement => Some(auto_increment_keyword(db).to_string()),
        ConstraintKind::Default => value(&spec.default_value).map(|v| format!("DEFAULT {}", v)),
        ConstraintKind::Check => value(&spec.check).map(|v| format!("CHECK ({})", v)),
        ConstraintKind::OnUpdate => value(&spec.on_update).map(|v| format!("ON UPDATE {}", v)),
        ConstraintKind::Comment => {
            value(&spec.comment).map(|v| format!("COMMENT {}", quote_literal(&v)))
        }
        ConstraintKind::Collation => value(&spec.collation).map(|v| format!("COLLATE {}", v)),
        ConstraintKind::CharacterSet => {
            value(&spec.character_set).map(|v| format!("CHARACTER SET {}", v))
        }
        ConstraintKind::ForeignKey => None,
    }
}

/// The referenced table/column of a FOREIGN KEY column.
///
/// Returns `Ok(None)` for columns without the constraint, and a reference
/// error when the constraint is present but the target is incomplete.
pub fn foreign_key_target(spec: &ColumnSpec) -> DbResult<Option<&ForeignKeyTarget>> {
    if !spec.has(ConstraintKind::ForeignKey) {
        return Ok(None);
    }
    match &spec.references {
        Some(target) if !target.table.trim().is_empty() && !target.column.trim().is_empty() => {
            Ok(Some(target))
        }
        _ => Err(DbError::reference(
            spec.references
                .as_ref()
                .map(|t| t.table.clone())
                .unwrap_or_default(),
            Some(spec.name.as_str()),
            format!("Undefined foreign key reference for column {}", spec.name.trim()),
        )),
    }
}

/// Table-level foreign key clause.
pub fn foreign_key_fragment(column: &str, target: &ForeignKeyTarget) -> String {
    format!(
        "FOREIGN KEY ({}) REFERENCES {}({})",
        column.trim(),
        target.table.trim(),
        target.column.trim()
    )
}
