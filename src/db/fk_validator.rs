//! Foreign-key target validation.
//!
//! A column may be referenced by a foreign key only if the database can find
//! its rows through a key: it must belong to the primary key, be the sole
//! column of some index, or belong to a unique index.

use crate::db::catalog::CatalogInspector;
use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::TableSchema;
use tracing::debug;

/// Decide whether `column` of `schema` is a legal foreign-key target.
///
/// Returns the rejection reason on failure.
pub fn check_reference_target(schema: &TableSchema, column: &str) -> Result<(), String> {
    let keyed = schema.column(column).is_some()
        && (schema.is_primary_key(column)
            || schema.has_single_column_index(column)
            || schema
                .indexes
                .iter()
                .any(|idx| idx.is_unique && idx.columns.iter().any(|c| c == column)));

    if keyed {
        Ok(())
    } else {
        Err(format!(
            "Referenced column '{}' in table '{}' lacks an index, unique key, or primary key",
            column, schema.table_name
        ))
    }
}

/// Validates foreign-key targets against the live catalog.
pub struct ForeignKeyValidator;

impl ForeignKeyValidator {
    /// Check that `table.column` exists and is keyed.
    pub async fn validate(pool: &DbPool, table: &str, column: &str) -> DbResult<()> {
        if !CatalogInspector::table_exists(pool, table).await? {
            return Err(DbError::reference(
                table,
                Some(column),
                format!("Referenced table '{}' does not exist", table),
            ));
        }

        let schema = CatalogInspector::describe_table(pool, table).await?;
        check_reference_target(&schema, column)
            .map_err(|reason| DbError::reference(table, Some(column), reason))?;

        debug!(table = %table, column = %column, "Foreign key target accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnDefinition, IndexInfo};

    fn products() -> TableSchema {
        TableSchema::new("products")
            .with_column(ColumnDefinition::new("id", "integer", false).with_primary_key(true))
            .with_column(ColumnDefinition::new("sku", "varchar(20)", false))
            .with_column(ColumnDefinition::new("region", "varchar(10)", false))
            .with_column(ColumnDefinition::new("vendor", "integer", true))
            .with_column(ColumnDefinition::new("label", "text", true))
            .with_primary_key(vec!["id".to_string()])
            .with_index(
                IndexInfo::new("products_sku_region", vec!["sku".to_string(), "region".to_string()])
                    .with_unique(true),
            )
            .with_index(IndexInfo::new("products_vendor", vec!["vendor".to_string()]))
    }

    #[test]
    fn test_primary_key_is_valid_target() {
        assert!(check_reference_target(&products(), "id").is_ok());
    }

    #[test]
    fn test_unique_index_member_is_valid_target() {
        assert!(check_reference_target(&products(), "sku").is_ok());
        assert!(check_reference_target(&products(), "region").is_ok());
    }

    #[test]
    fn test_single_column_index_is_valid_target() {
        assert!(check_reference_target(&products(), "vendor").is_ok());
    }

    #[test]
    fn test_unkeyed_column_rejected() {
        let reason = check_reference_target(&products(), "label").unwrap_err();
        assert_eq!(
            reason,
            "Referenced column 'label' in table 'products' lacks an index, unique key, or primary key"
        );
    }

    #[test]
    fn test_missing_column_rejected() {
        assert!(check_reference_target(&products(), "ghost").is_err());
    }
}
