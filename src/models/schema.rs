//! Catalog data models.
//!
//! These types describe what the catalog inspector reads back from a live
//! database: columns, indexes, primary keys and foreign keys of one table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Ordered primary-key columns
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Add a column definition.
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key columns.
    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    /// Add an index.
    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    /// Whether `column` belongs to any non-primary unique index.
    pub fn is_unique_member(&self, column: &str) -> bool {
        self.indexes
            .iter()
            .filter(|idx| idx.is_unique && !idx.is_primary)
            .any(|idx| idx.columns.iter().any(|c| c == column))
    }

    /// Whether some index consists of exactly this one column.
    pub fn has_single_column_index(&self, column: &str) -> bool {
        self.indexes
            .iter()
            .any(|idx| idx.columns.len() == 1 && idx.columns[0] == column)
    }

    /// Referenced tables of every foreign key constraining `column`, in order.
    pub fn foreign_key_targets(&self, column: &str) -> Vec<&str> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.columns.iter().any(|c| c == column))
            .map(|fk| fk.referenced_table.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type as reported by the catalog (e.g., `varchar(50)`)
    pub data_type: String,
    pub nullable: bool,
    /// Raw default expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            is_primary_key: false,
        }
    }

    /// Set whether this is a primary key column.
    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

/// A (possibly composite) foreign key of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Constrained columns, in constraint order
    pub columns: Vec<String>,
    pub referenced_table: String,
    /// Referenced columns, parallel to `columns`
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Create a new foreign key.
    pub fn new(
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: None,
            columns,
            referenced_table: referenced_table.into(),
            referenced_columns,
        }
    }

    /// Single-column convenience constructor.
    pub fn single(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self::new(
            vec![column.into()],
            referenced_table,
            vec![referenced_column.into()],
        )
    }

    /// Set the constraint name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    /// Ordered index columns
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

impl IndexInfo {
    /// Create a new index info.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
            is_primary: false,
        }
    }

    /// Set whether this is a unique index.
    pub fn with_unique(mut self, is_unique: bool) -> Self {
        self.is_unique = is_unique;
        self
    }

    /// Set whether this is the primary key index.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        if is_primary {
            self.is_unique = true;
        }
        self
    }
}
