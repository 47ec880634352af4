//! Catalog inspection.
//!
//! Read-only queries over the live catalog of the connected database:
//! base tables, columns, indexes, primary key and foreign keys.
//!
//! SQL lives in the `queries` submodule; each dialect has its own
//! implementation submodule exposing the same functions. PostgreSQL reads the
//! current schema, MySQL the current database.

use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, ForeignKey, IndexInfo, TableSchema};
use tracing::debug;

/// Catalog inspector for the connected database.
pub struct CatalogInspector;

impl CatalogInspector {
    /// List base tables, sorted by name.
    pub async fn list_tables(pool: &DbPool) -> DbResult<Vec<String>> {
        let tables = match pool {
            DbPool::Postgres(p) => postgres::list_tables(p).await?,
            DbPool::MySql(p) => mysql::list_tables(p).await?,
            DbPool::SQLite(p) => sqlite::list_tables(p).await?,
        };
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    pub async fn table_exists(pool: &DbPool, table: &str) -> DbResult<bool> {
        match pool {
            DbPool::Postgres(p) => postgres::table_exists(p, table).await,
            DbPool::MySql(p) => mysql::table_exists(p, table).await,
            DbPool::SQLite(p) => sqlite::table_exists(p, table).await,
        }
    }

    /// Columns in declaration order.
    pub async fn columns(pool: &DbPool, table: &str) -> DbResult<Vec<ColumnDefinition>> {
        match pool {
            DbPool::Postgres(p) => postgres::columns(p, table).await,
            DbPool::MySql(p) => mysql::columns(p, table).await,
            DbPool::SQLite(p) => sqlite::columns(p, table).await,
        }
    }

    /// Indexes, including the one backing the primary key where the database
    /// keeps one.
    pub async fn indexes(pool: &DbPool, table: &str) -> DbResult<Vec<IndexInfo>> {
        match pool {
            DbPool::Postgres(p) => postgres::indexes(p, table).await,
            DbPool::MySql(p) => mysql::indexes(p, table).await,
            DbPool::SQLite(p) => sqlite::indexes(p, table).await,
        }
    }

    /// Ordered primary-key columns; empty when the table has none.
    pub async fn primary_key(pool: &DbPool, table: &str) -> DbResult<Vec<String>> {
        match pool {
            DbPool::Postgres(p) => postgres::primary_key(p, table).await,
            DbPool::MySql(p) => mysql::primary_key(p, table).await,
            DbPool::SQLite(p) => sqlite::primary_key(p, table).await,
        }
    }

    /// Foreign keys, one entry per constraint with column order preserved.
    pub async fn foreign_keys(pool: &DbPool, table: &str) -> DbResult<Vec<ForeignKey>> {
        match pool {
            DbPool::Postgres(p) => postgres::foreign_keys(p, table).await,
            DbPool::MySql(p) => mysql::foreign_keys(p, table).await,
            DbPool::SQLite(p) => sqlite::foreign_keys(p, table).await,
        }
    }

    /// Everything the catalog knows about one table.
    pub async fn describe_table(pool: &DbPool, table: &str) -> DbResult<TableSchema> {
        if !Self::table_exists(pool, table).await? {
            return Err(DbError::reference(
                table,
                None,
                format!("Table '{}' does not exist", table),
            ));
        }

        let primary_key = Self::primary_key(pool, table).await?;
        let columns = Self::columns(pool, table)
            .await?
            .into_iter()
            .map(|c| {
                let is_pk = primary_key.contains(&c.name);
                c.with_primary_key(is_pk)
            })
            .collect();
        let indexes = Self::indexes(pool, table).await?;
        let foreign_keys = Self::foreign_keys(pool, table).await?;

        debug!(table = %table, "Described table");
        Ok(TableSchema {
            table_name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }
}

/// Fold (constraint, column, referenced table, referenced column) rows,
/// ordered by constraint then position, into one foreign key per constraint.
fn group_foreign_keys(rows: Vec<(String, String, String, String)>) -> Vec<ForeignKey> {
    let mut keys: Vec<ForeignKey> = Vec::new();
    for (name, column, ref_table, ref_column) in rows {
        match keys.last_mut() {
            Some(fk) if fk.name.as_deref() == Some(name.as_str()) => {
                fk.columns.push(column);
                fk.referenced_columns.push(ref_column);
            }
            _ => keys.push(ForeignKey::single(column, ref_table, ref_column).with_name(name)),
        }
    }
    keys
}

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const TABLE_EXISTS: &str = r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema()
                AND table_type = 'BASE TABLE'
                AND table_name = $1
            ) AS present
            "#;

        pub const COLUMNS: &str = r#"
            SELECT
                a.attname::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS column_type,
                NOT a.attnotnull AS is_nullable,
                pg_get_expr(d.adbin, d.adrelid) AS column_default
            FROM pg_attribute a
            JOIN pg_class t ON t.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE t.relname = $1
            AND n.nspname = current_schema()
            AND a.attnum > 0
            AND NOT a.attisdropped
            ORDER BY a.attnum
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT a.attname::text AS column_name
            FROM pg_index ix
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE t.relname = $1
            AND n.nspname = current_schema()
            AND ix.indisprimary
            ORDER BY k.ord
            "#;

        pub const INDEXES: &str = r#"
            SELECT
                i.relname::text AS index_name,
                array_agg(a.attname::text ORDER BY k.ord) AS column_names,
                ix.indisunique AS is_unique,
                ix.indisprimary AS is_primary
            FROM pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE t.relname = $1
            AND n.nspname = current_schema()
            GROUP BY i.relname, ix.indisunique, ix.indisprimary
            ORDER BY i.relname
            "#;

        pub const FOREIGN_KEYS: &str = r#"
            SELECT
                con.conname::text AS constraint_name,
                src.attname::text AS column_name,
                ref.relname::text AS referenced_table,
                dst.attname::text AS referenced_column
            FROM pg_constraint con
            JOIN pg_class t ON t.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_class ref ON ref.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(src_num, dst_num, ord)
            JOIN pg_attribute src ON src.attrelid = con.conrelid AND src.attnum = k.src_num
            JOIN pg_attribute dst ON dst.attrelid = con.confrelid AND dst.attnum = k.dst_num
            WHERE con.contype = 'f'
            AND t.relname = $1
            AND n.nspname = current_schema()
            ORDER BY con.conname, k.ord
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const TABLE_EXISTS: &str = r#"
            SELECT COUNT(*) AS PRESENT
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            AND TABLE_NAME = ?
            "#;

        pub const COLUMNS: &str = r#"
            SELECT
                CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
                CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
                CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#;

        pub const PRIMARY_KEY: &str = r#"
            SELECT CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_NAME = ?
            AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
            "#;

        pub const INDEXES: &str = r#"
            SELECT
                CONVERT(INDEX_NAME USING utf8mb4) AS INDEX_NAME,
                CONVERT(GROUP_CONCAT(COLUMN_NAME ORDER BY SEQ_IN_INDEX SEPARATOR ',') USING utf8mb4)
                    AS COLUMN_NAMES,
                CAST(MIN(NON_UNIQUE) = 0 AS SIGNED) AS IS_UNIQUE
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            GROUP BY INDEX_NAME
            ORDER BY INDEX_NAME
            "#;

        pub const FOREIGN_KEYS: &str = r#"
            SELECT
                CONVERT(CONSTRAINT_NAME USING utf8mb4) AS CONSTRAINT_NAME,
                CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
                CONVERT(REFERENCED_TABLE_NAME USING utf8mb4) AS REFERENCED_TABLE_NAME,
                CONVERT(REFERENCED_COLUMN_NAME USING utf8mb4) AS REFERENCED_COLUMN_NAME
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_NAME = ?
            AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const TABLE_EXISTS: &str = r#"
            SELECT COUNT(*) AS present FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            AND name = ?1
            "#;

        pub const COLUMNS: &str = r#"
            SELECT name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#;

        pub const INDEX_LIST: &str = r#"
            SELECT name, "unique", origin FROM pragma_index_list(?1)
            "#;

        pub const INDEX_COLUMNS: &str = r#"
            SELECT name FROM pragma_index_info(?1) ORDER BY seqno
            "#;

        pub const FOREIGN_KEYS: &str = r#"
            SELECT id, seq, "table", "from", "to"
            FROM pragma_foreign_key_list(?1)
            ORDER BY id DESC, seq
            "#;
    }
}

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("table_name")).collect())
    }

    pub async fn table_exists(pool: &PgPool, table: &str) -> DbResult<bool> {
        let present: bool = sqlx::query_scalar(queries::postgres::TABLE_EXISTS)
            .bind(table)
            .fetch_one(pool)
            .await?;
        Ok(present)
    }

    pub async fn columns(pool: &PgPool, table: &str) -> DbResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::postgres::COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let column_type: String = row.get("column_type");
                let nullable: bool = row.get("is_nullable");
                let default_value: Option<String> = row.try_get("column_default").ok().flatten();

                let col = ColumnDefinition::new(name, column_type, nullable);
                match default_value {
                    Some(def) => col.with_default(def),
                    None => col,
                }
            })
            .collect())
    }

    pub async fn primary_key(pool: &PgPool, table: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::PRIMARY_KEY)
            .bind(table)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("column_name")).collect())
    }

    pub async fn indexes(pool: &PgPool, table: &str) -> DbResult<Vec<IndexInfo>> {
        let rows = sqlx::query(queries::postgres::INDEXES)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name: String = row.get("index_name");
                let columns: Vec<String> = row.get("column_names");
                let is_unique: bool = row.get("is_unique");
                let is_primary: bool = row.get("is_primary");

                if columns.is_empty() {
                    return None;
                }
                Some(
                    IndexInfo::new(name, columns)
                        .with_unique(is_unique)
                        .with_primary(is_primary),
                )
            })
            .collect())
    }

    pub async fn foreign_keys(pool: &PgPool, table: &str) -> DbResult<Vec<ForeignKey>> {
        let rows = sqlx::query(queries::postgres::FOREIGN_KEYS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(group_foreign_keys(
            rows.iter()
                .map(|row| {
                    (
                        row.get("constraint_name"),
                        row.get("column_name"),
                        row.get("referenced_table"),
                        row.get("referenced_column"),
                    )
                })
                .collect(),
        ))
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{MySqlPool, Row};

    /// MySQL may report information_schema text as VARBINARY depending on
    /// server charset configuration.
    fn get_string(row: &MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    pub async fn list_tables(pool: &MySqlPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect())
    }

    pub async fn table_exists(pool: &MySqlPool, table: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(queries::mysql::TABLE_EXISTS)
            .bind(table)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn columns(pool: &MySqlPool, table: &str) -> DbResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::mysql::COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "COLUMN_NAME");
                let column_type = get_string(row, "COLUMN_TYPE");
                let nullable = get_string(row, "IS_NULLABLE") == "YES";

                let col = ColumnDefinition::new(name, column_type, nullable);
                match get_optional_string(row, "COLUMN_DEFAULT") {
                    Some(def) => col.with_default(def),
                    None => col,
                }
            })
            .collect())
    }

    pub async fn primary_key(pool: &MySqlPool, table: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::PRIMARY_KEY)
            .bind(table)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|row| get_string(row, "COLUMN_NAME")).collect())
    }

    pub async fn indexes(pool: &MySqlPool, table: &str) -> DbResult<Vec<IndexInfo>> {
        let rows = sqlx::query(queries::mysql::INDEXES)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "INDEX_NAME");
                let columns: Vec<String> = get_string(row, "COLUMN_NAMES")
                    .split(',')
                    .map(str::to_string)
                    .collect();
                let is_unique: i64 = row.try_get("IS_UNIQUE").unwrap_or(0);
                let is_primary = name == "PRIMARY";

                IndexInfo::new(name, columns)
                    .with_unique(is_unique != 0)
                    .with_primary(is_primary)
            })
            .collect())
    }

    pub async fn foreign_keys(pool: &MySqlPool, table: &str) -> DbResult<Vec<ForeignKey>> {
        let rows = sqlx::query(queries::mysql::FOREIGN_KEYS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(group_foreign_keys(
            rows.iter()
                .map(|row| {
                    (
                        get_string(row, "CONSTRAINT_NAME"),
                        get_string(row, "COLUMN_NAME"),
                        get_string(row, "REFERENCED_TABLE_NAME"),
                        get_string(row, "REFERENCED_COLUMN_NAME"),
                    )
                })
                .collect(),
        ))
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn list_tables(pool: &SqlitePool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    pub async fn table_exists(pool: &SqlitePool, table: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(queries::sqlite::TABLE_EXISTS)
            .bind(table)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn columns(pool: &SqlitePool, table: &str) -> DbResult<Vec<ColumnDefinition>> {
        let rows = sqlx::query(queries::sqlite::COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let data_type: String = row.get("type");
                let notnull: i64 = row.get("notnull");
                let pk: i64 = row.get("pk");
                let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();

                // INTEGER PRIMARY KEY aliases rowid and is never NULL
                let rowid_alias = pk > 0 && data_type.eq_ignore_ascii_case("INTEGER");
                let nullable = notnull == 0 && !rowid_alias;
                let col = ColumnDefinition::new(name, data_type, nullable);
                match default_value {
                    Some(def) => col.with_default(def),
                    None => col,
                }
            })
            .collect())
    }

    pub async fn primary_key(pool: &SqlitePool, table: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        // pk is the 1-based position within the key, 0 for non-key columns
        let mut keyed: Vec<(i64, String)> = rows
            .iter()
            .map(|row| (row.get::<i64, _>("pk"), row.get::<String, _>("name")))
            .filter(|(pk, _)| *pk > 0)
            .collect();
        keyed.sort_by_key(|(pk, _)| *pk);
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    pub async fn indexes(pool: &SqlitePool, table: &str) -> DbResult<Vec<IndexInfo>> {
        let idx_list = sqlx::query(queries::sqlite::INDEX_LIST)
            .bind(table)
            .fetch_all(pool)
            .await?;

        let mut indexes = Vec::with_capacity(idx_list.len());
        for idx_row in &idx_list {
            let name: String = idx_row.get("name");
            let is_unique: i64 = idx_row.get("unique");
            let origin: String = idx_row.try_get("origin").unwrap_or_default();

            let columns: Vec<String> = sqlx::query(queries::sqlite::INDEX_COLUMNS)
                .bind(&name)
                .fetch_all(pool)
                .await?
                .iter()
                .filter_map(|row| row.try_get::<Option<String>, _>("name").ok().flatten())
                .collect();

            if !columns.is_empty() {
                indexes.push(
                    IndexInfo::new(name, columns)
                        .with_unique(is_unique != 0)
                        .with_primary(origin == "pk"),
                );
            }
        }
        Ok(indexes)
    }

    pub async fn foreign_keys(pool: &SqlitePool, table: &str) -> DbResult<Vec<ForeignKey>> {
        let rows = sqlx::query(queries::sqlite::FOREIGN_KEYS)
            .bind(table)
            .fetch_all(pool)
            .await?;

        let mut grouped = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            let ref_table: String = row.get("table");
            let column: String = row.get("from");
            let ref_column = match row.try_get::<Option<String>, _>("to").ok().flatten() {
                Some(c) => c,
                // REFERENCES parent without a column list targets its primary key
                None => {
                    let seq: i64 = row.get("seq");
                    primary_key(pool, &ref_table)
                        .await?
                        .into_iter()
                        .nth(seq as usize)
                        .unwrap_or_default()
                }
            };
            grouped.push((format!("fk_{}", id), column, ref_table, ref_column));
        }
        Ok(group_foreign_keys(grouped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, col: &str, table: &str, ref_col: &str) -> (String, String, String, String) {
        (
            name.to_string(),
            col.to_string(),
            table.to_string(),
            ref_col.to_string(),
        )
    }

    #[test]
    fn test_group_foreign_keys_preserves_order() {
        let keys = group_foreign_keys(vec![
            row("fk_line_order", "order_id", "orders", "id"),
            row("fk_line_product", "sku", "products", "sku"),
            row("fk_line_product", "variant", "products", "variant"),
        ]);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], ForeignKey::single("order_id", "orders", "id").with_name("fk_line_order"));
        assert_eq!(keys[1].columns, vec!["sku", "variant"]);
        assert_eq!(keys[1].referenced_columns, vec!["sku", "variant"]);
    }

    #[test]
    fn test_group_foreign_keys_empty() {
        assert!(group_foreign_keys(Vec::new()).is_empty());
    }
}
