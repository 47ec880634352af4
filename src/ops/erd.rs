//! Entity-relationship diagrams.
//!
//! Starting from a seed table, the foreign-key graph is walked in both
//! directions (a table's parents, then every table referencing it) until the
//! connected component is exhausted. The result is rendered as one bordered
//! box per table followed by the relationship list.
//!
//! ```text
//! +-------------------------+
//! |        customers        |
//! +-------------------------+
//! | id (PK) (NN) : INTEGER  |
//! | name (NN) : VARCHAR(50) |
//! +-------------------------+
//!
//! === Relationships ===
//! (orders) [customer_id] -> (customers) [id]
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::db::{CatalogInspector, DbPool};
use crate::error::{DbError, DbResult};
use crate::models::{ForeignKey, TableSchema};
use crate::ops::format::{center, display_width, pad_right};
use crate::ops::outcome::OpOutcome;

/// One foreign key as a directed child -> parent edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Relationship {
    pub child: String,
    pub parent: String,
    pub columns: Vec<String>,
    pub referenced_columns: Vec<String>,
}

impl Relationship {
    fn new(child: &str, fk: &ForeignKey) -> Self {
        Self {
            child: child.to_string(),
            parent: fk.referenced_table.clone(),
            columns: fk.columns.clone(),
            referenced_columns: fk.referenced_columns.clone(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "({}) [{}] -> ({}) [{}]",
            self.child,
            self.columns.join(", "),
            self.parent,
            self.referenced_columns.join(", ")
        )
    }
}

/// Tables reachable from the seed and the edges discovered on the way.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    pub tables: BTreeSet<String>,
    pub relationships: Vec<Relationship>,
}

/// Snapshot of every table and its outgoing foreign keys.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    tables: Vec<String>,
    foreign_keys: HashMap<String, Vec<ForeignKey>>,
}

#[derive(Clone, Copy)]
enum Cursor {
    /// Next outgoing foreign key of the frame's table
    Outgoing(usize),
    /// Next foreign key of `tables[table]` that may point back at the frame
    Incoming { table: usize, fk: usize },
}

struct Frame<'a> {
    table: &'a str,
    cursor: Cursor,
}

impl SchemaGraph {
    pub fn new(tables: impl IntoIterator<Item = (String, Vec<ForeignKey>)>) -> Self {
        let mut graph = Self::default();
        for (table, fks) in tables {
            graph.tables.push(table.clone());
            graph.foreign_keys.insert(table, fks);
        }
        graph
    }

    /// Read every table and its foreign keys from the catalog.
    pub async fn load(pool: &DbPool) -> DbResult<Self> {
        let tables = CatalogInspector::list_tables(pool).await?;
        let mut entries = Vec::with_capacity(tables.len());
        for table in tables {
            let fks = CatalogInspector::foreign_keys(pool, &table).await?;
            entries.push((table, fks));
        }
        Ok(Self::new(entries))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.foreign_keys.contains_key(table)
    }

    fn outgoing(&self, table: &str) -> &[ForeignKey] {
        self.foreign_keys.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth-first walk from `seed` over edges in both directions.
    ///
    /// Each table first follows its own foreign keys, descending into a
    /// parent as soon as it is found, then scans every other table for keys
    /// pointing back at it. Edges are deduplicated by their full tuple and
    /// kept in discovery order.
    pub fn traverse(&self, seed: &str) -> Traversal {
        let mut traversal = Traversal::default();
        if !self.contains(seed) {
            return traversal;
        }

        let mut seen: HashSet<Relationship> = HashSet::new();
        let mut record = |traversal: &mut Traversal, edge: Relationship| {
            if seen.insert(edge.clone()) {
                traversal.relationships.push(edge);
            }
        };

        traversal.tables.insert(seed.to_string());
        let mut stack = vec![Frame {
            table: seed,
            cursor: Cursor::Outgoing(0),
        }];

        while let Some(frame) = stack.last_mut() {
            let current = frame.table;
            let mut descend: Option<&str> = None;

            match frame.cursor {
                Cursor::Outgoing(i) => match self.outgoing(current).get(i) {
                    Some(fk) => {
                        frame.cursor = Cursor::Outgoing(i + 1);
                        record(&mut traversal, Relationship::new(current, fk));
                        descend = Some(fk.referenced_table.as_str());
                    }
                    None => frame.cursor = Cursor::Incoming { table: 0, fk: 0 },
                },
                Cursor::Incoming { table, fk } => {
                    let Some(other) = self.tables.get(table) else {
                        stack.pop();
                        continue;
                    };
                    if other == current {
                        frame.cursor = Cursor::Incoming { table: table + 1, fk: 0 };
                        continue;
                    }
                    match self.outgoing(other).get(fk) {
                        Some(key) => {
                            frame.cursor = Cursor::Incoming { table, fk: fk + 1 };
                            if key.referenced_table == current {
                                record(&mut traversal, Relationship::new(other, key));
                                descend = Some(other.as_str());
                            }
                        }
                        None => frame.cursor = Cursor::Incoming { table: table + 1, fk: 0 },
                    }
                }
            }

            if let Some(next) = descend {
                if self.contains(next) && traversal.tables.insert(next.to_string()) {
                    stack.push(Frame {
                        table: next,
                        cursor: Cursor::Outgoing(0),
                    });
                }
            }
        }

        traversal
    }
}

/// Column annotation line: `name (PK) (FK->t) (UQ) (NN) (DF:x) : type`.
fn column_line(schema: &TableSchema, index: usize) -> String {
    let column = &schema.columns[index];
    let mut line = column.name.clone();
    if schema.is_primary_key(&column.name) {
        line.push_str(" (PK)");
    }
    for parent in schema.foreign_key_targets(&column.name) {
        line.push_str(&format!(" (FK->{})", parent));
    }
    if schema.is_unique_member(&column.name) {
        line.push_str(" (UQ)");
    }
    if !column.nullable {
        line.push_str(" (NN)");
    }
    if let Some(default) = &column.default_value {
        line.push_str(&format!(" (DF:{})", default));
    }
    line.push_str(&format!(" : {}", column.data_type));
    line
}

/// Render one table as a bordered box.
pub fn render_table(schema: &TableSchema) -> Vec<String> {
    let lines: Vec<String> = (0..schema.columns.len())
        .map(|i| column_line(schema, i))
        .collect();

    let widest = lines
        .iter()
        .map(|l| display_width(l))
        .chain(std::iter::once(display_width(&schema.table_name)))
        .max()
        .unwrap_or(0);
    let box_width = widest + 4;
    let border = format!("+{}+", "-".repeat(box_width - 2));

    let mut out = Vec::with_capacity(lines.len() + 4);
    out.push(border.clone());
    out.push(format!("|{}|", center(&schema.table_name, box_width - 2)));
    out.push(border.clone());
    for line in &lines {
        out.push(format!("| {}|", pad_right(line, box_width - 3)));
    }
    out.push(border);
    out
}

/// Full diagram text: boxes sorted by table name, then relationships.
pub fn render(schemas: &[TableSchema], relationships: &[Relationship]) -> String {
    let mut sorted: Vec<&TableSchema> = schemas.iter().collect();
    sorted.sort_by(|a, b| a.table_name.cmp(&b.table_name));

    let mut lines = Vec::new();
    for schema in sorted {
        lines.extend(render_table(schema));
        lines.push(String::new());
    }
    if !relationships.is_empty() {
        lines.push("=== Relationships ===".to_string());
        lines.extend(relationships.iter().map(Relationship::render));
    }
    lines.join("\n")
}

/// A generated diagram.
#[derive(Debug, Clone, Serialize)]
pub struct ErdDiagram {
    pub seed: String,
    pub tables: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub text: String,
}

impl ErdDiagram {
    pub fn into_outcome(self) -> OpOutcome {
        OpOutcome::succeed("Succeed: ERD Generated").with_text(self.text)
    }
}

pub struct ErdGenerator;

impl ErdGenerator {
    pub async fn generate(pool: &DbPool, seed: &str) -> DbResult<ErdDiagram> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Err(DbError::validation("table", "Undefined Table Name"));
        }

        let graph = SchemaGraph::load(pool).await?;
        if !graph.contains(seed) {
            return Err(DbError::reference(
                seed,
                None,
                format!("Table '{}' does not exist", seed),
            ));
        }

        let traversal = graph.traverse(seed);
        debug!(
            seed = %seed,
            tables = traversal.tables.len(),
            edges = traversal.relationships.len(),
            "Traversed foreign-key graph"
        );

        let mut schemas = Vec::with_capacity(traversal.tables.len());
        for table in &traversal.tables {
            schemas.push(CatalogInspector::describe_table(pool, table).await?);
        }
        let text = render(&schemas, &traversal.relationships);

        info!(seed = %seed, tables = schemas.len(), "Generated ERD");
        Ok(ErdDiagram {
            seed: seed.to_string(),
            tables: traversal.tables.into_iter().collect(),
            relationships: traversal.relationships,
            text,
        })
    }
}
