//! Column-to-join query compiler
//!
//! Turns a declarative list of output columns — each bound to a type in the
//! generic entity table and annotated with its inferred relationships —
//! into one flat SQL projection executed via self-joins against that table.
//!
//! The lowest-`ord` descriptor anchors the FROM clause ("master" table);
//! every other descriptor is placed through a discovered [`Connection`] as a
//! `LEFT JOIN` over a correlated subquery, or force-placed as an independent
//! `CROSS JOIN` table when no relationship can be discovered within the
//! bounded placement passes. Force placement yields an unconstrained cross
//! product for that column — a visible degradation surfaced through
//! [`CompiledQuery::forced`] and warning logs, not an error.
//!
//! Compilation is deterministic: the same descriptor set yields the same
//! alias assignments and SQL text regardless of input list order.

pub mod connection;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
pub use connection::{Connection, ConnectionKind};

/// One requested output column (column descriptor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryColumn {
    /// Output column identity (SELECT item is aliased `c{col_id}`)
    pub col_id: i64,
    /// Type id this column projects
    pub obj: i64,
    /// Display name of the type
    pub obj_name: String,
    /// Set when the column is itself a reference requisite
    #[serde(default)]
    pub is_ref: bool,
    /// Parent type id, 0 if top-level
    #[serde(default)]
    pub up: i64,
    /// Inherited base type
    #[serde(default)]
    pub base: i64,
    /// Requisite linkage id
    #[serde(default)]
    pub req_id: Option<i64>,
    /// Original requisite id
    #[serde(default)]
    pub orig_id: Option<i64>,
    /// Type id this column's type references
    #[serde(default, rename = "ref")]
    pub ref_id: Option<i64>,
    /// Type id for which this column is array-owner
    #[serde(default)]
    pub arr: Option<i64>,
    /// Explicit display/resolution order, unique per request
    pub ord: i64,
}

/// Compile request payload as the front-end submits it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub columns: Vec<QueryColumn>,
}

/// Result of one compilation
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    /// The SELECT statement, ready for the store (no bind parameters)
    pub sql: String,
    /// Alias assigned to each distinct type id
    pub aliases: BTreeMap<i64, String>,
    /// Type ids that were force-placed as independent tables.
    /// Non-empty means the statement contains an unconstrained cross
    /// product for those columns.
    pub forced: Vec<i64>,
}

/// One resolved join, recorded in placement order
#[derive(Debug, Clone)]
struct JoinEdge {
    conn: Connection,
}

/// Per-call placement state; fresh maps every compile
#[derive(Debug, Default)]
struct Placement {
    /// Type ids in placement order (master first)
    order: Vec<i64>,
    aliases: BTreeMap<i64, String>,
    joins: Vec<JoinEdge>,
    /// Force-placed type ids, in placement order
    independents: Vec<i64>,
}

impl Placement {
    fn is_placed(&self, obj: i64) -> bool {
        self.aliases.contains_key(&obj)
    }

    fn place_master(&mut self, obj: i64) {
        self.aliases.insert(obj, format!("a{obj}"));
        self.order.push(obj);
    }

    fn place_join(&mut self, conn: Connection) {
        self.aliases.insert(conn.target_obj, format!("a{}", conn.target_obj));
        self.order.push(conn.target_obj);
        self.joins.push(JoinEdge { conn });
    }

    fn place_independent(&mut self, obj: i64) {
        self.aliases.insert(obj, format!("a{obj}"));
        self.order.push(obj);
        self.independents.push(obj);
    }

    fn is_independent(&self, obj: i64) -> bool {
        self.independents.contains(&obj)
    }
}

/// Compiles column descriptor lists into self-join SELECT statements
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    cfg: EngineConfig,
}

impl QueryCompiler {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    /// Compile `columns` against the tenant table `db`.
    ///
    /// Fails only on an empty column list; undiscoverable relationships
    /// degrade to independent tables instead of failing the request.
    pub fn compile(&self, columns: &[QueryColumn], db: &str) -> Result<CompiledQuery> {
        if columns.is_empty() {
            return Err(EngineError::EmptyColumnList);
        }

        let mut sorted: Vec<&QueryColumn> = columns.iter().collect();
        sorted.sort_by_key(|c| c.ord);

        // One placement per distinct type id; repeats share the alias
        let mut seen = HashSet::new();
        let mut descriptors: Vec<&QueryColumn> = Vec::new();
        for col in &sorted {
            if seen.insert(col.obj) {
                descriptors.push(col);
            }
        }
        let by_obj: HashMap<i64, &QueryColumn> =
            descriptors.iter().map(|c| (c.obj, *c)).collect();

        let master = descriptors[0];
        let mut placement = Placement::default();
        placement.place_master(master.obj);
        debug!(
            master = master.obj,
            name = %master.obj_name,
            "master table a{}",
            master.obj
        );

        let mut remaining: Vec<&QueryColumn> = descriptors[1..].to_vec();
        let max_passes = self.cfg.max_pass_factor * remaining.len();
        let mut pass = 0;

        while !remaining.is_empty() && pass < max_passes {
            pass += 1;
            let placed_before = placement.order.len();

            let mut deferred = Vec::new();
            for col in remaining.drain(..) {
                if placement.is_placed(col.obj) {
                    continue;
                }
                let mut visiting = HashSet::new();
                if !self.try_place(col, &by_obj, &mut placement, &mut visiting) {
                    deferred.push(col);
                }
            }
            remaining = deferred;
            remaining.retain(|col| !placement.is_placed(col.obj));

            if placement.order.len() == placed_before && !remaining.is_empty() {
                // Stalled pass: force the lowest-ord descriptor so later
                // passes can still join against it
                let col = remaining.remove(0);
                warn!(
                    obj = col.obj,
                    name = %col.obj_name,
                    "no connection found, adding as independent table"
                );
                placement.place_independent(col.obj);
            }
        }

        for col in remaining.drain(..) {
            if placement.is_placed(col.obj) {
                continue;
            }
            warn!(
                obj = col.obj,
                name = %col.obj_name,
                "pass limit reached, adding as independent table"
            );
            placement.place_independent(col.obj);
        }

        let sql = self.emit(db, &sorted, master, &placement);
        debug!(passes = pass, joins = placement.joins.len(), "compiled query");

        Ok(CompiledQuery {
            sql,
            aliases: placement.aliases.clone(),
            forced: placement.independents.clone(),
        })
    }

    /// Try to place one descriptor, placing its `up` parent first when that
    /// parent exists in the input set. Returns false to defer to a later
    /// pass. `visiting` breaks `up` cycles: recursion aborts and defers
    /// instead of looping.
    fn try_place<'a>(
        &self,
        col: &'a QueryColumn,
        by_obj: &HashMap<i64, &'a QueryColumn>,
        placement: &mut Placement,
        visiting: &mut HashSet<i64>,
    ) -> bool {
        if placement.is_placed(col.obj) {
            return true;
        }
        if !visiting.insert(col.obj) {
            return false;
        }

        if col.up != 0 && !placement.is_placed(col.up) {
            match by_obj.get(&col.up) {
                Some(parent) => {
                    if !self.try_place(parent, by_obj, placement, visiting) {
                        return false;
                    }
                }
                None => {
                    // Parent type is not part of the request: unreachable,
                    // goes in as an unconstrained independent table
                    warn!(
                        obj = col.obj,
                        up = col.up,
                        name = %col.obj_name,
                        "parent type absent from column set, adding as independent table"
                    );
                    placement.place_independent(col.obj);
                    return true;
                }
            }
        }

        let placed: Vec<&QueryColumn> = placement
            .order
            .iter()
            .filter_map(|obj| by_obj.get(obj).copied())
            .collect();
        match connection::find_connection(col, &placed) {
            Some(conn) => {
                debug!(
                    obj = col.obj,
                    parent = conn.parent_obj,
                    kind = ?conn.kind,
                    "placed a{}",
                    col.obj
                );
                placement.place_join(conn);
                true
            }
            None => false,
        }
    }

    /// Assemble the final statement from the placement
    fn emit(
        &self,
        db: &str,
        sorted: &[&QueryColumn],
        master: &QueryColumn,
        placement: &Placement,
    ) -> String {
        let master_alias = &placement.aliases[&master.obj];

        let mut select_fields = Vec::with_capacity(sorted.len());
        for col in sorted {
            let alias = &placement.aliases[&col.obj];
            if col.obj == master.obj || placement.is_independent(col.obj) {
                select_fields.push(format!("{alias}.val c{}", col.col_id));
            } else {
                select_fields.push(format!("{alias}.{alias}_val c{}", col.col_id));
            }
        }

        let mut from_parts = vec![format!("{db} {master_alias}")];
        for obj in &placement.independents {
            from_parts.push(format!("CROSS JOIN {db} a{obj}"));
        }

        let mut join_clauses = Vec::with_capacity(placement.joins.len());
        for edge in &placement.joins {
            let conn = &edge.conn;
            let alias = &placement.aliases[&conn.target_obj];
            let parent_alias = &placement.aliases[&conn.parent_obj];
            // Master and independent tables expose plain `.id`; joined
            // tables expose their subquery's `a{obj}_id`
            let parent_id = if conn.parent_obj == master.obj
                || placement.is_independent(conn.parent_obj)
            {
                format!("{parent_alias}.id")
            } else {
                format!("{parent_alias}.a{}_id", conn.parent_obj)
            };
            let subquery = join_subquery(db, conn);
            join_clauses.push(format!(
                "LEFT JOIN {subquery} {alias} ON {alias}.up={parent_id}"
            ));
        }

        let mut where_parts = vec![format!(
            "{master_alias}.t={} AND {master_alias}.up!=0",
            master.obj
        )];
        for obj in &placement.independents {
            where_parts.push(format!("a{obj}.t={obj}"));
        }

        let mut parts = vec![
            format!("SELECT {}", select_fields.join(", ")),
            format!("FROM {}", from_parts.join(" ")),
        ];
        parts.extend(join_clauses);
        parts.push(format!("WHERE {}", where_parts.join(" AND ")));
        parts.join("\n")
    }
}

/// Correlated subquery exposing `(up, a{obj}_val, a{obj}_id)` for one join
fn join_subquery(db: &str, conn: &Connection) -> String {
    let obj = conn.target_obj;
    match conn.kind {
        ConnectionKind::Reference => {
            let link = conn.link_id.unwrap_or(obj);
            format!(
                "(SELECT r{link}.up, a{obj}.val a{obj}_val, a{obj}.id a{obj}_id \
                 FROM {db} r{link}, {db} a{obj} \
                 WHERE a{obj}.id=r{link}.t AND a{obj}.t={obj})"
            )
        }
        ConnectionKind::Dependent | ConnectionKind::Child | ConnectionKind::ReferenceUp => {
            format!(
                "(SELECT a{obj}.up, a{obj}.val a{obj}_val, a{obj}.id a{obj}_id \
                 FROM {db} a{obj} \
                 WHERE a{obj}.t={obj})"
            )
        }
        ConnectionKind::BaseReference => {
            let link = conn.link_id.unwrap_or(obj);
            format!(
                "(SELECT r{link}.up, a{obj}.val a{obj}_val, a{obj}.id a{obj}_id \
                 FROM {db} r{link} CROSS JOIN {db} a{obj} \
                 WHERE a{obj}.id=r{link}.t AND a{obj}.t={obj} AND r{link}.val='{link}')"
            )
        }
    }
}
