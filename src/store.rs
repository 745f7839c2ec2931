//! Generic entity store access
//!
//! Every record in the tenant table is a Node: `{id, t, up, val}`. Types
//! ("terms") and their attributes ("requisites") are Nodes too, so the same
//! two primitives serve both data and metadata:
//!
//! - `EntityStore::execute` — run one SQL statement, get rows back
//! - `MetadataLoader::load_metadata` — requisite rows describing a term
//!
//! The store enforces no foreign keys; `t`/`up` consistency is an
//! assumption the compilers make, not something they verify.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::sql;

/// Sentinel parent id meaning "root / no parent"
pub const ROOT_PARENT: i64 = 0;

/// One record in the generic table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Record id
    pub id: i64,
    /// Type reference (id of the term Node classifying this record)
    pub t: i64,
    /// Parent reference (`ROOT_PARENT` for top-level records)
    pub up: i64,
    /// Textual value
    pub val: String,
}

/// A single cell returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Null,
}

impl SqlValue {
    /// Numeric view; text cells parse if they hold digits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Text(s) => s.parse().ok(),
            SqlValue::Null => None,
        }
    }

    /// Borrowed text view (None for Int/Null)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Owned textual rendering ("" for Null)
    pub fn to_text(&self) -> String {
        match self {
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Null => String::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// One row returned by the store, positional
pub type Row = Vec<SqlValue>;

/// Named bind parameters for a statement.
///
/// Ordered map so repeated compilations bind identically; the store
/// adapter translates names to its driver's placeholder style.
pub type Params = BTreeMap<String, String>;

/// Synchronous SQL execution against the generic table.
///
/// Send + Sync so services can share one adapter across request tasks.
/// Errors are never retried here; adapters surface them as
/// `EngineError::Store` and the caller owns timeout/cancellation policy.
pub trait EntityStore: Send + Sync {
    /// Execute one statement, returning all rows
    fn execute(&self, sql: &str, params: &Params) -> Result<Vec<Row>>;
}

/// Metadata row describing one requisite of a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisiteRow {
    /// Requisite node id
    pub req_id: i64,
    /// Requisite type id
    pub req_t: i64,
    /// Requisite name
    pub req_val: String,
    /// Inherited base type
    pub base: i64,
    /// Referenced term id, if the requisite is a reference
    pub ref_id: Option<i64>,
    /// Referenced term name
    pub ref_val: Option<String>,
    /// Whether the requisite is array-valued ("table" requisite)
    pub is_table_req: bool,
    /// Declarative modifiers (ORDER, UNIQUE, MULTIPLE, NOT NULL)
    pub mods: Vec<String>,
}

/// Requisite metadata for a term, in store order
pub trait MetadataLoader: Send + Sync {
    fn load_metadata(&self, db: &str, term_id: i64) -> Result<Vec<RequisiteRow>>;
}

/// Default loader: issues the term-metadata template through an EntityStore
pub struct SqlMetadataLoader<'a, S: EntityStore> {
    store: &'a S,
}

impl<'a, S: EntityStore> SqlMetadataLoader<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<'a, S: EntityStore> MetadataLoader for SqlMetadataLoader<'a, S> {
    fn load_metadata(&self, db: &str, term_id: i64) -> Result<Vec<RequisiteRow>> {
        let stmt = sql::term_metadata(db, term_id);
        let rows = self.store.execute(&stmt, &Params::new())?;
        rows.iter().map(parse_requisite_row).collect()
    }
}

/// Decode one metadata row: (req_id, req_t, req_val, base, ref_id, ref_val,
/// is_table_req, mods) with mods comma-joined by the template.
fn parse_requisite_row(row: &Row) -> Result<RequisiteRow> {
    if row.len() < 8 {
        return Err(EngineError::MalformedRow(format!(
            "term metadata row has {} columns, expected 8",
            row.len()
        )));
    }

    let req_id = row[0]
        .as_i64()
        .ok_or_else(|| EngineError::MalformedRow("req_id is not numeric".into()))?;
    let req_t = row[1]
        .as_i64()
        .ok_or_else(|| EngineError::MalformedRow("req_t is not numeric".into()))?;

    let mods = match &row[7] {
        SqlValue::Text(s) if !s.is_empty() => {
            s.split(',').map(|m| m.trim().to_string()).collect()
        }
        _ => Vec::new(),
    };

    Ok(RequisiteRow {
        req_id,
        req_t,
        req_val: row[2].to_text(),
        base: row[3].as_i64().unwrap_or(0),
        ref_id: row[4].as_i64(),
        ref_val: row[5].as_str().map(str::to_string),
        is_table_req: row[6].as_i64().unwrap_or(0) != 0,
        mods,
    })
}
