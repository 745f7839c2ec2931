//! Listing header construction from term metadata
//!
//! The header describes each requisite of the listed term once: scalar
//! fields carry their type and optional reference target, table requisites
//! additionally declare whether their repeated values have an explicit
//! order key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::RequisiteRow;

/// Modifiers recognized on requisite declarations
pub const BOOLEAN_MODIFIERS: &[&str] = &["NOT NULL", "ORDER", "MULTIPLE", "UNIQUE"];

/// One header column in the listing response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderField {
    /// Requisite node id
    pub id: i64,
    /// Requisite type id (value nodes of this requisite carry this `t`)
    pub t: i64,
    /// Field name shown to the caller
    pub name: String,
    /// Inherited base type
    #[serde(default)]
    pub base: i64,
    /// Referenced term id when the requisite is a reference
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<i64>,
    /// True for array-valued ("table") requisites
    #[serde(default)]
    pub is_table_req: bool,
    /// Declarative modifiers, verbatim from the metadata
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    /// Referenced term's own name, when it differs from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
}

impl HeaderField {
    /// Whether repeated values of this requisite carry an explicit order key
    pub fn is_ordered(&self) -> bool {
        self.modifiers.iter().any(|m| m.contains("ORDER"))
    }
}

/// Build the header from raw metadata rows.
///
/// Rows are deduplicated by requisite id, first occurrence wins; the
/// metadata query can repeat a requisite once per modifier join.
pub fn build_header(rows: &[RequisiteRow]) -> Vec<HeaderField> {
    let mut header: Vec<HeaderField> = Vec::with_capacity(rows.len());
    for row in rows {
        if header.iter().any(|h| h.id == row.req_id) {
            continue;
        }
        let original_name = row
            .ref_val
            .as_ref()
            .filter(|v| **v != row.req_val)
            .cloned();
        header.push(HeaderField {
            id: row.req_id,
            t: row.req_t,
            name: row.req_val.clone(),
            base: row.base,
            ref_id: row.ref_id,
            is_table_req: row.is_table_req,
            modifiers: row.mods.clone(),
            original_name,
        });
    }
    header
}

/// Table requisites keyed by requisite node id (the `t` their value nodes
/// carry)
pub fn table_fields(header: &[HeaderField]) -> BTreeMap<i64, &HeaderField> {
    header
        .iter()
        .filter(|h| h.is_table_req)
        .map(|h| (h.id, h))
        .collect()
}
