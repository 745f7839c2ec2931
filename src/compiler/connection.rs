//! Relationship resolution between column descriptors
//!
//! A descriptor joins the query through the first already-placed descriptor
//! it relates to. Relation kinds are tried in a fixed priority, most
//! specific evidence first; the order is a load-bearing contract, covered
//! by tests.

use super::QueryColumn;

/// How a descriptor's table connects to its parent table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Parent's type references this type (or the reverse): joined through
    /// the reference node `r{link_id}`
    Reference,
    /// Parent's type owns this type as an array ("table" requisite)
    Dependent,
    /// This type's `up` points at the parent type
    Child,
    /// Reference-flagged descriptor hanging off its `up` type
    ReferenceUp,
    /// Base-type / requisite-id cross match, joined through `r{link_id}`
    BaseReference,
}

/// A discovered relationship, consumed during SQL emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub kind: ConnectionKind,
    /// Type id of the already-placed side
    pub parent_obj: i64,
    /// Type id being placed
    pub target_obj: i64,
    /// Reference node id (Reference) or requisite id (BaseReference)
    pub link_id: Option<i64>,
}

type Predicate = fn(&QueryColumn, &QueryColumn) -> Option<Connection>;

/// Resolution order: reference, dependent, reverse reference, child,
/// reference-up, base cross match. First match wins.
const PREDICATES: &[Predicate] = &[
    reference,
    dependent,
    reverse_reference,
    child,
    reference_up,
    base_reference,
];

/// Find the highest-priority connection between `candidate` and any placed
/// descriptor. `placed` must be in placement order so that repeated
/// compilations discover the same connection.
pub fn find_connection(candidate: &QueryColumn, placed: &[&QueryColumn]) -> Option<Connection> {
    for predicate in PREDICATES {
        for anchor in placed {
            if let Some(conn) = predicate(candidate, anchor) {
                return Some(conn);
            }
        }
    }
    None
}

/// Placed descriptor's type references the candidate's type
fn reference(candidate: &QueryColumn, placed: &QueryColumn) -> Option<Connection> {
    if placed.ref_id == Some(candidate.obj) {
        Some(Connection {
            kind: ConnectionKind::Reference,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: Some(candidate.obj),
        })
    } else {
        None
    }
}

/// Placed descriptor owns the candidate's type as an array
fn dependent(candidate: &QueryColumn, placed: &QueryColumn) -> Option<Connection> {
    if placed.arr == Some(candidate.obj) {
        Some(Connection {
            kind: ConnectionKind::Dependent,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: None,
        })
    } else {
        None
    }
}

/// Candidate's type references the placed descriptor's type
fn reverse_reference(candidate: &QueryColumn, placed: &QueryColumn) -> Option<Connection> {
    if candidate.ref_id == Some(placed.obj) {
        Some(Connection {
            kind: ConnectionKind::Reference,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: candidate.ref_id,
        })
    } else {
        None
    }
}

/// Candidate's `up` points at the placed descriptor's type
fn child(candidate: &QueryColumn, placed: &QueryColumn) -> Option<Connection> {
    if candidate.up != 0 && candidate.up == placed.obj {
        Some(Connection {
            kind: ConnectionKind::Child,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: None,
        })
    } else {
        None
    }
}

/// Reference-flagged candidate hanging off the placed descriptor's type
fn reference_up(candidate: &QueryColumn, placed: &QueryColumn) -> Option<Connection> {
    if candidate.is_ref && candidate.up != 0 && candidate.up == placed.obj {
        Some(Connection {
            kind: ConnectionKind::ReferenceUp,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: None,
        })
    } else {
        None
    }
}

/// Base-type cross match through a requisite id, in either direction
fn base_reference(candidate: &QueryColumn, placed: &QueryColumn) -> Option<Connection> {
    if candidate.base == placed.obj && candidate.req_id.is_some() {
        return Some(Connection {
            kind: ConnectionKind::BaseReference,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: candidate.req_id,
        });
    }
    if placed.base == candidate.obj && placed.req_id.is_some() {
        return Some(Connection {
            kind: ConnectionKind::BaseReference,
            parent_obj: placed.obj,
            target_obj: candidate.obj,
            link_id: placed.req_id,
        });
    }
    None
}
