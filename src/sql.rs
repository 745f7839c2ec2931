//! Statement templates for the listing round trips
//!
//! Identifiers (tenant table name, type ids) are interpolated directly:
//! they originate from trusted metadata, never from caller free text.
//! Filter values always travel as bound parameters (see listing::filter).

/// The term node itself: `(id, t, val)` or no rows
pub fn term_node(db: &str, term_id: i64) -> String {
    format!(
        "SELECT vals.id, vals.t, vals.val FROM {db} vals WHERE vals.id={term_id} AND vals.up=0"
    )
}

/// One page of entities of a term: `(id, up, val)` per entity.
///
/// `joins` and `where_clause` come from the filter compiler and may be empty.
pub fn term_objects(
    db: &str,
    term_id: i64,
    parent_id: i64,
    joins: &str,
    where_clause: &str,
    limit: i64,
    offset: i64,
) -> String {
    format!(
        "SELECT vals.id, vals.up, vals.val\n\
         FROM {db} vals\n\
         {joins}\n\
         WHERE vals.t={term_id} AND vals.up={parent_id} {where_clause}\n\
         ORDER BY vals.id\n\
         LIMIT {limit} OFFSET {offset}"
    )
}

/// All requisite values of one entity: `(val, req_id, field_name, alt_val)`.
///
/// `req_id` is the value node's type; `field_name` that type's name;
/// `alt_val` the id of a referenced record when the value resolves to one.
pub fn object_requisites(db: &str, obj_id: i64) -> String {
    format!(
        "SELECT reqs.val, reqs.t, types.val, refs.id\n\
         FROM {db} reqs\n\
         \tLEFT JOIN {db} types ON types.id=reqs.t\n\
         \tLEFT JOIN {db} refs ON refs.t=types.t AND refs.val=reqs.val\n\
         WHERE reqs.up={obj_id}\n\
         ORDER BY reqs.id"
    )
}

/// Order keys for the ORDER-modified table requisites of one entity:
/// `(up, req_id, item_id, order_key)` per repeated value group.
///
/// The store does not guarantee retrieval order of repeated child values,
/// so the explicit order key node is read back per requisite type.
pub fn ordered_requisites(db: &str, obj_id: i64, array_ids: &[i64]) -> String {
    let ids = array_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "SELECT items.up, items.t, items.id, ord.val\n\
         FROM {db} items\n\
         \tJOIN {db} ord ON ord.up=items.id\n\
         WHERE items.up={obj_id} AND items.t IN ({ids})\n\
         ORDER BY ord.val"
    )
}

/// Requisite metadata for a term: `(req_id, req_t, req_val, base, ref_id,
/// ref_val, is_table_req, mods)` with mods comma-joined.
pub fn term_metadata(db: &str, term_id: i64) -> String {
    format!(
        "SELECT reqs.id, reqs.t, reqs.val, refs.t, refs.id, refs.val,\n\
         \tCASE WHEN subreqs.id IS NOT NULL THEN 1 ELSE 0 END,\n\
         \t(SELECT string_agg(mods.val, ',') FROM {db} mods WHERE mods.up=reqs.id)\n\
         FROM {db} reqs\n\
         \tLEFT JOIN {db} refs ON refs.id=reqs.t AND refs.up=0\n\
         \tLEFT JOIN {db} subreqs ON subreqs.up=refs.id\n\
         WHERE reqs.up={term_id}\n\
         ORDER BY reqs.id"
    )
}
