//! Store procedure result codes
//!
//! The create/update/delete stored procedures answer with short result
//! strings ("1", "warn_record_exists", "err_term_not_found 64", ...).
//! This table maps each known prefix to a boundary status and message.
//! It is a static immutable lookup, passed by reference wherever needed.

/// One known store result code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeEntry {
    /// Result prefix as emitted by the stored procedures
    pub prefix: &'static str,
    /// HTTP-ish status the boundary should answer with
    pub status: u16,
    /// Human-readable message (None for plain success)
    pub message: Option<&'static str>,
}

/// Known result codes, matched by prefix in order.
///
/// "1" and the warn_* entries are benign (200); everything else is a
/// client or server error the boundary translates.
pub const STORE_CODES: &[CodeEntry] = &[
    CodeEntry { prefix: "1", status: 200, message: None },
    CodeEntry { prefix: "warn_term_exists", status: 200, message: Some("Term already exists") },
    CodeEntry { prefix: "warn_req_exists", status: 200, message: Some("Requisite already exists") },
    CodeEntry { prefix: "warn_ref_exists", status: 200, message: Some("Reference already exists") },
    CodeEntry { prefix: "warn_record_exists", status: 200, message: Some("Record already exists") },
    CodeEntry { prefix: "err_term_not_found", status: 404, message: Some("Term not found") },
    CodeEntry { prefix: "err_req_not_found", status: 404, message: Some("Requisite not found") },
    CodeEntry { prefix: "err_term_name_exists", status: 409, message: Some("Term name already exists") },
    CodeEntry { prefix: "err_empty_val", status: 422, message: Some("Empty value") },
    CodeEntry { prefix: "err_non_unique_val", status: 409, message: Some("Value is not unique") },
    CodeEntry { prefix: "err_type_not_found", status: 400, message: Some("Invalid type") },
    CodeEntry { prefix: "err_invalid_ref", status: 400, message: Some("Invalid reference") },
    CodeEntry { prefix: "err_obj_not_found", status: 404, message: Some("Object not found") },
    CodeEntry { prefix: "err_is_metadata", status: 400, message: Some("Object is metadata and cannot be deleted") },
    CodeEntry { prefix: "err_is_referenced", status: 400, message: Some("Object is referenced by other entities") },
    CodeEntry { prefix: "err_incorrect_term", status: 400, message: Some("Incorrect term") },
    CodeEntry { prefix: "err_term_is_in_use", status: 409, message: Some("Term is currently in use") },
];

/// Look up a store result string by prefix
pub fn lookup(res: &str) -> Option<&'static CodeEntry> {
    STORE_CODES.iter().find(|e| res.starts_with(e.prefix))
}

/// Whether a result string is a benign warning (or plain success)
pub fn is_warning(res: &str) -> bool {
    lookup(res).map(|e| e.status == 200).unwrap_or(false)
}
