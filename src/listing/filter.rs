//! Filter compilation for listing requests
//!
//! Caller-supplied key/value pairs become extra joins, a WHERE fragment and
//! a bound-parameter map. Unrecognized keys never fail the request: they are
//! dropped with a warning, availability over strict validation.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::BTreeMap;
use tracing::warn;

use super::header::HeaderField;
use crate::store::Params;

/// Keys handled as pagination/scope controls, never as filters
pub const RESERVED_KEYS: &[&str] = &["up", "limit", "offset"];

/// Bare requisite-id key form, e.g. `f307`
static FIELD_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^f(\d+)$").unwrap());

/// Comparison inferred from wildcard placement in the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// `%x%`
    Contains,
    /// `x%`
    StartsWith,
    /// `%x`
    EndsWith,
    /// No wildcard: equality against the index-length prefix of the value
    TruncatedEquals,
}

/// Which SQL alias the predicate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    /// The master `vals` alias (the entity's own value)
    Direct,
    /// A per-filter `f{id}` join over the requisite's value nodes
    Join,
    /// A precomputed report column `repval_{id}`
    ReportAlias,
}

/// Whether bare-integer keys resolve against report columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterContext {
    #[default]
    Default,
    Report,
}

/// One resolved filter; `value` is the normalized core with wildcards
/// stripped, re-applied by [`Filter::bound_value`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field_id: i64,
    pub value: String,
    pub target: FilterTarget,
    pub match_mode: MatchMode,
}

impl Filter {
    /// Normalize the raw value (trim + lowercase), classify its wildcards
    /// and strip them from the stored core.
    fn new(field_id: i64, target: FilterTarget, raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        let starts = normalized.starts_with('%');
        let ends = normalized.ends_with('%');
        let match_mode = match (starts, ends) {
            (true, true) => MatchMode::Contains,
            (false, true) => MatchMode::StartsWith,
            (true, false) => MatchMode::EndsWith,
            (false, false) => MatchMode::TruncatedEquals,
        };
        Filter {
            field_id,
            value: normalized.trim_matches('%').to_string(),
            target,
            match_mode,
        }
    }

    /// Bind-parameter name, without the `:` sigil
    pub fn param_name(&self) -> String {
        format!("filter_{}", self.field_id)
    }

    /// Value to bind: wildcards re-applied for the LIKE modes, the full
    /// core for equality. Only the column side is truncated, so a value
    /// longer than the indexable prefix matches nothing.
    pub fn bound_value(&self) -> String {
        match self.match_mode {
            MatchMode::Contains => format!("%{}%", self.value),
            MatchMode::StartsWith => format!("{}%", self.value),
            MatchMode::EndsWith => format!("%{}", self.value),
            MatchMode::TruncatedEquals => self.value.clone(),
        }
    }

    fn prefix(&self) -> String {
        match self.target {
            FilterTarget::Direct => "vals".to_string(),
            FilterTarget::Join => format!("f{}", self.field_id),
            FilterTarget::ReportAlias => format!("repval_{}", self.field_id),
        }
    }

    /// WHERE fragment, `AND`-prefixed for appending after the page predicate
    pub fn predicate(&self, prefix_len: usize) -> String {
        let prefix = self.prefix();
        let param = self.param_name();
        match self.match_mode {
            MatchMode::TruncatedEquals => {
                format!("AND lower(left({prefix}.val, {prefix_len})) = :{param}")
            }
            _ => format!("AND lower({prefix}.val) LIKE :{param}"),
        }
    }

    /// Extra join for Join-target filters; Direct and ReportAlias predicates
    /// apply to aliases the page query already has
    pub fn join_clause(&self, db: &str) -> Option<String> {
        match self.target {
            FilterTarget::Join => {
                let id = self.field_id;
                Some(format!(
                    "LEFT JOIN {db} f{id} ON f{id}.up=vals.id AND f{id}.t={id}"
                ))
            }
            _ => None,
        }
    }
}

/// SQL fragments plus bound parameters for one listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPlan {
    /// Newline-joined LEFT JOIN clauses, possibly empty
    pub joins: String,
    /// Space-joined `AND ...` predicates, possibly empty
    pub where_clause: String,
    /// `filter_{id}` → value, bound by the store adapter
    pub params: Params,
}

/// Resolves filter keys against one term's identity and header
pub struct FilterCompiler<'a> {
    term_id: i64,
    term_name: &'a str,
    header: &'a [HeaderField],
    context: FilterContext,
    index_prefix_len: usize,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(
        term_id: i64,
        term_name: &'a str,
        header: &'a [HeaderField],
        context: FilterContext,
        index_prefix_len: usize,
    ) -> Self {
        Self {
            term_id,
            term_name,
            header,
            context,
            index_prefix_len,
        }
    }

    /// Compile the caller's filter map. Reserved keys are skipped, unknown
    /// keys dropped with a warning; resolution itself never fails.
    pub fn build(&self, db: &str, filters: &BTreeMap<String, String>) -> FilterPlan {
        let mut joins = Vec::new();
        let mut predicates = Vec::new();
        let mut params = Params::new();

        for (key, raw) in filters {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let Some(filter) = self.resolve(key, raw) else {
                warn!(key = %key, term = self.term_id, "unknown filter key dropped");
                continue;
            };
            if let Some(join) = filter.join_clause(db) {
                joins.push(join);
            }
            predicates.push(filter.predicate(self.index_prefix_len));
            params.insert(filter.param_name(), filter.bound_value());
        }

        FilterPlan {
            joins: joins.join("\n"),
            where_clause: predicates.join(" "),
            params,
        }
    }

    fn resolve(&self, key: &str, raw: &str) -> Option<Filter> {
        if let Some(caps) = FIELD_KEY_RE.captures(key) {
            let id: i64 = caps[1].parse().ok()?;
            let target = if id == self.term_id {
                FilterTarget::Direct
            } else {
                FilterTarget::Join
            };
            return Some(Filter::new(id, target, raw));
        }

        let key_lower = key.to_lowercase();
        if key_lower == self.term_name.to_lowercase() {
            return Some(Filter::new(self.term_id, FilterTarget::Direct, raw));
        }
        if let Some(field) = self
            .header
            .iter()
            .find(|h| h.name.to_lowercase() == key_lower)
        {
            // Value nodes carry the requisite node id as their type
            return Some(Filter::new(field.id, FilterTarget::Join, raw));
        }

        if self.context == FilterContext::Report {
            if let Ok(id) = key.parse::<i64>() {
                return Some(Filter::new(id, FilterTarget::ReportAlias, raw));
            }
        }

        None
    }
}
