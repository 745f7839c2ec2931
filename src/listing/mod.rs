//! Listing / projection service
//!
//! Renders one term as a paginated list of entities. Each entity row carries
//! the entity's own value plus its resolved requisites: scalars keyed by
//! their reference id or field name, table requisites accumulated into
//! ordered value lists.
//!
//! The service issues one metadata query, one page query, and then one or
//! two queries per listed entity. The per-entity fan-out is a known scaling
//! limit, accepted for simplicity; page size bounds it.

pub mod filter;
pub mod header;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::sql;
use crate::store::{EntityStore, MetadataLoader, Params, Row};
use filter::{FilterCompiler, FilterContext};
use header::{build_header, table_fields, HeaderField};

/// One resolved requisite value of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReqValue {
    Scalar(String),
    Table {
        vals: Vec<String>,
        /// Order key of the group, present only for ORDER-modified requisites
        #[serde(skip_serializing_if = "Option::is_none")]
        q: Option<String>,
    },
}

/// One listed entity with its resolved requisites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRow {
    pub id: i64,
    pub up: i64,
    pub val: String,
    pub reqs: BTreeMap<String, ReqValue>,
}

/// Listing response: the term's schema plus one row per entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermObjects {
    pub header: Vec<HeaderField>,
    pub objects: Vec<ObjectRow>,
}

/// One listing request as the boundary hands it over
#[derive(Debug, Clone, Deserialize)]
pub struct ListingRequest {
    pub term_id: i64,
    /// Parent scope (`up` of the listed entities)
    #[serde(default)]
    pub parent_id: i64,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(skip)]
    pub context: FilterContext,
}

/// Lists a term's entities against one store/loader pair
pub struct ListingService<'a, S: EntityStore, M: MetadataLoader> {
    store: &'a S,
    loader: &'a M,
    cfg: EngineConfig,
}

impl<'a, S: EntityStore, M: MetadataLoader> ListingService<'a, S, M> {
    pub fn new(store: &'a S, loader: &'a M, cfg: EngineConfig) -> Self {
        Self { store, loader, cfg }
    }

    /// List one page of `req.term_id`'s entities in tenant table `db`.
    pub fn list(&self, db: &str, req: &ListingRequest) -> Result<TermObjects> {
        let term_rows = self
            .store
            .execute(&sql::term_node(db, req.term_id), &Params::new())?;
        let term_name = match term_rows.first() {
            Some(row) if row.len() >= 3 => row[2].to_text(),
            _ => return Err(EngineError::TermNotFound(req.term_id)),
        };

        let meta = self.loader.load_metadata(db, req.term_id)?;
        if meta.is_empty() {
            return Err(EngineError::TermNotFound(req.term_id));
        }
        let head = build_header(&meta);
        let tables = table_fields(&head);
        let ordered_ids: Vec<i64> = tables
            .values()
            .filter(|h| h.is_ordered())
            .map(|h| h.id)
            .collect();

        let plan = FilterCompiler::new(
            req.term_id,
            &term_name,
            &head,
            req.context,
            self.cfg.index_prefix_len,
        )
        .build(db, &req.filters);

        let limit = req.limit.unwrap_or(self.cfg.default_limit);
        let offset = req.offset.unwrap_or(self.cfg.default_offset);
        let page_sql = sql::term_objects(
            db,
            req.term_id,
            req.parent_id,
            &plan.joins,
            &plan.where_clause,
            limit,
            offset,
        );
        let page = self.store.execute(&page_sql, &plan.params)?;
        debug!(
            term = req.term_id,
            entities = page.len(),
            filters = plan.params.len(),
            "listing page fetched"
        );

        let mut objects = Vec::with_capacity(page.len());
        for row in &page {
            if row.len() < 3 {
                return Err(EngineError::MalformedRow(format!(
                    "entity row has {} columns, expected 3",
                    row.len()
                )));
            }
            let id = row[0]
                .as_i64()
                .ok_or_else(|| EngineError::MalformedRow("entity id is not numeric".into()))?;
            let up = row[1].as_i64().unwrap_or(0);
            let val = row[2].to_text();

            let order_keys = if ordered_ids.is_empty() {
                BTreeMap::new()
            } else {
                self.fetch_order_keys(db, id, &ordered_ids)?
            };
            let reqs = self.resolve_requisites(db, id, &head, &tables, &order_keys)?;
            objects.push(ObjectRow { id, up, val, reqs });
        }

        Ok(TermObjects {
            header: head,
            objects,
        })
    }

    /// Order keys for one entity's ORDER-modified table requisites:
    /// requisite node id → explicit order key value
    fn fetch_order_keys(
        &self,
        db: &str,
        obj_id: i64,
        ordered_ids: &[i64],
    ) -> Result<BTreeMap<i64, String>> {
        let stmt = sql::ordered_requisites(db, obj_id, ordered_ids);
        let rows = self.store.execute(&stmt, &Params::new())?;
        let mut keys = BTreeMap::new();
        for row in &rows {
            if row.len() < 4 {
                continue;
            }
            if let Some(req_type) = row[1].as_i64() {
                keys.entry(req_type).or_insert_with(|| row[3].to_text());
            }
        }
        Ok(keys)
    }

    /// Fetch and resolve one entity's requisite rows against the header
    fn resolve_requisites(
        &self,
        db: &str,
        obj_id: i64,
        head: &[HeaderField],
        tables: &BTreeMap<i64, &HeaderField>,
        order_keys: &BTreeMap<i64, String>,
    ) -> Result<BTreeMap<String, ReqValue>> {
        let stmt = sql::object_requisites(db, obj_id);
        let rows = self.store.execute(&stmt, &Params::new())?;

        let mut reqs = BTreeMap::new();
        for row in &rows {
            if row.len() < 4 {
                continue;
            }
            resolve_row(row, head, tables, order_keys, &mut reqs);
        }
        Ok(reqs)
    }
}

/// Place one `(val, req_id, field_name, alt_val)` row into the requisite
/// map. Value nodes carry their requisite node id as `t`, so rows match
/// header fields by id:
/// - scalar header match: keyed by the reference id when the field is a
///   reference, by the field name otherwise;
/// - table header match: appended to the accumulating value list, order key
///   attached when the requisite is ORDER-modified;
/// - no match but numeric side value: the referenced record's id, scalar
///   under the row's own label.
fn resolve_row(
    row: &Row,
    head: &[HeaderField],
    tables: &BTreeMap<i64, &HeaderField>,
    order_keys: &BTreeMap<i64, String>,
    reqs: &mut BTreeMap<String, ReqValue>,
) {
    let val = row[0].to_text();
    let Some(req_id) = row[1].as_i64() else {
        return;
    };

    if let Some(field) = tables.get(&req_id) {
        let q = order_keys.get(&field.id).cloned();
        match reqs.get_mut(&field.name) {
            Some(ReqValue::Table { vals, .. }) => vals.push(val),
            _ => {
                reqs.insert(field.name.clone(), ReqValue::Table { vals: vec![val], q });
            }
        }
        return;
    }

    if let Some(field) = head.iter().find(|h| h.id == req_id && !h.is_table_req) {
        let key = match field.ref_id {
            Some(ref_id) => ref_id.to_string(),
            None => field.name.clone(),
        };
        reqs.insert(key, ReqValue::Scalar(val));
        return;
    }

    if let Some(alt) = row[3].as_i64() {
        let label = row[2].to_text();
        if !label.is_empty() {
            reqs.insert(label, ReqValue::Scalar(alt.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqlValue;

    fn scalar_field(id: i64, t: i64, name: &str, ref_id: Option<i64>) -> HeaderField {
        HeaderField {
            id,
            t,
            name: name.to_string(),
            base: 0,
            ref_id,
            is_table_req: false,
            modifiers: Vec::new(),
            original_name: None,
        }
    }

    fn table_field(id: i64, t: i64, name: &str, ordered: bool) -> HeaderField {
        HeaderField {
            id,
            t,
            name: name.to_string(),
            base: 0,
            ref_id: None,
            is_table_req: true,
            modifiers: if ordered {
                vec!["ORDER".to_string()]
            } else {
                Vec::new()
            },
            original_name: None,
        }
    }

    fn req_row(val: &str, req_id: i64, label: &str, alt: Option<i64>) -> Row {
        vec![
            SqlValue::Text(val.to_string()),
            SqlValue::Int(req_id),
            SqlValue::Text(label.to_string()),
            alt.map_or(SqlValue::Null, SqlValue::Int),
        ]
    }

    #[test]
    fn test_scalar_keyed_by_reference_id() {
        let head = vec![scalar_field(307, 71, "Role", Some(71))];
        let tables = table_fields(&head);
        let mut reqs = BTreeMap::new();
        resolve_row(
            &req_row("admin", 307, "Role", None),
            &head,
            &tables,
            &BTreeMap::new(),
            &mut reqs,
        );
        assert_eq!(reqs["71"], ReqValue::Scalar("admin".to_string()));
    }

    #[test]
    fn test_scalar_keyed_by_name_without_reference() {
        let head = vec![scalar_field(308, 90, "Comment", None)];
        let tables = table_fields(&head);
        let mut reqs = BTreeMap::new();
        resolve_row(
            &req_row("hello", 308, "Comment", None),
            &head,
            &tables,
            &BTreeMap::new(),
            &mut reqs,
        );
        assert_eq!(reqs["Comment"], ReqValue::Scalar("hello".to_string()));
    }

    #[test]
    fn test_table_requisite_accumulates_with_order_key() {
        let head = vec![table_field(310, 72, "Items", true)];
        let tables = table_fields(&head);
        let order_keys: BTreeMap<i64, String> = [(310, "3".to_string())].into();
        let mut reqs = BTreeMap::new();
        resolve_row(&req_row("a", 310, "Items", None), &head, &tables, &order_keys, &mut reqs);
        resolve_row(&req_row("b", 310, "Items", None), &head, &tables, &order_keys, &mut reqs);
        assert_eq!(
            reqs["Items"],
            ReqValue::Table {
                vals: vec!["a".to_string(), "b".to_string()],
                q: Some("3".to_string()),
            }
        );
    }

    #[test]
    fn test_table_requisite_without_order_has_no_key() {
        let head = vec![table_field(310, 72, "Tags", false)];
        let tables = table_fields(&head);
        let mut reqs = BTreeMap::new();
        resolve_row(&req_row("x", 310, "Tags", None), &head, &tables, &BTreeMap::new(), &mut reqs);
        assert_eq!(
            reqs["Tags"],
            ReqValue::Table {
                vals: vec!["x".to_string()],
                q: None,
            }
        );
    }

    #[test]
    fn test_unmatched_row_records_referenced_id() {
        let head = vec![scalar_field(307, 71, "Role", Some(71))];
        let tables = table_fields(&head);
        let mut reqs = BTreeMap::new();
        resolve_row(
            &req_row("42", 99, "Weight", Some(555)),
            &head,
            &tables,
            &BTreeMap::new(),
            &mut reqs,
        );
        assert_eq!(reqs["Weight"], ReqValue::Scalar("555".to_string()));
    }

    #[test]
    fn test_unmatched_row_without_side_value_is_dropped() {
        let head = vec![scalar_field(307, 71, "Role", Some(71))];
        let tables = table_fields(&head);
        let mut reqs = BTreeMap::new();
        resolve_row(
            &req_row("noise", 99, "Weight", None),
            &head,
            &tables,
            &BTreeMap::new(),
            &mut reqs,
        );
        assert!(reqs.is_empty());
    }

    #[test]
    fn test_req_value_serialization_shapes() {
        let scalar = ReqValue::Scalar("x".to_string());
        assert_eq!(serde_json::to_string(&scalar).unwrap(), "\"x\"");

        let table = ReqValue::Table {
            vals: vec!["a".to_string()],
            q: Some("1".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&table).unwrap(),
            "{\"vals\":[\"a\"],\"q\":\"1\"}"
        );

        let unordered = ReqValue::Table {
            vals: vec!["a".to_string()],
            q: None,
        };
        assert_eq!(serde_json::to_string(&unordered).unwrap(), "{\"vals\":[\"a\"]}");
    }
}
