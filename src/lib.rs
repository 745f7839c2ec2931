//! Quintet query compilation engine
//!
//! All domain data lives in one generic table per tenant: every record is a
//! Node `{id, t, up, val}`, and the schema (terms, requisites, modifiers) is
//! made of Nodes too. This crate turns that layout back into relational
//! shapes:
//!
//! - [`compiler`] — compiles a declarative column list into one flat SQL
//!   SELECT over self-joins of the generic table;
//! - [`listing`] — renders a term's entities as a paginated list with
//!   resolved scalar and table requisites, filters compiled into joins and
//!   bound parameters;
//! - [`store`] — the two seams to the outside: synchronous SQL execution
//!   and term metadata loading.
//!
//! The compilers are pure and allocate all state per call; the only
//! blocking operations are the store round trips.

pub mod codes;
pub mod compiler;
pub mod config;
pub mod error;
pub mod listing;
pub mod sql;
pub mod store;

pub use compiler::{CompiledQuery, QueryColumn, QueryCompiler, QueryRequest};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use listing::{ListingRequest, ListingService, ObjectRow, ReqValue, TermObjects};
pub use store::{EntityStore, MetadataLoader, Node, Params, Row, SqlValue};
