//! `cql-builder` is an editable model of a token-sequence query: an ordered
//! list of tokens, each owning a tree of boolean groups over field
//! predicates. The model serializes to query text and can be rebuilt from
//! it.
//!
//! ## Examples
//!
//! ```rust
//! use cql_builder::{Comparator, Operator, Predicate, Query};
//!
//! let mut query = Query::default();
//! let token = query.token_ids()[0];
//! let root = query.token(token).unwrap().root();
//! let empty = query.children(root)[0];
//! query.set_value(empty, "house").unwrap();
//!
//! query
//!     .add_predicate(root, Predicate::new("pos", Comparator::StartsWith, "N"), Operator::And, None)
//!     .unwrap();
//! assert_eq!(query.serialize(), "[word = \"house\" & pos = \"N.*\"]");
//!
//! query.load("[lemma=\"run\"][]{0,2} within <s/>").unwrap();
//! assert_eq!(query.len(), 2);
//! ```
mod error;
mod group;
mod node;
mod predicate;
mod query;
mod reconcile;
mod serialize;
mod settings;
mod token;
mod view;

pub use error::{
    BuilderError, ConfigError, ConstraintError, InvariantViolation, ParseFailure,
};
pub use node::{Group, Node, NodeId, NodeKind, Operator};
pub use predicate::{
    ALTERNATION, CASE_MARKER, CASE_MARKER_COMPAT, Comparator, Predicate, WILDCARD,
    values_from_list,
};
pub use query::{Query, Scope};
pub use reconcile::parse;
pub use serialize::serialize_predicate;
pub use settings::{FieldSpec, Settings};
pub use token::{Token, TokenId};
pub use view::TreeView;
