//! Selector compiler and matcher core of the mica document query engine.
//!
//! A selector (the declarative query document of the MongoDB query
//! language) is compiled once into a [`Matcher`]; the matcher is then
//! applied to any number of documents, deciding whether each matches and
//! reporting the array indices traversed and, for `$near`, the distance
//! used by nearest-first sorting.
//!
//! ```
//! use bson::doc;
//! use mica_matcher::Matcher;
//!
//! let matcher = Matcher::new(doc! { "score": { "$gt": 5 } }).unwrap();
//! assert!(matcher.document_matches(&doc! { "score": [3, 8, 4] }).matched);
//! ```

mod branched;
mod compile;
mod document;
mod element;
mod error;
mod lookup;
mod matcher;
mod near;
mod predicates;
mod result;

pub use bson::{Bson, Document};

pub use error::MatcherError;
pub use lookup::{Branch, IndexStep, Lookup};
pub use matcher::{DocPredicate, Matcher, Selector, WhereEvaluator};
pub use result::MatchResult;
