//! The compiled-selector façade.

use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document, doc};

use crate::compile::{CompileCtx, CompileOptions, compile_document_selector};
use crate::document::{DocMatcher, eval_document};
use crate::error::MatcherError;
use crate::lookup::DocNode;
use crate::predicates::{is_truthy, selector_is_id};
use crate::result::MatchResult;

/// Executes `$where` code against candidate documents.
///
/// The matcher core has no script engine; callers that accept `$where`
/// selectors inject one via [`Matcher::with_where_evaluator`]. The code is
/// trusted, so panics propagate to the caller unchanged.
pub trait WhereEvaluator: Send + Sync {
    fn eval(&self, code: &str, doc: &Document) -> bool;
}

/// A trusted predicate usable as a whole selector.
#[derive(Clone)]
pub struct DocPredicate(Arc<dyn Fn(&Document) -> bool + Send + Sync>);

impl DocPredicate {
    pub fn new(predicate: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Self {
        DocPredicate(Arc::new(predicate))
    }

    pub(crate) fn call(&self, doc: &Document) -> bool {
        (self.0)(doc)
    }
}

impl fmt::Debug for DocPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocPredicate(..)")
    }
}

/// What a matcher can be compiled from.
#[derive(Debug)]
pub enum Selector {
    /// The usual case: a selector document.
    Document(Document),
    /// A bare top-level value: an `_id` scalar shorthand, or a falsy
    /// value meaning "match nothing".
    Value(Bson),
    /// A trusted predicate.
    Predicate(DocPredicate),
}

impl Selector {
    /// Wrap a closure as a predicate selector.
    pub fn predicate(predicate: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Selector {
        Selector::Predicate(DocPredicate::new(predicate))
    }
}

impl From<Document> for Selector {
    fn from(doc: Document) -> Selector {
        Selector::Document(doc)
    }
}

impl From<Bson> for Selector {
    fn from(value: Bson) -> Selector {
        match value {
            Bson::Document(doc) => Selector::Document(doc),
            other => Selector::Value(other),
        }
    }
}

impl From<DocPredicate> for Selector {
    fn from(predicate: DocPredicate) -> Selector {
        Selector::Predicate(predicate)
    }
}

/// A selector compiled into an executable matcher.
///
/// Compilation validates the whole selector up front; matching cannot
/// fail. A matcher is immutable and can be shared across threads.
pub struct Matcher {
    selector: Option<Document>,
    doc_matcher: DocMatcher,
    is_simple: bool,
    has_where: bool,
    has_geo_query: bool,
    paths: Vec<String>,
}

impl Matcher {
    /// Compile a selector. `$where` selectors are rejected here; use
    /// [`Matcher::with_where_evaluator`] for those.
    pub fn new(selector: impl Into<Selector>) -> Result<Matcher, MatcherError> {
        Matcher::compile(selector.into(), None)
    }

    /// Compile a selector that may contain `$where`, executing its code
    /// through `evaluator`.
    pub fn with_where_evaluator(
        selector: impl Into<Selector>,
        evaluator: Arc<dyn WhereEvaluator>,
    ) -> Result<Matcher, MatcherError> {
        Matcher::compile(selector.into(), Some(evaluator))
    }

    fn compile(
        selector: Selector,
        where_evaluator: Option<Arc<dyn WhereEvaluator>>,
    ) -> Result<Matcher, MatcherError> {
        let mut cx = CompileCtx::new(where_evaluator);
        let (stored, doc_matcher) = match selector {
            Selector::Predicate(predicate) => {
                cx.is_simple = false;
                cx.record_path("");
                (None, DocMatcher::Callable(predicate))
            }
            Selector::Value(value) if selector_is_id(&value) => {
                cx.record_path("_id");
                (Some(doc! { "_id": value.clone() }), DocMatcher::IdEquality(value))
            }
            Selector::Value(value) if !is_truthy(&value) => {
                cx.is_simple = false;
                (None, DocMatcher::Nothing)
            }
            Selector::Value(value) => {
                return Err(MatcherError::InvalidSelector(format!(
                    "unsupported top-level value {value}"
                )));
            }
            Selector::Document(selector) => {
                // {_id: falsy} can never match; _id values are never
                // falsy.
                if selector.get("_id").is_some_and(|id| !is_truthy(id)) {
                    cx.is_simple = false;
                    (None, DocMatcher::Nothing)
                } else {
                    let compiled = compile_document_selector(
                        &selector,
                        &mut cx,
                        CompileOptions {
                            in_elem_match: false,
                            is_root: true,
                        },
                    )?;
                    (Some(selector), compiled)
                }
            }
        };
        Ok(Matcher {
            selector: stored,
            doc_matcher,
            is_simple: cx.is_simple,
            has_where: cx.has_where,
            has_geo_query: cx.has_geo_query,
            paths: cx.paths,
        })
    }

    /// Apply the matcher to one document.
    pub fn document_matches(&self, doc: &Document) -> MatchResult {
        eval_document(&self.doc_matcher, DocNode::Doc(doc))
    }

    /// Whether the selector contains `$near`.
    pub fn has_geo_query(&self) -> bool {
        self.has_geo_query
    }

    /// Whether the selector contains `$where`.
    pub fn has_where(&self) -> bool {
        self.has_where
    }

    /// True when the selector uses only implicit equality and
    /// scalar-operand comparison, inclusion and `$ne` operators, so an
    /// index or fast path can serve it.
    pub fn is_simple(&self) -> bool {
        self.is_simple
    }

    /// Field paths the selector reads, in first-use order. Contains the
    /// empty sentinel when a `$where` or predicate selector may read
    /// anything.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// The normalized selector document retained at compile time, when
    /// there is one.
    pub fn selector(&self) -> Option<&Document> {
        self.selector.as_ref()
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matcher")
            .field("selector", &self.selector)
            .field("is_simple", &self.is_simple)
            .field("has_where", &self.has_where)
            .field("has_geo_query", &self.has_geo_query)
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}
