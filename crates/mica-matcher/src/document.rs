//! Matchers over whole documents, composed by field path and logical
//! operator.

use std::sync::Arc;

use bson::Bson;

use crate::branched::{BranchedMatcher, eval_branched};
use crate::lookup::{DocNode, Lookup};
use crate::matcher::{DocPredicate, WhereEvaluator};
use crate::result::{MatchResult, and_results};

/// A compiled predicate over a document (or, under `$elemMatch`, a bare
/// array element).
pub(crate) enum DocMatcher {
    Everything,
    Nothing,
    /// Resolve a path, then apply a branched matcher to what it reached.
    FieldPath {
        lookup: Lookup,
        matcher: BranchedMatcher,
    },
    And(Vec<DocMatcher>),
    /// `$or` with one child is collapsed at compile time; this variant
    /// always has two or more and reports no array indices.
    Or(Vec<DocMatcher>),
    Nor(Vec<DocMatcher>),
    Where {
        code: String,
        evaluator: Arc<dyn WhereEvaluator>,
    },
    /// A trusted top-level predicate selector.
    Callable(DocPredicate),
    /// The `_id` shorthand.
    IdEquality(Bson),
}

pub(crate) fn and_document_matchers(mut subs: Vec<DocMatcher>) -> DocMatcher {
    match subs.len() {
        0 => DocMatcher::Everything,
        1 => subs.pop().unwrap(),
        _ => DocMatcher::And(subs),
    }
}

pub(crate) fn eval_document(matcher: &DocMatcher, node: DocNode<'_>) -> MatchResult {
    match matcher {
        DocMatcher::Everything => MatchResult::hit(),
        DocMatcher::Nothing => MatchResult::miss(),
        DocMatcher::FieldPath { lookup, matcher } => {
            let branches = lookup.branches_for_node(node);
            eval_branched(matcher, &branches)
        }
        DocMatcher::And(subs) => {
            and_results(subs.iter().map(|sub| eval_document(sub, node)))
        }
        DocMatcher::Or(subs) => {
            MatchResult::of(subs.iter().any(|sub| eval_document(sub, node).matched))
        }
        DocMatcher::Nor(subs) => {
            MatchResult::of(subs.iter().all(|sub| !eval_document(sub, node).matched))
        }
        DocMatcher::Where { code, evaluator } => match node {
            DocNode::Doc(doc) => MatchResult::of(evaluator.eval(code, doc)),
            DocNode::Array(_) => MatchResult::miss(),
        },
        DocMatcher::Callable(predicate) => match node {
            DocNode::Doc(doc) => MatchResult::of(predicate.call(doc)),
            DocNode::Array(_) => MatchResult::miss(),
        },
        DocMatcher::IdEquality(id) => match node {
            DocNode::Doc(doc) => MatchResult::of(
                doc.get("_id")
                    .is_some_and(|actual| mica_ejson::deep_equals(actual, id)),
            ),
            DocNode::Array(_) => MatchResult::miss(),
        },
    }
}
