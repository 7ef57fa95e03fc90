//! Matchers lifted over the set of branches a path lookup produced.

use crate::element::{ElementMatch, ElementMatcher, eval_element};
use crate::lookup::{Branch, IndexStep, expand_arrays_in_branches};
use crate::near::{NearMatcher, eval_near};
use crate::result::{MatchResult, and_results};

/// A compiled predicate over a sequence of branches.
pub(crate) enum BranchedMatcher {
    /// An element matcher applied across (usually expanded) branches.
    Element(ElementMatcher),
    /// Negation; array indices are meaningless once inverted and are
    /// dropped.
    Not(Box<BranchedMatcher>),
    And(Vec<BranchedMatcher>),
    Everything,
    Nothing,
    Near(NearMatcher),
}

/// Collapse an AND of branched matchers the same way the document layer
/// does: no children always match, a single child stands alone.
pub(crate) fn and_branched_matchers(mut subs: Vec<BranchedMatcher>) -> BranchedMatcher {
    match subs.len() {
        0 => BranchedMatcher::Everything,
        1 => subs.pop().unwrap(),
        _ => BranchedMatcher::And(subs),
    }
}

pub(crate) fn eval_branched(matcher: &BranchedMatcher, branches: &[Branch<'_>]) -> MatchResult {
    match matcher {
        BranchedMatcher::Element(element) => {
            let expanded = if element.dont_expand_leaf_arrays() {
                branches.to_vec()
            } else {
                expand_arrays_in_branches(branches, element.dont_include_leaf_arrays())
            };
            for mut branch in expanded {
                let matched = match eval_element(element, branch.value) {
                    ElementMatch::False => false,
                    ElementMatch::True => true,
                    ElementMatch::AtIndex(i) => {
                        if branch.array_indices.is_empty() {
                            branch.array_indices = vec![IndexStep::Implicit(i)];
                        }
                        true
                    }
                };
                if matched {
                    let array_indices =
                        (!branch.array_indices.is_empty()).then_some(branch.array_indices);
                    return MatchResult {
                        matched: true,
                        array_indices,
                        distance: None,
                    };
                }
            }
            MatchResult::miss()
        }
        BranchedMatcher::Not(inner) => {
            MatchResult::of(!eval_branched(inner, branches).matched)
        }
        BranchedMatcher::And(subs) => {
            and_results(subs.iter().map(|sub| eval_branched(sub, branches)))
        }
        BranchedMatcher::Everything => MatchResult::hit(),
        BranchedMatcher::Nothing => MatchResult::miss(),
        BranchedMatcher::Near(near) => eval_near(near, branches),
    }
}
