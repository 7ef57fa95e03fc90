//! Dotted-path resolution against documents with nested arrays.
//!
//! A [`Lookup`] is compiled once from a path like `a.b.0.c` and then
//! applied to any number of documents, producing the set of [`Branch`]es
//! the path reaches. Arrays fan the path out: a numeric part indexes into
//! an array explicitly, while a non-numeric part also descends into every
//! document element of an array it meets along the way.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::predicates::is_numeric_key;

/// One array step recorded while resolving a path.
///
/// `Explicit` means the path itself named the index (`"a.0"`); `Implicit`
/// means matching fanned out over an array element. Sort-key generation
/// needs the distinction, matching itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStep {
    Explicit(usize),
    Implicit(usize),
}

impl IndexStep {
    /// The array position regardless of how it was reached.
    pub fn index(&self) -> usize {
        match self {
            IndexStep::Explicit(i) | IndexStep::Implicit(i) => *i,
        }
    }
}

/// One candidate value reached by resolving a path through a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch<'a> {
    /// The resolved value; `None` when the field is absent.
    pub value: Option<&'a Bson>,
    /// Array positions walked to reach the value, outermost first. Empty
    /// when the path never crossed an array.
    pub array_indices: Vec<IndexStep>,
    /// Set when the path ended with an explicit numeric index whose
    /// element is itself an array; expansion must not flatten it.
    pub dont_iterate: bool,
}

/// A document node a lookup can start from. `$elemMatch` in document mode
/// matches against bare array elements, so lookups must accept both.
#[derive(Clone, Copy)]
pub(crate) enum DocNode<'a> {
    Doc(&'a Document),
    Array(&'a [Bson]),
}

/// A dotted field path compiled for repeated resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    parts: Vec<String>,
    for_sort: bool,
}

impl Lookup {
    /// Compile a dotted path for matching.
    pub fn new(path: &str) -> Lookup {
        Lookup {
            parts: path.split('.').map(String::from).collect(),
            for_sort: false,
        }
    }

    /// Compile a dotted path for sort-key generation: implicit array
    /// branching is suppressed when the next path part is numeric, so an
    /// explicit index is never shadowed by element fan-out.
    pub fn for_sort(path: &str) -> Lookup {
        Lookup {
            for_sort: true,
            ..Lookup::new(path)
        }
    }

    /// The path as originally written.
    pub fn path(&self) -> String {
        self.parts.join(".")
    }

    /// Resolve against a document, producing every branch the path
    /// reaches.
    pub fn branches<'a>(&self, doc: &'a Document) -> Vec<Branch<'a>> {
        self.branches_for_node(DocNode::Doc(doc))
    }

    pub(crate) fn branches_for_node<'a>(&self, node: DocNode<'a>) -> Vec<Branch<'a>> {
        let mut out = Vec::new();
        self.walk(node, &self.parts, Vec::new(), &mut out);
        out
    }

    fn walk<'a>(
        &self,
        node: DocNode<'a>,
        parts: &[String],
        mut indices: Vec<IndexStep>,
        out: &mut Vec<Branch<'a>>,
    ) {
        let first = parts[0].as_str();
        let rest = &parts[1..];
        let in_array = matches!(node, DocNode::Array(_));

        let child: Option<&'a Bson> = match node {
            DocNode::Array(arr) => {
                if !is_numeric_key(first) {
                    return;
                }
                let index: usize = match first.parse() {
                    Ok(i) => i,
                    Err(_) => return,
                };
                if index >= arr.len() {
                    return;
                }
                indices.push(IndexStep::Explicit(index));
                Some(&arr[index])
            }
            DocNode::Doc(doc) => doc.get(first),
        };

        if rest.is_empty() {
            let dont_iterate = in_array && matches!(child, Some(Bson::Array(_)));
            out.push(Branch {
                value: child,
                array_indices: indices,
                dont_iterate,
            });
            return;
        }

        match child {
            Some(Bson::Document(doc)) => self.walk(DocNode::Doc(doc), rest, indices, out),
            Some(Bson::Array(arr)) => {
                self.walk(DocNode::Array(arr), rest, indices.clone(), out);
                // Implicit branching: descend into each document element
                // as well, unless a sort-mode lookup is about to consume
                // an explicit index.
                if !(self.for_sort && is_numeric_key(rest[0].as_str())) {
                    for (i, element) in arr.iter().enumerate() {
                        if let Bson::Document(doc) = element {
                            let mut fanned = indices.clone();
                            fanned.push(IndexStep::Implicit(i));
                            self.walk(DocNode::Doc(doc), rest, fanned, out);
                        }
                    }
                }
            }
            _ => {
                // A scalar midway through the path dead-ends: the field
                // is absent, except under an array where the branch just
                // disappears.
                if !in_array {
                    out.push(Branch {
                        value: None,
                        array_indices: indices,
                        dont_iterate: false,
                    });
                }
            }
        }
    }
}

/// Flatten arrays found at branch leaves into per-element branches.
///
/// Every input branch is re-emitted as-is, except that `skip_the_arrays`
/// drops branches whose value is an iterable array. Array values
/// additionally yield one branch per element. Branches tagged
/// `dont_iterate` pass through untouched.
pub(crate) fn expand_arrays_in_branches<'a>(
    branches: &[Branch<'a>],
    skip_the_arrays: bool,
) -> Vec<Branch<'a>> {
    let mut out = Vec::new();
    for branch in branches {
        let is_array = matches!(branch.value, Some(Bson::Array(_)));
        if !(skip_the_arrays && is_array && !branch.dont_iterate) {
            out.push(Branch {
                value: branch.value,
                array_indices: branch.array_indices.clone(),
                dont_iterate: false,
            });
        }
        if let Some(Bson::Array(arr)) = branch.value
            && !branch.dont_iterate
        {
            for (i, leaf) in arr.iter().enumerate() {
                let mut indices = branch.array_indices.clone();
                indices.push(IndexStep::Implicit(i));
                out.push(Branch {
                    value: Some(leaf),
                    array_indices: indices,
                    dont_iterate: false,
                });
            }
        }
    }
    out
}
