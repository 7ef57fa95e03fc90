//! Predicates over a single resolved value.
//!
//! Element matchers are the leaves of a compiled selector. Each is built
//! once at compile time and evaluated against `Option<&Bson>`, where
//! `None` means the field was absent.

use std::cmp::Ordering;

use bson::Bson;

use crate::branched::{BranchedMatcher, eval_branched};
use crate::document::{DocMatcher, eval_document};
use crate::error::MatcherError;
use crate::lookup::{Branch, DocNode};

/// Result of an element matcher. `$elemMatch` reports which element
/// matched so the branched layer can seed `array_indices` with it.
pub(crate) enum ElementMatch {
    False,
    True,
    AtIndex(usize),
}

/// A compiled single-value predicate.
pub(crate) enum ElementMatcher {
    /// Literal equality; a null operand also accepts absent fields.
    Equality(Bson),
    Regex(CompiledRegex),
    Compare {
        op: CompareOp,
        operand: Bson,
        operand_type: i32,
    },
    /// Constantly false; an ordered comparison against an array operand.
    Never,
    In(Vec<ElementMatcher>),
    Mod {
        divisor: f64,
        remainder: f64,
    },
    Size(f64),
    Type(f64),
    Exists,
    ElemMatchDoc(Box<DocMatcher>),
    ElemMatchBranched(Box<BranchedMatcher>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    fn relates(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
        }
    }
}

impl ElementMatcher {
    /// `$size` and `$elemMatch` test the array itself, not its leaves.
    pub(crate) fn dont_expand_leaf_arrays(&self) -> bool {
        matches!(
            self,
            ElementMatcher::Size(_)
                | ElementMatcher::ElemMatchDoc(_)
                | ElementMatcher::ElemMatchBranched(_)
        )
    }

    /// `$type` tests leaves only; an array value itself is skipped.
    pub(crate) fn dont_include_leaf_arrays(&self) -> bool {
        matches!(self, ElementMatcher::Type(_))
    }
}

/// A `$regex` or regex-literal operand, compiled once.
///
/// The original pattern and option letters are kept for literal-vs-literal
/// equality; the compiled engine is stateless, so repeated tests of the
/// same value always agree.
pub(crate) struct CompiledRegex {
    source: String,
    options: String,
    re: regex::Regex,
}

/// Build the engine with inline flags. `i`, `m`, `s` and `x` translate
/// directly; `g` only affects cursor state in other engines and is
/// dropped. Unknown letters from regex literals are ignored; `$options`
/// strings are validated before this is called.
pub(crate) fn compile_regex(pattern: &str, options: &str) -> Result<CompiledRegex, MatcherError> {
    let mut flags = String::new();
    for ch in options.chars() {
        if matches!(ch, 'i' | 'm' | 's' | 'x') && !flags.contains(ch) {
            flags.push(ch);
        }
    }
    let translated = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{flags}){pattern}")
    };
    let re = regex::Regex::new(&translated)
        .map_err(|e| MatcherError::InvalidOperand(format!("invalid regex pattern: {e}")))?;
    Ok(CompiledRegex {
        source: pattern.to_string(),
        options: options.to_string(),
        re,
    })
}

fn is_undefined(value: Option<&Bson>) -> bool {
    matches!(value, None | Some(Bson::Undefined))
}

pub(crate) fn eval_element(matcher: &ElementMatcher, value: Option<&Bson>) -> ElementMatch {
    let matched = match matcher {
        ElementMatcher::Equality(operand) => {
            if matches!(operand, Bson::Null | Bson::Undefined) {
                matches!(value, None | Some(Bson::Null) | Some(Bson::Undefined))
            } else {
                value.is_some_and(|v| mica_ejson::deep_equals(operand, v))
            }
        }
        ElementMatcher::Regex(regex) => match value {
            Some(Bson::RegularExpression(literal)) => {
                literal.pattern == regex.source && literal.options == regex.options
            }
            Some(Bson::String(s)) => regex.re.is_match(s),
            _ => false,
        },
        ElementMatcher::Compare {
            op,
            operand,
            operand_type,
        } => {
            let value = match value {
                None | Some(Bson::Undefined) => &Bson::Null,
                Some(v) => v,
            };
            mica_ejson::type_of(value) == *operand_type
                && op.relates(mica_ejson::cmp(value, operand))
        }
        ElementMatcher::Never => false,
        ElementMatcher::In(options) => options
            .iter()
            .any(|option| matches!(eval_element(option, value), ElementMatch::True)),
        ElementMatcher::Mod { divisor, remainder } => value
            .and_then(mica_ejson::as_f64)
            .is_some_and(|v| v % divisor == *remainder),
        ElementMatcher::Size(size) => {
            matches!(value, Some(Bson::Array(arr)) if arr.len() as f64 == *size)
        }
        ElementMatcher::Type(code) => {
            !is_undefined(value)
                && value.is_some_and(|v| mica_ejson::type_of(v) as f64 == *code)
        }
        ElementMatcher::Exists => !is_undefined(value),
        ElementMatcher::ElemMatchDoc(doc_matcher) => {
            let Some(Bson::Array(arr)) = value else {
                return ElementMatch::False;
            };
            for (i, element) in arr.iter().enumerate() {
                let node = match element {
                    Bson::Document(doc) => DocNode::Doc(doc),
                    Bson::Array(inner) => DocNode::Array(inner),
                    _ => return ElementMatch::False,
                };
                if eval_document(doc_matcher, node).matched {
                    return ElementMatch::AtIndex(i);
                }
            }
            return ElementMatch::False;
        }
        ElementMatcher::ElemMatchBranched(branched) => {
            let Some(Bson::Array(arr)) = value else {
                return ElementMatch::False;
            };
            for (i, element) in arr.iter().enumerate() {
                let branch = Branch {
                    value: Some(element),
                    array_indices: Vec::new(),
                    dont_iterate: true,
                };
                if eval_branched(branched, &[branch]).matched {
                    return ElementMatch::AtIndex(i);
                }
            }
            return ElementMatch::False;
        }
    };
    if matched {
        ElementMatch::True
    } else {
        ElementMatch::False
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::bson;

    fn matched(m: &ElementMatcher, value: &Bson) -> bool {
        matches!(eval_element(m, Some(value)), ElementMatch::True)
    }

    #[test]
    fn null_equality_accepts_absent_and_null() {
        let m = ElementMatcher::Equality(Bson::Null);
        assert!(matches!(eval_element(&m, None), ElementMatch::True));
        assert!(matched(&m, &Bson::Null));
        assert!(!matched(&m, &bson!(0)));
    }

    #[test]
    fn regex_matches_strings_and_identical_literals() {
        let m = ElementMatcher::Regex(compile_regex("^ab", "i").unwrap());
        assert!(matched(&m, &bson!("ABide")));
        assert!(!matched(&m, &bson!("xab")));
        let same = Bson::RegularExpression(bson::Regex {
            pattern: "^ab".into(),
            options: "i".into(),
        });
        assert!(matched(&m, &same));
        let different_flags = Bson::RegularExpression(bson::Regex {
            pattern: "^ab".into(),
            options: "".into(),
        });
        assert!(!matched(&m, &different_flags));
        assert!(!matched(&m, &bson!(12)));
    }

    #[test]
    fn global_flag_is_stateless() {
        let m = ElementMatcher::Regex(compile_regex("a", "g").unwrap());
        assert!(matched(&m, &bson!("banana")));
        assert!(matched(&m, &bson!("banana")));
    }

    #[test]
    fn comparison_requires_same_type_code() {
        let m = ElementMatcher::Compare {
            op: CompareOp::Gt,
            operand: bson!(5),
            operand_type: 1,
        };
        assert!(matched(&m, &bson!(7)));
        assert!(matched(&m, &bson!(5.5)));
        assert!(!matched(&m, &bson!(5)));
        assert!(!matched(&m, &bson!("x")));
    }

    #[test]
    fn null_comparison_covers_absent_values() {
        let m = ElementMatcher::Compare {
            op: CompareOp::Gte,
            operand: Bson::Null,
            operand_type: 10,
        };
        assert!(matches!(eval_element(&m, None), ElementMatch::True));
        assert!(matched(&m, &Bson::Null));
        assert!(!matched(&m, &bson!(1)));
    }

    #[test]
    fn modulo() {
        let m = ElementMatcher::Mod {
            divisor: 4.0,
            remainder: 1.0,
        };
        assert!(matched(&m, &bson!(9)));
        assert!(!matched(&m, &bson!(8)));
        assert!(!matched(&m, &bson!("9")));
    }

    #[test]
    fn size_compares_array_length_exactly() {
        let m = ElementMatcher::Size(2.0);
        assert!(matched(&m, &bson!([1, 2])));
        assert!(!matched(&m, &bson!([1])));
        assert!(!matched(&m, &bson!("ab")));
        let fractional = ElementMatcher::Size(1.5);
        assert!(!matched(&fractional, &bson!([1])));
    }

    #[test]
    fn type_code_checks() {
        let m = ElementMatcher::Type(2.0);
        assert!(matched(&m, &bson!("s")));
        assert!(!matched(&m, &bson!(1)));
        assert!(matches!(eval_element(&m, None), ElementMatch::False));
    }

    #[test]
    fn exists_treats_undefined_as_absent() {
        let m = ElementMatcher::Exists;
        assert!(matched(&m, &Bson::Null));
        assert!(matches!(eval_element(&m, None), ElementMatch::False));
        assert!(!matched(&m, &Bson::Undefined));
    }

    #[test]
    fn in_matches_any_option() {
        let m = ElementMatcher::In(vec![
            ElementMatcher::Equality(bson!(1)),
            ElementMatcher::Regex(compile_regex("^z", "").unwrap()),
        ]);
        assert!(matched(&m, &bson!(1)));
        assert!(matched(&m, &bson!("zed")));
        assert!(!matched(&m, &bson!("ed")));
    }
}
