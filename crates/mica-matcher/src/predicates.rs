//! Structural predicates over selector and document values.

use bson::{Bson, Document};

use crate::error::MatcherError;

/// Non-empty string of ASCII digits, usable as an array index.
pub(crate) fn is_numeric_key(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Array or document.
pub(crate) fn is_indexable(v: &Bson) -> bool {
    matches!(v, Bson::Array(_) | Bson::Document(_))
}

/// Whether every key of `doc` starts with `$`.
///
/// An empty document is not an operator mapping. Mixed operator and plain
/// keys are an error unless `inconsistent_ok`, in which case the mapping
/// counts as plain.
pub(crate) fn is_operator_document(
    doc: &Document,
    inconsistent_ok: bool,
) -> Result<bool, MatcherError> {
    let mut these_are_operators: Option<bool> = None;
    for (key, _) in doc {
        let this_is_operator = key.starts_with('$');
        match these_are_operators {
            None => these_are_operators = Some(this_is_operator),
            Some(prev) if prev != this_is_operator => {
                if !inconsistent_ok {
                    return Err(MatcherError::InvalidSelector(format!(
                        "inconsistent operator keys in {doc}"
                    )));
                }
                these_are_operators = Some(false);
            }
            Some(_) => {}
        }
    }
    Ok(these_are_operators.unwrap_or(false))
}

/// [`is_operator_document`] lifted to any value; non-documents are never
/// operator mappings.
pub(crate) fn is_operator_mapping(v: &Bson, inconsistent_ok: bool) -> Result<bool, MatcherError> {
    match v {
        Bson::Document(d) => is_operator_document(d, inconsistent_ok),
        _ => Ok(false),
    }
}

/// Scalar usable as the `_id` shorthand at the top of a selector.
pub(crate) fn selector_is_id(v: &Bson) -> bool {
    matches!(
        v,
        Bson::String(_)
            | Bson::Int32(_)
            | Bson::Int64(_)
            | Bson::Double(_)
            | Bson::DateTime(_)
            | Bson::ObjectId(_)
    )
}

/// Truthiness in the sense the selector language inherits: null, undefined,
/// false, zero, NaN and the empty string are falsy.
pub(crate) fn is_truthy(v: &Bson) -> bool {
    match v {
        Bson::Null | Bson::Undefined => false,
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0 && !d.is_nan(),
        Bson::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Anything that is not a scalar: documents, arrays, regexes, dates,
/// binaries and the like. Used by the simple-selector analysis.
pub(crate) fn is_object_like(v: &Bson) -> bool {
    !matches!(
        v,
        Bson::String(_)
            | Bson::Int32(_)
            | Bson::Int64(_)
            | Bson::Double(_)
            | Bson::Boolean(_)
            | Bson::Null
            | Bson::Undefined
    )
}
