//! Typed comparison primitives over [`bson::Bson`] values.
//!
//! Query semantics treat all numeric variants (`Int32`, `Int64`, `Double`)
//! as one numeric type, compare documents key-order-sensitively, and order
//! values of different types by a canonical type order. Everything here is
//! pure; the matcher crate consumes these as its injected value comparator.

use std::cmp::Ordering;

use bson::Bson;

/// Query-level type code for a value.
///
/// All numbers collapse to code 1; the remaining codes are the classic BSON
/// element type numbers. `$type` matches against these.
pub fn type_of(v: &Bson) -> i32 {
    match v {
        Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_) => 1,
        Bson::String(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::Binary(_) => 5,
        Bson::Undefined => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Null => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) => 12,
        Bson::JavaScriptCode(_) => 13,
        Bson::Symbol(_) => 14,
        Bson::JavaScriptCodeWithScope(_) => 15,
        Bson::Timestamp(_) => 17,
        Bson::Decimal128(_) => 19,
        Bson::MinKey => -1,
        Bson::MaxKey => 127,
    }
}

/// Rank of a type code in the canonical cross-type sort order.
///
/// Null sorts before numbers, then strings, documents, arrays, binary,
/// object ids, booleans, dates, and regular expressions.
fn type_order(code: i32) -> i32 {
    match code {
        -1 => -2,
        10 | 6 => 0,
        1 | 19 => 1,
        2 | 14 => 2,
        3 => 3,
        4 => 4,
        5 => 5,
        7 => 6,
        8 => 7,
        9 | 17 => 8,
        11 => 9,
        127 => 127,
        _ => 100,
    }
}

/// Numeric view of a value, if it has one.
pub fn as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Double(d) => Some(*d),
        Bson::Int32(i) => Some(*i as f64),
        Bson::Int64(i) => Some(*i as f64),
        _ => None,
    }
}

/// Whether the value is a binary blob.
pub fn is_binary(v: &Bson) -> bool {
    matches!(v, Bson::Binary(_))
}

/// Structural deep clone.
pub fn clone_value(v: &Bson) -> Bson {
    v.clone()
}

/// Extended-JSON deep equality.
///
/// Numbers compare by value across variants, documents compare
/// key-order-sensitively, regular expressions compare pattern and options
/// textually, binary blobs compare subtype and bytes. `Undefined` equals
/// only itself — the selector's null/undefined conflation happens in the
/// equality matcher, not here.
pub fn deep_equals(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Array(x), Bson::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| deep_equals(l, r))
        }
        (Bson::Document(x), Bson::Document(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && deep_equals(va, vb))
        }
        (Bson::String(x), Bson::String(y)) => x == y,
        (Bson::Boolean(x), Bson::Boolean(y)) => x == y,
        (Bson::Null, Bson::Null) => true,
        (Bson::Undefined, Bson::Undefined) => true,
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis() == y.timestamp_millis()
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x == y,
        (Bson::Binary(x), Bson::Binary(y)) => x.subtype == y.subtype && x.bytes == y.bytes,
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => {
            x.pattern == y.pattern && x.options == y.options
        }
        (Bson::Symbol(x), Bson::Symbol(y)) => x == y,
        (Bson::JavaScriptCode(x), Bson::JavaScriptCode(y)) => x == y,
        (Bson::Timestamp(x), Bson::Timestamp(y)) => x == y,
        (Bson::Decimal128(x), Bson::Decimal128(y)) => x == y,
        (Bson::MinKey, Bson::MinKey) | (Bson::MaxKey, Bson::MaxKey) => true,
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Canonical total order.
///
/// Values of different type codes order by [`type_order`]; values of the
/// same code order by value. Regular expressions order by pattern then
/// options so that the order stays total.
pub fn cmp(a: &Bson, b: &Bson) -> Ordering {
    let (ta, tb) = (type_of(a), type_of(b));
    let (oa, ob) = (type_order(ta), type_order(tb));
    if oa != ob {
        return oa.cmp(&ob);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::Null | Bson::Undefined, Bson::Null | Bson::Undefined) => Ordering::Equal,
        (Bson::MinKey, Bson::MinKey) | (Bson::MaxKey, Bson::MaxKey) => Ordering::Equal,
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            x.timestamp_millis().cmp(&y.timestamp_millis())
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Array(x), Bson::Array(y)) => cmp_arrays(x, y),
        (Bson::Document(x), Bson::Document(y)) => cmp_documents(x, y),
        (Bson::Binary(x), Bson::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => x
            .pattern
            .cmp(&y.pattern)
            .then_with(|| x.options.cmp(&y.options)),
        (Bson::JavaScriptCode(x), Bson::JavaScriptCode(y)) => x.cmp(y),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            x.time.cmp(&y.time).then_with(|| x.increment.cmp(&y.increment))
        }
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

fn cmp_arrays(a: &[Bson], b: &[Bson]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = cmp(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Documents compare as interleaved key/value sequences: first differing
/// key (string order) or value wins, then length.
fn cmp_documents(a: &bson::Document, b: &bson::Document) -> Ordering {
    for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
        let ord = ka.cmp(kb);
        if ord != Ordering::Equal {
            return ord;
        }
        let ord = cmp(va, vb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}
