//! `$near` compilation and evaluation.
//!
//! Two operand shapes: a GeoJSON `{$geometry: ..., $maxDistance: ...}`
//! document using geodesic distance, and a legacy coordinate pair using
//! plain Euclidean distance with `$maxDistance` read from the sibling
//! selector. A document may hold several candidate points under one
//! field; only the nearest in-range branch is reported, which feeds the
//! implicit nearest-first sort upstream.

use bson::{Bson, Document};

use crate::error::MatcherError;
use crate::lookup::{Branch, expand_arrays_in_branches};
use crate::predicates::is_indexable;
use crate::result::MatchResult;

#[derive(Debug)]
pub(crate) struct NearMatcher {
    mode: NearMode,
    max_distance: Option<f64>,
}

#[derive(Debug)]
enum NearMode {
    /// Geodesic distance to a GeoJSON geometry.
    Geometry(Document),
    /// Euclidean distance to a flat coordinate pair. `None` when the
    /// operand's components were not numeric; such a matcher sees every
    /// candidate as out of range.
    Pair(Option<(f64, f64)>),
}

/// First two numeric entries of an array or document, in order.
fn point_to_pair(v: &Bson) -> Option<(f64, f64)> {
    let mut components = match v {
        Bson::Array(arr) => arr.iter(),
        Bson::Document(doc) => return pair_from_values(doc.values()),
        _ => return None,
    };
    let x = mica_ejson::as_f64(components.next()?)?;
    let y = mica_ejson::as_f64(components.next()?)?;
    Some((x, y))
}

fn pair_from_values<'a>(mut values: impl Iterator<Item = &'a Bson>) -> Option<(f64, f64)> {
    let x = mica_ejson::as_f64(values.next()?)?;
    let y = mica_ejson::as_f64(values.next()?)?;
    Some((x, y))
}

pub(crate) fn compile_near(
    operand: &Bson,
    value_selector: &Document,
) -> Result<NearMatcher, MatcherError> {
    if let Bson::Document(operand) = operand
        && operand.contains_key("$geometry")
    {
        let geometry = match operand.get("$geometry") {
            Some(Bson::Document(g)) => g.clone(),
            _ => {
                return Err(MatcherError::InvalidOperand(
                    "$geometry must be a GeoJSON document".into(),
                ));
            }
        };
        let max_distance = operand.get("$maxDistance").and_then(mica_ejson::as_f64);
        return Ok(NearMatcher {
            mode: NearMode::Geometry(geometry),
            max_distance,
        });
    }
    if !is_indexable(operand) {
        return Err(MatcherError::InvalidOperand(
            "$near argument must be coordinate pair or GeoJSON".into(),
        ));
    }
    let max_distance = value_selector
        .get("$maxDistance")
        .and_then(mica_ejson::as_f64);
    Ok(NearMatcher {
        mode: NearMode::Pair(point_to_pair(operand)),
        max_distance,
    })
}

/// Distance from the query point to one candidate value, or `None` when
/// the candidate does not denote a location.
fn distance_to(near: &NearMatcher, value: Option<&Bson>) -> Option<f64> {
    match &near.mode {
        NearMode::Geometry(point) => {
            let Some(Bson::Document(candidate)) = value else {
                return None;
            };
            match candidate.get_str("type") {
                Ok("Point") => mica_geo::point_distance(point, candidate),
                Ok(_) => {
                    // Non-point geometries only get a coarse in/out
                    // ordering relative to the radius.
                    let max = near.max_distance?;
                    if mica_geo::geometry_within_radius(candidate, point, max) {
                        Some(0.0)
                    } else {
                        Some(max + 1.0)
                    }
                }
                Err(_) => None,
            }
        }
        NearMode::Pair(pair) => {
            let (px, py) = (*pair)?;
            let value = value.filter(|v| is_indexable(v))?;
            let (vx, vy) = point_to_pair(value)?;
            Some(((px - vx).powi(2) + (py - vy).powi(2)).sqrt())
        }
    }
}

/// Expand every branch and keep the strictly nearest in-range candidate;
/// ties keep the earlier branch.
pub(crate) fn eval_near(near: &NearMatcher, branches: &[Branch<'_>]) -> MatchResult {
    let mut best: Option<MatchResult> = None;
    for branch in expand_arrays_in_branches(branches, false) {
        let Some(distance) = distance_to(near, branch.value) else {
            continue;
        };
        if let Some(max) = near.max_distance
            && distance > max
        {
            continue;
        }
        if let Some(incumbent) = &best
            && incumbent.distance.is_some_and(|d| d <= distance)
        {
            continue;
        }
        best = Some(MatchResult {
            matched: true,
            array_indices: (!branch.array_indices.is_empty()).then_some(branch.array_indices),
            distance: Some(distance),
        });
    }
    best.unwrap_or_else(MatchResult::miss)
}
