//! Recursive translation of a selector tree into the matcher AST.
//!
//! Walks the selector once, validating shapes and operands as it goes,
//! and accumulates the introspection flags (`is_simple`, `has_where`,
//! `has_geo_query`, referenced paths) on the shared compile state.

use std::sync::Arc;

use bson::{Bson, Document};

use crate::branched::{BranchedMatcher, and_branched_matchers};
use crate::document::{DocMatcher, and_document_matchers};
use crate::element::{CompareOp, ElementMatcher, compile_regex};
use crate::error::MatcherError;
use crate::lookup::Lookup;
use crate::matcher::WhereEvaluator;
use crate::near;
use crate::predicates::{
    is_object_like, is_operator_document, is_operator_mapping, is_truthy,
};

/// Mutable state threaded through one compilation.
pub(crate) struct CompileCtx {
    pub(crate) is_simple: bool,
    pub(crate) has_where: bool,
    pub(crate) has_geo_query: bool,
    pub(crate) paths: Vec<String>,
    pub(crate) where_evaluator: Option<Arc<dyn WhereEvaluator>>,
}

impl CompileCtx {
    pub(crate) fn new(where_evaluator: Option<Arc<dyn WhereEvaluator>>) -> Self {
        CompileCtx {
            is_simple: true,
            has_where: false,
            has_geo_query: false,
            paths: Vec::new(),
            where_evaluator,
        }
    }

    pub(crate) fn record_path(&mut self, path: &str) {
        if !self.paths.iter().any(|p| p == path) {
            self.paths.push(path.to_string());
        }
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct CompileOptions {
    /// Inside `$elemMatch` document mode field paths are relative to the
    /// element and are not recorded on the matcher.
    pub(crate) in_elem_match: bool,
    /// True only for the selector's top level; `$near` is legal nowhere
    /// else.
    pub(crate) is_root: bool,
}

pub(crate) fn compile_document_selector(
    selector: &Document,
    cx: &mut CompileCtx,
    options: CompileOptions,
) -> Result<DocMatcher, MatcherError> {
    let mut doc_matchers = Vec::new();
    for (key, sub_selector) in selector {
        if key.starts_with('$') {
            cx.is_simple = false;
            doc_matchers.push(compile_logical_operator(key, sub_selector, cx, options)?);
        } else {
            if !options.in_elem_match {
                cx.record_path(key);
            }
            let lookup = Lookup::new(key);
            let matcher = compile_value_selector(sub_selector, cx, options.is_root)?;
            doc_matchers.push(DocMatcher::FieldPath { lookup, matcher });
        }
    }
    Ok(and_document_matchers(doc_matchers))
}

fn compile_logical_operator(
    key: &str,
    sub_selector: &Bson,
    cx: &mut CompileCtx,
    options: CompileOptions,
) -> Result<DocMatcher, MatcherError> {
    match key {
        "$and" => {
            let subs = compile_selector_array(sub_selector, cx, options.in_elem_match)?;
            Ok(and_document_matchers(subs))
        }
        "$or" => {
            let mut subs = compile_selector_array(sub_selector, cx, options.in_elem_match)?;
            // A single-clause $or is the clause itself, array indices
            // included; only the many-clause form discards them.
            if subs.len() == 1 {
                Ok(subs.pop().unwrap())
            } else {
                Ok(DocMatcher::Or(subs))
            }
        }
        "$nor" => {
            let subs = compile_selector_array(sub_selector, cx, options.in_elem_match)?;
            Ok(DocMatcher::Nor(subs))
        }
        "$where" => compile_where(sub_selector, cx),
        "$comment" => Ok(DocMatcher::Everything),
        _ => Err(MatcherError::UnknownOperator(format!(
            "unrecognized logical operator: {key}"
        ))),
    }
}

/// `$and`/`$or`/`$nor` operands: a non-empty array of plain documents.
fn compile_selector_array(
    sub_selector: &Bson,
    cx: &mut CompileCtx,
    in_elem_match: bool,
) -> Result<Vec<DocMatcher>, MatcherError> {
    let selectors = match sub_selector {
        Bson::Array(arr) if !arr.is_empty() => arr,
        _ => {
            return Err(MatcherError::InvalidSelector(
                "$and/$or/$nor must be nonempty array".into(),
            ));
        }
    };
    selectors
        .iter()
        .map(|entry| match entry {
            Bson::Document(doc) => compile_document_selector(
                doc,
                cx,
                CompileOptions {
                    in_elem_match,
                    is_root: false,
                },
            ),
            _ => Err(MatcherError::InvalidSelector(
                "$and/$or/$nor entries need to be full documents".into(),
            )),
        })
        .collect()
}

fn compile_where(operand: &Bson, cx: &mut CompileCtx) -> Result<DocMatcher, MatcherError> {
    cx.has_where = true;
    cx.record_path("");
    let code = match operand {
        Bson::String(code) => code.clone(),
        Bson::JavaScriptCode(code) => code.clone(),
        _ => {
            return Err(MatcherError::InvalidOperand(
                "$where requires a string or code operand".into(),
            ));
        }
    };
    let evaluator = cx.where_evaluator.clone().ok_or_else(|| {
        MatcherError::OperatorContext("$where requires a where evaluator".into())
    })?;
    Ok(DocMatcher::Where { code, evaluator })
}

/// Compile the value half of a `field: value` entry: a regex literal, an
/// operator mapping, or a plain value matched by equality.
pub(crate) fn compile_value_selector(
    value_selector: &Bson,
    cx: &mut CompileCtx,
    is_root: bool,
) -> Result<BranchedMatcher, MatcherError> {
    match value_selector {
        Bson::RegularExpression(regex) => {
            cx.is_simple = false;
            let compiled = compile_regex(&regex.pattern, &regex.options)?;
            Ok(BranchedMatcher::Element(ElementMatcher::Regex(compiled)))
        }
        Bson::Document(doc) => {
            if is_operator_document(doc, false)? {
                operator_branched_matcher(doc, cx, is_root)
            } else {
                Ok(BranchedMatcher::Element(compile_equality(value_selector)?))
            }
        }
        _ => Ok(BranchedMatcher::Element(compile_equality(value_selector)?)),
    }
}

fn operator_branched_matcher(
    value_selector: &Document,
    cx: &mut CompileCtx,
    is_root: bool,
) -> Result<BranchedMatcher, MatcherError> {
    let mut subs = Vec::new();
    for (operator, operand) in value_selector {
        let simple_range = matches!(operator.as_str(), "$lt" | "$lte" | "$gt" | "$gte")
            && mica_ejson::as_f64(operand).is_some();
        let simple_equality =
            matches!(operator.as_str(), "$eq" | "$ne") && !is_object_like(operand);
        let simple_inclusion = matches!(operator.as_str(), "$in" | "$nin")
            && matches!(operand, Bson::Array(options) if options.iter().all(|o| !is_object_like(o)));
        if !(simple_range || simple_equality || simple_inclusion) {
            cx.is_simple = false;
        }
        subs.push(compile_operator(
            operator,
            operand,
            value_selector,
            cx,
            is_root,
        )?);
    }
    Ok(and_branched_matchers(subs))
}

fn compile_operator(
    operator: &str,
    operand: &Bson,
    value_selector: &Document,
    cx: &mut CompileCtx,
    is_root: bool,
) -> Result<BranchedMatcher, MatcherError> {
    match operator {
        // Branched operators.
        "$not" => Ok(BranchedMatcher::Not(Box::new(compile_value_selector(
            operand, cx, false,
        )?))),
        "$ne" => Ok(BranchedMatcher::Not(Box::new(BranchedMatcher::Element(
            compile_equality(operand)?,
        )))),
        "$nin" => Ok(BranchedMatcher::Not(Box::new(BranchedMatcher::Element(
            compile_in(operand)?,
        )))),
        "$exists" => {
            let exists = BranchedMatcher::Element(ElementMatcher::Exists);
            if is_truthy(operand) {
                Ok(exists)
            } else {
                Ok(BranchedMatcher::Not(Box::new(exists)))
            }
        }
        "$options" => {
            // Consumed by the sibling $regex; only its presence matters.
            if value_selector.contains_key("$regex") {
                Ok(BranchedMatcher::Everything)
            } else {
                Err(MatcherError::OperatorContext("$options needs a $regex".into()))
            }
        }
        "$maxDistance" => {
            if value_selector.contains_key("$near") {
                Ok(BranchedMatcher::Everything)
            } else {
                Err(MatcherError::OperatorContext(
                    "$maxDistance needs a $near".into(),
                ))
            }
        }
        "$all" => compile_all(operand, cx),
        "$near" => {
            if !is_root {
                return Err(MatcherError::OperatorContext(
                    "$near can't be inside another $ operator".into(),
                ));
            }
            cx.has_geo_query = true;
            Ok(BranchedMatcher::Near(near::compile_near(
                operand,
                value_selector,
            )?))
        }
        // Element operators.
        "$eq" => Ok(BranchedMatcher::Element(compile_equality(operand)?)),
        "$lt" => Ok(BranchedMatcher::Element(compile_inequality(CompareOp::Lt, operand))),
        "$lte" => Ok(BranchedMatcher::Element(compile_inequality(CompareOp::Lte, operand))),
        "$gt" => Ok(BranchedMatcher::Element(compile_inequality(CompareOp::Gt, operand))),
        "$gte" => Ok(BranchedMatcher::Element(compile_inequality(CompareOp::Gte, operand))),
        "$in" => Ok(BranchedMatcher::Element(compile_in(operand)?)),
        "$mod" => Ok(BranchedMatcher::Element(compile_mod(operand)?)),
        "$size" => Ok(BranchedMatcher::Element(compile_size(operand)?)),
        "$type" => Ok(BranchedMatcher::Element(compile_type(operand)?)),
        "$regex" => Ok(BranchedMatcher::Element(compile_regex_operator(
            operand,
            value_selector,
        )?)),
        "$elemMatch" => Ok(BranchedMatcher::Element(compile_elem_match(operand, cx)?)),
        _ => Err(MatcherError::UnknownOperator(format!(
            "unrecognized operator: {operator}"
        ))),
    }
}

fn compile_equality(operand: &Bson) -> Result<ElementMatcher, MatcherError> {
    if is_operator_mapping(operand, false)? {
        return Err(MatcherError::InvalidSelector(
            "cannot match an operator mapping by equality".into(),
        ));
    }
    Ok(ElementMatcher::Equality(operand.clone()))
}

fn compile_inequality(op: CompareOp, operand: &Bson) -> ElementMatcher {
    // Ordered comparison against a whole array never matches.
    if matches!(operand, Bson::Array(_)) {
        return ElementMatcher::Never;
    }
    let operand = match operand {
        Bson::Undefined => Bson::Null,
        other => other.clone(),
    };
    let operand_type = mica_ejson::type_of(&operand);
    ElementMatcher::Compare {
        op,
        operand,
        operand_type,
    }
}

fn compile_in(operand: &Bson) -> Result<ElementMatcher, MatcherError> {
    let options = match operand {
        Bson::Array(options) => options,
        _ => {
            return Err(MatcherError::InvalidOperand("$in/$nin needs an array".into()));
        }
    };
    let mut matchers = Vec::with_capacity(options.len());
    for option in options {
        if let Bson::RegularExpression(regex) = option {
            matchers.push(ElementMatcher::Regex(compile_regex(
                &regex.pattern,
                &regex.options,
            )?));
        } else if is_operator_mapping(option, false)? {
            return Err(MatcherError::InvalidOperand(
                "cannot nest $ under $in or $nin".into(),
            ));
        } else {
            matchers.push(ElementMatcher::Equality(option.clone()));
        }
    }
    Ok(ElementMatcher::In(matchers))
}

fn compile_mod(operand: &Bson) -> Result<ElementMatcher, MatcherError> {
    if let Bson::Array(pair) = operand
        && pair.len() == 2
        && let Some(divisor) = mica_ejson::as_f64(&pair[0])
        && let Some(remainder) = mica_ejson::as_f64(&pair[1])
    {
        return Ok(ElementMatcher::Mod { divisor, remainder });
    }
    Err(MatcherError::InvalidOperand(
        "argument to $mod must be an array of two numbers".into(),
    ))
}

fn compile_size(operand: &Bson) -> Result<ElementMatcher, MatcherError> {
    // Strings coerce to zero; any other non-number is an error.
    match operand {
        Bson::String(_) => Ok(ElementMatcher::Size(0.0)),
        _ => match mica_ejson::as_f64(operand) {
            Some(size) => Ok(ElementMatcher::Size(size)),
            None => Err(MatcherError::InvalidOperand("$size needs a number".into())),
        },
    }
}

fn compile_type(operand: &Bson) -> Result<ElementMatcher, MatcherError> {
    match mica_ejson::as_f64(operand) {
        Some(code) => Ok(ElementMatcher::Type(code)),
        None => Err(MatcherError::InvalidOperand("$type needs a number".into())),
    }
}

fn compile_regex_operator(
    operand: &Bson,
    value_selector: &Document,
) -> Result<ElementMatcher, MatcherError> {
    let pattern = match operand {
        Bson::String(pattern) => pattern.as_str(),
        Bson::RegularExpression(regex) => regex.pattern.as_str(),
        _ => {
            return Err(MatcherError::InvalidOperand(
                "$regex has to be a string or regexp".into(),
            ));
        }
    };
    let compiled = match value_selector.get("$options") {
        Some(Bson::String(options)) => {
            // An explicit $options replaces any flags on the operand.
            if options.chars().any(|c| !matches!(c, 'g' | 'i' | 'm')) {
                return Err(MatcherError::InvalidOperand(
                    "only the i, m, and g regexp options are supported".into(),
                ));
            }
            compile_regex(pattern, options)?
        }
        Some(_) => {
            return Err(MatcherError::InvalidOperand(
                "$options has to be a string".into(),
            ));
        }
        None => match operand {
            Bson::RegularExpression(regex) => compile_regex(&regex.pattern, &regex.options)?,
            _ => compile_regex(pattern, "")?,
        },
    };
    Ok(ElementMatcher::Regex(compiled))
}

fn compile_elem_match(operand: &Bson, cx: &mut CompileCtx) -> Result<ElementMatcher, MatcherError> {
    let operand = match operand {
        Bson::Document(doc) => doc,
        _ => {
            return Err(MatcherError::InvalidOperand(
                "$elemMatch needs a document".into(),
            ));
        }
    };
    if is_operator_document(operand, true)? {
        let branched = operator_branched_matcher(operand, cx, false)?;
        Ok(ElementMatcher::ElemMatchBranched(Box::new(branched)))
    } else {
        // Not the same as a value selector: `{$elemMatch: {x: 3}}` means
        // "an element has a field x equal to 3", and the element's own
        // paths stay off the matcher's path set.
        let doc_matcher = compile_document_selector(
            operand,
            cx,
            CompileOptions {
                in_elem_match: true,
                is_root: false,
            },
        )?;
        Ok(ElementMatcher::ElemMatchDoc(Box::new(doc_matcher)))
    }
}

fn compile_all(operand: &Bson, cx: &mut CompileCtx) -> Result<BranchedMatcher, MatcherError> {
    let criteria = match operand {
        Bson::Array(criteria) => criteria,
        _ => {
            return Err(MatcherError::InvalidOperand("$all requires array".into()));
        }
    };
    // An empty $all matches nothing, per the reference behavior.
    if criteria.is_empty() {
        return Ok(BranchedMatcher::Nothing);
    }
    let mut subs = Vec::with_capacity(criteria.len());
    for criterion in criteria {
        if is_operator_mapping(criterion, false)? {
            return Err(MatcherError::InvalidOperand(
                "no $ expressions in $all".into(),
            ));
        }
        subs.push(compile_value_selector(criterion, cx, false)?);
    }
    Ok(and_branched_matchers(subs))
}
