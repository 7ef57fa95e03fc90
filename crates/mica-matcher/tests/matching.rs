use bson::{Bson, doc};
use mica_matcher::{IndexStep, Matcher};

fn matcher(selector: bson::Document) -> Matcher {
    Matcher::new(selector).unwrap()
}

// ── Equality ────────────────────────────────────────────────────

#[test]
fn scalar_equality() {
    let m = matcher(doc! { "a": 7 });
    assert!(m.document_matches(&doc! { "a": 7 }).matched);
    assert!(m.document_matches(&doc! { "a": 7.0 }).matched);
    assert!(!m.document_matches(&doc! { "a": 8 }).matched);
    assert!(!m.document_matches(&doc! { "b": 7 }).matched);
}

#[test]
fn equality_matches_any_array_element() {
    let m = matcher(doc! { "a": 7 });
    let result = m.document_matches(&doc! { "a": [5, 7, 9] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn whole_array_equality_also_matches() {
    let m = matcher(doc! { "a": [5, 7] });
    assert!(m.document_matches(&doc! { "a": [5, 7] }).matched);
    // The array itself is one of the expanded branches.
    assert!(m.document_matches(&doc! { "a": [[5, 7], [8]] }).matched);
    assert!(!m.document_matches(&doc! { "a": [7, 5] }).matched);
}

#[test]
fn document_equality_is_order_sensitive() {
    let m = matcher(doc! { "a": { "x": 1, "y": 2 } });
    assert!(m.document_matches(&doc! { "a": { "x": 1, "y": 2 } }).matched);
    assert!(!m.document_matches(&doc! { "a": { "y": 2, "x": 1 } }).matched);
}

#[test]
fn null_matches_missing_and_null_fields() {
    let m = matcher(doc! { "a": null });
    assert!(m.document_matches(&doc! { "b": 1 }).matched);
    assert!(m.document_matches(&doc! { "a": null }).matched);
    assert!(!m.document_matches(&doc! { "a": 0 }).matched);
}

#[test]
fn in_with_null_matches_missing_field() {
    let m = matcher(doc! { "a": { "$in": [null] } });
    assert!(m.document_matches(&doc! { "b": 1 }).matched);
    assert!(m.document_matches(&doc! { "a": null }).matched);
    assert!(!m.document_matches(&doc! { "a": 1 }).matched);
}

// ── Dotted paths and array indices ──────────────────────────────

#[test]
fn nested_path_equality() {
    let m = matcher(doc! { "a.b": 3 });
    assert!(m.document_matches(&doc! { "a": { "b": 3 } }).matched);
    assert!(!m.document_matches(&doc! { "a": { "b": 4 } }).matched);
    assert!(!m.document_matches(&doc! { "a": 3 }).matched);
}

#[test]
fn explicit_index_reaches_into_array() {
    let m = matcher(doc! { "a.0": 5 });
    assert!(m.document_matches(&doc! { "a": [5] }).matched);
    assert!(!m.document_matches(&doc! { "a": [[5]] }).matched);
}

#[test]
fn explicit_index_against_nested_array_literal() {
    let m = matcher(doc! { "a.0": [5] });
    assert!(m.document_matches(&doc! { "a": [[5]] }).matched);
    assert!(!m.document_matches(&doc! { "a": [5] }).matched);
}

#[test]
fn explicit_index_step_is_tagged() {
    let m = matcher(doc! { "a.0.b": 3 });
    let result = m.document_matches(&doc! { "a": [{ "b": 3 }] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Explicit(0)]));
}

#[test]
fn implicit_branching_over_array_of_documents() {
    let m = matcher(doc! { "a.b": 2 });
    let result = m.document_matches(&doc! { "a": [{ "b": 1 }, { "b": 2 }] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn no_indices_without_arrays() {
    let m = matcher(doc! { "a": { "$gt": 5 } });
    let result = m.document_matches(&doc! { "a": 7 });
    assert!(result.matched);
    assert_eq!(result.array_indices, None);
}

#[test]
fn failed_match_carries_no_metadata() {
    let m = matcher(doc! { "a": { "$gt": 5 } });
    let result = m.document_matches(&doc! { "a": [1, 2] });
    assert!(!result.matched);
    assert_eq!(result.array_indices, None);
    assert_eq!(result.distance, None);
}

// ── Ordered comparison ──────────────────────────────────────────

#[test]
fn gt_over_scalars_and_arrays() {
    let m = matcher(doc! { "a": { "$gt": 5 } });
    assert!(m.document_matches(&doc! { "a": 7 }).matched);
    assert!(!m.document_matches(&doc! { "a": 5 }).matched);
    let result = m.document_matches(&doc! { "a": [3, 8, 4] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn ordered_comparison_never_crosses_types() {
    let m = matcher(doc! { "a": { "$gt": 5 } });
    assert!(!m.document_matches(&doc! { "a": "x" }).matched);
    assert!(!m.document_matches(&doc! { "a": true }).matched);
}

#[test]
fn range_combines_operators() {
    let m = matcher(doc! { "a": { "$gte": 3, "$lt": 8 } });
    assert!(m.document_matches(&doc! { "a": 3 }).matched);
    assert!(m.document_matches(&doc! { "a": 7.5 }).matched);
    assert!(!m.document_matches(&doc! { "a": 8 }).matched);
}

#[test]
fn comparison_against_array_operand_matches_nothing() {
    let m = matcher(doc! { "a": { "$lt": [5] } });
    assert!(!m.document_matches(&doc! { "a": 1 }).matched);
    assert!(!m.document_matches(&doc! { "a": [1] }).matched);
}

#[test]
fn string_ordering() {
    let m = matcher(doc! { "name": { "$lt": "mango" } });
    assert!(m.document_matches(&doc! { "name": "apple" }).matched);
    assert!(!m.document_matches(&doc! { "name": "pear" }).matched);
}

// ── $in / $nin / $ne ────────────────────────────────────────────

#[test]
fn in_matches_scalars_and_regexes() {
    let m = matcher(doc! { "a": { "$in": [1, Bson::RegularExpression(bson::Regex {
        pattern: "^z".into(),
        options: "".into(),
    })] } });
    assert!(m.document_matches(&doc! { "a": 1 }).matched);
    assert!(m.document_matches(&doc! { "a": "zebra" }).matched);
    assert!(!m.document_matches(&doc! { "a": "ant" }).matched);
}

#[test]
fn nin_inverts_across_all_branches() {
    let m = matcher(doc! { "a": { "$nin": [2] } });
    assert!(m.document_matches(&doc! { "a": 1 }).matched);
    assert!(!m.document_matches(&doc! { "a": 2 }).matched);
    // Any element in the list disqualifies the whole array.
    assert!(!m.document_matches(&doc! { "a": [1, 2] }).matched);
    assert!(m.document_matches(&doc! { "a": [1, 3] }).matched);
}

#[test]
fn ne_strips_array_indices() {
    let m = matcher(doc! { "a": { "$ne": 9 } });
    let result = m.document_matches(&doc! { "a": [1, 2] });
    assert!(result.matched);
    assert_eq!(result.array_indices, None);
}

// ── $exists / $mod / $size / $type ──────────────────────────────

#[test]
fn exists_checks_presence_not_nullness() {
    let yes = matcher(doc! { "a": { "$exists": true } });
    assert!(yes.document_matches(&doc! { "a": null }).matched);
    assert!(!yes.document_matches(&doc! { "b": 1 }).matched);
    let no = matcher(doc! { "a": { "$exists": false } });
    assert!(no.document_matches(&doc! { "b": 1 }).matched);
    assert!(!no.document_matches(&doc! { "a": null }).matched);
}

#[test]
fn exists_operand_truthiness() {
    let falsy = matcher(doc! { "a": { "$exists": 0 } });
    assert!(falsy.document_matches(&doc! { "b": 1 }).matched);
    let truthy = matcher(doc! { "a": { "$exists": 1 } });
    assert!(truthy.document_matches(&doc! { "a": 1 }).matched);
}

#[test]
fn mod_matches_numbers() {
    let m = matcher(doc! { "a": { "$mod": [4, 1] } });
    assert!(m.document_matches(&doc! { "a": 9 }).matched);
    assert!(!m.document_matches(&doc! { "a": 8 }).matched);
    assert!(!m.document_matches(&doc! { "a": "9" }).matched);
    assert!(m.document_matches(&doc! { "a": [8, 9] }).matched);
}

#[test]
fn size_tests_the_array_itself() {
    let m = matcher(doc! { "a": { "$size": 2 } });
    assert!(m.document_matches(&doc! { "a": [5, 5] }).matched);
    assert!(!m.document_matches(&doc! { "a": [5] }).matched);
    assert!(!m.document_matches(&doc! { "a": "ab" }).matched);
}

#[test]
fn size_does_not_expand_nested_arrays() {
    let m = matcher(doc! { "a": { "$size": 1 } });
    assert!(m.document_matches(&doc! { "a": [[5, 5]] }).matched);
    let two = matcher(doc! { "a": { "$size": 2 } });
    assert!(!two.document_matches(&doc! { "a": [[5, 5]] }).matched);
}

#[test]
fn size_string_operand_coerces_to_zero() {
    let m = matcher(doc! { "a": { "$size": "2" } });
    assert!(m.document_matches(&doc! { "a": [] }).matched);
    assert!(!m.document_matches(&doc! { "a": [1, 2] }).matched);
}

#[test]
fn type_skips_leaf_arrays() {
    let m = matcher(doc! { "a": { "$type": 4 } });
    assert!(!m.document_matches(&doc! { "a": [5] }).matched);
    assert!(m.document_matches(&doc! { "a": [[5]] }).matched);
}

#[test]
fn type_matches_codes() {
    let string = matcher(doc! { "a": { "$type": 2 } });
    assert!(string.document_matches(&doc! { "a": "s" }).matched);
    assert!(!string.document_matches(&doc! { "a": 1 }).matched);
    assert!(!string.document_matches(&doc! { "b": 1 }).matched);
    let number = matcher(doc! { "a": { "$type": 1 } });
    assert!(number.document_matches(&doc! { "a": 1 }).matched);
    assert!(number.document_matches(&doc! { "a": 1.5 }).matched);
    let null = matcher(doc! { "a": { "$type": 10 } });
    assert!(null.document_matches(&doc! { "a": null }).matched);
    assert!(!null.document_matches(&doc! { "b": 1 }).matched);
}

// ── Regex ───────────────────────────────────────────────────────

#[test]
fn regex_literal_matches_strings() {
    let m = matcher(doc! { "a": Bson::RegularExpression(bson::Regex {
        pattern: "^ab".into(),
        options: "i".into(),
    }) });
    assert!(m.document_matches(&doc! { "a": "Abc" }).matched);
    assert!(!m.document_matches(&doc! { "a": "cab" }).matched);
    assert!(!m.document_matches(&doc! { "a": 12 }).matched);
}

#[test]
fn regex_literal_matches_identical_regex_values() {
    let m = matcher(doc! { "a": Bson::RegularExpression(bson::Regex {
        pattern: "^ab".into(),
        options: "i".into(),
    }) });
    let same = doc! { "a": Bson::RegularExpression(bson::Regex {
        pattern: "^ab".into(),
        options: "i".into(),
    }) };
    assert!(m.document_matches(&same).matched);
    let other_flags = doc! { "a": Bson::RegularExpression(bson::Regex {
        pattern: "^ab".into(),
        options: "".into(),
    }) };
    assert!(!m.document_matches(&other_flags).matched);
}

#[test]
fn regex_operator_with_options() {
    let m = matcher(doc! { "a": { "$regex": "^john", "$options": "i" } });
    assert!(m.document_matches(&doc! { "a": "John" }).matched);
    assert!(!m.document_matches(&doc! { "a": "joh" }).matched);
}

#[test]
fn regex_matches_any_array_element() {
    let m = matcher(doc! { "tags": { "$regex": "^b" } });
    let result = m.document_matches(&doc! { "tags": ["apple", "banana"] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

// ── $not / $all ─────────────────────────────────────────────────

#[test]
fn not_inverts_operator_mappings() {
    let m = matcher(doc! { "a": { "$not": { "$gt": 5 } } });
    assert!(m.document_matches(&doc! { "a": 3 }).matched);
    assert!(!m.document_matches(&doc! { "a": 7 }).matched);
    // Absent fields satisfy $not.
    assert!(m.document_matches(&doc! { "b": 1 }).matched);
}

#[test]
fn not_accepts_regex_operands() {
    let m = matcher(doc! { "a": { "$not": Bson::RegularExpression(bson::Regex {
        pattern: "^b".into(),
        options: "".into(),
    }) } });
    assert!(m.document_matches(&doc! { "a": "apple" }).matched);
    assert!(!m.document_matches(&doc! { "a": "banana" }).matched);
}

#[test]
fn double_not_keeps_matching_but_drops_indices() {
    let plain = matcher(doc! { "a": { "$gt": 5 } });
    let doubled = matcher(doc! { "a": { "$not": { "$not": { "$gt": 5 } } } });
    let doc = doc! { "a": [3, 8] };
    let plain_result = plain.document_matches(&doc);
    let doubled_result = doubled.document_matches(&doc);
    assert!(plain_result.matched && doubled_result.matched);
    assert_eq!(plain_result.array_indices, Some(vec![IndexStep::Implicit(1)]));
    assert_eq!(doubled_result.array_indices, None);
}

#[test]
fn all_requires_every_criterion_somewhere() {
    let m = matcher(doc! { "a": { "$all": [1, 2] } });
    assert!(m.document_matches(&doc! { "a": [1, 2, 3] }).matched);
    assert!(m.document_matches(&doc! { "a": [2, 1] }).matched);
    assert!(!m.document_matches(&doc! { "a": [1, 3] }).matched);
    assert!(!m.document_matches(&doc! { "a": 1 }).matched);
}

#[test]
fn all_with_single_scalar_against_scalar_field() {
    let m = matcher(doc! { "a": { "$all": [5] } });
    assert!(m.document_matches(&doc! { "a": 5 }).matched);
    assert!(!m.document_matches(&doc! { "a": 6 }).matched);
}

#[test]
fn empty_all_matches_nothing() {
    let m = matcher(doc! { "a": { "$all": [] } });
    assert!(!m.document_matches(&doc! { "a": [1] }).matched);
    assert!(!m.document_matches(&doc! { "b": 1 }).matched);
}

// ── $elemMatch ──────────────────────────────────────────────────

#[test]
fn elem_match_needs_one_element_satisfying_all() {
    let m = matcher(doc! { "a": { "$elemMatch": { "$gt": 5, "$lt": 8 } } });
    let result = m.document_matches(&doc! { "a": [3, 7, 9] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
    // 3 and 9 each satisfy one bound, no single element both.
    assert!(!m.document_matches(&doc! { "a": [3, 9] }).matched);
}

#[test]
fn elem_match_reports_first_matching_index() {
    let m = matcher(doc! { "a": { "$elemMatch": { "$gt": 5 } } });
    let result = m.document_matches(&doc! { "a": [3, 7, 9] });
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn elem_match_document_mode() {
    let m = matcher(doc! { "a": { "$elemMatch": { "b": { "$gt": 1 } } } });
    let result = m.document_matches(&doc! { "a": [{ "b": 0 }, { "b": 2 }] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
    assert!(!m.document_matches(&doc! { "a": [{ "b": 0 }] }).matched);
    assert!(!m.document_matches(&doc! { "a": { "b": 2 } }).matched);
}

#[test]
fn elem_match_document_mode_stops_at_non_document_element() {
    let m = matcher(doc! { "a": { "$elemMatch": { "b": 2 } } });
    assert!(m.document_matches(&doc! { "a": [{ "b": 2 }, 5] }).matched);
    // A scalar element ahead of the match aborts the scan.
    assert!(!m.document_matches(&doc! { "a": [5, { "b": 2 }] }).matched);
}

#[test]
fn elem_match_requires_array_value() {
    let m = matcher(doc! { "a": { "$elemMatch": { "$gt": 5 } } });
    assert!(!m.document_matches(&doc! { "a": 7 }).matched);
    assert!(!m.document_matches(&doc! { "b": 1 }).matched);
}

#[test]
fn elem_match_does_not_flatten_nested_array_elements() {
    let m = matcher(doc! { "a": { "$elemMatch": { "$gt": 5 } } });
    // The nested [6] is tested as an array, not flattened into 6.
    assert!(!m.document_matches(&doc! { "a": [[6]] }).matched);
    // A scalar element alongside it still matches on its own.
    let result = m.document_matches(&doc! { "a": [[6], 9] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn elem_match_keeps_existing_branch_indices() {
    let m = matcher(doc! { "a.b": { "$elemMatch": { "$gt": 5 } } });
    let result = m.document_matches(&doc! { "a": [{ "b": [1, 9] }] });
    assert!(result.matched);
    // The branch already walked a[0]; the element index is not seeded
    // over it.
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(0)]));
}

// ── Multiple fields ─────────────────────────────────────────────

#[test]
fn fields_combine_with_and_semantics() {
    let m = matcher(doc! { "a": 1, "b": { "$gt": 1 } });
    assert!(m.document_matches(&doc! { "a": 1, "b": 2 }).matched);
    assert!(!m.document_matches(&doc! { "a": 1, "b": 1 }).matched);
    assert!(!m.document_matches(&doc! { "a": 2, "b": 2 }).matched);
}

#[test]
fn later_field_indices_win() {
    let m = matcher(doc! { "a": 1, "b": 2 });
    let result = m.document_matches(&doc! { "a": [1], "b": [9, 2] });
    assert!(result.matched);
    assert_eq!(result.array_indices, Some(vec![IndexStep::Implicit(1)]));
}

#[test]
fn empty_selector_matches_everything() {
    let m = matcher(doc! {});
    assert!(m.document_matches(&doc! {}).matched);
    assert!(m.document_matches(&doc! { "a": 1 }).matched);
}
