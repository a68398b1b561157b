//! Tests for the provenance queries

use pretty_assertions::assert_eq;
use propsheet::prelude::*;

/// `x` and `y` related, `x` declared last so it is the source
fn related_sheet() -> Sheet {
    let mut sheet = Sheet::new();
    sheet.add_interface("y", false, "0").unwrap();
    sheet.add_interface("x", false, "1").unwrap();
    sheet
        .add_relation([("y", "x + 1"), ("x", "y - 1")])
        .unwrap();
    sheet
}

fn mark(entries: &[(&str, i32)]) -> Dictionary {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), Value::from(*value)))
        .collect()
}

#[test]
fn test_changed_value_is_reported_as_changed() {
    let mut sheet = related_sheet();
    sheet.set("x", 2).unwrap();
    sheet.update().unwrap();

    let diff = sheet.contributing(&mark(&[("x", 1)]));
    assert_eq!(diff.changed, mark(&[("x", 2)]));
    assert!(diff.touched.is_empty());
}

#[test]
fn test_unchanged_source_is_only_touched() {
    let mut sheet = related_sheet();
    sheet.update().unwrap();

    let diff = sheet.contributing(&mark(&[("x", 1)]));
    assert!(diff.changed.is_empty());
    assert_eq!(diff.touched, mark(&[("x", 1)]));
}

#[test]
fn test_missing_from_mark_counts_as_changed() {
    let mut sheet = related_sheet();
    sheet.update().unwrap();

    let diff = sheet.contributing(&Dictionary::new());
    assert_eq!(diff.changed, mark(&[("x", 1)]));
}

/// With plain outputs present only they, not interface cells, define the
/// active inputs
#[test]
fn test_pure_outputs_define_active_inputs() {
    let mut sheet = related_sheet();
    sheet.add_input("tax", "3").unwrap();
    sheet.add_input("unused", "0").unwrap();
    sheet.add_output("price", "y * tax").unwrap();
    sheet.update().unwrap();

    let diff = sheet.contributing(&Dictionary::new());
    assert_eq!(diff.changed, mark(&[("tax", 3), ("x", 1)]));

    assert!(sheet.is_enabled("tax", &[]).unwrap());
    assert!(!sheet.is_enabled("unused", &[]).unwrap());
    assert!(!sheet.is_enabled("y", &[]).unwrap());
}

#[test]
fn test_contributing_to_cell() {
    let mut sheet = related_sheet();
    sheet.add_input("tax", "3").unwrap();
    sheet.add_output("price", "y * tax").unwrap();
    sheet.add_constant("ten", "10").unwrap();
    sheet.add_output("scaled", "ten * tax").unwrap();
    sheet.update().unwrap();

    assert_eq!(
        sheet.contributing_to_cell("price").unwrap(),
        ContributingSet {
            changed: mark(&[("tax", 3), ("x", 1)]),
            touched: Dictionary::new(),
        }
    );
    // Constants never contribute
    assert_eq!(
        sheet.contributing_to_cell("scaled").unwrap().changed,
        mark(&[("tax", 3)])
    );
    // An input contributes to itself
    assert_eq!(
        sheet.contributing_to_cell("tax").unwrap().changed,
        mark(&[("tax", 3)])
    );
    assert_eq!(
        sheet.contributing_to_cell("nope"),
        Err(SheetError::UnknownCell("nope".into()))
    );
}
