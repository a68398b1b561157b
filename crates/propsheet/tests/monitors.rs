//! Tests for monitor registration, dispatch and deferred edits

use pretty_assertions::assert_eq;
use propsheet::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn recorder<T: 'static>() -> (Rc<RefCell<Vec<T>>>, impl FnMut(T) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |item| sink.borrow_mut().push(item))
}

fn ratio_sheet() -> Sheet {
    let mut sheet = Sheet::new();
    sheet.add_interface("a", false, "1").unwrap();
    sheet.add_interface("b", false, "1").unwrap();
    sheet
        .add_relation([("a", "b * 2"), ("b", "a / 2")])
        .unwrap();
    sheet
}

#[test]
fn test_value_monitor_fires_on_registration_and_change() {
    let mut sheet = Sheet::new();
    sheet.add_input("x", "1").unwrap();
    sheet.add_output("double", "x * 2").unwrap();

    let (seen, mut record) = recorder::<Value>();
    sheet
        .monitor_value("double", move |value| record(value.clone()))
        .unwrap();
    assert_eq!(*seen.borrow(), vec![Value::Empty]);

    let stats = sheet.update().unwrap();
    assert_eq!(stats.notifications, 1);

    // Unchanged: nothing fires
    let stats = sheet.update().unwrap();
    assert_eq!(stats.notifications, 0);

    sheet.set("x", 4).unwrap();
    sheet.update().unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![Value::Empty, Value::from(2), Value::from(8)]
    );
}

/// The first update reports an invariant's truth even when it always held
#[test]
fn test_invariant_value_monitor_reports_first_pass() {
    let mut sheet = Sheet::new();
    sheet.add_input("x", "1").unwrap();
    sheet.add_invariant("positive", "x > 0").unwrap();

    let (seen, mut record) = recorder::<Value>();
    sheet
        .monitor_value("positive", move |value| record(value.clone()))
        .unwrap();

    sheet.update().unwrap();
    assert_eq!(*seen.borrow(), vec![Value::Empty, Value::from(true)]);

    // Still holding: no further notification
    sheet.set("x", 3).unwrap();
    sheet.update().unwrap();
    assert_eq!(seen.borrow().len(), 2);

    sheet.set("x", -3).unwrap();
    sheet.update().unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![Value::Empty, Value::from(true), Value::from(false)]
    );
}

#[test]
fn test_input_value_monitor() {
    let mut sheet = Sheet::new();
    sheet.add_input("x", "1").unwrap();

    let (seen, mut record) = recorder::<Value>();
    sheet
        .monitor_value("x", move |value| record(value.clone()))
        .unwrap();

    sheet.set("x", 5).unwrap();
    sheet.update().unwrap();
    // Same value again is not a change
    sheet.set("x", 5).unwrap();
    sheet.update().unwrap();

    assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(5)]);
}

#[test]
fn test_enabled_monitor_follows_relation_sources() {
    let mut sheet = ratio_sheet();

    let (a_seen, a_record) = recorder::<bool>();
    let (b_seen, b_record) = recorder::<bool>();
    sheet.monitor_enabled("a", &[], a_record).unwrap();
    sheet.monitor_enabled("b", &[], b_record).unwrap();

    // b is the source, a is derived from it
    sheet.update().unwrap();
    assert!(sheet.is_enabled("b", &[]).unwrap());
    assert!(!sheet.is_enabled("a", &[]).unwrap());
    // Watching the source enables a dependent control
    assert!(sheet.is_enabled("a", &["b"]).unwrap());

    sheet.set("a", 6).unwrap();
    sheet.update().unwrap();

    assert_eq!(*a_seen.borrow(), vec![false, true]);
    assert_eq!(*b_seen.borrow(), vec![false, true, false]);
}

#[test]
fn test_contributing_monitor_diffs_against_mark() {
    let mut sheet = ratio_sheet();
    let mut mark = Dictionary::new();
    mark.insert("b".to_string(), Value::from(1));

    let (seen, mut record) = recorder::<ContributingSet>();
    sheet
        .monitor_contributing("a", mark, move |set: &ContributingSet| {
            record(set.clone())
        })
        .unwrap();

    sheet.update().unwrap();
    sheet.set("b", 2).unwrap();
    sheet.update().unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    // Nothing computed yet at registration
    assert!(seen[0].is_empty());
    // b unchanged against the mark, but it decided the relation
    assert_eq!(seen[1].changed, Dictionary::new());
    assert_eq!(
        seen[1].touched.get("b"),
        Some(&Value::from(1))
    );
    assert_eq!(seen[2].changed.get("b"), Some(&Value::from(2)));
    assert!(seen[2].touched.is_empty());
}

#[test]
fn test_disconnect() {
    let mut sheet = Sheet::new();
    sheet.add_input("x", "1").unwrap();
    sheet.add_output("y", "x").unwrap();

    let (seen, mut record) = recorder::<Value>();
    let id = sheet
        .monitor_value("y", move |value| record(value.clone()))
        .unwrap();
    assert_eq!(sheet.monitor_count(), 1);

    sheet.update().unwrap();
    assert!(sheet.disconnect(id));
    assert!(!sheet.disconnect(id));
    assert_eq!(sheet.monitor_count(), 0);

    sheet.set("x", 2).unwrap();
    sheet.update().unwrap();
    assert_eq!(*seen.borrow(), vec![Value::Empty, Value::from(1)]);
}

#[test]
fn test_unknown_names() {
    let mut sheet = Sheet::new();
    sheet.add_input("x", "1").unwrap();
    sheet.add_output("y", "x").unwrap();

    assert_eq!(
        sheet.monitor_value("nope", |_| {}).unwrap_err(),
        SheetError::UnknownCell("nope".into())
    );
    assert_eq!(
        sheet.monitor_invariant_dependent("nope", |_| {}).unwrap_err(),
        SheetError::UnknownCell("nope".into())
    );
    assert_eq!(
        sheet.monitor_enabled("y", &[], |_| {}).unwrap_err(),
        SheetError::UnknownInput("y".into())
    );
    assert_eq!(
        sheet.monitor_enabled("x", &["nope"], |_| {}).unwrap_err(),
        SheetError::UnknownInput("nope".into())
    );
    assert_eq!(sheet.monitor_count(), 0);
}

/// Callbacks edit inputs through the deferred queue; edits land after the
/// update that fired them
#[test]
fn test_deferred_inputs() {
    let mut sheet = Sheet::new();
    sheet.add_input("a", "1").unwrap();
    sheet.add_input("b", "2").unwrap();
    sheet.add_output("total", "a + b").unwrap();

    let deferred = sheet.deferred();
    sheet
        .monitor_value("total", move |value| {
            if *value == Value::from(3) {
                deferred.set("a", 10);
            }
        })
        .unwrap();

    sheet.update().unwrap();
    // The edit is applied but not yet computed
    assert_eq!(sheet.get("total").unwrap(), Value::from(3));
    assert_eq!(sheet.get("a").unwrap(), Value::from(10));

    sheet.update().unwrap();
    assert_eq!(sheet.get("total").unwrap(), Value::from(12));
    assert!(sheet.deferred().is_empty());
}

#[test]
fn test_deferred_errors_surface_from_update() {
    let mut sheet = Sheet::new();
    sheet.add_input("a", "1").unwrap();
    sheet.deferred().touch(["a", "missing"]);

    assert_eq!(
        sheet.update(),
        Err(SheetError::UnknownInput("missing".into()))
    );
    assert!(sheet.deferred().is_empty());
}
