use std::collections::HashMap;

use proptest::prelude::*;
use stepform_spec::{Document, MarkerConfig, NodeSpec, StepRegistry};

fn fixture(name: &str) -> &'static str {
    match name {
        "branching_form" => include_str!("../tests/fixtures/branching_form.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn load() -> (Document, StepRegistry) {
    let doc = Document::from_json(fixture("branching_form")).expect("fixture parses");
    let form = doc.find_by_id("signup-form").expect("form present");
    (doc, StepRegistry::new(form, MarkerConfig::default()))
}

#[test]
fn scan_follows_document_order() {
    let (doc, registry) = load();
    let steps = registry.scan(&doc);
    let names: Vec<_> = steps.iter().map(|step| step.label()).collect();
    assert_eq!(names, ["Contact", "State", "Confirm"]);
    assert_eq!(steps[1].condition.as_deref(), Some("country == 'US'"));
    assert!(steps[0].condition.is_none());
    assert_eq!(steps.iter().map(|step| step.order).collect::<Vec<_>>(), [0, 1, 2]);
}

#[test]
fn dividers_are_removed_once() {
    let (mut doc, registry) = load();
    assert_eq!(registry.excise_dividers(&mut doc), 2);
    assert_eq!(registry.excise_dividers(&mut doc), 0);
    assert!(doc.query_all_with_attr(doc.root(), "ms-step-divider").is_empty());
}

#[test]
fn filter_hides_steps_whose_condition_fails() {
    let (mut doc, mut registry) = load();
    let snapshot = registry.recompute(&doc);
    assert_eq!(snapshot.visible.orders(), [0, 2]);

    let country = doc.controls_named(doc.root(), "country")[0];
    doc.set_value(country, "US");
    let snapshot = registry.recompute(&doc);
    assert_eq!(snapshot.visible.orders(), [0, 1, 2]);
    assert_eq!(snapshot.visible.position_of(snapshot.declared[2].node), Some(2));
}

#[test]
fn step_name_falls_back_to_marker_value() {
    let doc = Document::new(
        &NodeSpec::new("form")
            .child(NodeSpec::new("div").attr("ms-step", "details"))
            .child(NodeSpec::new("div").attr("ms-step", "")),
    );
    let registry = StepRegistry::new(doc.root(), MarkerConfig::default());
    let steps = registry.scan(&doc);
    assert_eq!(steps[0].label(), "details");
    assert_eq!(steps[1].name, None);
    assert_eq!(steps[1].label(), "");
}

#[test]
fn empty_condition_attribute_counts_as_absent() {
    let doc = Document::new(
        &NodeSpec::new("form").child(NodeSpec::new("div").attr("ms-step", "").attr("data-condition", "")),
    );
    let mut registry = StepRegistry::new(doc.root(), MarkerConfig::default());
    assert_eq!(registry.recompute(&doc).visible.len(), 1);
}

#[test]
fn custom_markers_are_honoured() {
    let markers = MarkerConfig {
        step: "data-step".into(),
        condition: "data-when".into(),
        ..MarkerConfig::default()
    };
    let doc = Document::new(
        &NodeSpec::new("form")
            .child(NodeSpec::new("div").attr("data-step", "a"))
            .child(NodeSpec::new("div").attr("data-step", "b").attr("data-when", "x == 'y'"))
            .child(NodeSpec::new("div").attr("ms-step", "ignored")),
    );
    let mut registry = StepRegistry::new(doc.root(), markers);
    let snapshot = registry.recompute(&doc);
    assert_eq!(snapshot.declared.len(), 2);
    assert_eq!(snapshot.visible.orders(), [0]);
}

fn conditional_form(conditions: &[bool]) -> (Document, HashMap<String, String>) {
    let mut form = NodeSpec::new("form");
    let mut values = HashMap::new();
    for (index, shown) in conditions.iter().enumerate() {
        let field = format!("f{index}");
        form = form.child(
            NodeSpec::new("div")
                .attr("ms-step", format!("s{index}"))
                .attr("data-condition", format!("{field} == 'on'")),
        );
        values.insert(field, if *shown { "on" } else { "off" }.to_string());
    }
    (Document::new(&form), values)
}

proptest! {
    #[test]
    fn visible_sequence_preserves_declared_order(conditions in proptest::collection::vec(any::<bool>(), 0..12)) {
        let (doc, values) = conditional_form(&conditions);
        let mut registry = StepRegistry::new(doc.root(), MarkerConfig::default());
        let declared = registry.scan(&doc);
        let visible = registry.filter_with(&declared, &values);

        let orders = visible.orders();
        prop_assert!(orders.windows(2).all(|pair| pair[0] < pair[1]));
        let expected: Vec<usize> = conditions
            .iter()
            .enumerate()
            .filter(|(_, shown)| **shown)
            .map(|(index, _)| index)
            .collect();
        prop_assert_eq!(orders, expected);
    }

    #[test]
    fn recompute_is_idempotent(conditions in proptest::collection::vec(any::<bool>(), 0..8)) {
        let (doc, values) = conditional_form(&conditions);
        let mut registry = StepRegistry::new(doc.root(), MarkerConfig::default());
        let declared = registry.scan(&doc);
        let first = registry.filter_with(&declared, &values);
        let rescanned = registry.scan(&doc);
        let second = registry.filter_with(&rescanned, &values);
        prop_assert_eq!(first, second);
    }
}
