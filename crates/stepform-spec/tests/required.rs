use stepform_spec::{
    Document, MarkerConfig, NodeSpec, StepRegistry, required::reconcile, suspend_hidden_required,
};

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
fn hidden_step_controls_lose_required_and_get_it_back() {
    let (mut doc, mut registry) = load();
    let state = doc.controls_named(doc.root(), "state")[0];
    let country = doc.controls_named(doc.root(), "country")[0];

    let snapshot = registry.recompute(&doc);
    let changes = reconcile(&mut doc, registry.markers(), &snapshot.declared, &snapshot.visible);
    assert_eq!(changes.demoted, 1);
    assert!(!doc.has_attr(state, "required"));
    assert_eq!(doc.attr(state, "data-required"), Some("true"));

    let again = reconcile(&mut doc, registry.markers(), &snapshot.declared, &snapshot.visible);
    assert_eq!(again.demoted + again.restored, 0, "reconcile is idempotent");

    doc.set_value(country, "US");
    let snapshot = registry.recompute(&doc);
    let changes = reconcile(&mut doc, registry.markers(), &snapshot.declared, &snapshot.visible);
    assert_eq!(changes.restored, 1);
    assert!(doc.has_attr(state, "required"));
    assert!(!doc.has_attr(state, "data-required"));
}

#[test]
fn visible_steps_keep_declared_required() {
    let (mut doc, mut registry) = load();
    let email = doc.controls_named(doc.root(), "email")[0];
    let terms = doc.controls_named(doc.root(), "terms")[0];
    let snapshot = registry.recompute(&doc);
    reconcile(&mut doc, registry.markers(), &snapshot.declared, &snapshot.visible);
    assert!(doc.has_attr(email, "required"));
    assert!(doc.has_attr(terms, "required"));
}

#[test]
fn optional_controls_are_never_promoted() {
    let doc_spec = NodeSpec::new("form").child(
        NodeSpec::new("div")
            .attr("ms-step", "only")
            .attr("data-condition", "toggle == 'on'")
            .child(NodeSpec::new("input").attr("name", "toggle").value("off"))
            .child(NodeSpec::new("input").attr("name", "optional")),
    );
    let mut doc = Document::new(&doc_spec);
    let mut registry = StepRegistry::new(doc.root(), MarkerConfig::default());
    let optional = doc.controls_named(doc.root(), "optional")[0];

    for value in ["off", "on", "off", "on"] {
        let toggle = doc.controls_named(doc.root(), "toggle")[0];
        doc.set_value(toggle, value);
        let snapshot = registry.recompute(&doc);
        reconcile(&mut doc, registry.markers(), &snapshot.declared, &snapshot.visible);
        assert!(!doc.has_attr(optional, "required"));
    }
}

#[test]
fn submit_suspends_only_individually_hidden_controls() {
    let (mut doc, registry) = load();
    let referral = doc.controls_named(doc.root(), "referral")[0];
    let email = doc.controls_named(doc.root(), "email")[0];
    let terms = doc.controls_named(doc.root(), "terms")[0];

    // Steps that are merely off screen keep their constraints.
    let confirm = doc.closest(terms, |element| element.attrs.contains_key("ms-step")).unwrap();
    doc.set_display(confirm, "none");

    let suspended = suspend_hidden_required(&mut doc, registry.markers(), registry.form());
    assert_eq!(suspended.nodes(), [referral]);
    assert!(!doc.has_attr(referral, "required"));
    assert_eq!(doc.attr(referral, "data-original-required"), Some("true"));
    assert!(doc.has_attr(email, "required"));
    assert!(doc.has_attr(terms, "required"));

    suspended.restore(&mut doc, registry.markers());
    assert!(doc.has_attr(referral, "required"));
    assert!(!doc.has_attr(referral, "data-original-required"));
}

#[test]
fn controls_outside_steps_use_full_visibility() {
    let mut doc = Document::new(
        &NodeSpec::new("form")
            .child(
                NodeSpec::new("div").child(NodeSpec::new("input").attr("name", "stray").attr("required", "")),
            )
            .child(NodeSpec::new("input").attr("name", "shown").attr("required", "")),
    );
    let markers = MarkerConfig::default();
    let form = doc.root();
    let hidden_wrapper = doc.children(form)[0];
    doc.set_display(hidden_wrapper, "none");
    let stray = doc.controls_named(form, "stray")[0];

    let suspended = suspend_hidden_required(&mut doc, &markers, form);
    assert_eq!(suspended.nodes(), [stray]);
    suspended.restore(&mut doc, &markers);
    assert!(doc.has_attr(stray, "required"));
}
