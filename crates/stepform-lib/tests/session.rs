use std::time::{Duration, Instant};

use stepform_lib::{StepFormSession, Transition};
use stepform_spec::{Document, NodeId, NodeSpec, WizardConfig};

fn wizard(id: &str) -> NodeSpec {
    NodeSpec::new("div")
        .attr("ms", "wrapper")
        .attr("id", id)
        .child(
            NodeSpec::new("form")
                .child(NodeSpec::new("nav").attr("ms-nav-steps", "container"))
                .child(
                    NodeSpec::new("div")
                        .attr("ms-step", "start")
                        .child(NodeSpec::new("select").attr("name", "plan").value("basic")),
                )
                .child(
                    NodeSpec::new("div")
                        .attr("ms-step", "extras")
                        .attr("data-condition", "plan == 'pro'"),
                )
                .child(NodeSpec::new("div").attr("ms-step", "done")),
        )
}

fn page() -> Document {
    Document::new(
        &NodeSpec::new("body")
            .child(wizard("left"))
            .child(wizard("right"))
            .child(NodeSpec::new("div").attr("ms", "wrapper").attr("id", "broken")),
    )
}

fn plan(doc: &Document, wrapper: &str) -> NodeId {
    let scope = doc.find_by_id(wrapper).unwrap();
    doc.controls_named(scope, "plan")[0]
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn every_wrapper_with_a_form_becomes_an_instance() {
    let mut doc = page();
    let session = StepFormSession::initialize(&mut doc, &WizardConfig::default());
    assert_eq!(session.len(), 2);
    let ids: Vec<_> = session.forms().iter().map(|form| form.id()).collect();
    assert_eq!(ids, [Some("left"), Some("right")]);
    assert!(doc.take_mutations().is_empty());
}

#[test]
fn rapid_changes_coalesce_into_one_recompute() {
    let mut doc = page();
    let mut session = StepFormSession::initialize(&mut doc, &WizardConfig::default());
    let start = Instant::now();
    let left = plan(&doc, "left");

    doc.set_value(left, "pro");
    assert_eq!(session.dispatch_mutations(&mut doc, start), 1);
    assert!(session.poll(&mut doc, start + ms(50)).is_empty());

    doc.set_value(left, "basic");
    doc.set_value(left, "pro");
    assert_eq!(session.dispatch_mutations(&mut doc, start + ms(80)), 2);
    assert_eq!(session.next_deadline(), Some(start + ms(180)));
    assert!(session.poll(&mut doc, start + ms(150)).is_empty());

    let payloads = session.poll(&mut doc, start + ms(180));
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].form_id.as_deref(), Some("left"));
    assert_eq!(payloads[0].steps.len(), 3);
    assert!(session.poll(&mut doc, start + ms(400)).is_empty());
}

#[test]
fn instances_do_not_share_state() {
    let mut doc = page();
    let mut session = StepFormSession::initialize(&mut doc, &WizardConfig::default());
    let start = Instant::now();

    let left = session.by_id("left").unwrap();
    assert_eq!(
        left.advance(&mut doc).unwrap(),
        Transition::Moved { from: 0, to: 1 }
    );
    assert_eq!(session.get(0).unwrap().current_step_index(), Some(1));
    assert_eq!(session.get(1).unwrap().current_step_index(), Some(0));
    assert!(session.get(1).unwrap().state().history().is_empty());

    let right = plan(&doc, "right");
    doc.set_value(right, "pro");
    session.dispatch_mutations(&mut doc, start);
    let payloads = session.poll(&mut doc, start + ms(100));
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].form_id.as_deref(), Some("right"));
    assert_eq!(session.get(0).unwrap().snapshot().visible.len(), 2);
    assert_eq!(session.get(1).unwrap().snapshot().visible.len(), 3);
}

#[test]
fn engine_rendering_does_not_retrigger_the_reactor() {
    let mut doc = page();
    let mut session = StepFormSession::initialize(&mut doc, &WizardConfig::default());
    let start = Instant::now();

    session
        .by_id("left")
        .unwrap()
        .advance(&mut doc)
        .unwrap();
    assert_eq!(session.dispatch_mutations(&mut doc, start), 0);
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn structure_changes_follow_configuration() {
    let mut doc = page();
    let config = WizardConfig {
        watch_structure: false,
        ..WizardConfig::default()
    };
    let mut session = StepFormSession::initialize(&mut doc, &config);
    let form = session.get(0).unwrap().form();

    doc.append_child(form, &NodeSpec::new("div").attr("ms-step", "late"))
        .unwrap();
    assert_eq!(session.dispatch_mutations(&mut doc, Instant::now()), 0);

    let mut doc = page();
    let mut session = StepFormSession::initialize(&mut doc, &WizardConfig::default());
    let form = session.get(0).unwrap().form();
    let start = Instant::now();
    doc.append_child(form, &NodeSpec::new("div").attr("ms-step", "late"))
        .unwrap();
    assert_eq!(session.dispatch_mutations(&mut doc, start), 1);
    let payloads = session.poll(&mut doc, start + ms(100));
    assert_eq!(payloads[0].steps.len(), 3);
}
