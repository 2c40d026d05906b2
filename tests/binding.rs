use std::time::{Duration, Instant};

use data_display as dd;
use dd::{
    Control, ControlKind, DataDisplay, Document, Evaluator, FieldContext, Form, Markup, Registry,
    Settings,
};
use pretty_assertions::assert_eq;

fn sample() -> Document {
    let form = Form::new()
        .with(Control::text("inputTest", ""))
        .with(Control::checkable(ControlKind::Radio, "plan", "basic", true))
        .with(Control::checkable(ControlKind::Radio, "plan", "pro", false));
    let mut doc = Document::new(form);
    doc.push(
        "greeting",
        &[
            ("data-display", "{inputTest} == 'testing' :: $this.show();"),
            ("style", "color: green"),
        ],
    );
    doc.push(
        "pro-only",
        &[
            ("data-display", "{plan} == 'pro'"),
            ("data-display-resets", "$this.css('display', 'none'); $this.attr('data-plan', {plan});"),
        ],
    );
    doc.push("plain", &[("class", "static")]);
    doc.push("orphan", &[("data-display", "{nowhere} == 1")]);
    doc
}

#[test]
fn test_bind_applies_resets_and_initial_state() {
    let mut doc = sample();
    let mut display = DataDisplay::new(Settings::default());
    assert_eq!(display.bind(&mut doc), 2);

    let greeting = doc.element_by_id("greeting").unwrap();
    let pro = doc.element_by_id("pro-only").unwrap();
    let orphan = doc.element_by_id("orphan").unwrap();
    assert_eq!(display.bound(), vec![greeting, pro]);
    assert!(!display.is_bound(orphan));

    assert!(!doc.is_visible(greeting));
    assert!(!doc.is_visible(pro));
    assert_eq!(doc.attr(pro, "data-plan").as_deref(), Some("basic"));
    assert_eq!(
        display.triggers(greeting)[0].events,
        vec!["change.dataDisplay", "keyup.dataDisplay"]
    );

    // binding again is a no-op
    assert_eq!(display.bind(&mut doc), 0);
}

#[test]
fn test_changes_are_debounced_until_quiet() {
    let mut doc = sample();
    let settings = Settings {
        debounce_ms: 100,
        ..Settings::default()
    };
    let mut display = DataDisplay::new(settings);
    display.bind(&mut doc);
    let greeting = doc.element_by_id("greeting").unwrap();

    let t0 = Instant::now();
    let ms = Duration::from_millis(1);
    doc.set_field("inputTest", "test");
    assert_eq!(display.notify(&mut doc, "inputTest", "keyup", t0), 0);
    doc.set_field("inputTest", "testing");
    display.notify(&mut doc, "inputTest", "keyup", t0 + 60 * ms);

    assert_eq!(display.poll(&mut doc, t0 + 100 * ms), 0);
    assert!(!doc.is_visible(greeting));
    assert_eq!(display.poll(&mut doc, t0 + 160 * ms), 1);
    assert!(doc.is_visible(greeting));
    assert_eq!(display.poll(&mut doc, t0 + 500 * ms), 0);
}

#[test]
fn test_unrelated_events_do_not_trigger() {
    let mut doc = sample();
    let settings = Settings {
        key_events_fire: false,
        ..Settings::default()
    };
    let mut display = DataDisplay::new(settings);
    display.bind(&mut doc);
    let now = Instant::now();
    display.notify(&mut doc, "inputTest", "keyup", now);
    display.notify(&mut doc, "somethingElse", "change", now);
    assert_eq!(display.flush(&mut doc), 0);
    display.notify(&mut doc, "inputTest", "change.dataDisplay", now);
    assert_eq!(display.flush(&mut doc), 1);
}

#[test]
fn test_leading_edge_runs_immediately() {
    let mut doc = sample();
    let settings = Settings {
        debounce_ms: 50,
        debounce_leading: true,
        ..Settings::default()
    };
    let mut display = DataDisplay::new(settings);
    display.bind(&mut doc);
    let pro = doc.element_by_id("pro-only").unwrap();

    let t0 = Instant::now();
    doc.set_field("plan", "pro");
    assert_eq!(display.notify(&mut doc, "plan", "change", t0), 1);
    assert!(doc.is_visible(pro));
    assert_eq!(doc.attr(pro, "data-plan").as_deref(), Some("pro"));
    // inside the window: swallowed, and no trailing call afterwards
    doc.set_field("plan", "basic");
    assert_eq!(display.notify(&mut doc, "plan", "change", t0 + Duration::from_millis(10)), 0);
    assert_eq!(display.poll(&mut doc, t0 + Duration::from_millis(100)), 0);
    assert!(doc.is_visible(pro));
}

#[test]
fn test_destroy_restores_markup_exactly() {
    let original = sample();
    let mut doc = original.clone();
    let mut display = DataDisplay::new(Settings::default());
    display.bind(&mut doc);
    doc.set_field("inputTest", "testing");
    doc.set_field("plan", "pro");
    display.notify(&mut doc, "inputTest", "change", Instant::now());
    display.notify(&mut doc, "plan", "change", Instant::now());
    display.flush(&mut doc);
    assert_ne!(doc.elements[0].attrs, original.elements[0].attrs);

    display.destroy(&mut doc);
    assert!(display.bound().is_empty());
    for (after, before) in doc.elements.iter().zip(&original.elements) {
        assert_eq!(after.attrs.get("data-display"), before.attrs.get("data-display"));
        assert_eq!(
            after.attrs.get("data-display-resets"),
            before.attrs.get("data-display-resets")
        );
        assert_eq!(after.attrs.get("style"), before.attrs.get("style"));
    }
}

#[test]
fn test_rebind_with_new_attribute_names() {
    let mut doc = sample();
    let mut display = DataDisplay::new(Settings::default());
    display.bind(&mut doc);
    let plain = doc.element_by_id("plain").unwrap();
    doc.set_attr(plain, "data-when", "1 < 2");

    let settings = Settings {
        conditions_attr: "data-when".into(),
        ..Settings::default()
    };
    assert_eq!(display.rebind(&mut doc, settings), 1);
    assert_eq!(display.bound(), vec![plain]);
    assert!(doc.is_visible(plain));
    assert_eq!(display.spec(plain).unwrap().raw, "1 < 2");
}

#[test]
fn test_spec_captures_unique_fields() {
    let mut doc = Document::new(Form::from_pairs([("a", "1"), ("b", "2")]));
    let el = doc.push("x", &[("data-display", "{a} == 1 && {b} == 2 && {a} < {b}")]);
    let mut display = DataDisplay::new(Settings::default());
    display.bind(&mut doc);
    let spec = display.spec(el).unwrap();
    assert_eq!(spec.referenced_fields, vec!["a", "b"]);
    assert_eq!(spec.reset_raw, None);
    assert_eq!(spec.saved_style, None);
    assert!(doc.is_visible(el));
}

#[test]
fn test_custom_helpers_reach_bound_elements() {
    let mut doc = Document::new(Form::from_pairs([("tags", "a,b,c")]));
    let el = doc.push("many", &[("data-display", "count({tags}) is greater than 2")]);
    let mut registry = Registry::with_builtins();
    registry
        .register_fn("count", r"count\(\{([^}]+)\}\)", |field, ctx: &dyn FieldContext| {
            ctx.resolve(field?).map(|v| v.split(',').count().to_string())
        })
        .unwrap();
    let mut display = DataDisplay::with_evaluator(Settings::default(), Evaluator::new(registry));
    assert_eq!(display.bind(&mut doc), 1);
    assert!(doc.is_visible(el));

    doc.set_field("tags", "a");
    display.notify(&mut doc, "tags", "change", Instant::now());
    display.flush(&mut doc);
    assert!(!doc.is_visible(el));
}
