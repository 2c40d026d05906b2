use data_display as dd;
use dd::{Action, ActionKind, Form};
use proptest::prelude::*;

proptest! {
    // Each clause is judged on its own: the number of Show actions equals the
    // number of true clauses, whatever their order.
    #[test]
    fn clauses_are_independent(flags in prop::collection::vec(any::<bool>(), 1..8)) {
        let cond = flags
            .iter()
            .map(|f| format!("{{v}} == {};", if *f { 1 } else { 0 }))
            .collect::<Vec<_>>()
            .join(" || ");
        let form = Form::from_pairs([("v", "1")]);
        let shows = dd::evaluate(&cond, &form)
            .into_iter()
            .filter(|a| a.kind == ActionKind::Show)
            .count();
        prop_assert_eq!(shows, flags.iter().filter(|f| **f).count());
    }

    #[test]
    fn substitution_exhausts_placeholders(value in ".*") {
        let form = Form::from_pairs([("field", value.as_str())]);
        let cond = "{field} == 'x' :: $this.attr('a', {field})";
        let fields = dd::extract_fields(cond);
        let substituted = dd::substitute_fields(cond, &fields, &form);
        prop_assert!(dd::extract_fields(&substituted).is_empty());
    }

    // Whatever the user types, it can only ever be compared, never change the
    // shape of the condition.
    #[test]
    fn values_cannot_inject(value in r#"[ -~]{0,24}"#) {
        let form = Form::from_pairs([("q", value.as_str())]);
        let cond = "{q} == 'never-matches-%%' :: hit(); || 1 == 1 :: ok()";
        prop_assert_eq!(dd::evaluate(cond, &form), vec![Action::effect("ok()")]);
    }

    #[test]
    fn numeric_values_compare_as_numbers(n in -1_000_000i64..1_000_000) {
        let value = n.to_string();
        let form = Form::from_pairs([("n", value.as_str())]);
        let cond = format!("{{n}} == {n} && {{n}} + 1 > {n}");
        prop_assert_eq!(dd::evaluate(&cond, &form), vec![Action::show()]);
    }
}

#[test]
fn quotes_and_separators_stay_inside_the_literal() {
    for value in ["\"", "'", "\"; || true; || \"", "::", "{q}", "a) || (1", ".*+?^$[]\\"] {
        let form = Form::from_pairs([("q", value)]);
        assert!(
            dd::evaluate("{q} == 'zzz'", &form).is_empty(),
            "value {value:?} changed the outcome"
        );
    }
}
