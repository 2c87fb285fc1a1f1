use crate::context::{Context, Set};
use crate::error::RippleError;
use crate::expr::Expression;
use crate::parser::parse;

fn set(names: &[&str]) -> Set {
    names.iter().map(|s| s.to_string()).collect()
}

fn sym(name: &str, key: &str) -> Expression {
    Expression::sym(name).keyed(key)
}

#[test]
fn test_linear_graph() {
    let c = Context::new()
        .insert(sym("B", "A"))
        .unwrap()
        .insert(sym("C", "B"))
        .unwrap();

    assert_eq!(c.len(), 2);
    assert_eq!(c.get_incoming("A"), set(&["B"]));
    assert_eq!(c.get_incoming("B"), set(&["C"]));
    assert_eq!(c.get_outgoing("B"), set(&["A"]));
    assert_eq!(c.get_outgoing("C"), set(&["B"]));

    assert_eq!(c.erase("A").get_incoming("A"), set(&[]));
    assert_eq!(c.erase("B").get_incoming("A"), set(&["B"]));
    assert_eq!(c.erase("B").get_outgoing("B"), set(&["A"]));

    assert_eq!(c.referencing("C"), set(&["A", "B", "C"]));
}

#[test]
fn test_branching_graph() {
    let c = Context::new()
        .insert(Expression::table([Expression::sym("B"), Expression::sym("C")]).keyed("A"))
        .unwrap();

    assert_eq!(c.len(), 1);
    assert_eq!(c.get_incoming("A"), set(&["B", "C"]));
    assert_eq!(c.get_outgoing("B"), set(&["A"]));
    assert_eq!(c.get_outgoing("C"), set(&["A"]));

    assert_eq!(c.referencing("C"), set(&["A", "C"]));
    assert_eq!(c.referencing("B"), set(&["A", "B"]));
}

#[test]
fn test_load_from_source() {
    let c = Context::parse("(D=E C=D B=C A=B)").unwrap();

    assert_eq!(c.get_incoming("A"), set(&["B"]));
    assert_eq!(c.get_incoming("B"), set(&["C"]));
    assert_eq!(c.get_incoming("C"), set(&["D"]));
    assert_eq!(c.get_incoming("D"), set(&["E"]));
    assert_eq!(c.get_outgoing("B"), set(&["A"]));
    assert_eq!(c.get_outgoing("C"), set(&["B"]));
    assert_eq!(c.get_outgoing("D"), set(&["C"]));
    assert_eq!(c.get_outgoing("E"), set(&["D"]));
}

#[test]
fn test_load_drops_unkeyed_parts() {
    let c = Context::parse("(a=1 2 b=3)").unwrap();
    assert_eq!(c.len(), 2);
    assert!(c.contains("a"));
    assert!(c.contains("b"));
}

#[test]
fn test_load_single_rule() {
    let c = Context::parse("a=1").unwrap();
    assert_eq!(c.len(), 1);
    assert_eq!(c.at("a").unwrap().as_i32(), 1);

    let c = Context::parse("a=(1 2)").unwrap();
    assert_eq!(c.len(), 1);
    assert_eq!(c.at("a").unwrap().size(), 2);
}

#[test]
fn test_replacing_a_rule_updates_edges() {
    let c = Context::parse("(A=B B=1)").unwrap();
    let c = c.insert(sym("C", "A")).unwrap();

    assert_eq!(c.get_incoming("A"), set(&["C"]));
    assert_eq!(c.get_outgoing("B"), set(&[]));
    assert_eq!(c.get_outgoing("C"), set(&["A"]));
}

#[test]
fn test_insert_lookup() {
    let e = parse("a=(b c)").unwrap();
    let c = Context::new().insert(e.clone()).unwrap();

    assert_eq!(c.at("a").unwrap(), &e);
    assert!(c.at("missing").is_err());
    assert!(matches!(c.at("missing"), Err(RippleError::Missing(_))));
    assert_eq!(c.get("missing"), Expression::none().keyed("missing"));
    assert_eq!(c.get("missing").key(), "missing");
}

#[test]
fn test_empty_key_is_rejected() {
    let result = Context::new().insert(Expression::from(1));
    assert!(matches!(result, Err(RippleError::EmptyKey)));
}

#[test]
fn test_cycles_are_rejected() {
    let c = Context::new().insert(sym("b", "a")).unwrap();
    let before = c.clone();

    let result = c.insert(sym("a", "b"));
    assert!(matches!(result, Err(RippleError::Cycle(_))));
    assert_eq!(c, before, "a failed insert must not change the context");
}

#[test]
fn test_self_reference_is_a_cycle() {
    let result = Context::new().insert(sym("a", "a"));
    assert!(matches!(result, Err(RippleError::Cycle(_))));
}

#[test]
fn test_longer_cycles_are_rejected() {
    let c = Context::parse("(a=b b=c)").unwrap();
    assert!(c.insert(sym("a", "c")).is_ok(), "a forward edge is fine");
    assert!(c.insert(sym("c", "a")).is_err());

    let c = Context::parse("(a=b b=c c=d)").unwrap();
    assert!(c.cyclic(&sym("d", "a")));
    assert!(!c.cyclic(&sym("d", "e")));
}

#[test]
fn test_cyclic_matches_insert_failure() {
    let c = Context::parse("(a=b b=c)").unwrap();

    for candidate in [sym("c", "a"), sym("c", "c"), sym("d", "d"), sym("x", "c")] {
        assert_eq!(
            c.cyclic(&candidate),
            c.insert(candidate.clone()).is_err(),
            "cyclic() and insert() disagree on {:?}",
            candidate
        );
    }
}

#[test]
fn test_erase_missing_key_is_a_noop() {
    let c = Context::parse("(a=1)").unwrap();
    assert_eq!(c.erase("zebra"), c);
}

#[test]
fn test_erase_all() {
    let c = Context::parse("(a=1 b=2 c=3)").unwrap();
    let c = c.erase_all(&set(&["a", "c", "nope"]));

    assert_eq!(c.len(), 1);
    assert!(c.contains("b"));
}

#[test]
fn test_outgoing_for_absent_names_scans_items() {
    let c = Context::parse("(a=missing b=missing)").unwrap();
    assert!(!c.contains("missing"));
    assert_eq!(c.get_outgoing("missing"), set(&["a", "b"]));
}

#[test]
fn test_nth_key_covers_snapshot_order() {
    let c = Context::parse("(a=1 b=2 c=3)").unwrap();

    let mut seen: Vec<&str> = (0..c.len()).map(|n| c.nth_key(n).unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, ["a", "b", "c"]);
    assert!(c.nth_key(3).is_none());
}

#[test]
fn test_expr_gathers_items() {
    let c = Context::parse("(a=1 b=2)").unwrap();
    let e = c.expr();

    assert_eq!(e.size(), 2);
    assert_eq!(e.attr("a").as_i32(), 1);
    assert_eq!(e.attr("b").as_i32(), 2);
}

#[test]
fn test_save_load_round_trip() {
    let c = Context::parse("(a=b b=(1 2 c) c='moo')").unwrap();
    let saved = c.to_source();
    let loaded = Context::parse(&saved).unwrap();

    assert_eq!(loaded, c);
    assert_eq!(loaded.to_source(), saved);
}

#[test]
fn test_snapshots_share_structure() {
    let c1 = Context::parse("(a=1 b=2)").unwrap();
    let c2 = c1.insert(parse("c=3").unwrap()).unwrap();

    // the original snapshot is untouched by the insert
    assert_eq!(c1.len(), 2);
    assert_eq!(c2.len(), 3);
    assert!(!c1.contains("c"));
}
