use crate::context::Context;
use crate::parser::parse;
use crate::resolve::{
    insert_invalidate, resolution_of, resolve_full, resolve_once, resolve_one,
};
use std::time::Duration;

const CHAIN: &str = "(a=b b=c c=d d=e e=f f=g g=h h=i i=j j=1)";
const TREE: &str =
    "(a=(b c) b=(d e) c=(f g) d=(h i) e=(j k) f=(l m) g=(n o) h=1 i=2 j=3 k=4 l=5 m=6 n=7 o=8)";

#[test]
fn test_resolve_one_inserts_literals() {
    let products = resolve_one(&parse("a=1").unwrap(), Context::new());
    assert_eq!(products.at("a").unwrap().as_i32(), 1);
}

#[test]
fn test_resolve_one_defers_unresolvable_rules() {
    let products = resolve_one(&parse("a=missing").unwrap(), Context::new());
    assert!(products.is_empty());
}

#[test]
fn test_resolve_one_skips_existing_products() {
    let products = resolve_one(&parse("a=1").unwrap(), Context::new());
    let products = resolve_one(&parse("a=2").unwrap(), products);
    assert_eq!(products.at("a").unwrap().as_i32(), 1, "products are not replaced");
}

#[test]
fn test_resolve_one_substitutes_symbols() {
    let products = resolve_one(&parse("b=1").unwrap(), Context::new());
    let products = resolve_one(&parse("a=b").unwrap(), products);
    assert_eq!(products.at("a").unwrap().as_i32(), 1);
    assert_eq!(products.at("a").unwrap().key(), "a");
}

#[test]
fn test_resolve_once_is_monotone() {
    let rules = Context::parse(CHAIN).unwrap();
    let mut products = Context::new();

    loop {
        let next = resolve_once(&rules, products.clone());
        assert!(next.len() >= products.len());
        if next.len() == products.len() {
            break;
        }
        products = next;
    }
}

#[test]
fn test_full_resolution_of_a_chain() {
    let rules = Context::parse(CHAIN).unwrap();
    let products = resolve_full(&rules, Context::new());

    assert_eq!(products.len(), 10);
    for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"] {
        assert_eq!(products.at(name).unwrap().as_i32(), 1, "{} should be 1", name);
    }
}

#[test]
fn test_full_resolution_of_a_tree() {
    let rules = Context::parse(TREE).unwrap();
    let products = resolve_full(&rules, Context::new());

    assert_eq!(products.len(), 15);
    assert_eq!(products.at("d").unwrap().to_string(), "d=(1 2)");
    assert_eq!(products.at("b").unwrap().to_string(), "b=((1 2) (3 4))");
    assert_eq!(
        products.at("a").unwrap().to_string(),
        "a=(((1 2) (3 4)) ((5 6) (7 8)))"
    );
}

#[test]
fn test_resolution_is_idempotent() {
    let rules = Context::parse(TREE).unwrap();
    let once = resolve_full(&rules, Context::new());
    let twice = resolve_full(&rules, once.clone());

    assert_eq!(once, twice);
}

#[test]
fn test_unresolvable_symbols_stay_deferred() {
    let rules = Context::parse("(a=b b=missing c=1)").unwrap();
    let products = resolve_full(&rules, Context::new());

    assert_eq!(products.len(), 1);
    assert!(products.contains("c"));

    // binding the missing name unblocks the rest
    let rules = rules.insert(parse("missing=2").unwrap()).unwrap();
    let products = resolve_full(&rules, products);
    assert_eq!(products.len(), 4);
    assert_eq!(products.at("a").unwrap().as_i32(), 2);
}

#[test]
fn test_insert_invalidate_drops_downstream() {
    let rules = Context::parse(CHAIN).unwrap();
    let products = resolve_full(&rules, Context::new());
    assert_eq!(products.len(), 10);

    let (rules, products) = insert_invalidate(parse("j=2").unwrap(), &rules, &products).unwrap();

    for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"] {
        assert!(!products.contains(name), "{} should have been invalidated", name);
    }

    let products = resolve_full(&rules, products);
    for name in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"] {
        assert_eq!(products.at(name).unwrap().as_i32(), 2, "{} should be 2", name);
    }
}

#[test]
fn test_insert_invalidate_preserves_unrelated_products() {
    let rules = Context::parse("(a=b b=1 c=2)").unwrap();
    let products = resolve_full(&rules, Context::new());

    let (rules, products) = insert_invalidate(parse("b=3").unwrap(), &rules, &products).unwrap();

    assert!(!products.contains("a"));
    assert!(!products.contains("b"));
    assert!(products.contains("c"), "an untouched product is preserved");

    let products = resolve_full(&rules, products);
    assert_eq!(products.at("a").unwrap().as_i32(), 3);
}

#[test]
fn test_insert_invalidate_rejects_cycles() {
    let rules = Context::parse("(a=b b=1)").unwrap();
    let products = resolve_full(&rules, Context::new());

    assert!(insert_invalidate(parse("b=a").unwrap(), &rules, &products).is_err());
}

#[test]
fn test_resolution_stream_is_generational() {
    let rules = Context::parse(CHAIN).unwrap();
    let mut stream = resolution_of(&rules, &Context::new(), Duration::ZERO);

    let mut last_len = 0;
    let mut emissions = 0;
    for products in stream.by_ref() {
        assert!(products.len() > last_len, "emissions must grow strictly");
        last_len = products.len();
        emissions += 1;
    }

    assert_eq!(last_len, 10, "the final emission is fully resolved");
    assert!(emissions >= 1);
    assert!(stream.is_complete());
}

#[test]
fn test_resolution_stream_completes_immediately_when_settled() {
    let rules = Context::parse("(a=1)").unwrap();
    let products = resolve_full(&rules, Context::new());

    let mut stream = resolution_of(&rules, &products, Duration::ZERO);
    assert!(stream.next().is_none());
    assert!(stream.is_complete());
}

#[test]
fn test_resolution_stream_can_be_unsubscribed() {
    let rules = Context::parse(CHAIN).unwrap();
    let mut stream = resolution_of(&rules, &Context::new(), Duration::ZERO);
    let subscription = stream.subscription();

    let first = stream.next();
    assert!(first.is_some());

    subscription.unsubscribe();
    assert!(stream.next().is_none());
    assert!(
        !stream.is_complete(),
        "an unsubscribed stream stops without completing"
    );
}
