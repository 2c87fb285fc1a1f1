use crate::engine::Engine;
use crate::expr::Expression;
use crate::parser::parse;
use crate::workers::{MessageQueue, WorkerPool};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_load_and_resolve() {
    let mut engine = Engine::new();
    engine.load("(a=b b=c c=1)").unwrap();

    assert_eq!(engine.rules().len(), 3);
    assert!(engine.products().is_empty());

    engine.resolve();
    assert_eq!(engine.products().len(), 3);
    assert_eq!(engine.products().at("a").unwrap().as_i32(), 1);
}

#[test]
fn test_insert_invalidates_downstream() {
    let mut engine = Engine::new();
    engine.load("(a=b b=c c=1 x=2)").unwrap();
    engine.resolve();
    assert_eq!(engine.products().len(), 4);

    engine.insert_source("c=9").unwrap();

    assert!(!engine.products().contains("a"));
    assert!(!engine.products().contains("b"));
    assert!(!engine.products().contains("c"));
    assert!(engine.products().contains("x"), "unrelated products survive");

    engine.resolve();
    assert_eq!(engine.products().at("a").unwrap().as_i32(), 9);
}

#[test]
fn test_erase_invalidates_downstream() {
    let mut engine = Engine::new();
    engine.load("(a=b b=1 c=2)").unwrap();
    engine.resolve();

    engine.erase("b");

    assert_eq!(engine.rules().len(), 2);
    assert!(!engine.products().contains("a"));
    assert!(!engine.products().contains("b"));
    assert!(engine.products().contains("c"));

    // with b gone, a stays deferred
    engine.resolve();
    assert!(!engine.products().contains("a"));
}

#[test]
fn test_cycle_rejection_leaves_engine_unchanged() {
    let mut engine = Engine::new();
    engine.insert_source("a=b").unwrap();
    let rules_before = engine.rules().clone();

    assert!(engine.insert_source("b=a").is_err());
    assert_eq!(engine.rules(), &rules_before);
}

#[test]
fn test_builtins_are_callable() {
    let mut engine = Engine::new();
    engine
        .define("add", |args| {
            Expression::from(args.iter().map(|p| p.as_i32()).sum::<i32>())
        })
        .unwrap();

    engine.insert_source("total=(add 1 2 3)").unwrap();
    engine.resolve();

    assert_eq!(engine.products().at("total").unwrap().as_i32(), 6);
}

#[test]
fn test_builtins_survive_invalidation() {
    let mut engine = Engine::new();
    engine
        .define("double", |args| Expression::from(args.first().as_i32() * 2))
        .unwrap();
    engine.load("(a=(double b) b=3)").unwrap();
    engine.resolve();
    assert_eq!(engine.products().at("a").unwrap().as_i32(), 6);

    engine.insert_source("b=5").unwrap();
    engine.resolve();
    assert_eq!(engine.products().at("a").unwrap().as_i32(), 10);
}

#[test]
fn test_rules_shadow_builtins() {
    let mut engine = Engine::new();
    engine.define("k", |_| Expression::from(1)).unwrap();
    engine.insert_source("k=5").unwrap();
    engine.insert_source("a=k").unwrap();
    engine.resolve();

    assert_eq!(engine.products().at("a").unwrap().as_i32(), 5);
}

#[test]
fn test_save_round_trips() {
    let mut engine = Engine::new();
    engine.load("(a=b b=(1 2) c='moo')").unwrap();
    engine.resolve();

    let saved = engine.save();
    assert_eq!(saved.lines().count(), 3, "one rule per line, no products");

    let mut restored = Engine::new();
    restored.load(&saved).unwrap();
    assert_eq!(restored.rules(), engine.rules());
}

#[test]
fn test_snapshot() {
    let mut engine = Engine::new();
    engine.load("(a=1)").unwrap();
    engine.resolve();

    let snapshot = engine.snapshot();
    assert_eq!(&snapshot.rules, engine.rules());
    assert_eq!(&snapshot.products, engine.products());

    // snapshots are stable across later edits
    engine.insert_source("b=2").unwrap();
    assert_eq!(snapshot.rules.len(), 1);
}

#[test]
fn test_resolution_stream_from_engine() {
    let mut engine = Engine::new();
    engine.load("(a=b b=c c=1)").unwrap();

    let products = engine.resolution(Duration::ZERO).last().unwrap();
    assert_eq!(products.len(), 3);
    assert_eq!(products.at("a").unwrap().as_i32(), 1);
}

#[test]
fn test_concurrent_resolution_matches_synchronous() {
    let sources = [
        "(a=b b=c c=d d=e e=f f=g g=h h=i i=j j=1)",
        "(a=(b c) b=(d e) c=(f g) d=(h i) e=(j k) f=(l m) g=(n o) h=1 i=2 j=3 k=4 l=5 m=6 n=7 o=8)",
    ];

    for source in sources {
        let mut sync_engine = Engine::new();
        sync_engine.load(source).unwrap();
        sync_engine.resolve();

        let queue = MessageQueue::new();
        let pool = WorkerPool::with_listener(4, Arc::new(queue.clone()));
        let mut engine = Engine::new();
        engine.load(source).unwrap();
        engine.resolve_concurrent(&pool, &queue);

        assert_eq!(
            engine.products(),
            sync_engine.products(),
            "both strategies converge on {}",
            source
        );
    }
}

#[test]
fn test_absorb_ignores_empty_results() {
    use crate::workers::PoolEvent;

    let mut engine = Engine::new();
    engine.load("(a=1)").unwrap();

    let absorbed = engine.absorb(PoolEvent::Finished {
        worker: 0,
        name: "a".to_string(),
        result: Expression::none(),
    });
    assert!(!absorbed, "an empty result means the task failed");
    assert!(engine.products().is_empty());

    let absorbed = engine.absorb(PoolEvent::Finished {
        worker: 0,
        name: "a".to_string(),
        result: parse("a=1").unwrap(),
    });
    assert!(absorbed);
    assert_eq!(engine.products().at("a").unwrap().as_i32(), 1);
}
