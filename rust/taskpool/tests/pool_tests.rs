use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::thread;
use std::time::Duration;

use taskpool::{ConcurrentPool, ErrorKind, Outcome, PoolConfig};

#[derive(Debug, Clone, Copy)]
struct AddParam {
    a: i64,
    b: i64,
}

fn add_params() -> Vec<AddParam> {
    [(1, 2), (3, 4), (4, 12), (33, 3), (1000, 333)]
        .into_iter()
        .map(|(a, b)| AddParam { a, b })
        .collect()
}

fn sorted_keys<R, E>(outcomes: &[Outcome<R, E>]) -> Vec<String> {
    let mut keys: Vec<_> = outcomes.iter().map(|o| o.key().to_string()).collect();
    keys.sort();
    keys
}

#[test]
fn test_add_function() {
    let mut pool = ConcurrentPool::new(3)
        .unwrap()
        .set_key_generator(|p: &AddParam| format!("a({})+b({})", p.a, p.b))
        .set_inputs(add_params())
        .set_execution_function(|p: &AddParam| Ok::<_, String>(p.a + p.b));

    pool.execute().unwrap();
    let outcomes = pool.results().unwrap();

    let by_key: HashMap<_, _> = outcomes
        .iter()
        .map(|o| (o.key().to_string(), (o.output().copied(), o.error().cloned())))
        .collect();
    let expected = [
        ("a(1)+b(2)", 3),
        ("a(3)+b(4)", 7),
        ("a(4)+b(12)", 16),
        ("a(33)+b(3)", 36),
        ("a(1000)+b(333)", 1333),
    ];
    assert_eq!(outcomes.len(), expected.len());
    assert_eq!(by_key.len(), expected.len());
    for (key, sum) in expected {
        assert_eq!(by_key[key], (Some(sum), None), "outcome for {key}");
    }
}

#[test]
fn test_key_generator_set_after_inputs_does_not_rekey() {
    let mut pool = ConcurrentPool::new(3)
        .unwrap()
        .set_inputs(add_params())
        .set_key_generator(|p: &AddParam| format!("a({})+b({})", p.a, p.b))
        .set_execution_function(|p: &AddParam| Ok::<_, ()>(p.a + p.b));

    let outcomes = pool.execute().unwrap();
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| o.key().is_empty()));
    let mut sums: Vec<_> = outcomes.iter().map(|o| *o.output().unwrap()).collect();
    sums.sort();
    assert_eq!(sums, vec![3, 7, 16, 36, 1333]);
}

#[test]
fn test_completeness_for_any_worker_count() {
    for workers in [1, 2, 3, 8, 64] {
        for inputs in [0usize, 1, 7, 100] {
            let mut pool = ConcurrentPool::new(workers)
                .unwrap()
                .set_key_generator(|n: &usize| n.to_string())
                .set_inputs(0..inputs)
                .set_execution_function(|n: &usize| Ok::<_, ()>(n * n));

            let outcomes = pool.execute().unwrap();
            assert_eq!(outcomes.len(), inputs, "workers={workers} inputs={inputs}");

            let mut squares: Vec<_> = outcomes.iter().map(|o| *o.output().unwrap()).collect();
            squares.sort();
            assert_eq!(squares, (0..inputs).map(|n| n * n).collect::<Vec<_>>());
        }
    }
}

#[test]
fn test_single_failure_is_isolated() {
    let mut pool = ConcurrentPool::new(4)
        .unwrap()
        .set_key_generator(|n: &u32| format!("item-{n}"))
        .set_inputs(0..20u32)
        .set_execution_function(|n: &u32| {
            if *n == 13 {
                Err(format!("unlucky {n}"))
            } else {
                Ok(n * 10)
            }
        });

    let outcomes = pool.execute().unwrap();
    assert_eq!(outcomes.len(), 20);

    let failures: Vec<_> = outcomes.iter().filter(|o| o.is_err()).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].key(), "item-13");
    assert_eq!(failures[0].error().unwrap(), "unlucky 13");
    assert_eq!(failures[0].output(), None);

    for outcome in outcomes.iter().filter(|o| o.is_ok()) {
        let n: u32 = outcome.key()["item-".len()..].parse().unwrap();
        assert_eq!(outcome.output(), Some(&(n * 10)));
    }
}

#[test]
fn test_single_worker_preserves_input_order() {
    let mut pool = ConcurrentPool::new(1)
        .unwrap()
        .set_key_generator(|n: &u64| n.to_string())
        .set_inputs(0..50u64)
        .set_execution_function(|n: &u64| {
            thread::sleep(Duration::from_micros(fastrand::u64(0..300)));
            Ok::<_, ()>(*n)
        });

    let outputs: Vec<_> = pool
        .execute()
        .unwrap()
        .iter()
        .map(|o| *o.output().unwrap())
        .collect();
    assert_eq!(outputs, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_many_workers_yield_a_permutation() {
    let inputs: Vec<u64> = (0..40).collect();
    let mut pool = ConcurrentPool::new(6)
        .unwrap()
        .set_key_generator(|n: &u64| format!("{n:03}"))
        .set_inputs(inputs.clone())
        .set_execution_function(|n: &u64| {
            // Later inputs finish faster, which encourages reordering.
            thread::sleep(Duration::from_millis((40 - n) / 8 + fastrand::u64(0..3)));
            Ok::<_, ()>(*n)
        });

    let outcomes = pool.execute().unwrap();
    let expected: Vec<_> = inputs.iter().map(|n| format!("{n:03}")).collect();
    assert_eq!(sorted_keys(outcomes), expected);
}

#[test]
fn test_second_execute_returns_cached_outcomes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut pool = ConcurrentPool::new(3)
        .unwrap()
        .set_inputs(0..10u32)
        .set_execution_function(move |n: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(n + 1)
        });

    let first = pool.execute().unwrap().to_vec();
    let elapsed = pool.execution_time().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 10);

    let second = pool.execute().unwrap().to_vec();
    assert_eq!(first, second);
    assert_eq!(pool.execution_time().unwrap(), elapsed);
    assert_eq!(calls.load(Ordering::SeqCst), 10);
}

#[test]
fn test_accessors_require_finished_execution() {
    let pool = ConcurrentPool::<u32, u32, ()>::new(2).unwrap();
    let err = pool.results().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFinished));
    let err = pool.execution_time().unwrap_err();
    assert!(err.is_not_finished());
}

#[test]
fn test_zero_worker_count_is_rejected() {
    let err = ConcurrentPool::<u32, u32, ()>::new(0).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

    let config: PoolConfig = serde_json::from_str(r#"{"worker_count": 0}"#).unwrap();
    assert!(ConcurrentPool::<u32, u32, ()>::with_config(config).is_err());
}

#[test]
fn test_oversized_worker_count_is_rejected() {
    let err = ConcurrentPool::<u32, u32, ()>::new(1usize << 42).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

    let err = ConcurrentPool::<u32, u32, ()>::new(PoolConfig::MAX_WORKER_COUNT + 1).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

    let json = format!(r#"{{"worker_count": {}}}"#, usize::MAX);
    let config: PoolConfig = serde_json::from_str(&json).unwrap();
    assert!(ConcurrentPool::<u32, u32, ()>::with_config(config).is_err());
}

#[test]
fn test_panic_is_contained_and_pool_stays_unfinished() {
    let mut pool = ConcurrentPool::new(3)
        .unwrap()
        .set_inputs(0..12u32)
        .set_execution_function(|n: &u32| {
            if *n == 5 {
                panic!("cannot handle {n}");
            }
            Ok::<_, ()>(*n)
        });

    let err = pool.execute().unwrap_err();
    match err.kind() {
        ErrorKind::ExecutionFault { component, message } => {
            assert!(component.starts_with("worker-"));
            assert_eq!(message, "cannot handle 5");
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert!(!pool.is_finished());
    assert!(pool.results().unwrap_err().is_not_finished());
    assert!(pool.execution_time().unwrap_err().is_not_finished());
}

#[test]
fn test_partial_outputs_are_kept() {
    let mut pool = ConcurrentPool::new(2)
        .unwrap()
        .set_key_generator(|s: &String| s.clone())
        .set_inputs(["12".to_string(), "3x".to_string(), "7".to_string()])
        .set_partial_execution_function(|s: &String| {
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            let value = digits.parse::<u32>().ok();
            let error = (digits.len() != s.len()).then(|| format!("trailing input in '{s}'"));
            (value, error)
        });

    let outcomes = pool.execute().unwrap();
    let partial = outcomes.iter().find(|o| o.key() == "3x").unwrap();
    assert_eq!(partial.output(), Some(&3));
    assert_eq!(partial.error().unwrap(), "trailing input in '3x'");
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 2);
}

#[test]
fn test_duplicate_and_empty_keys_are_kept() {
    let mut pool = ConcurrentPool::new(2)
        .unwrap()
        .set_key_generator(|n: &u8| if *n == 0 { String::new() } else { "dup".to_string() })
        .set_inputs([0u8, 1, 2, 0])
        .set_execution_function(|n: &u8| Ok::<_, ()>(*n));

    let outcomes = pool.execute().unwrap();
    assert_eq!(sorted_keys(outcomes), vec!["", "", "dup", "dup"]);
}

#[test]
fn test_worker_count_bounds_concurrency() {
    const WORKERS: usize = 3;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (a, p) = (active.clone(), peak.clone());

    let mut pool = ConcurrentPool::new(WORKERS)
        .unwrap()
        .set_inputs(0..30u32)
        .set_execution_function(move |n: &u32| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            a.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(*n)
        });

    assert_eq!(pool.execute().unwrap().len(), 30);
    assert!(peak.load(Ordering::SeqCst) <= WORKERS);
    assert_eq!(active.load(Ordering::SeqCst), 0);
}

#[test]
fn test_workers_run_in_parallel() {
    let sleep = Duration::from_millis(50);
    let mut pool = ConcurrentPool::new(4)
        .unwrap()
        .set_inputs(0..4u32)
        .set_execution_function(move |n: &u32| {
            thread::sleep(sleep);
            Ok::<_, ()>(*n)
        });

    pool.execute().unwrap();
    let elapsed = pool.execution_time().unwrap();
    assert!(elapsed >= sleep);
    assert!(elapsed < sleep * 4);
}

#[test]
fn test_named_threads() {
    let names = Arc::new(Mutex::new(Vec::new()));
    let seen = names.clone();
    let config = PoolConfig::new(2).with_thread_name_prefix("adder");
    let mut pool = ConcurrentPool::with_config(config)
        .unwrap()
        .set_inputs(0..8u32)
        .set_execution_function(move |n: &u32| {
            let name = thread::current().name().unwrap_or_default().to_string();
            seen.lock().unwrap().push(name);
            Ok::<_, ()>(*n)
        });

    pool.execute().unwrap();
    let names = names.lock().unwrap();
    assert_eq!(names.len(), 8);
    assert!(
        names
            .iter()
            .all(|name| name == "adder-worker-0" || name == "adder-worker-1")
    );
}
