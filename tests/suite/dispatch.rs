//! End-to-end dispatch through real worker threads.

use std::thread;
use std::time::Duration;

use futures_util::future::join_all;
use offload_engine::{
    DispatchState, Dispatcher, Failure, Interrupt, Outcome, WorkError, WorkErrorKind, WorkUnit,
};

use crate::common::{closed_form_sum, settle};

fn sum_below(n: u64) -> Result<u64, WorkError> {
    Ok((0..n).sum())
}

fn scramble(mut values: Vec<u64>) -> Result<Vec<u64>, WorkError> {
    values.reverse();
    values.push(0);
    Ok(values)
}

fn panics_on_odd(n: u64) -> Result<u64, WorkError> {
    assert!(n.is_multiple_of(2), "odd input {n}");
    Ok(n)
}

fn wait_for_cancel(limit_ms: u64, interrupt: &Interrupt) -> Result<u64, WorkError> {
    for waited in 0..limit_ms {
        if interrupt.is_requested() {
            return Err(WorkError::raised(format!("stopped after {waited} ms")));
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(limit_ms)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_dispatches_each_get_their_own_outcome() {
    let dispatcher = Dispatcher::new();
    let handles: Vec<_> = (1..=16_u64)
        .map(|i| dispatcher.run(WorkUnit::new(sum_below, i * 10_000)).unwrap())
        .collect();

    let outcomes = join_all(handles.into_iter().map(settle)).await;
    for (i, outcome) in (1..=16_u64).zip(outcomes) {
        assert_eq!(outcome, Outcome::Success(closed_form_sum(i * 10_000)));
    }
}

#[tokio::test]
async fn input_is_moved_not_shared() {
    let dispatcher = Dispatcher::new();
    let original = vec![1, 2, 3];

    let handle = dispatcher
        .run(WorkUnit::new(scramble, original.clone()))
        .unwrap();
    let outcome = settle(handle).await;

    assert_eq!(outcome, Outcome::Success(vec![3, 2, 1, 0]));
    assert_eq!(original, vec![1, 2, 3]);
}

#[tokio::test]
async fn panicking_unit_leaves_dispatcher_usable() {
    let dispatcher = Dispatcher::new();

    let failed = settle(dispatcher.run(WorkUnit::new(panics_on_odd, 3)).unwrap()).await;
    match failed {
        Outcome::Failure(Failure::Computation(err)) => {
            assert_eq!(err.kind(), WorkErrorKind::Panicked);
            assert!(err.message().contains("odd input 3"), "{err}");
        }
        other => panic!("expected a panicked computation, got {other:?}"),
    }

    let ok = settle(dispatcher.run(WorkUnit::new(panics_on_odd, 4)).unwrap()).await;
    assert_eq!(ok, Outcome::Success(4));
}

#[tokio::test]
async fn handle_outlives_its_dispatcher() {
    let handle = {
        let dispatcher = Dispatcher::new();
        dispatcher.run(WorkUnit::new(sum_below, 1_000)).unwrap()
    };
    assert_eq!(settle(handle).await, Outcome::Success(closed_form_sum(1_000)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_from_another_task_resolves_the_awaiting_caller() {
    let dispatcher = Dispatcher::new();
    let handle = dispatcher
        .run(WorkUnit::interruptible(wait_for_cancel, 5_000))
        .unwrap();
    let canceller = handle.cancel_handle();

    let cancel_task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel()
    });

    let outcome = settle(handle).await;
    assert!(cancel_task.await.unwrap());
    assert_eq!(outcome, Outcome::Failure(Failure::Cancelled));
}

#[tokio::test]
async fn dispatch_ids_are_unique_per_dispatcher() {
    let dispatcher = Dispatcher::new();
    let first = dispatcher.run(WorkUnit::new(sum_below, 1)).unwrap();
    let second = dispatcher.run(WorkUnit::new(sum_below, 1)).unwrap();
    assert_ne!(first.id(), second.id());

    let first_id = first.id();
    settle(first).await;
    let canceller = second.cancel_handle();
    settle(second).await;
    assert_eq!(canceller.state(), DispatchState::Completed);
    assert!(first_id.value() < canceller.id().value());
}
