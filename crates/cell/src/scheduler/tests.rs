use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::time::Duration;

use rstest::rstest;
use warden_exec::SerialExecutor;

use super::*;
use crate::{ContainerSpec, ValueContainer};

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}

/// Blocks `exec` until the returned sender fires or is dropped.
fn hold(exec: &SerialExecutor) -> mpsc::Sender<()> {
	let (gate_tx, gate_rx) = mpsc::channel::<()>();
	exec.execute(Box::new(move || {
		let _ = gate_rx.recv();
	}));
	gate_tx
}

#[rstest]
fn sync_operations_round_trip(#[values(Tier::Immediate, Tier::Highest, Tier::Lowest)] tier: Tier) {
	init_tracing();
	let handle = ValueContainer::new(vec![1]);
	let actions = handle.sync().tier(tier);
	assert_eq!(actions.tier(), tier);

	assert_eq!(actions.get().unwrap(), [1]);
	assert_eq!(actions.set(vec![2, 3]).unwrap(), [2, 3]);
	assert_eq!(actions.update(|v| v.push(4)).unwrap(), [2, 3, 4]);
	assert_eq!(actions.transform(|v| v.iter().sum::<i32>()).unwrap(), 9);
	assert_eq!(handle.pending(), 0);
}

#[rstest]
fn operations_fail_fast_once_container_is_gone(#[values(Tier::Immediate, Tier::Highest, Tier::Lowest)] tier: Tier) {
	let handle = ValueContainer::new(String::from("alive"));
	let actions = handle.sync().tier(tier);
	drop(handle);

	let invoked = Arc::new(AtomicBool::new(false));
	assert!(matches!(actions.get(), Err(ContainerError::ContainerGone)));
	assert!(matches!(actions.set("late".into()), Err(ContainerError::ContainerGone)));

	let flag = Arc::clone(&invoked);
	let updated = actions.update(move |s| {
		flag.store(true, Ordering::SeqCst);
		s.clear();
	});
	assert!(matches!(updated, Err(ContainerError::ContainerGone)));

	let flag = Arc::clone(&invoked);
	let projected = actions.transform(move |s| {
		flag.store(true, Ordering::SeqCst);
		s.len()
	});
	assert!(matches!(projected, Err(ContainerError::ContainerGone)));
	assert!(!invoked.load(Ordering::SeqCst));
}

#[test]
fn update_after_drop_never_runs_mutator() {
	let handle = ValueContainer::new(1);
	let sync = handle.sync();
	assert_eq!(sync.lowest_priority().set(2).unwrap(), 2);
	assert_eq!(sync.lowest_priority().get().unwrap(), 2);

	drop(handle);
	let ran = Arc::new(AtomicBool::new(false));
	let flag = Arc::clone(&ran);
	let result = sync.lowest_priority().update(move |v| {
		flag.store(true, Ordering::SeqCst);
		*v = 99;
	});
	assert!(result.unwrap_err().is_container_gone());
	assert!(!ran.load(Ordering::SeqCst));
}

#[test]
fn concurrent_sync_updates_are_serialized() {
	const THREADS: usize = 8;
	const PER_THREAD: u64 = 200;

	let handle = ValueContainer::with_spec(0u64, ContainerSpec::default().label("counter"));
	let barrier = Arc::new(Barrier::new(THREADS));
	let workers: Vec<_> = (0..THREADS)
		.map(|thread| {
			let sync = handle.sync();
			let barrier = Arc::clone(&barrier);
			std::thread::spawn(move || {
				barrier.wait();
				for n in 0..PER_THREAD {
					let tier = match (thread as u64 + n) % 3 {
						0 => Tier::Immediate,
						1 => Tier::Highest,
						_ => Tier::Lowest,
					};
					sync.tier(tier).update(|count| *count += 1).unwrap();
				}
			})
		})
		.collect();
	for worker in workers {
		worker.join().unwrap();
	}

	assert_eq!(handle.sync().immediate().get().unwrap(), THREADS as u64 * PER_THREAD);
	assert_eq!(handle.pending(), 0);
}

#[test]
fn admitted_operation_finishes_after_handle_drop() {
	let handle = ValueContainer::new(0);
	let sync = handle.sync();
	let (started_tx, started_rx) = mpsc::channel::<()>();
	let (release_tx, release_rx) = mpsc::channel::<()>();

	let in_flight = {
		let sync = sync.clone();
		std::thread::spawn(move || {
			sync.lowest_priority().update(move |v| {
				let _ = started_tx.send(());
				let _ = release_rx.recv();
				*v = 5;
			})
		})
	};

	started_rx.recv_timeout(WAIT).unwrap();
	drop(handle);
	release_tx.send(()).unwrap();

	assert_eq!(in_flight.join().unwrap().unwrap(), 5);
	assert!(sync.highest_priority().get().unwrap_err().is_container_gone());
}

#[test]
fn async_completions_run_on_target_context() {
	init_tracing();
	let handle = ValueContainer::new(10);
	let target = SerialExecutor::new("ctx-b").unwrap();
	let gate = hold(&target);
	let actions = handle.async_on(target.clone()).lowest_priority();
	let (tx, rx) = mpsc::channel();

	let (observer, sent) = (target.clone(), tx.clone());
	actions.get(move |r| {
		let _ = sent.send(("get", observer.is_current(), r.ok()));
	});
	let (observer, sent) = (target.clone(), tx.clone());
	actions.set_with(11, move |r| {
		let _ = sent.send(("set", observer.is_current(), r.ok()));
	});
	let (observer, sent) = (target.clone(), tx);
	actions.update_with(
		|v| *v += 1,
		move |r| {
			let _ = sent.send(("update", observer.is_current(), r.ok()));
		},
	);

	// The issuing thread got control back while the target is still held.
	assert!(!target.is_current());
	assert!(rx.try_recv().is_err());
	gate.send(()).unwrap();

	let seen: Vec<_> = (0..3).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
	assert_eq!(seen, [("get", true, Some(10)), ("set", true, Some(11)), ("update", true, Some(12))]);
}

#[test]
fn async_transform_and_fire_and_forget() {
	let handle = ValueContainer::new(String::from("a"));
	let target = SerialExecutor::new("ctx-transform").unwrap();
	let actions = handle.async_on(target).highest_priority();
	actions.set("ab".to_string());
	actions.update(|s| s.push('c'));

	let (tx, rx) = mpsc::channel();
	actions.transform(
		|s| s.len(),
		move |r| {
			let _ = tx.send(r.ok());
		},
	);
	assert_eq!(rx.recv_timeout(WAIT).unwrap(), Some(3));
	assert_eq!(handle.sync().immediate().get().unwrap(), "abc");
}

#[rstest]
fn async_reports_container_gone_on_target_context(#[values(Tier::Immediate, Tier::Highest, Tier::Lowest)] tier: Tier) {
	let handle = ValueContainer::new(1);
	let target = SerialExecutor::new("ctx-gone").unwrap();
	let gate = hold(&target);
	let actions = handle.async_on(target.clone()).tier(tier);

	let ran = Arc::new(AtomicBool::new(false));
	let (tx, rx) = mpsc::channel();

	let (flag, observer, sent) = (Arc::clone(&ran), target.clone(), tx.clone());
	actions.update_with(
		move |v| {
			flag.store(true, Ordering::SeqCst);
			*v = 99;
		},
		move |r| {
			let _ = sent.send(("update", observer.is_current(), r.map_err(|err| err.is_container_gone())));
		},
	);
	let (observer, sent) = (target.clone(), tx.clone());
	actions.get(move |r| {
		let _ = sent.send(("get", observer.is_current(), r.map_err(|err| err.is_container_gone())));
	});
	let (flag, observer, sent) = (Arc::clone(&ran), target.clone(), tx);
	actions.transform(
		move |v| {
			flag.store(true, Ordering::SeqCst);
			*v * 2
		},
		move |r| {
			let _ = sent.send(("transform", observer.is_current(), r.map_err(|err| err.is_container_gone())));
		},
	);

	drop(handle);
	gate.send(()).unwrap();

	let seen: Vec<_> = (0..3).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
	assert_eq!(seen, [("update", true, Err(true)), ("get", true, Err(true)), ("transform", true, Err(true))]);
	assert!(!ran.load(Ordering::SeqCst));
}

#[rstest]
fn panicking_queued_mutator_reports_unexpected(#[values(Tier::Highest, Tier::Lowest)] tier: Tier) {
	init_tracing();
	let handle = ValueContainer::new(vec![1]);
	let actions = handle.sync().tier(tier);

	let failed = actions.update(|_| panic!("bad mutator"));
	assert!(matches!(failed, Err(ContainerError::Unexpected(_))));

	assert_eq!(actions.update(|v| v.push(2)).unwrap(), [1, 2]);
	assert_eq!(handle.pending(), 0);
}

#[test]
fn tokio_runtime_as_execution_context() {
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.worker_threads(1)
		.thread_name("ctx-tokio")
		.build()
		.unwrap();
	let handle = ValueContainer::new(1);
	let (tx, rx) = mpsc::channel();
	handle.async_on(runtime.handle().clone()).highest_priority().update_with(
		|v| *v += 5,
		move |r| {
			let _ = tx.send((std::thread::current().name().map(str::to_owned), r.ok()));
		},
	);

	let (thread, value) = rx.recv_timeout(WAIT).unwrap();
	assert_eq!(thread.as_deref(), Some("ctx-tokio"));
	assert_eq!(value, Some(6));
}

#[test]
fn background_uses_fallback_runtime() {
	let handle = ValueContainer::new("bg");
	let (tx, rx) = mpsc::channel();
	handle.background().immediate().get(move |r| {
		let _ = tx.send((std::thread::current().name().map(str::to_owned), r.ok()));
	});

	let (thread, value) = rx.recv_timeout(WAIT).unwrap();
	assert_eq!(thread.as_deref(), Some("warden-exec-global"));
	assert_eq!(value, Some("bg"));
}

#[test]
fn errors_render_readably() {
	assert_eq!(ContainerError::ContainerGone.to_string(), "value container is gone");
	let wrapped = ContainerError::from(anyhow::anyhow!("disk on fire"));
	assert!(!wrapped.is_container_gone());
	assert_eq!(wrapped.to_string(), "unexpected error: disk on fire");
}
