/*!
 * Worker Thread Tests
 * Tracking, join ordering and spawn refusal during teardown
 */

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sigil_vm::{Status, VirtualMachine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_deinitialize_waits_for_worker() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    vm.spawn_thread(move || {
        thread::sleep(Duration::from_millis(50));
        flag.store(true, Ordering::SeqCst);
    })
    .unwrap();

    vm.deinitialize().unwrap();
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_deinitialize_joins_every_worker() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3u64 {
        let order = Arc::clone(&order);
        vm.spawn_named_thread(format!("ordered-{}", i), move || {
            thread::sleep(Duration::from_millis(30 - i * 10));
            order.lock().push(i);
        })
        .unwrap();
    }
    assert_eq!(vm.tracked_threads(), 3);

    vm.deinitialize().unwrap();
    let mut finished = order.lock().clone();
    finished.sort_unstable();
    assert_eq!(finished, vec![0, 1, 2]);
    assert_eq!(vm.tracked_threads(), 0);
}

#[test]
fn test_worker_sees_inactive_during_teardown() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let waiter = vm.clone();
    let handler = thread::spawn(move || waiter.wait_for_shutdown());
    vm.wait_for_vm().unwrap();

    let refused = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&refused);
    let worker_vm = vm.clone();
    vm.spawn_thread(move || {
        while worker_vm.is_active() {
            thread::sleep(Duration::from_millis(1));
        }
        *seen.lock() = Some(Status::of(&worker_vm.spawn_thread(|| {})));
    })
    .unwrap();

    vm.request_shutdown().unwrap();
    assert!(handler.join().unwrap().is_ok());
    assert_eq!(*refused.lock(), Some(Status::SystemShutdown));
}

#[test]
fn test_empty_thread_name() {
    let vm = VirtualMachine::new();
    assert_eq!(Status::of(&vm.spawn_named_thread("", || {})), Status::ArgNull);
}

#[test]
fn test_thread_limit_from_builder() {
    let vm = VirtualMachine::builder().with_max_threads(2).build();
    vm.initialize(Vec::<String>::new()).unwrap();

    let release = Arc::new(AtomicBool::new(false));
    for _ in 0..2 {
        let release = Arc::clone(&release);
        vm.spawn_thread(move || {
            while !release.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();
    }

    assert_eq!(Status::of(&vm.spawn_thread(|| {})), Status::Busy);
    release.store(true, Ordering::SeqCst);
    vm.deinitialize().unwrap();
}
