/*!
 * Shutdown Handler Tests
 * Single-handler rule, readiness gating and cross-thread shutdown requests
 */

use pretty_assertions::assert_eq;
use sigil_vm::{Status, VirtualMachine, VmState};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[test]
fn test_second_waiter_is_locked() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let waiter = vm.clone();
    let first = thread::spawn(move || waiter.wait_for_shutdown());
    vm.wait_for_vm().unwrap();

    assert_eq!(Status::of(&vm.wait_for_shutdown()), Status::Locked);
    assert!(vm.is_active());

    vm.request_shutdown().unwrap();
    assert!(first.join().unwrap().is_ok());
}

#[test]
fn test_wait_for_vm_blocks_until_handler_registers() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let (tx, rx) = mpsc::channel();
    let gate = vm.clone();
    let gated = thread::spawn(move || {
        let result = gate.wait_for_vm();
        tx.send(()).unwrap();
        result
    });

    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    let waiter = vm.clone();
    let handler = thread::spawn(move || waiter.wait_for_shutdown());

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(gated.join().unwrap().is_ok());

    vm.request_shutdown().unwrap();
    assert!(handler.join().unwrap().is_ok());
}

#[test]
fn test_wait_for_vm_wakes_on_teardown() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let gate = vm.clone();
    let gated = thread::spawn(move || gate.wait_for_vm());

    thread::sleep(Duration::from_millis(20));
    vm.deinitialize().unwrap();

    assert_eq!(Status::of(&gated.join().unwrap()), Status::SystemShutdown);
}

#[test]
fn test_shutdown_requested_from_worker() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let worker_vm = vm.clone();
    vm.spawn_thread(move || {
        worker_vm.wait_for_vm().unwrap();
        worker_vm.request_shutdown().unwrap();
    })
    .unwrap();

    vm.wait_for_shutdown().unwrap();
    assert_eq!(vm.state(), VmState::Shutdown);
    assert_eq!(vm.tracked_threads(), 0);
}

#[test]
fn test_repeated_requests_are_accepted_once_running() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let waiter = vm.clone();
    let handler = thread::spawn(move || waiter.wait_for_shutdown());
    vm.wait_for_vm().unwrap();

    let requesters: Vec<_> = (0..4)
        .map(|_| {
            let vm = vm.clone();
            thread::spawn(move || vm.request_shutdown())
        })
        .collect();

    assert!(handler.join().unwrap().is_ok());
    for requester in requesters {
        let status = Status::of(&requester.join().unwrap());
        assert!(status == Status::Ok || status == Status::Failed);
    }
    assert!(!vm.is_active());
}
