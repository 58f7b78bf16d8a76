/*!
 * Console Tests
 * Command execution and the interactive loop
 */

use pretty_assertions::assert_eq;
use sigil_vm::console::{self, Outcome, PROMPT};
use sigil_vm::{Status, VirtualMachine};
use std::io::Cursor;
use std::thread;

fn running_vm() -> (VirtualMachine, thread::JoinHandle<sigil_vm::VmResult<()>>) {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();
    let waiter = vm.clone();
    let handler = thread::spawn(move || waiter.wait_for_shutdown());
    vm.wait_for_vm().unwrap();
    (vm, handler)
}

#[test]
fn test_treeinfo_lists_registry() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let Outcome::Continue(text) = console::exec(&vm, "treeinfo").unwrap() else {
        panic!("treeinfo should not shut down");
    };
    assert!(text.starts_with("vm-tree: vmroot(0, RC:2), master: self/root"));
    assert!(text.contains("vm-tree:     runtime(1, RC:0), master: vmroot"));

    let Outcome::Continue(json) = console::exec(&vm, "treeinfo json").unwrap() else {
        panic!("treeinfo json should not shut down");
    };
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["nodes"][0]["name"], "vmroot");

    vm.deinitialize().unwrap();
}

#[test]
fn test_cookie_and_debug_commands() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let before = vm.cookie().unwrap();
    let Outcome::Continue(text) = console::exec(&vm, "cookie").unwrap() else {
        panic!("cookie should not shut down");
    };
    assert!(text.starts_with(&format!("cookie: {:#010x} -> ", before)));

    console::exec(&vm, "debug on").unwrap();
    assert!(vm.debug_mode());
    console::exec(&vm, "debug off").unwrap();
    assert!(!vm.debug_mode());

    assert_eq!(
        Status::of(&console::exec(&vm, "flushvm")),
        Status::NotSupported
    );
    assert_eq!(
        console::exec(&vm, "   ").unwrap(),
        Outcome::Continue(String::new())
    );

    vm.deinitialize().unwrap();
}

#[test]
fn test_exit_requests_shutdown() {
    let (vm, handler) = running_vm();

    assert_eq!(console::exec(&vm, "exit").unwrap(), Outcome::Shutdown);
    assert!(handler.join().unwrap().is_ok());
    assert!(!vm.is_active());
}

#[test]
fn test_run_loop() {
    let (vm, handler) = running_vm();

    let input = Cursor::new("state\nbogus\nexit\nstate\n");
    let mut output = Vec::new();
    console::run(&vm, input, &mut output).unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with(PROMPT));
    assert!(text.contains("active: true"));
    assert!(text.contains("error: "));
    assert!(text.contains("(VM_NOT_SUPPORTED)"));
    assert!(text.ends_with("shutting down\n"));

    assert!(handler.join().unwrap().is_ok());
}

#[test]
fn test_run_stops_at_end_of_input() {
    let vm = VirtualMachine::new();
    vm.initialize(Vec::<String>::new()).unwrap();

    let mut output = Vec::new();
    console::run(&vm, Cursor::new("help\n"), &mut output).unwrap();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("treeinfo [json]"));

    vm.deinitialize().unwrap();
}
