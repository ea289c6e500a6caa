//! Interrupt attach/detach over a fake kernel GPIO tree
//!
//! Regular files never signal the edge events a real sysfs value file
//! does, so these tests cover arming, replacement, and teardown; edge
//! delivery itself is exercised against the poll loop in the unit tests.

mod common;

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use piduino_core::{Board, Edge, Error, Level, PinMode};

use common::{FakeGpio, FakePwm};

fn fake_tree(pins: &[u8]) -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    fs::write(dir.path().join("export"), "").unwrap();
    fs::write(dir.path().join("unexport"), "").unwrap();
    for pin in pins {
        let pin_dir = dir.path().join(format!("gpio{pin}"));
        fs::create_dir_all(&pin_dir).unwrap();
        fs::write(pin_dir.join("direction"), "in").unwrap();
        fs::write(pin_dir.join("value"), "0").unwrap();
        fs::write(pin_dir.join("edge"), "none").unwrap();
    }
    dir
}

#[test]
fn test_attach_arms_edge_file() {
    let tree = fake_tree(&[4]);
    let board = Board::with_sysfs_root(tree.path());

    board.attach_interrupt(4, Edge::Falling, |_| {}).unwrap();
    assert_eq!(
        fs::read_to_string(tree.path().join("gpio4").join("edge")).unwrap(),
        "falling"
    );
    board.detach_interrupt(4).unwrap();
}

#[test]
fn test_detach_is_prompt_and_unexports() {
    let tree = fake_tree(&[4]);
    let board = Board::with_sysfs_root(tree.path());

    let fired = Arc::new(AtomicUsize::new(0));
    let fired2 = fired.clone();
    board
        .attach_interrupt(4, Edge::Both, move |_| {
            fired2.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    // The worker is parked in poll with no edge ever coming; detach must
    // not wait for one
    let started = Instant::now();
    board.detach_interrupt(4).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(
        fs::read_to_string(tree.path().join("unexport")).unwrap(),
        "4"
    );
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_reattach_replaces_worker() {
    let tree = fake_tree(&[4]);
    let board = Board::with_sysfs_root(tree.path());

    board.attach_interrupt(4, Edge::Rising, |_| {}).unwrap();
    board.attach_interrupt(4, Edge::Both, |_| {}).unwrap();
    assert_eq!(
        fs::read_to_string(tree.path().join("gpio4").join("edge")).unwrap(),
        "both"
    );
    board.detach_interrupt(4).unwrap();
}

#[test]
fn test_detach_without_attach_is_ok() {
    let tree = fake_tree(&[]);
    let board = Board::with_sysfs_root(tree.path());
    board.detach_interrupt(4).unwrap();
}

#[test]
fn test_attach_invalid_pin_rejected() {
    let tree = fake_tree(&[]);
    let board = Board::with_sysfs_root(tree.path());
    let err = board.attach_interrupt(200, Edge::Rising, |_| {}).unwrap_err();
    assert!(matches!(err, Error::InvalidPin(200)));
}

#[test]
fn test_injected_backends_share_the_fake_tree() {
    let tree = fake_tree(&[4]);
    let gpio = Arc::new(FakeGpio::new());
    let board = Board::with_backends_at(
        tree.path(),
        gpio.clone(),
        gpio.clone(),
        Arc::new(FakePwm::new()),
    );

    // Digital I/O goes through the injected backend while interrupt
    // arming lands in the fake tree
    board.pin_mode(4, PinMode::Output).unwrap();
    board.digital_write(4, Level::High).unwrap();
    assert_eq!(gpio.level(4), Level::High);

    board.attach_interrupt(4, Edge::Rising, |_| {}).unwrap();
    assert_eq!(
        fs::read_to_string(tree.path().join("gpio4").join("edge")).unwrap(),
        "rising"
    );

    board.detach_interrupt(4).unwrap();
    assert_eq!(
        fs::read_to_string(tree.path().join("unexport")).unwrap(),
        "4"
    );
}

#[test]
fn test_workers_survive_board_clones() {
    let tree = fake_tree(&[4]);
    let board = Board::with_sysfs_root(tree.path());
    let clone = board.clone();

    clone.attach_interrupt(4, Edge::Rising, |_| {}).unwrap();
    drop(clone);
    thread::sleep(Duration::from_millis(20));

    // The original handle still owns the worker and can tear it down
    board.detach_interrupt(4).unwrap();
}
