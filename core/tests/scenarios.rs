// SPDX-License-Identifier: Apache-2.0

//! End-to-end ordering scenarios.
//!
//! Exercises the classifier → router → composition buffer chain the way the
//! supervisor's event loop does, without a real PTY or terminal — the
//! ordering invariants are properties of that chain, not of the PTY itself.
//! Uses `tokio::time::pause`/`advance` to control the idle window
//! deterministically.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ime_proxy_core::{Classification, CompositionBuffer, SpecialKey, classify, route};

/// Mimics `ProxySupervisor::handle_stdin_chunk`'s dispatch, writing forwarded
/// bytes to a shared in-memory child stream instead of a real PTY. The
/// Classifier is consulted here, exactly as the Supervisor does, and its
/// verdict is passed into `buffer.process` rather than the buffer
/// classifying internally.
fn feed(buffer: &mut CompositionBuffer, child: &Arc<Mutex<Vec<u8>>>, chunk: &[u8]) {
    match route(chunk) {
        SpecialKey::Interrupt | SpecialKey::EndOfFile | SpecialKey::Enter | SpecialKey::EscapeIntroduced => {
            buffer.flush().unwrap();
            child.lock().unwrap().extend_from_slice(chunk);
        }
        SpecialKey::Backspace => {
            if !buffer.backspace().unwrap() {
                child.lock().unwrap().extend_from_slice(chunk);
            }
        }
        SpecialKey::None => {
            let text = std::str::from_utf8(chunk).expect("scenario fixtures are valid UTF-8");
            let is_ime = matches!(classify(text), Classification::Ime(_));
            buffer.process(text, is_ime).unwrap();
        }
    }
}

fn new_harness(timeout: Duration) -> (CompositionBuffer, Arc<Mutex<Vec<u8>>>) {
    let child = Arc::new(Mutex::new(Vec::new()));
    let flush_child = child.clone();
    let regular_child = child.clone();
    let buffer = CompositionBuffer::new(
        timeout,
        move |text: &str| {
            flush_child.lock().unwrap().extend_from_slice(text.as_bytes());
            Ok(())
        },
        move |text: &str| {
            regular_child.lock().unwrap().extend_from_slice(text.as_bytes());
            Ok(())
        },
    );
    (buffer, child)
}

async fn advance_past_timeout(buffer: &mut CompositionBuffer, past: Duration) {
    if let Some(generation) = buffer.deadline().map(|_| buffer.generation()) {
        tokio::time::advance(past).await;
        buffer.on_timeout(generation).unwrap();
    } else {
        tokio::time::advance(past).await;
    }
}

#[tokio::test(start_paused = true)]
async fn s1_vietnamese_settled_composition() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, b"xin ");
    assert_eq!(&child.lock().unwrap()[..], b"xin ");

    tokio::time::advance(Duration::from_millis(200)).await;
    feed(&mut buffer, &child, "chào".as_bytes());
    advance_past_timeout(&mut buffer, Duration::from_millis(60)).await;

    assert_eq!(&child.lock().unwrap()[..], "xin chào".as_bytes());
}

#[tokio::test(start_paused = true)]
async fn s2_cjk_plus_enter() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, "中".as_bytes());
    feed(&mut buffer, &child, &[0x0A]);

    let out = child.lock().unwrap().clone();
    assert_eq!(out, [b"\xe4\xb8\xad".as_slice(), b"\n"].concat());
}

#[tokio::test(start_paused = true)]
async fn s3_backspace_inside_composition() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, "ñ".as_bytes());
    tokio::time::advance(Duration::from_millis(10)).await;
    feed(&mut buffer, &child, &[0x7F]);

    assert!(child.lock().unwrap().is_empty());
    assert!(!buffer.is_composing());
}

#[tokio::test(start_paused = true)]
async fn s4_backspace_with_empty_buffer() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, &[0x7F]);
    assert_eq!(&child.lock().unwrap()[..], &[0x7F]);
}

#[tokio::test(start_paused = true)]
async fn s5_escape_sequence_during_composition() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, "한".as_bytes());
    tokio::time::advance(Duration::from_millis(10)).await;
    feed(&mut buffer, &child, &[0x1B, b'[', b'A']);

    let out = child.lock().unwrap().clone();
    assert_eq!(out, [b"\xed\x95\x9c".as_slice(), &[0x1B, b'[', b'A']].concat());
}

#[tokio::test(start_paused = true)]
async fn s6_mixed_burst() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, b"a");
    tokio::time::advance(Duration::from_millis(5)).await;
    feed(&mut buffer, &child, "あ".as_bytes());
    tokio::time::advance(Duration::from_millis(5)).await;
    feed(&mut buffer, &child, b"b");

    let out = child.lock().unwrap().clone();
    let expected = [b"a".as_slice(), "あ".as_bytes(), b"b"].concat();
    assert_eq!(out, expected);
}

#[tokio::test(start_paused = true)]
async fn s7_idle_flush() {
    let (mut buffer, child) = new_harness(Duration::from_millis(50));
    feed(&mut buffer, &child, "日本".as_bytes());
    assert!(child.lock().unwrap().is_empty());

    advance_past_timeout(&mut buffer, Duration::from_millis(100)).await;

    assert_eq!(&child.lock().unwrap()[..], "日本".as_bytes());
    assert!(!buffer.is_composing());
}
