// SPDX-License-Identifier: Apache-2.0

//! Coalesces IME composition fragments into atomic writes to the child.
//!
//! Driven entirely by the supervisor's single cooperative task: every method
//! here is synchronous. The only concession to time is [`CompositionBuffer::deadline`],
//! a plain [`tokio::time::Instant`] the supervisor polls with
//! `tokio::time::sleep_until` inside its own `select!` loop. A
//! `timer_generation` counter stamped on every arm/clear lets
//! [`CompositionBuffer::on_timeout`] recognize a deadline that has since been
//! superseded, so no real timer-cancellation handle is needed.
//!
//! The Classifier is consulted by the caller, not by this module: per
//! spec.md §4.5 item 4 the Supervisor calls `Classifier.classify` first and
//! hands the pre-computed verdict to [`CompositionBuffer::process`] as
//! `is_ime`, mirroring spec.md §4.2's `process(text, is_ime)` contract.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::error::ProxyResult;

/// Buffers in-progress IME composition fragments and flushes them as a
/// single atomic write once a special key arrives or the idle timeout
/// elapses.
pub struct CompositionBuffer {
    buffer: Vec<char>,
    timeout: Duration,
    deadline: Option<Instant>,
    timer_generation: u64,
    on_flush: Box<dyn FnMut(&str) -> ProxyResult<()> + Send>,
    on_regular: Box<dyn FnMut(&str) -> ProxyResult<()> + Send>,
}

impl CompositionBuffer {
    /// `on_flush` is called with the full, coalesced composition text once it
    /// is ready to be written to the child. `on_regular` is called with
    /// ordinary (non-IME) decoded text. Both run synchronously on the
    /// supervisor's task; callers typically close over the same
    /// `PtyBridge::write`.
    pub fn new(
        timeout: Duration,
        on_flush: impl FnMut(&str) -> ProxyResult<()> + Send + 'static,
        on_regular: impl FnMut(&str) -> ProxyResult<()> + Send + 'static,
    ) -> Self {
        Self {
            buffer: Vec::new(),
            timeout,
            deadline: None,
            timer_generation: 0,
            on_flush: Box::new(on_flush),
            on_regular: Box::new(on_regular),
        }
    }

    /// Accepts one chunk of decoded terminal input along with the
    /// Classifier's verdict for it (spec.md §4.2).
    ///
    /// `is_ime = false`: if a composition is in progress it is flushed first,
    /// then `text` is forwarded immediately via the regular-input sink.
    /// `is_ime = true`: `text` is appended to the buffer and the idle
    /// deadline is (re)armed.
    pub fn process(&mut self, text: &str, is_ime: bool) -> ProxyResult<()> {
        trace!(is_ime, len = text.len(), "buffer: process");
        if is_ime {
            self.buffer.extend(text.chars());
            self.arm_deadline();
            Ok(())
        } else {
            if self.is_composing() {
                self.flush()?;
            }
            (self.on_regular)(text)
        }
    }

    /// Emits the buffered composition (if any) as a single atomic write and
    /// clears the buffer. A no-op when nothing is composing.
    pub fn flush(&mut self) -> ProxyResult<()> {
        if self.buffer.is_empty() {
            self.deadline = None;
            return Ok(());
        }
        let text: String = self.buffer.drain(..).collect();
        self.deadline = None;
        self.timer_generation += 1;
        trace!(chars = text.chars().count(), "buffer: flush");
        (self.on_flush)(&text)
    }

    /// Applies a backspace to the in-progress composition.
    ///
    /// Returns `true` if the backspace was absorbed by the buffer (the
    /// caller must not also forward the raw backspace byte), or `false` if
    /// nothing was composing and the caller should forward it as-is.
    pub fn backspace(&mut self) -> ProxyResult<bool> {
        if !self.is_composing() {
            return Ok(false);
        }
        self.buffer.pop();
        trace!(remaining = self.buffer.len(), "buffer: backspace");
        if self.buffer.is_empty() {
            self.clear();
        } else {
            self.arm_deadline();
        }
        Ok(true)
    }

    /// Discards any in-progress composition without emitting it.
    pub fn clear(&mut self) {
        trace!("buffer: clear");
        self.buffer.clear();
        self.deadline = None;
        self.timer_generation += 1;
    }

    #[must_use]
    pub fn is_composing(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// The composition text buffered so far, without consuming it.
    #[must_use]
    pub fn peek(&self) -> String {
        self.buffer.iter().collect()
    }

    /// The instant at which the current composition should be flushed due to
    /// inactivity, if one is armed.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The generation stamped on the currently armed deadline. Callers that
    /// schedule a `sleep_until(deadline)` should capture this value alongside
    /// it and pass it back to [`CompositionBuffer::on_timeout`] when the
    /// sleep fires, so a deadline superseded by newer input is ignored.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.timer_generation
    }

    /// Called by the supervisor when a previously scheduled `sleep_until`
    /// fires. Flushes only if `generation` still matches the current
    /// generation; otherwise the deadline was superseded (by a flush, a
    /// clear, or a new keystroke re-arming it) and this is a stale wakeup.
    pub fn on_timeout(&mut self, generation: u64) -> ProxyResult<()> {
        if generation == self.timer_generation {
            trace!(generation, "buffer: idle timeout fired");
            self.flush()
        } else {
            trace!(generation, current = self.timer_generation, "buffer: stale timeout ignored");
            Ok(())
        }
    }

    fn arm_deadline(&mut self) {
        self.timer_generation += 1;
        self.deadline = Some(Instant::now() + self.timeout);
    }
}
