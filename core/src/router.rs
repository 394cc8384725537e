// SPDX-License-Identifier: Apache-2.0

//! Special-key classification of raw input bytes.
//!
//! The router holds no state beyond its decision logic: given a chunk of
//! bytes as they arrive from the terminal, decide which (if any) special key
//! it represents. The *action* taken on that decision (flush-then-forward,
//! backspace-or-forward, drop) belongs to the supervisor, not here.

/// A control key that must pre-empt any in-progress IME composition before
/// being forwarded to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKey {
    /// `Ctrl-C` (0x03).
    Interrupt,
    /// `Ctrl-D` (0x04).
    EndOfFile,
    /// Backspace/Delete (0x7F or 0x08).
    Backspace,
    /// Enter (0x0D or 0x0A).
    Enter,
    /// An escape sequence: the chunk starts with 0x1B (arrow keys, function
    /// keys, bracketed-paste markers, etc). The composition buffer is
    /// flushed but the sequence itself is not otherwise interpreted here.
    EscapeIntroduced,
    /// No special meaning; the chunk is ordinary (possibly IME) input.
    None,
}

/// Classifies a raw chunk of terminal input bytes as it arrives, before any
/// UTF-8 decoding or script classification happens.
///
/// Per spec.md §4.3, rules 1-4 (`Interrupt`/`EndOfFile`/`Backspace`/`Enter`)
/// require the chunk to be exactly that one byte — a coalesced chunk like
/// `[0x03, b'l', b's']` is ordinary input that merely starts with a control
/// byte, not a bare interrupt, and must fall through to classification
/// instead of being forwarded whole. Only rule 5 (`EscapeIntroduced`) matches
/// on a leading byte regardless of the chunk's length, since escape
/// sequences are themselves multi-byte by construction.
#[must_use]
pub fn route(chunk: &[u8]) -> SpecialKey {
    match chunk {
        [0x03] => SpecialKey::Interrupt,
        [0x04] => SpecialKey::EndOfFile,
        [0x7F] | [0x08] => SpecialKey::Backspace,
        [0x0D] | [0x0A] => SpecialKey::Enter,
        [0x1B, ..] => SpecialKey::EscapeIntroduced,
        _ => SpecialKey::None,
    }
}
