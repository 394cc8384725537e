// SPDX-License-Identifier: Apache-2.0

//! Unicode classification of raw terminal input.
//!
//! Pure, stateless functions: no I/O, no buffering. Given a decoded chunk of
//! text, decide whether it is ordinary input or part of an IME composition,
//! and if the latter, which script it belongs to. Range tables are expressed
//! as `const` arrays of inclusive `(start, end)` code point pairs, in the
//! style of the CSI/ESC byte-range tables this is grounded on.

/// Scripts whose input methods commonly produce multi-byte, multi-keystroke
/// compositions (accents, tone marks, or whole-syllable assembly) that a
/// naive byte-at-a-time forwarder would mangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Vietnamese,
    Chinese,
    Japanese,
    Korean,
    Thai,
    Arabic,
    Devanagari,
    Unknown,
}

/// The result of classifying one chunk of decoded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Plain ASCII / already-composed input; forward as-is.
    Regular,
    /// Part of an in-progress or atomic IME composition for the given script.
    Ime(Script),
}

/// Inclusive Unicode code point ranges, `(start, end, script)`, checked in
/// the order listed here — "first match wins" per the design's script
/// table. Ranges mirror that table exactly, including its combining-mark
/// entry for Vietnamese.
const SCRIPT_RANGES: &[(u32, u32, Script)] = &[
    // Vietnamese: Latin-1 Supplement accented letters, individual
    // Latin Extended-A letters with breve/horn/stroke, the tone-mark block,
    // and the combining diacriticals used to build them live-on-the-wire.
    (0x00C0, 0x00FF, Script::Vietnamese),
    (0x0102, 0x0103, Script::Vietnamese),
    (0x0110, 0x0111, Script::Vietnamese),
    (0x0128, 0x0129, Script::Vietnamese),
    (0x0168, 0x0169, Script::Vietnamese),
    (0x01A0, 0x01B0, Script::Vietnamese),
    (0x1EA0, 0x1EF9, Script::Vietnamese),
    (0x0300, 0x036F, Script::Vietnamese), // combining marks
    // CJK Unified Ideographs (and common extension/compat/radical blocks).
    (0x4E00, 0x9FFF, Script::Chinese),
    (0x3400, 0x4DBF, Script::Chinese),
    (0xF900, 0xFAFF, Script::Chinese),
    (0x2F00, 0x2FDF, Script::Chinese), // Kangxi Radicals
    // Japanese kana blocks (Han overlaps with Chinese above; kana disambiguates).
    (0x3040, 0x309F, Script::Japanese), // Hiragana
    (0x30A0, 0x30FF, Script::Japanese), // Katakana
    (0x31F0, 0x31FF, Script::Japanese), // Katakana Phonetic Extensions
    (0xFF65, 0xFF9F, Script::Japanese), // Halfwidth Katakana
    // Korean.
    (0xAC00, 0xD7AF, Script::Korean), // Hangul Syllables
    (0x1100, 0x11FF, Script::Korean), // Hangul Jamo
    (0xA960, 0xA97F, Script::Korean), // Hangul Jamo Extended-A
    (0x3130, 0x318F, Script::Korean), // Hangul Compatibility Jamo
    // Thai.
    (0x0E00, 0x0E7F, Script::Thai),
    // Arabic.
    (0x0600, 0x06FF, Script::Arabic),
    // Devanagari.
    (0x0900, 0x097F, Script::Devanagari),
];

/// Returns the script a single code point belongs to, if it falls within one
/// of the recognized IME-relevant ranges.
#[must_use]
pub fn script_of(ch: char) -> Option<Script> {
    let cp = ch as u32;
    SCRIPT_RANGES
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&cp))
        .map(|(_, _, script)| *script)
}

/// Scans `text` for the first recognized script, preferring the first
/// non-combining-mark character found so a bare accent does not shadow the
/// base letter's script when both are present in the same chunk.
#[must_use]
pub fn detect_script(text: &str) -> Option<Script> {
    let mut fallback = None;
    for ch in text.chars() {
        let Some(script) = script_of(ch) else {
            continue;
        };
        let is_combining_mark = (0x0300..=0x036F).contains(&(ch as u32));
        if is_combining_mark {
            fallback.get_or_insert(script);
        } else {
            return Some(script);
        }
    }
    fallback
}

/// Classifies a decoded chunk of terminal input.
///
/// A chunk is `Regular` only when it is empty or pure 7-bit ASCII. Otherwise
/// it is `Ime`: text matching one of the recognized script ranges carries
/// that script; any other non-ASCII text (its byte length necessarily
/// exceeds its code-point length once UTF-8 encoded) is still `Ime`, tagged
/// [`Script::Unknown`] — e.g. emoji or box-drawing characters, which compose
/// in a single keystroke but are still not 7-bit ASCII input.
#[must_use]
pub fn classify(text: &str) -> Classification {
    if text.is_empty() || text.is_ascii() {
        tracing::trace!(len = text.len(), "classifier: regular");
        return Classification::Regular;
    }
    let result = Classification::Ime(detect_script(text).unwrap_or(Script::Unknown));
    tracing::trace!(?result, len = text.len(), "classifier: classified");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunk_is_regular() {
        assert_eq!(classify(""), Classification::Regular);
    }

    #[test]
    fn single_ascii_byte_is_regular() {
        assert_eq!(classify("a"), Classification::Regular);
        assert_eq!(classify("\r"), Classification::Regular);
    }

    #[test]
    fn vietnamese_combining_mark_alone_is_ime() {
        // U+0301 COMBINING ACUTE ACCENT, no base letter yet.
        assert_eq!(
            classify("\u{0301}"),
            Classification::Ime(Script::Vietnamese)
        );
    }

    #[test]
    fn vietnamese_precomposed_letter_is_ime() {
        assert_eq!(classify("\u{1EA1}"), Classification::Ime(Script::Vietnamese)); // ẠA
    }

    #[test]
    fn chinese_ideograph_is_ime() {
        assert_eq!(classify("\u{4E2D}"), Classification::Ime(Script::Chinese)); // 中
    }

    #[test]
    fn japanese_hiragana_is_ime() {
        assert_eq!(classify("\u{3042}"), Classification::Ime(Script::Japanese)); // あ
    }

    #[test]
    fn korean_hangul_syllable_is_ime() {
        assert_eq!(classify("\u{AC00}"), Classification::Ime(Script::Korean)); // 가
    }

    #[test]
    fn thai_vowel_is_ime() {
        assert_eq!(classify("\u{0E34}"), Classification::Ime(Script::Thai));
    }

    #[test]
    fn arabic_letter_is_ime() {
        assert_eq!(classify("\u{0628}"), Classification::Ime(Script::Arabic)); // ب
    }

    #[test]
    fn devanagari_letter_is_ime() {
        assert_eq!(
            classify("\u{0915}"),
            Classification::Ime(Script::Devanagari)
        ); // क
    }

    #[test]
    fn byte_length_vs_code_point_length_mismatch_still_classifies() {
        // "中" is 3 bytes, 1 code point, 1 grapheme — classification must use
        // code points, not byte length.
        let text = "中";
        assert_eq!(text.len(), 3);
        assert_eq!(text.chars().count(), 1);
        assert_eq!(classify(text), Classification::Ime(Script::Chinese));
    }

    #[test]
    fn emoji_with_no_recognized_script_is_ime_unknown() {
        // Byte length (4) exceeds code-point length (1): rule (a) applies
        // even though no specific script range matches.
        assert_eq!(classify("\u{1F600}"), Classification::Ime(Script::Unknown));
    }

    #[test]
    fn base_letter_before_mark_prefers_base_script() {
        // Base Han ideograph followed by a combining mark in the same chunk:
        // the non-combining character's script wins.
        let text = "\u{4E2D}\u{0301}";
        assert_eq!(classify(text), Classification::Ime(Script::Chinese));
    }
}
