/*
 * mailheaders - email module
 *
 * Copyright 2017 Manos Pitsidianakis
 *
 * This file is part of mailheaders.
 *
 * mailheaders is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * mailheaders is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with mailheaders. If not, see <http://www.gnu.org/licenses/>.
 */

//! Non-ASCII text in header values, as `RFC2047` encoded words.

use data_encoding::BASE64;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// An encoded word may not be more than 75 characters long.
const ENCODED_WORD_MAX: usize = 75;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Base64,
    QuotedPrintable,
}

/// Decodes header text that may contain encoded words.
pub fn decode_header_text(input: &[u8]) -> String {
    super::parser::encodings::phrase(input)
}

pub(crate) fn needs_encoding(text: &str) -> bool {
    !text.is_ascii()
        || text.contains("=?")
        || text.chars().any(|c| c.is_ascii_control() && c != '\t')
}

/// Characters left as they are in `Q` encoded words inside phrases.
fn is_q_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!*+-/".contains(&b)
}

fn q_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .map(|b| if is_q_safe(*b) || *b == b' ' { 1 } else { 3 })
        .sum()
}

fn b_len(len: usize) -> usize {
    (len + 2) / 3 * 4
}

fn encoded_text(bytes: &[u8], mode: Mode) -> String {
    match mode {
        Mode::Base64 => BASE64.encode(bytes),
        Mode::QuotedPrintable => {
            let mut ret = String::with_capacity(q_len(bytes));
            for &b in bytes {
                if is_q_safe(b) {
                    ret.push(b as char);
                } else if b == b' ' {
                    ret.push('_');
                } else {
                    ret.push_str(&format!("={:02X}", b));
                }
            }
            ret
        }
    }
}

/// Picks the charset to encode `text` with, and the label to announce it
/// by: the requested one if it can represent all of `text`, UTF-8
/// otherwise.
///
/// `encoding_rs` resolves the ISO-8859-1 labels to windows-1252. Those are
/// only honoured when `text` stays within ISO-8859-1, where both agree, and
/// are announced as `iso-8859-1`.
fn select_charset(text: &str, charset: Option<&str>) -> (&'static Encoding, &'static str) {
    let requested = charset.map(|label| label.trim().to_ascii_lowercase());
    let encoding = match requested
        .as_deref()
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        Some(encoding) if encoding.output_encoding() == encoding => encoding,
        _ => return (UTF_8, "utf-8"),
    };
    if encoding == WINDOWS_1252
        && !matches!(
            requested.as_deref(),
            Some("windows-1252" | "cp1252" | "x-cp1252")
        )
    {
        return if text.chars().all(|c| c < '\u{80}' || ('\u{a0}'..='\u{ff}').contains(&c)) {
            (WINDOWS_1252, "iso-8859-1")
        } else {
            log::debug!("iso-8859-1 cannot represent {:?}, using UTF-8", text);
            (UTF_8, "utf-8")
        };
    }
    let (_, _, had_errors) = encoding.encode(text);
    if had_errors {
        log::debug!(
            "{} cannot represent {:?}, using UTF-8",
            encoding.name(),
            text
        );
        (UTF_8, "utf-8")
    } else {
        (encoding, encoding.name())
    }
}

/// Encodes the whole of `text` as a sequence of encoded words separated by a
/// space. Characters are never split across words.
fn encode_words(text: &str, charset: Option<&str>) -> String {
    let (encoding, label) = select_charset(text, charset);
    let label = label.to_ascii_lowercase();
    let (bytes, _, _) = encoding.encode(text);
    let mode = if q_len(&bytes) <= b_len(bytes.len()) {
        Mode::QuotedPrintable
    } else {
        Mode::Base64
    };
    let marker = match mode {
        Mode::Base64 => 'b',
        Mode::QuotedPrintable => 'q',
    };
    let overhead = label.len() + 7;
    let encoded_len = |chunk: &str| -> usize {
        let (bytes, _, _) = encoding.encode(chunk);
        match mode {
            Mode::Base64 => b_len(bytes.len()),
            Mode::QuotedPrintable => q_len(&bytes),
        }
    };

    let mut chunks: Vec<String> = vec![];
    let mut chunk = String::new();
    for c in text.chars() {
        let mut candidate = chunk.clone();
        candidate.push(c);
        if !chunk.is_empty() && overhead + encoded_len(&candidate) > ENCODED_WORD_MAX {
            chunks.push(std::mem::take(&mut chunk));
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }

    chunks
        .iter()
        .map(|chunk| {
            let (bytes, _, _) = encoding.encode(chunk);
            format!("=?{}?{}?{}?=", label, marker, encoded_text(&bytes, mode))
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Byte spans of the whitespace separated words of `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut ret = vec![];
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                ret.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        ret.push((s, text.len()));
    }
    ret
}

/// Encodes unstructured header text such as a subject.
///
/// Only the runs of words that need it are encoded; plain ASCII words and
/// the whitespace around runs are kept as they are. Text that needs no
/// encoding is returned unchanged.
pub fn encode_header_text(text: &str, charset: Option<&str>) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }
    let spans = word_spans(text);
    let word_needs_encoding = |(s, e): (usize, usize)| needs_encoding(&text[s..e]);
    let mut ret = String::with_capacity(text.len() * 2);
    let mut last = 0;
    let mut i = 0;
    while i < spans.len() {
        let (start, end) = spans[i];
        if word_needs_encoding(spans[i]) {
            let mut j = i;
            while j + 1 < spans.len() && word_needs_encoding(spans[j + 1]) {
                j += 1;
            }
            ret.push_str(&text[last..start]);
            ret.push_str(&encode_words(&text[start..spans[j].1], charset));
            last = spans[j].1;
            i = j + 1;
        } else {
            ret.push_str(&text[last..end]);
            last = end;
            i += 1;
        }
    }
    ret.push_str(&text[last..]);
    ret
}

/// Encodes a phrase such as an address display name. A phrase that needs
/// encoding is encoded as a whole.
pub fn encode_phrase(text: &str, charset: Option<&str>) -> String {
    if needs_encoding(text) {
        encode_words(text.trim(), charset)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodings_ascii_unchanged() {
        assert_eq!(
            encode_header_text("hey, check this out", None),
            "hey, check this out"
        );
        assert_eq!(encode_phrase("Eva Lucy-Ann Tester", None), "Eva Lucy-Ann Tester");
    }

    #[test]
    fn test_encodings_subject_words() {
        let encoded = encode_header_text("Re: café au lait", None);
        assert!(encoded.starts_with("Re: =?utf-8?"), "{encoded}");
        assert!(encoded.ends_with("?= au lait"), "{encoded}");
        assert_eq!(decode_header_text(encoded.as_bytes()), "Re: café au lait");

        let text = "Ελληνικά και English λέξεις";
        let encoded = encode_header_text(text, None);
        assert!(encoded.is_ascii());
        assert!(encoded.contains(" English "), "{encoded}");
        assert_eq!(decode_header_text(encoded.as_bytes()), text);

        // Text looking like an encoded word is encoded itself.
        let encoded = encode_header_text("=?utf-8?q?x?=", None);
        assert_ne!(encoded, "=?utf-8?q?x?=");
        assert_eq!(decode_header_text(encoded.as_bytes()), "=?utf-8?q?x?=");
    }

    #[test]
    fn test_encodings_long_text_splits() {
        let text = "ünïcödé ".repeat(20);
        let text = text.trim();
        let encoded = encode_header_text(text, None);
        for word in encoded.split(' ') {
            assert!(word.len() <= ENCODED_WORD_MAX, "{word}");
            assert!(word.starts_with("=?utf-8?"), "{word}");
        }
        assert!(encoded.split(' ').count() > 1);
        assert_eq!(decode_header_text(encoded.as_bytes()), text);
    }

    #[test]
    fn test_encodings_charset_selection() {
        let encoded = encode_phrase("Müller, Hans", Some("iso-8859-2"));
        assert!(encoded.starts_with("=?iso-8859-2?q?M=FCller=2C_Hans?="), "{encoded}");
        assert_eq!(decode_header_text(encoded.as_bytes()), "Müller, Hans");

        let encoded = encode_phrase("日本語", Some("iso-8859-2"));
        assert!(encoded.starts_with("=?utf-8?b?"), "{encoded}");
        assert_eq!(decode_header_text(encoded.as_bytes()), "日本語");

        let encoded = encode_header_text("café", Some("ISO-8859-1"));
        assert_eq!(encoded, "=?iso-8859-1?q?caf=E9?=");
        assert_eq!(decode_header_text(encoded.as_bytes()), "café");
        let encoded = encode_header_text("café", Some("latin1"));
        assert_eq!(encoded, "=?iso-8859-1?q?caf=E9?=");
        // The euro sign is not in ISO-8859-1, only in windows-1252.
        let encoded = encode_header_text("5 €", Some("iso-8859-1"));
        assert!(encoded.starts_with("5 =?utf-8?"), "{encoded}");
        let encoded = encode_header_text("5 €", Some("windows-1252"));
        assert_eq!(encoded, "5 =?windows-1252?q?=80?=");

        let encoded = encode_phrase("Ärger", Some("no-such-charset"));
        assert!(encoded.starts_with("=?utf-8?"), "{encoded}");
    }
}
