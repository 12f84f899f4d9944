/*
 * mailheaders - headers
 *
 * Copyright 2020 Manos Pitsidianakis
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

//! Header field writers.
//!
//! Every writer produces a complete field, `Name: value\n`, with continuation
//! lines starting with a tab. Lines are folded only between tokens, so a
//! token longer than the fold length is written on a line of its own.

use super::HeaderName;
use crate::{
    conf::HeaderOptions,
    email::{address::AddressList, encodings, parser},
};

/// How the value of a header is folded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeaderKind {
    /// Address lists, folded between addresses.
    Address,
    Subject,
    /// Message ids, never folded.
    MessageId,
    /// Lists of message ids.
    References,
    /// Trace fields, folded between their clauses.
    Received,
    Unstructured,
}

const ADDRESS_HEADERS: &[HeaderName] = &[
    HeaderName::FROM,
    HeaderName::SENDER,
    HeaderName::REPLY_TO,
    HeaderName::TO,
    HeaderName::CC,
    HeaderName::BCC,
    HeaderName::RESENT_FROM,
    HeaderName::RESENT_SENDER,
    HeaderName::RESENT_REPLY_TO,
    HeaderName::RESENT_TO,
    HeaderName::RESENT_CC,
    HeaderName::RESENT_BCC,
];

const MESSAGE_ID_HEADERS: &[HeaderName] = &[
    HeaderName::MESSAGE_ID,
    HeaderName::RESENT_MESSAGE_ID,
    HeaderName::CONTENT_ID,
];

impl HeaderKind {
    pub fn of(name: &HeaderName) -> Self {
        if ADDRESS_HEADERS.contains(name) {
            Self::Address
        } else if MESSAGE_ID_HEADERS.contains(name) {
            Self::MessageId
        } else if name == &HeaderName::SUBJECT {
            Self::Subject
        } else if name == &HeaderName::REFERENCES || name == &HeaderName::IN_REPLY_TO {
            Self::References
        } else if name == &HeaderName::RECEIVED {
            Self::Received
        } else {
            Self::Unstructured
        }
    }

    /// Formats a field, final line break included.
    pub fn format(self, name: &HeaderName, value: &str, options: &HeaderOptions) -> String {
        match self {
            Self::Address => address(name, value, options),
            Self::MessageId => format!("{}: {}\n", name, value.trim()),
            Self::References => references(name, value, options),
            Self::Received => received(name, value, options),
            Self::Subject | Self::Unstructured if !value.is_ascii() => {
                let value =
                    encodings::encode_header_text(value, options.default_charset.as_deref());
                unstructured(name, &value, options.fold_len)
            }
            Self::Subject | Self::Unstructured => unstructured(name, value, options.fold_len),
        }
    }
}

fn address(name: &HeaderName, value: &str, options: &HeaderOptions) -> String {
    let addresses = AddressList::parse(value.as_bytes())
        .formatted(true, options.default_charset.as_deref());
    let mut ret = format!("{}: ", name);
    let mut len = ret.len();
    for (i, addr) in addresses.iter().enumerate() {
        if i > 0 {
            ret.push(',');
            len += 1;
            // The separator must fit on the line too.
            if options.fold_addresses && len + 1 + addr.len() >= options.fold_len {
                ret.push_str("\n\t");
                len = 1;
            } else {
                ret.push(' ');
                len += 1;
            }
        }
        ret.push_str(addr);
        len += addr.len();
    }
    ret.push('\n');
    ret
}

/// Words of `value` with the whitespace run before each one. Line breaks
/// count as whitespace and are dropped from the runs.
fn words(value: &str) -> Vec<(String, &str)> {
    let is_ws = |c: char| c.is_whitespace();
    let mut ret = vec![];
    let mut rest = value;
    while !rest.is_empty() {
        let word_start = rest.find(|c: char| !is_ws(c)).unwrap_or(rest.len());
        if word_start == rest.len() {
            break;
        }
        let space = rest[..word_start]
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect::<String>();
        let tail = &rest[word_start..];
        let word_len = tail.find(is_ws).unwrap_or(tail.len());
        ret.push((space, &tail[..word_len]));
        rest = &tail[word_len..];
    }
    ret
}

/// Folds free text between words, keeping the original spacing on each line.
fn unstructured(name: &HeaderName, value: &str, fold_len: usize) -> String {
    let mut ret = format!("{}: ", name);
    let mut len = ret.len();
    for (i, (space, word)) in words(value).into_iter().enumerate() {
        if i == 0 {
            ret.push_str(word);
            len += word.len();
            continue;
        }
        let space = if space.is_empty() { " ".to_string() } else { space };
        if len + space.len() + word.len() > fold_len {
            ret.push_str("\n\t");
            len = 1;
        } else {
            ret.push_str(&space);
            len += space.len();
        }
        ret.push_str(word);
        len += word.len();
    }
    ret.push('\n');
    ret
}

fn references(name: &HeaderName, value: &str, options: &HeaderOptions) -> String {
    let tokens = parser::address::references(value.as_bytes());
    if tokens.is_empty() {
        return unstructured(name, value, options.fold_len);
    }
    let mut ret = format!("{}:", name);
    let mut len = ret.len();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && len + token.len() + 3 >= options.fold_len {
            ret.push_str("\n\t");
            len = 1;
        } else {
            ret.push(' ');
            len += 1;
        }
        ret.push('<');
        ret.push_str(token);
        ret.push('>');
        len += token.len() + 2;
    }
    ret.push('\n');
    ret
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn skip_space(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_space(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn skip_comment(bytes: &[u8], pos: usize) -> usize {
    match parser::generic::comment(&bytes[pos..]) {
        Ok((rest, ())) => bytes.len() - rest.len(),
        Err(_) => bytes.len(),
    }
}

fn skip_cfws(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        pos = skip_space(bytes, pos);
        if pos < bytes.len() && bytes[pos] == b'(' {
            pos = skip_comment(bytes, pos);
        } else {
            return pos;
        }
    }
}

/// Skips a run of bytes up to whitespace, a comment or a semicolon.
fn skip_run(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && !is_space(bytes[pos]) && bytes[pos] != b'(' && bytes[pos] != b';'
    {
        pos += 1;
    }
    pos
}

fn skip_angle(bytes: &[u8], pos: usize) -> usize {
    match bytes[pos..].iter().position(|b| *b == b'>') {
        Some(end) => pos + end + 1,
        None => bytes.len(),
    }
}

fn skip_domain(bytes: &[u8], pos: usize) -> usize {
    let pos = skip_cfws(bytes, pos);
    if bytes.get(pos) == Some(&b'[') {
        match bytes[pos..].iter().position(|b| *b == b']') {
            Some(end) => pos + end + 1,
            None => bytes.len(),
        }
    } else {
        skip_run(bytes, pos)
    }
}

fn skip_cfws_atom(bytes: &[u8], pos: usize) -> usize {
    let pos = skip_cfws(bytes, pos);
    skip_run(bytes, pos)
}

fn skip_msgid(bytes: &[u8], pos: usize) -> usize {
    let pos = skip_cfws(bytes, pos);
    if bytes.get(pos) == Some(&b'<') {
        skip_angle(bytes, pos)
    } else {
        skip_run(bytes, pos)
    }
}

fn skip_addr(bytes: &[u8], pos: usize) -> usize {
    let pos = skip_cfws(bytes, pos);
    if bytes.get(pos) == Some(&b'<') {
        skip_angle(bytes, pos)
    } else {
        match bytes[pos..]
            .iter()
            .position(|b| is_space(*b) || *b == b';')
        {
            Some(end) => pos + end,
            None => bytes.len(),
        }
    }
}

type Skip = fn(&[u8], usize) -> usize;

/// Clause keywords of a `Received` field, each followed by its argument.
const RECEIVED_TOKENS: &[(&[u8], Skip)] = &[
    (b"from ", skip_domain),
    (b"by ", skip_domain),
    (b"via ", skip_cfws_atom),
    (b"with ", skip_cfws_atom),
    (b"id ", skip_msgid),
    (b"for ", skip_addr),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Span {
    start: usize,
    end: usize,
}

/// Splits a `Received` value into clauses: one per keyword, a clause ending
/// with a semicolon, and the date after it. Comments stay in the clause they
/// follow.
fn received_parts(bytes: &[u8]) -> Vec<Span> {
    let mut parts = vec![];
    let mut close = |start: usize, end: usize| {
        let mut end = end;
        while end > start && is_space(bytes[end - 1]) {
            end -= 1;
        }
        if end > start {
            parts.push(Span { start, end });
        }
    };
    let mut start = skip_space(bytes, 0);
    let mut pos = start;
    while pos < bytes.len() {
        let rest = &bytes[pos..];
        // Keywords are matched in lower case only.
        if let Some((token, skip)) = RECEIVED_TOKENS
            .iter()
            .find(|(token, _)| rest.starts_with(token))
        {
            if pos > start {
                close(start, pos);
                start = pos;
            }
            pos = skip(bytes, pos + token.len());
            continue;
        }
        pos = skip_run(bytes, pos);
        match bytes.get(pos) {
            Some(b';') => {
                pos += 1;
                close(start, pos);
                pos = skip_space(bytes, pos);
                start = pos;
            }
            Some(b'(') => pos = skip_comment(bytes, pos),
            _ => pos = skip_space(bytes, pos),
        }
    }
    close(start, bytes.len());
    parts
}

fn received(name: &HeaderName, value: &str, options: &HeaderOptions) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    let bytes = value.as_bytes();
    let mut ret = format!("{}: ", name);
    let mut len = ret.len();
    let mut prev_end = None;
    for Span { start, end } in received_parts(bytes) {
        let part = &value[start..end];
        if let Some(prev_end) = prev_end {
            let space = value[prev_end..start]
                .chars()
                .filter(|c| *c != '\r' && *c != '\n')
                .collect::<String>();
            let space = if space.is_empty() { " ".to_string() } else { space };
            if len + space.len() + part.len() > options.fold_len {
                ret.push_str("\n\t");
                len = 1;
            } else {
                ret.push_str(&space);
                len += space.len();
            }
        }
        ret.push_str(part);
        len += part.len();
        prev_end = Some(end);
    }
    ret.push('\n');
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_headers_fold_kinds() {
        assert_eq!(HeaderKind::of(&HeaderName::FROM), HeaderKind::Address);
        assert_eq!(
            HeaderKind::of(&HeaderName::try_from("resent-cc").unwrap()),
            HeaderKind::Address
        );
        assert_eq!(HeaderKind::of(&HeaderName::CONTENT_ID), HeaderKind::MessageId);
        assert_eq!(HeaderKind::of(&HeaderName::IN_REPLY_TO), HeaderKind::References);
        assert_eq!(HeaderKind::of(&HeaderName::SUBJECT), HeaderKind::Subject);
        assert_eq!(
            HeaderKind::of(&HeaderName::try_from("X-Mailer").unwrap()),
            HeaderKind::Unstructured
        );
    }

    #[test]
    fn test_email_headers_fold_words() {
        assert_eq!(
            words(" a  b\r\n\tc"),
            vec![
                (" ".to_string(), "a"),
                ("  ".to_string(), "b"),
                ("\t".to_string(), "c")
            ]
        );
        assert!(words("   ").is_empty());
    }

    #[test]
    fn test_email_headers_fold_received_parts() {
        let value = "from a (comment (nested)) by b;  date";
        let parts = received_parts(value.as_bytes())
            .into_iter()
            .map(|Span { start, end }| &value[start..end])
            .collect::<Vec<_>>();
        assert_eq!(parts, vec!["from a (comment (nested))", "by b;", "date"]);
        assert!(received_parts(b"").is_empty());
        assert_eq!(received_parts(b"opaque text only").len(), 1);

        let value = "FROM a BY b; date";
        let parts = received_parts(value.as_bytes())
            .into_iter()
            .map(|Span { start, end }| &value[start..end])
            .collect::<Vec<_>>();
        assert_eq!(parts, vec!["FROM a BY b;", "date"]);
    }

    #[test]
    fn test_email_headers_fold_received_empty() {
        let options = HeaderOptions::default();
        assert_eq!(received(&HeaderName::RECEIVED, "", &options), "");
        assert_eq!(received(&HeaderName::RECEIVED, " \t ", &options), "");
    }
}
