/*
 * mailheaders - configuration module.
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

//! Per-message header options.
//!
//! Options are fixed once a [`Message`](crate::email::Message) is
//! constructed; every folding writer of that message reads the same values.

/// Conventional maximum line length before a fold point.
pub const FOLD_LEN: usize = 78;

/// Line terminator written after each header field and the header block.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// The terminator of the first line of `input`. Input without a line
    /// break is taken as `LF`.
    pub fn detect(input: &[u8]) -> Self {
        match input.iter().position(|b| *b == b'\n') {
            Some(pos) if pos > 0 && input[pos - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderOptions {
    /// Fold threshold for all header writers.
    #[serde(default = "fold_len_val")]
    pub fold_len: usize,
    /// Pre-populate the standard header order on new messages.
    #[serde(default = "false_val")]
    pub pretty_headers: bool,
    /// Charset used to encode subjects when the caller does not name one.
    #[serde(default = "none")]
    pub default_charset: Option<String>,
    /// Fold address headers between addresses.
    #[serde(default = "true_val")]
    pub fold_addresses: bool,
    /// Terminator of every line written. Parsed messages keep the one they
    /// were read with.
    pub line_ending: LineEnding,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            fold_len: FOLD_LEN,
            pretty_headers: false,
            default_charset: None,
            fold_addresses: true,
            line_ending: LineEnding::Lf,
        }
    }
}

impl HeaderOptions {
    pub fn with_pretty_headers(mut self, new_val: bool) -> Self {
        self.pretty_headers = new_val;
        self
    }
}

pub const fn fold_len_val() -> usize {
    FOLD_LEN
}

pub const fn true_val() -> bool {
    true
}

pub const fn false_val() -> bool {
    false
}

pub const fn none<T>() -> Option<T> {
    None
}
