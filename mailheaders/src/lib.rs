/*
 * mailheaders - lib.rs
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

#![deny(
    rustdoc::redundant_explicit_links,
    unsafe_op_in_unsafe_fn,
    /* groups */
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    /* restriction */
    clippy::dbg_macro,
    clippy::rc_buffer,
    clippy::as_underscore,
    /* rustdoc */
    rustdoc::broken_intra_doc_links,
    /* pedantic */
    clippy::doc_markdown,
    clippy::expect_fun_call,
    clippy::or_fun_call,
    clippy::case_sensitive_file_extension_comparisons,
    clippy::unnecessary_fallible_conversions,
    clippy::manual_hash_one,
)]
#![allow(
    clippy::option_if_let_else,
    clippy::missing_const_for_fn
)]

//! E-mail message headers.
//!
//! - Keep an ordered [`HeaderList`] where a header name may repeat, with
//!   case-insensitive lookups (see module [`email::headers`])
//! - Hold a [`Message`] whose address lists, subject, date and message id are
//!   decoded from its headers and written back to them whenever they change
//!   (see module [`email::message`])
//! - Fold every header the way its syntax allows: never inside message ids,
//!   between addresses, between the clauses of trace fields (see module
//!   [`email::headers::fold`])
//! - Encode and decode `RFC2047` encoded words (see module
//!   [`email::encodings`])
//! - Parse messages, keeping the original bytes and header positions, and
//!   write them back with message and MIME part headers in their original
//!   order (see [`Message::from_bytes`])
//!
//! Other exports are
//! - Per-message options, deserializable from configuration files (see
//!   module [`conf`])
//! - A [`StderrLogger`] for the `log` facade the crate logs through.

pub use utils::{
    datetime::{TzOffset, UnixTimestamp},
    logging::{LogLevel, StderrLogger},
};

pub mod conf;
pub use conf::*;
pub mod email;
pub use email::*;
pub mod error;
pub use error::*;

pub mod utils;

#[macro_use]
extern crate serde_derive;
pub extern crate log;
/* parser */
extern crate data_encoding;
extern crate encoding_rs;
pub extern crate nom;

#[allow(unused_imports)]
#[macro_use]
pub extern crate indexmap;
pub extern crate smallvec;
pub extern crate uuid;
