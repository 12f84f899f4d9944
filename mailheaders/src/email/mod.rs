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

/*!
 * Message headers and the structured fields decoded from them.
 *
 * # Parsing bytes into a `Message`
 *
 * ```
 * use mailheaders::{AddressRole, Message};
 *
 * let raw_mail = b"From: \"some name\" <some@example.com>
 * To: \"me\" <myself@example.com>
 * Subject: =?utf-8?Q?gratuitously_encoded_subject?=
 * Message-ID: <h2g7f.z0gy2pgaen5m@example.com>
 * MIME-Version: 1.0
 * Content-Type: text/plain; charset=\"utf-8\"
 *
 * hello world.
 * ";
 *
 * let message = Message::from_bytes(raw_mail).expect("Could not parse mail");
 * assert_eq!(message.subject(), Some("gratuitously encoded subject"));
 * assert_eq!(message.message_id(), Some("h2g7f.z0gy2pgaen5m@example.com"));
 * assert_eq!(
 *     message.addresses(AddressRole::From).to_string(),
 *     "some name <some@example.com>"
 * );
 * assert!(message.body().is_some());
 * assert_eq!(message.to_bytes().unwrap(), raw_mail);
 * ```
 */

pub mod address;
pub mod encodings;
pub mod headers;
pub mod message;
pub mod mime;
pub mod parser;

pub use address::{Address, AddressList, AddressRole, GroupAddress, MailboxAddress};
pub use encodings::{decode_header_text, encode_header_text, encode_phrase};
pub use headers::{HeaderEntry, HeaderKind, HeaderList, HeaderName, HeaderOp};
pub use message::{AddressListMut, Message};
pub use mime::{ContentType, MimeObject, MimePartRef, Multipart, MultipartType, Part};

/// Decodes an `RFC5322` date into a timestamp and a `±HHMM` offset.
pub use crate::utils::datetime::rfc5322_to_timestamp as decode_date;
