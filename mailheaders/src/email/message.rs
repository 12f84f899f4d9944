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

//! A message: its header list, the structured fields decoded from it, and
//! the MIME part it carries.
//!
//! The structured fields and the header list are kept in sync both ways.
//! Header mutations through [`Message::set_header`] and friends update the
//! decoded fields, and mutations of the decoded fields rewrite the matching
//! headers.
//!
//! ```rust
//! # use mailheaders::{AddressRole, HeaderName, Message};
//! let mut message = Message::new(false);
//! message.set_header(HeaderName::TO, "Tester <tester@example.com>");
//! assert_eq!(message.addresses(AddressRole::To).len(), 1);
//!
//! message
//!     .addresses_mut(AddressRole::To)
//!     .add_mailbox(None, "other@example.com");
//! assert_eq!(
//!     message.get_header("To").as_deref(),
//!     Some("Tester <tester@example.com>, other@example.com")
//! );
//! ```

use std::{
    borrow::Cow,
    convert::{Infallible, TryInto},
    io::Write,
    ops::Deref,
    rc::Rc,
};

use crate::{
    conf::{HeaderOptions, LineEnding},
    email::{
        address::{Address, AddressList, AddressRole, MailboxAddress},
        encodings::{decode_header_text, encode_header_text},
        headers::{HeaderEntry, HeaderList, HeaderName, HeaderOp},
        mime::{self, MimeObject, MimePartRef, Part},
        parser,
    },
    error::Result,
    utils::datetime::{rfc5322_to_timestamp, timestamp_to_rfc5322, TzOffset, UnixTimestamp},
};

/// Headers reserved on messages created with pretty headers, in order.
const PRETTY_HEADERS: &[HeaderName] = &[
    HeaderName::RETURN_PATH,
    HeaderName::RECEIVED,
    HeaderName::DATE,
    HeaderName::FROM,
    HeaderName::REPLY_TO,
    HeaderName::SUBJECT,
    HeaderName::SENDER,
    HeaderName::TO,
    HeaderName::CC,
];

/// Whether changing an address list rewrites its header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum SyncMode {
    Emit,
    /// The header is being written by the caller already.
    Suppress,
}

#[derive(Clone, Debug)]
pub struct Message {
    options: HeaderOptions,
    headers: HeaderList,
    addresses: [AddressList; 6],
    subject: Option<String>,
    message_id: Option<String>,
    date: (UnixTimestamp, TzOffset),
    mime_part: Option<MimePartRef>,
}

impl Default for Message {
    fn default() -> Self {
        Self::with_options(HeaderOptions::default())
    }
}

impl Message {
    /// Creates an empty message. With `pretty_headers` the standard headers
    /// get reserved positions, so that they are written in a conventional
    /// order whenever they are set.
    pub fn new(pretty_headers: bool) -> Self {
        Self::with_options(HeaderOptions::default().with_pretty_headers(pretty_headers))
    }

    pub fn with_options(options: HeaderOptions) -> Self {
        let mut headers = HeaderList::new();
        if options.pretty_headers {
            for name in PRETTY_HEADERS {
                headers.reserve(name.clone());
            }
        }
        Self {
            options,
            headers,
            addresses: Default::default(),
            subject: None,
            message_id: None,
            date: (0, 0),
            mime_part: None,
        }
    }

    /// Parses a message. Header fields keep their original bytes and
    /// positions; `Content-*` fields and the body make up a single leaf
    /// part. The message is written back with the line terminator of its
    /// first line.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (raw_headers, body) = parser::mail(bytes)?;
        let mut ret = Self::with_options(HeaderOptions {
            line_ending: LineEnding::detect(bytes),
            ..HeaderOptions::default()
        });
        let mut part_headers = HeaderList::new();
        for raw in raw_headers {
            let entry = HeaderEntry::from_raw(raw.name, raw.raw_value, Some(raw.offset as u64));
            if entry.name().is_content_header() {
                part_headers.append_entry(entry);
                continue;
            }
            if let Some(value) = entry.value() {
                ret.process_header(HeaderOp::Append, entry.name(), value);
            }
            ret.headers.append_entry(entry);
        }
        if !part_headers.is_empty() || !body.is_empty() {
            let part = Part::from_headers(part_headers, body.to_vec());
            ret.mime_part = Some(MimeObject::from(part).into_ref());
        }
        Ok(ret)
    }

    pub fn options(&self) -> &HeaderOptions {
        &self.options
    }

    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }

    /// Updates the structured field `name` stands for, if any.
    fn process_header(&mut self, op: HeaderOp, name: &HeaderName, value: &str) {
        if let Some(role) = AddressRole::from_header_name(name) {
            let op = if role.is_originator() {
                HeaderOp::Set
            } else {
                op
            };
            let parsed = AddressList::parse(value.as_bytes());
            log::trace!("{} {:?}: {} addresses", role, op, parsed.len());
            self.update_addresses(role, SyncMode::Suppress, |list| match op {
                HeaderOp::Set => *list = parsed,
                HeaderOp::Prepend => list.prepend(parsed),
                HeaderOp::Append => list.append(parsed),
            });
        } else if name == HeaderName::SUBJECT {
            self.subject = Some(decode_header_text(value.as_bytes()));
        } else if name == HeaderName::DATE {
            match rfc5322_to_timestamp(value) {
                Ok(date) => self.date = date,
                Err(err) => log::debug!("keeping previous date, could not decode {:?}: {}", value, err),
            }
        } else if name == HeaderName::MESSAGE_ID {
            match parser::address::message_id(value.as_bytes()) {
                Some(id) => self.message_id = Some(id),
                None => log::debug!("keeping previous message id, could not decode {:?}", value),
            }
        }
    }

    fn apply_header(&mut self, op: HeaderOp, name: HeaderName, value: &str) {
        if name.is_content_header() {
            match self.mime_part {
                Some(ref part) => {
                    log::trace!("{} belongs to the mime part", name);
                    part.borrow_mut().apply_header(op, name, value);
                }
                None => log::debug!("dropping {}: message has no mime part", name),
            }
            return;
        }
        self.process_header(op, &name, value);
        self.headers.apply(op, name, value, None);
    }

    /// Sets `name` to `value`, replacing every previous field of that name.
    ///
    /// The value is stored as given. Structured fields are decoded from it;
    /// values that fail to decode leave the previous decoded value in place.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        self.apply_header(HeaderOp::Set, name, value);
    }

    pub fn append_header(&mut self, name: HeaderName, value: &str) {
        self.apply_header(HeaderOp::Append, name, value);
    }

    pub fn prepend_header(&mut self, name: HeaderName, value: &str) {
        self.apply_header(HeaderOp::Prepend, name, value);
    }

    /// Removes every field named `name` and clears the structured field it
    /// stands for. Returns whether any field was removed.
    pub fn remove_header<T: TryInto<HeaderName>>(&mut self, name: T) -> bool {
        let Ok(name) = name.try_into() else {
            return false;
        };
        if name.is_content_header() {
            return self
                .mime_part
                .as_ref()
                .map_or(false, |part| part.borrow_mut().remove_header(&name));
        }
        if let Some(role) = AddressRole::from_header_name(&name) {
            self.update_addresses(role, SyncMode::Suppress, AddressList::clear);
        } else if name == HeaderName::SUBJECT {
            self.subject = None;
        } else if name == HeaderName::DATE {
            self.date = (0, 0);
        } else if name == HeaderName::MESSAGE_ID {
            self.message_id = None;
        }
        self.headers.remove(name)
    }

    /// The first value of `name`. `Content-*` fields are looked up in the
    /// mime part.
    pub fn get_header<T: TryInto<HeaderName>>(&self, name: T) -> Option<Cow<'_, str>> {
        let name = name.try_into().ok()?;
        if name.is_content_header() {
            return self
                .mime_part
                .as_ref()?
                .borrow()
                .get_header(&name)
                .map(|value| Cow::Owned(value.to_string()));
        }
        match self.headers.get(&name) {
            Some(value) => Some(Cow::Borrowed(value)),
            None if name == HeaderName::MIME_VERSION => Some(Cow::Borrowed("1.0")),
            None => None,
        }
    }

    pub fn addresses(&self, role: AddressRole) -> &AddressList {
        &self.addresses[role.index()]
    }

    /// Mutable access to an address list. Every change made through the
    /// returned handle rewrites the list's header.
    pub fn addresses_mut(&mut self, role: AddressRole) -> AddressListMut<'_> {
        AddressListMut {
            message: self,
            role,
        }
    }

    pub(crate) fn update_addresses<R>(
        &mut self,
        role: AddressRole,
        mode: SyncMode,
        f: impl FnOnce(&mut AddressList) -> R,
    ) -> R {
        let ret = f(&mut self.addresses[role.index()]);
        if mode == SyncMode::Emit {
            self.sync_addresses(role);
        }
        ret
    }

    fn sync_addresses(&mut self, role: AddressRole) {
        let value = self.addresses[role.index()]
            .to_string_encoded(true, self.options.default_charset.as_deref());
        log::trace!("syncing {}: {:?}", role, value);
        self.headers.set(role.header_name(), Some(&value), None);
    }

    pub fn add_mailbox(&mut self, role: AddressRole, name: Option<&str>, address: &str) {
        self.addresses_mut(role).add_mailbox(name, address);
    }

    /// Every `To`, `Cc` and `Bcc` address, or `None` if there are none.
    pub fn all_recipients(&self) -> Option<AddressList> {
        let mut ret = AddressList::new();
        for role in [AddressRole::To, AddressRole::Cc, AddressRole::Bcc] {
            ret.append(self.addresses(role).clone());
        }
        (!ret.is_empty()).then_some(ret)
    }

    /// Sets the subject, encoding it with `charset` or the configured
    /// default charset where needed.
    pub fn set_subject(&mut self, subject: &str, charset: Option<&str>) {
        let subject = subject.trim();
        let charset = charset.or(self.options.default_charset.as_deref());
        let encoded = encode_header_text(subject, charset);
        self.subject = Some(subject.to_string());
        self.headers.set(HeaderName::SUBJECT, Some(&encoded), None);
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn set_date(&mut self, timestamp: UnixTimestamp, tz_offset: TzOffset) {
        self.date = (timestamp, tz_offset);
        let value = timestamp_to_rfc5322(timestamp, tz_offset);
        self.headers.set(HeaderName::DATE, Some(&value), None);
    }

    pub fn set_date_from_str(&mut self, value: &str) -> Result<()> {
        let (timestamp, tz_offset) = rfc5322_to_timestamp(value)?;
        self.set_date(timestamp, tz_offset);
        Ok(())
    }

    pub fn date(&self) -> (UnixTimestamp, TzOffset) {
        self.date
    }

    pub fn date_as_string(&self) -> String {
        timestamp_to_rfc5322(self.date.0, self.date.1)
    }

    /// Sets the message id. Surrounding angle brackets are optional.
    pub fn set_message_id(&mut self, message_id: &str) {
        let message_id = message_id.trim();
        let message_id = message_id
            .strip_prefix('<')
            .and_then(|id| id.strip_suffix('>'))
            .unwrap_or(message_id);
        self.headers.set(
            HeaderName::MESSAGE_ID,
            Some(&format!("<{}>", message_id)),
            None,
        );
        self.message_id = Some(message_id.to_string());
    }

    /// Sets a new unique message id in the domain `fqdn` and returns it.
    pub fn generate_message_id(&mut self, fqdn: &str) -> String {
        let message_id = format!("{}@{}", uuid::Uuid::new_v4().simple(), fqdn);
        self.set_message_id(&message_id);
        message_id
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Sets the mime part the message carries.
    ///
    /// Setting the part already carried does nothing. A new part gets a
    /// `MIME-Version` header on the message if there is none, and its
    /// header positions are forgotten so that its headers are written after
    /// the message's own.
    pub fn set_mime_part(&mut self, part: Option<MimePartRef>) {
        match (&self.mime_part, &part) {
            (Some(current), Some(new)) if Rc::ptr_eq(current, new) => return,
            (None, None) => return,
            _ => {}
        }
        if let Some(ref new) = part {
            if !self.headers.contains(HeaderName::MIME_VERSION) {
                self.headers.append(HeaderName::MIME_VERSION, "1.0", None);
            }
            new.borrow_mut().reset_offsets();
        }
        self.mime_part = part;
    }

    pub fn mime_part(&self) -> Option<&MimePartRef> {
        self.mime_part.as_ref()
    }

    /// Best-effort guess of the part holding the message text.
    pub fn body(&self) -> Option<MimePartRef> {
        self.mime_part.as_ref().and_then(mime::guess_body)
    }

    /// Calls `f` on every part of the message, depth first.
    pub fn foreach(&self, f: &mut dyn FnMut(&MimePartRef)) {
        if let Some(ref part) = self.mime_part {
            mime::foreach(part, f);
        }
    }

    /// Walks the message headers and those of the mime part, ordered by
    /// their original positions as far as both have them.
    fn reconciled<E>(
        &self,
        mut f: impl FnMut(&HeaderEntry) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        let Some(ref part) = self.mime_part else {
            return self.headers.iter().try_for_each(f);
        };
        let part = part.borrow();
        let own = self.headers.iter().collect::<Vec<_>>();
        let body = part.headers().iter().collect::<Vec<_>>();
        let (mut i, mut j) = (0, 0);
        while i < own.len() && j < body.len() {
            let Some(body_offset) = body[j].offset() else {
                break;
            };
            match own[i].offset() {
                Some(offset) if offset < body_offset => {
                    f(own[i])?;
                    i += 1;
                }
                _ => {
                    f(body[j])?;
                    j += 1;
                }
            }
        }
        own[i..]
            .iter()
            .chain(body[j..].iter())
            .try_for_each(|entry| f(*entry))
    }

    /// Writes the header block, without the blank line ending it. Returns
    /// the number of bytes written.
    pub fn write_headers<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = 0;
        self.reconciled(|entry| -> Result<()> {
            written += entry.write_field(writer, &self.options)?;
            Ok(())
        })?;
        Ok(written)
    }

    pub fn headers_to_string(&self) -> String {
        let mut ret = String::new();
        self.reconciled(|entry| -> std::result::Result<(), Infallible> {
            ret.push_str(&entry.to_field(&self.options));
            Ok(())
        })
        .unwrap_or_else(|never| match never {});
        ret
    }

    /// Writes the whole message: headers, a blank line and the content of
    /// the mime part.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.write_headers(writer)?;
        let newline = self.options.line_ending.as_str();
        writer.write_all(newline.as_bytes())?;
        written += newline.len();
        if let Some(ref part) = self.mime_part {
            written += part.borrow().write_content(writer, &self.options)?;
        }
        Ok(written)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut ret = vec![];
        self.write_to(&mut ret)?;
        Ok(ret)
    }
}

/// Mutable handle to one of a message's address lists, returned by
/// [`Message::addresses_mut`]. Dereferences to the list for reading.
pub struct AddressListMut<'m> {
    message: &'m mut Message,
    role: AddressRole,
}

impl Deref for AddressListMut<'_> {
    type Target = AddressList;

    fn deref(&self) -> &AddressList {
        self.message.addresses(self.role)
    }
}

impl AddressListMut<'_> {
    /// Applies `f` to the list and rewrites the header.
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut AddressList) -> R) -> R {
        self.message
            .update_addresses(self.role, SyncMode::Emit, f)
    }

    /// Adds an address at the end and returns its index.
    pub fn add(&mut self, address: Address) -> usize {
        self.modify(|list| {
            list.push(address);
            list.len() - 1
        })
    }

    pub fn add_mailbox(&mut self, name: Option<&str>, address: &str) -> usize {
        self.add(Address::new(name.map(str::to_string), address.to_string()))
    }

    pub fn insert(&mut self, index: usize, address: Address) {
        self.modify(|list| list.insert(index, address));
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Address> {
        self.modify(|list| list.remove(index))
    }

    pub fn clear(&mut self) {
        self.modify(AddressList::clear);
    }

    pub fn append(&mut self, other: AddressList) {
        self.modify(|list| list.append(other));
    }

    pub fn prepend(&mut self, other: AddressList) {
        self.modify(|list| list.prepend(other));
    }

    /// Sets the display name of the address at `index`. Returns `false` if
    /// there is no such address.
    pub fn set_name(&mut self, index: usize, name: Option<&str>) -> bool {
        self.modify(|list| match list.get_mut(index) {
            Some(address) => {
                address.set_display_name(name.map(str::to_string));
                true
            }
            None => false,
        })
    }

    /// Sets the address of the mailbox at `index`. Returns `false` if there
    /// is no mailbox there.
    pub fn set_addr(&mut self, index: usize, address_spec: &str) -> bool {
        self.modify(|list| match list.get_mut(index) {
            Some(Address::Mailbox(mailbox)) => {
                mailbox.address_spec = address_spec.to_string();
                true
            }
            _ => false,
        })
    }

    /// Adds a member to the group at `index`. Returns `false` if there is no
    /// group there.
    pub fn add_to_group(&mut self, index: usize, mailbox: MailboxAddress) -> bool {
        self.modify(|list| list.add_to_group(index, mailbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_pretty_headers_order() {
        let mut message = Message::new(true);
        assert_eq!(message.headers_to_string(), "");
        message.set_header(HeaderName::TO, "to@example.com");
        message.set_subject("hello", None);
        message.set_header(HeaderName::FROM, "from@example.com");
        message.append_header(HeaderName::try_from("X-Mailer").unwrap(), "test");
        assert_eq!(
            message.headers_to_string(),
            "From: from@example.com\nSubject: hello\nTo: to@example.com\nX-Mailer: test\n"
        );
    }

    #[test]
    fn test_message_originators_always_replace() {
        let mut message = Message::new(false);
        message.append_header(HeaderName::FROM, "a@example.com");
        message.append_header(HeaderName::FROM, "b@example.com");
        assert_eq!(message.addresses(AddressRole::From).len(), 1);
        assert_eq!(
            message
                .addresses(AddressRole::From)
                .get(0)
                .and_then(Address::get_email),
            Some("b@example.com")
        );
        // The header list itself keeps both fields.
        assert_eq!(message.headers().count(HeaderName::FROM), 2);

        message.append_header(HeaderName::CC, "a@example.com");
        message.prepend_header(HeaderName::CC, "b@example.com, c@example.com");
        let emails = message
            .addresses(AddressRole::Cc)
            .iter()
            .filter_map(Address::get_email)
            .collect::<Vec<_>>();
        assert_eq!(emails, ["b@example.com", "c@example.com", "a@example.com"]);
    }

    #[test]
    fn test_message_decode_failures_keep_values() {
        let mut message = Message::new(false);
        message.set_header(HeaderName::DATE, "Sat, 31 May 2008 08:56:43 EST");
        message.set_header(HeaderName::MESSAGE_ID, "<136734928.123728@localhost.com>");
        message.set_header(HeaderName::DATE, "not a date");
        message.set_header(HeaderName::MESSAGE_ID, "<>");
        assert_eq!(message.date(), (1212242203, -500));
        assert_eq!(message.message_id(), Some("136734928.123728@localhost.com"));
        assert_eq!(message.get_header("date").as_deref(), Some("not a date"));
        assert!(message.set_date_from_str("garbage").is_err());
        assert_eq!(message.date(), (1212242203, -500));
    }

    #[test]
    fn test_message_content_headers_need_a_part() {
        let mut message = Message::new(false);
        message.set_header(HeaderName::CONTENT_TYPE, "text/html");
        assert_eq!(message.get_header(HeaderName::CONTENT_TYPE), None);
        assert!(message.headers().is_empty());
        assert!(!message.remove_header(HeaderName::CONTENT_TYPE));

        message.set_mime_part(Some(MimeObject::from(Part::default()).into_ref()));
        message.set_header(HeaderName::CONTENT_TYPE, "text/html");
        assert_eq!(
            message.get_header("content-type").as_deref(),
            Some("text/html")
        );
        assert!(!message.headers().contains(HeaderName::CONTENT_TYPE));
        assert!(message
            .body()
            .map_or(false, |body| body.borrow().content_type().is_type("text", "html")));
    }
}
