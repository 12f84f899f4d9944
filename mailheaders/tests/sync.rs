/*
 * mailheaders
 *
 * Copyright 2019 Manos Pitsidianakis
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

use mailheaders::{
    Address, AddressList, AddressRole, ContentType, HeaderName, MailboxAddress, Message,
    MimeObject, Part,
};

#[test]
fn test_address_header_sync() {
    let mut message = Message::new(true);
    assert!(message.addresses(AddressRole::To).is_empty());
    assert_eq!(message.get_header("To"), None);

    let mut to = message.addresses_mut(AddressRole::To);
    let index = to.add_mailbox(Some("Tester"), "tester@localhost.com");
    assert_eq!(index, 0);
    assert_eq!(
        message.get_header("To").as_deref(),
        Some("Tester <tester@localhost.com>")
    );

    assert!(message
        .addresses_mut(AddressRole::To)
        .set_name(0, Some("Eva Lucy-Ann Tester")));
    assert_eq!(
        message.get_header("To").as_deref(),
        Some("Eva Lucy-Ann Tester <tester@localhost.com>")
    );

    assert!(message
        .addresses_mut(AddressRole::To)
        .set_addr(0, "evalucyann@ximian.com"));
    assert_eq!(
        message.get_header("To").as_deref(),
        Some("Eva Lucy-Ann Tester <evalucyann@ximian.com>")
    );

    message
        .addresses_mut(AddressRole::To)
        .insert(0, Address::new_group("Group".to_string(), vec![]));
    assert_eq!(
        message.get_header("To").as_deref(),
        Some("Group: ;, Eva Lucy-Ann Tester <evalucyann@ximian.com>")
    );

    let removed = message.addresses_mut(AddressRole::To).remove_at(1);
    assert_eq!(
        removed.as_ref().and_then(Address::get_email),
        Some("evalucyann@ximian.com")
    );
    assert_eq!(message.get_header("To").as_deref(), Some("Group: ;"));

    assert!(message.addresses_mut(AddressRole::To).add_to_group(
        0,
        MailboxAddress::new(Some("Tester".to_string()), "tester@hotmail.com".to_string())
    ));
    assert_eq!(
        message.get_header("To").as_deref(),
        Some("Group: Tester <tester@hotmail.com>;")
    );
    assert_eq!(
        message.headers_to_string(),
        "To: Group: Tester <tester@hotmail.com>;\n"
    );

    // Not a group, not a mailbox.
    assert!(!message.addresses_mut(AddressRole::To).add_to_group(
        5,
        MailboxAddress::new(None, "nobody@hotmail.com".to_string())
    ));
    assert!(!message.addresses_mut(AddressRole::To).set_addr(0, "x@y.z"));
}

#[test]
fn test_address_header_sync_other_roles() {
    let mut message = Message::new(false);
    message.add_mailbox(AddressRole::Cc, None, "cc@localhost.com");
    message.add_mailbox(AddressRole::Bcc, Some("Hidden"), "bcc@localhost.com");
    assert_eq!(message.get_header("cc").as_deref(), Some("cc@localhost.com"));
    assert_eq!(
        message.get_header(HeaderName::BCC).as_deref(),
        Some("Hidden <bcc@localhost.com>")
    );

    let recipients = message.all_recipients().unwrap();
    assert_eq!(recipients.len(), 2);
    assert_eq!(
        recipients.to_string(),
        "cc@localhost.com, Hidden <bcc@localhost.com>"
    );

    message.addresses_mut(AddressRole::Cc).clear();
    assert_eq!(message.get_header("cc").as_deref(), Some(""));
    message.addresses_mut(AddressRole::Bcc).modify(AddressList::clear);
    assert!(message.all_recipients().is_none());

    message
        .addresses_mut(AddressRole::ReplyTo)
        .append(AddressList::parse(b"a@localhost.com, b@localhost.com"));
    message
        .addresses_mut(AddressRole::ReplyTo)
        .prepend(AddressList::parse(b"first@localhost.com"));
    assert_eq!(
        message.get_header("Reply-To").as_deref(),
        Some("first@localhost.com, a@localhost.com, b@localhost.com")
    );
}

#[test]
fn test_address_header_sync_encodes_names() {
    let mut message = Message::new(false);
    message.add_mailbox(AddressRole::From, Some("Ünïcödé Tester"), "u@localhost.com");
    let value = message.get_header("From").unwrap().into_owned();
    assert!(value.is_ascii(), "{value}");
    assert!(value.starts_with("=?utf-8?"), "{value}");
    assert!(value.ends_with(" <u@localhost.com>"), "{value}");
    assert_eq!(
        message.addresses(AddressRole::From).get(0).and_then(Address::get_display_name),
        Some("Ünïcödé Tester")
    );
}

#[test]
fn test_raw_header_updates_fields() {
    let mut message = Message::new(false);
    message.set_header(HeaderName::TO, "a@localhost.com, b@localhost.com");
    message.append_header(HeaderName::TO, "c@localhost.com");
    assert_eq!(message.addresses(AddressRole::To).len(), 3);
    // The header keeps the text it was given.
    assert_eq!(message.headers().get_all("To"), vec!["a@localhost.com, b@localhost.com", "c@localhost.com"]);

    message.set_header(HeaderName::TO, "d@localhost.com");
    assert_eq!(message.addresses(AddressRole::To).len(), 1);
    assert_eq!(message.headers().count("To"), 1);

    message.set_header(HeaderName::SUBJECT, "=?utf-8?q?caf=C3=A9?=");
    assert_eq!(message.subject(), Some("café"));
    assert_eq!(
        message.get_header(HeaderName::SUBJECT).as_deref(),
        Some("=?utf-8?q?caf=C3=A9?=")
    );

    message.set_header(HeaderName::MESSAGE_ID, " <1234@localhost.com> ");
    assert_eq!(message.message_id(), Some("1234@localhost.com"));

    message.set_header(HeaderName::MIME_VERSION, "1.0");
    assert_eq!(message.get_header("mime-version").as_deref(), Some("1.0"));

    assert!(message.remove_header("To"));
    assert!(message.addresses(AddressRole::To).is_empty());
    assert!(message.remove_header("Subject"));
    assert_eq!(message.subject(), None);
    assert!(message.remove_header("Message-Id"));
    assert_eq!(message.message_id(), None);
    assert!(!message.remove_header("Date"));
    assert_eq!(message.date(), (0, 0));
    // Synthesized when absent.
    assert!(message.remove_header("MIME-Version"));
    assert_eq!(message.get_header("MIME-Version").as_deref(), Some("1.0"));
}

#[test]
fn test_content_headers_sync() {
    let part = MimeObject::from(Part::new(ContentType::new("text", "plain"))).into_ref();
    let mut message = Message::new(false);
    message.set_mime_part(Some(part.clone()));

    message.set_header(HeaderName::CONTENT_TYPE, "text/html; charset=utf-8");
    assert!(part.borrow().content_type().is_type("text", "html"));
    assert_eq!(part.borrow().content_type().parameter("charset"), Some("utf-8"));

    let mut content_type = ContentType::new("text", "plain");
    content_type.set_parameter("format", "flowed");
    part.borrow_mut().set_content_type(content_type);
    assert_eq!(
        message.get_header("Content-Type").as_deref(),
        Some("text/plain; format=flowed")
    );

    message.append_header(HeaderName::CONTENT_DISPOSITION, "inline");
    assert_eq!(
        part.borrow().headers().get(HeaderName::CONTENT_DISPOSITION),
        Some("inline")
    );
    assert!(message.remove_header("content-disposition"));
    assert_eq!(message.get_header("Content-Disposition"), None);
    assert!(!message.headers().contains("Content-Type"));
}
