//
// mailheaders
//
// Copyright 2017 Emmanouil Pitsidianakis <manos@pitsidianak.is>
//
// This file is part of mailheaders.
//
// mailheaders is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// mailheaders is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with mailheaders. If not, see <http://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later

use super::*;

fn test_headers() -> HeaderList {
    let mut headers = HeaderList::new();
    for (name, value) in [
        ("Received", "first received header"),
        ("Received", "second received header"),
        ("Received", "third received header"),
        ("Date", "Sat, 31 May 2008 08:56:43 EST"),
        ("From", "Sender Name <sender@localhost.com>"),
        ("Sender", "Sender Name <sender@localhost.com>"),
        ("To", "Recipient Name <recipient@localhost.com>"),
        ("Subject", "hey, check this out"),
        ("Message-Id", "<136734928.123728@localhost.com>"),
    ] {
        headers.append(HeaderName::try_from(name).unwrap(), value, None);
    }
    headers
}

#[test]
fn test_headers_list_remove_at() {
    let mut headers = test_headers();
    assert_eq!(headers.len(), 9);
    assert_eq!(headers.count(HeaderName::RECEIVED), 3);
    assert_eq!(headers.get("received"), Some("first received header"));

    assert!(headers.remove_at(0));
    assert_eq!(headers.get(HeaderName::RECEIVED), Some("second received header"));
    assert_eq!(headers.count(HeaderName::RECEIVED), 2);
    assert_eq!(headers.len(), 8);

    // From the middle of a run of the same name.
    assert!(headers.remove_at(1));
    assert_eq!(
        headers.get_all(HeaderName::RECEIVED),
        vec!["second received header"]
    );

    let last = headers.len() - 1;
    assert_eq!(
        headers.get_at(last).map(HeaderEntry::name),
        Some(&HeaderName::MESSAGE_ID)
    );
    assert!(headers.remove_at(last));
    assert_eq!(headers.get(HeaderName::MESSAGE_ID), None);
    assert_eq!(headers.count(HeaderName::MESSAGE_ID), 0);
    assert!(!headers.contains("message-id"));

    assert!(!headers.remove_at(headers.len()));
    assert!(!headers.remove_at(100));
    assert_eq!(headers.len(), 6);
}

#[test]
fn test_headers_list_case_insensitive() {
    let headers = test_headers();
    assert_eq!(headers.get("SUBJECT"), Some("hey, check this out"));
    assert_eq!(headers.get("subject"), headers.get(HeaderName::SUBJECT));
    assert_eq!(headers.get(b"mEsSaGe-iD".as_slice()), Some("<136734928.123728@localhost.com>"));
    assert_eq!(headers.get("X-Nope"), None);
    assert_eq!(headers.get("invalid name:"), None);
    assert_eq!(headers.count("invalid name:"), 0);
}

#[test]
fn test_headers_list_set() {
    let mut headers = test_headers();
    headers.set(HeaderName::RECEIVED, Some("only received header"), None);
    assert_eq!(headers.count(HeaderName::RECEIVED), 1);
    assert_eq!(headers.len(), 7);
    // Set keeps the position of the first field.
    assert_eq!(headers.get_at(0).and_then(HeaderEntry::value), Some("only received header"));

    headers.set(HeaderName::try_from("X-Mailer").unwrap(), Some("test"), None);
    assert_eq!(headers.get_at(7).and_then(HeaderEntry::value), Some("test"));

    headers.set(HeaderName::RECEIVED, None, None);
    assert!(!headers.contains(HeaderName::RECEIVED));
    assert_eq!(headers.len(), 7);
    assert_eq!(headers.get_at(0).map(HeaderEntry::name), Some(&HeaderName::DATE));

    assert!(headers.remove("x-mailer"));
    assert!(!headers.remove("x-mailer"));
    assert_eq!(headers.len(), 6);
}

#[test]
fn test_headers_list_prepend() {
    let mut headers = test_headers();
    headers.prepend(HeaderName::RECEIVED, "newest received header", None);
    assert_eq!(headers.get(HeaderName::RECEIVED), Some("newest received header"));
    assert_eq!(
        headers.get_all("Received"),
        vec![
            "newest received header",
            "first received header",
            "second received header",
            "third received header",
        ]
    );
    headers.prepend(HeaderName::RETURN_PATH, "<sender@localhost.com>", None);
    assert_eq!(
        headers.iter().next().map(HeaderEntry::name),
        Some(&HeaderName::RETURN_PATH)
    );
}

#[test]
fn test_headers_list_placeholders() {
    let mut headers = HeaderList::new();
    headers.reserve(HeaderName::DATE);
    headers.reserve(HeaderName::FROM);
    headers.reserve(HeaderName::SUBJECT);
    headers.reserve(HeaderName::FROM);
    assert_eq!(headers.len(), 3);
    assert!(!headers.contains(HeaderName::FROM));
    assert_eq!(headers.get(HeaderName::FROM), None);
    assert_eq!(headers.to_string(), "");

    headers.append(HeaderName::SUBJECT, "subject", None);
    headers.prepend(HeaderName::FROM, "from@localhost.com", None);
    headers.append(HeaderName::SUBJECT, "second subject", None);
    assert_eq!(headers.len(), 4);
    assert_eq!(
        headers.to_string(),
        "From: from@localhost.com\nSubject: subject\nSubject: second subject\n"
    );
    assert!(headers.get_at(0).map_or(false, HeaderEntry::is_placeholder));
}

#[test]
fn test_headers_list_raw_values_and_offsets() {
    let mut headers = HeaderList::new();
    headers.append_entry(HeaderEntry::from_raw(
        HeaderName::SUBJECT,
        b" a subject\n folded",
        Some(0),
    ));
    headers.append_entry(HeaderEntry::from_raw(
        HeaderName::TO,
        b"  odd   <spacing@localhost.com>",
        Some(28),
    ));
    assert_eq!(headers.get(HeaderName::SUBJECT), Some("a subject folded"));
    assert_eq!(
        headers.to_string(),
        "Subject: a subject\n folded\nTo:  odd   <spacing@localhost.com>\n"
    );

    headers.set(HeaderName::TO, Some("spacing@localhost.com"), None);
    let to = headers.get_entry(HeaderName::TO).unwrap();
    assert_eq!(to.offset(), Some(28));
    assert_eq!(to.raw_value(), None);
    assert_eq!(
        headers.to_string(),
        "Subject: a subject\n folded\nTo: spacing@localhost.com\n"
    );

    headers.reset_offsets();
    assert!(headers.iter().all(|entry| entry.offset().is_none()));

    let mut out = vec![];
    let written = headers.write_to(&mut out, &HeaderOptions::default()).unwrap();
    assert_eq!(written, out.len());
    assert_eq!(out, headers.to_string().into_bytes());

    headers.clear();
    assert!(headers.is_empty());
    assert_eq!(headers.get(HeaderName::SUBJECT), None);
}

#[test]
fn test_headers_list_write_bytes() {
    let mut headers = HeaderList::new();
    headers.append_entry(HeaderEntry::from_raw(
        HeaderName::SUBJECT,
        b" caf\xe9\r\n au lait",
        Some(0),
    ));
    headers.append(HeaderName::TO, "recipient@localhost.com", None);

    let mut out = vec![];
    let written = headers.write_to(&mut out, &HeaderOptions::default()).unwrap();
    assert_eq!(written, out.len());
    assert_eq!(
        out,
        b"Subject: caf\xe9\r\n au lait\nTo: recipient@localhost.com\n"
    );

    let crlf = HeaderOptions {
        line_ending: LineEnding::CrLf,
        ..HeaderOptions::default()
    };
    let mut out = vec![];
    headers.write_to(&mut out, &crlf).unwrap();
    assert_eq!(
        out,
        b"Subject: caf\xe9\r\n au lait\r\nTo: recipient@localhost.com\r\n"
    );
    assert_eq!(
        headers.get_at(0).map(|entry| entry.to_field(&crlf)),
        Some("Subject: caf\u{fffd}\r\n au lait\r\n".to_string())
    );
}
