/*
 * mailheaders - email module
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

//! Email addresses and the six address roles of a message.

use std::fmt;

use crate::email::{
    encodings::{encode_phrase, needs_encoding},
    headers::HeaderName,
    parser,
};

/**
 * Container for a mailbox.
 *
 * ```text
 * > "Name Name2" <address@domain.tld>
 * >  └─────┬──┘   └──────────┬─────┘
 * > display_name             │
 * >                          │
 * >                    address_spec
 *```
 */
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MailboxAddress {
    pub display_name: Option<String>,
    pub address_spec: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupAddress {
    pub display_name: String,
    pub mailbox_list: Vec<MailboxAddress>,
}

#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Address {
    Mailbox(MailboxAddress),
    Group(GroupAddress),
}

const SPECIALS: &[u8] = b"()<>[]:;@\\,.\"";

/// Writes a display name as a header phrase.
fn format_phrase(name: &str, encode: bool, charset: Option<&str>) -> String {
    if encode && needs_encoding(name) {
        return encode_phrase(name, charset);
    }
    if name.bytes().any(|b| SPECIALS.contains(&b) || b.is_ascii_control()) {
        let mut ret = String::with_capacity(name.len() + 2);
        ret.push('"');
        for c in name.chars() {
            if c == '"' || c == '\\' {
                ret.push('\\');
            }
            ret.push(c);
        }
        ret.push('"');
        ret
    } else {
        name.to_string()
    }
}

impl MailboxAddress {
    pub fn new(display_name: Option<String>, address_spec: String) -> Self {
        Self {
            display_name: display_name.filter(|n| !n.trim().is_empty()),
            address_spec,
        }
    }

    /// Formats the mailbox for a header. Display names that need it are
    /// `RFC2047` encoded when `encode` is set.
    pub fn to_string_encoded(&self, encode: bool, charset: Option<&str>) -> String {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => format!(
                "{} <{}>",
                format_phrase(name, encode, charset),
                self.address_spec
            ),
            _ => self.address_spec.clone(),
        }
    }
}

impl GroupAddress {
    pub fn to_string_encoded(&self, encode: bool, charset: Option<&str>) -> String {
        format!(
            "{}: {};",
            format_phrase(&self.display_name, encode, charset),
            self.mailbox_list
                .iter()
                .map(|m| m.to_string_encoded(encode, charset))
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

impl Address {
    pub fn new(display_name: Option<String>, address_spec: String) -> Self {
        Self::Mailbox(MailboxAddress::new(display_name, address_spec))
    }

    pub fn new_group(display_name: String, mailbox_list: Vec<MailboxAddress>) -> Self {
        Self::Group(GroupAddress {
            display_name,
            mailbox_list,
        })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    pub fn get_display_name(&self) -> Option<&str> {
        match self {
            Self::Mailbox(m) => m.display_name.as_deref(),
            Self::Group(g) => Some(g.display_name.as_str()),
        }
    }

    /// Replaces the display name. A group keeps an empty name when given
    /// `None`.
    pub fn set_display_name(&mut self, new_val: Option<String>) {
        match self {
            Self::Mailbox(m) => m.display_name = new_val.filter(|n| !n.trim().is_empty()),
            Self::Group(g) => g.display_name = new_val.unwrap_or_default(),
        }
    }

    pub fn get_email(&self) -> Option<&str> {
        match self {
            Self::Mailbox(m) => Some(m.address_spec.as_str()),
            Self::Group(_) => None,
        }
    }

    pub fn get_fqdn(&self) -> Option<&str> {
        let email = self.get_email()?;
        let fqdn_pos = email.rfind('@')? + 1;
        Some(&email[fqdn_pos..])
    }

    pub fn to_string_encoded(&self, encode: bool, charset: Option<&str>) -> String {
        match self {
            Self::Mailbox(m) => m.to_string_encoded(encode, charset),
            Self::Group(g) => g.to_string_encoded(encode, charset),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string_encoded(false, None))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An ordered list of addresses, as found in one address header.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AddressList {
    inner: Vec<Address>,
}

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an address header value. Elements that cannot be parsed are
    /// dropped.
    pub fn parse(value: &[u8]) -> Self {
        Self {
            inner: parser::address::address_list(value),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Address> {
        self.inner.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Address> {
        self.inner.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Address> {
        self.inner.get_mut(index)
    }

    pub fn push(&mut self, address: Address) {
        self.inner.push(address);
    }

    /// Inserts at `index`, or at the end when `index` is past it.
    pub fn insert(&mut self, index: usize, address: Address) {
        let index = index.min(self.inner.len());
        self.inner.insert(index, address);
    }

    pub fn remove(&mut self, index: usize) -> Option<Address> {
        (index < self.inner.len()).then(|| self.inner.remove(index))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn append(&mut self, other: Self) {
        self.inner.extend(other.inner);
    }

    pub fn prepend(&mut self, other: Self) {
        self.inner.splice(0..0, other.inner);
    }

    /// Appends `mailbox` to the group at `index`. Returns `false` if there
    /// is no group there.
    pub fn add_to_group(&mut self, index: usize, mailbox: MailboxAddress) -> bool {
        match self.inner.get_mut(index) {
            Some(Address::Group(g)) => {
                g.mailbox_list.push(mailbox);
                true
            }
            _ => false,
        }
    }

    /// Every mailbox in the list, with group members in place of their group.
    pub fn mailboxes(&self) -> impl Iterator<Item = &MailboxAddress> + '_ {
        self.inner.iter().flat_map(|a| match a {
            Address::Mailbox(m) => std::slice::from_ref(m).iter(),
            Address::Group(g) => g.mailbox_list.iter(),
        })
    }

    /// Each address formatted on its own, for writers that fold between
    /// addresses.
    pub fn formatted(&self, encode: bool, charset: Option<&str>) -> Vec<String> {
        self.inner
            .iter()
            .map(|a| a.to_string_encoded(encode, charset))
            .collect()
    }

    pub fn to_string_encoded(&self, encode: bool, charset: Option<&str>) -> String {
        self.formatted(encode, charset).join(", ")
    }
}

impl fmt::Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string_encoded(false, None))
    }
}

impl From<Vec<Address>> for AddressList {
    fn from(inner: Vec<Address>) -> Self {
        Self { inner }
    }
}

impl From<Address> for AddressList {
    fn from(address: Address) -> Self {
        Self {
            inner: vec![address],
        }
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// The address headers a message keeps as structured lists.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum AddressRole {
    Sender = 0,
    From,
    ReplyTo,
    To,
    Cc,
    Bcc,
}

impl AddressRole {
    pub const ALL: [Self; 6] = [
        Self::Sender,
        Self::From,
        Self::ReplyTo,
        Self::To,
        Self::Cc,
        Self::Bcc,
    ];

    pub fn header_name(self) -> HeaderName {
        match self {
            Self::Sender => HeaderName::SENDER,
            Self::From => HeaderName::FROM,
            Self::ReplyTo => HeaderName::REPLY_TO,
            Self::To => HeaderName::TO,
            Self::Cc => HeaderName::CC,
            Self::Bcc => HeaderName::BCC,
        }
    }

    pub fn from_header_name(name: &HeaderName) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.header_name() == *name)
    }

    /// Originator roles hold whatever the header was last given, no matter
    /// whether the value was added or set.
    pub fn is_originator(self) -> bool {
        matches!(self, Self::Sender | Self::From | Self::ReplyTo)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AddressRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.header_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_format() {
        assert_eq!(
            Address::new(Some("Tester".into()), "tester@localhost.com".into()).to_string(),
            "Tester <tester@localhost.com>"
        );
        assert_eq!(
            Address::new(None, "tester@localhost.com".into()).to_string(),
            "tester@localhost.com"
        );
        assert_eq!(
            Address::new(Some("Doe, John".into()), "john@example.com".into()).to_string(),
            "\"Doe, John\" <john@example.com>"
        );
        assert_eq!(
            Address::new(
                Some("Jeffrey \"fejj\" Stedfast".into()),
                "fejj@helixcode.com".into()
            )
            .to_string(),
            "\"Jeffrey \\\"fejj\\\" Stedfast\" <fejj@helixcode.com>"
        );
        assert_eq!(Address::new_group("Group".into(), vec![]).to_string(), "Group: ;");
        assert_eq!(
            Address::new_group(
                "Group".into(),
                vec![MailboxAddress::new(
                    Some("Tester".into()),
                    "tester@hotmail.com".into()
                )]
            )
            .to_string(),
            "Group: Tester <tester@hotmail.com>;"
        );
    }

    #[test]
    fn test_address_encoded_names() {
        let address = Address::new(Some("Ünïcödé Tester".into()), "u@example.com".into());
        assert_eq!(address.to_string(), "Ünïcödé Tester <u@example.com>");
        let encoded = address.to_string_encoded(true, None);
        assert!(encoded.is_ascii());
        assert!(encoded.ends_with(" <u@example.com>"), "{encoded}");
        assert_eq!(
            AddressList::parse(encoded.as_bytes()),
            AddressList::from(address)
        );
    }

    #[test]
    fn test_address_list_mutation() {
        let mut list = AddressList::parse(b"a@example.com, Group: ;");
        assert_eq!(list.len(), 2);
        list.insert(0, Address::new(None, "first@example.com".into()));
        list.insert(100, Address::new(None, "last@example.com".into()));
        assert!(list.add_to_group(2, MailboxAddress::new(None, "m@example.com".into())));
        assert!(!list.add_to_group(0, MailboxAddress::new(None, "m@example.com".into())));
        assert_eq!(
            list.to_string(),
            "first@example.com, a@example.com, Group: m@example.com;, last@example.com"
        );
        assert_eq!(list.mailboxes().count(), 4);
        assert_eq!(
            list.remove(0).and_then(|a| a.get_fqdn().map(str::to_string)).as_deref(),
            Some("example.com")
        );
        assert!(list.remove(10).is_none());
        list.prepend(AddressList::parse(b"zero@example.com"));
        assert_eq!(list.get(0).and_then(Address::get_email), Some("zero@example.com"));
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn test_address_roles() {
        assert_eq!(AddressRole::ReplyTo.header_name().as_str(), "Reply-To");
        assert_eq!(
            AddressRole::from_header_name(&HeaderName::try_from("reply-to").unwrap()),
            Some(AddressRole::ReplyTo)
        );
        assert_eq!(AddressRole::from_header_name(&HeaderName::SUBJECT), None);
        assert!(AddressRole::From.is_originator());
        assert!(!AddressRole::Cc.is_originator());
        assert_eq!(AddressRole::Bcc.index(), 5);
    }
}
