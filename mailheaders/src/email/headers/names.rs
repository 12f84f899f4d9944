/*
 * mailheaders - header names
 *
 * Copyright 2023 Manos Pitsidianakis
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

//! E-mail header names. Also referred to as `Fields` in `RFC5322`.

use std::{
    borrow::Cow,
    convert::TryFrom,
    error::Error,
    hash::{Hash, Hasher},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

/// Case insensitive wrapper for a header name. As of `RFC5322` it's
/// guaranteed to be ASCII.
///
/// The spelling given at construction is kept for output; comparisons and
/// hashing ignore ASCII case.
#[derive(Clone)]
pub struct HeaderName {
    inner: Repr,
}

#[derive(Clone)]
enum Repr {
    Static(&'static str),
    Custom(SmallVec<[u8; 32]>),
}

/// A possible error when converting a `HeaderName` from another type.
pub struct InvalidHeaderName;

impl Error for InvalidHeaderName {}

impl std::fmt::Debug for InvalidHeaderName {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "Invalid header name.")
    }
}

impl std::fmt::Display for InvalidHeaderName {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", stringify!(InvalidHeaderName))
    }
}

impl InvalidHeaderName {
    const fn new() -> Self {
        Self
    }
}

macro_rules! standard_headers {
    (
        $(
            $(#[$docs:meta])*
            ($upcase:ident, $name:literal);
        )+
    ) => {
        impl HeaderName {
            $(
                $(#[$docs])*
                pub const $upcase: Self = Self {
                    inner: Repr::Static($name),
                };
            )+
        }

        #[cfg(test)]
        const TEST_HEADERS: &[(HeaderName, &str)] = &[
            $(
                (HeaderName::$upcase, $name),
            )+
        ];
    };
}

standard_headers! {
    (BCC, "Bcc");
    (CC, "Cc");
    (CONTENT_DESCRIPTION, "Content-Description");
    (CONTENT_DISPOSITION, "Content-Disposition");
    (CONTENT_ID, "Content-Id");
    (CONTENT_TRANSFER_ENCODING, "Content-Transfer-Encoding");
    (CONTENT_TYPE, "Content-Type");
    (DATE, "Date");
    (FROM, "From");
    (IN_REPLY_TO, "In-Reply-To");
    (MESSAGE_ID, "Message-Id");
    (MIME_VERSION, "MIME-Version");
    (RECEIVED, "Received");
    (REFERENCES, "References");
    (REPLY_TO, "Reply-To");
    (RESENT_BCC, "Resent-Bcc");
    (RESENT_CC, "Resent-Cc");
    (RESENT_FROM, "Resent-From");
    (RESENT_MESSAGE_ID, "Resent-Message-Id");
    (RESENT_REPLY_TO, "Resent-Reply-To");
    (RESENT_SENDER, "Resent-Sender");
    (RESENT_TO, "Resent-To");
    (RETURN_PATH, "Return-Path");
    (SENDER, "Sender");
    (SUBJECT, "Subject");
    (TO, "To");
}

/// Valid header name bytes.
///
/// Source: [RFC5322 3.6.8.](https://datatracker.ietf.org/doc/html/rfc5322#autoid-35)
/// ```text
/// field-name      =   1*ftext
///
/// ftext           =   %d33-57 /          ; Printable US-ASCII
///                     %d59-126           ;  characters not including
///                                        ;  ":".
/// ```
#[inline]
const fn is_ftext(b: u8) -> bool {
    matches!(b, 33..=57 | 59..=126)
}

impl HeaderName {
    /// Returns a `str` representation of the header, spelled as it was
    /// given.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self.inner {
            Repr::Static(v) => v,
            // SAFETY: only ftext bytes, which are ASCII, are ever stored.
            Repr::Custom(ref v) => unsafe { std::str::from_utf8_unchecked(v) },
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.as_str().as_bytes()
    }

    pub fn from_bytes(src: &[u8]) -> Result<Self, InvalidHeaderName> {
        if src.is_empty() || !src.iter().copied().all(is_ftext) {
            return Err(InvalidHeaderName::new());
        }
        Ok(Self {
            inner: Repr::Custom(SmallVec::from_slice(src)),
        })
    }

    /// Whether this name belongs to the body content metadata namespace
    /// (`Content-*`), which lives in the MIME part headers.
    pub fn is_content_header(&self) -> bool {
        const PREFIX: &[u8] = b"Content-";
        let bytes = self.as_bytes();
        bytes.len() > PREFIX.len() && bytes[..PREFIX.len()].eq_ignore_ascii_case(PREFIX)
    }
}

impl std::fmt::Debug for HeaderName {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_tuple("HeaderName").field(&self.as_str()).finish()
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

impl PartialEq for HeaderName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes().eq_ignore_ascii_case(other.as_bytes())
    }
}

impl Eq for HeaderName {}

impl Hash for HeaderName {
    #[inline]
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        for b in self.as_bytes() {
            hasher.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl FromStr for HeaderName {
    type Err = InvalidHeaderName;

    fn from_str(s: &str) -> Result<Self, InvalidHeaderName> {
        Self::from_bytes(s.as_bytes())
    }
}

impl AsRef<str> for HeaderName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<[u8]> for HeaderName {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<'de> Deserialize<'de> for HeaderName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            S(String),
            B(Vec<u8>),
        }
        if let Ok(s) = <Helper>::deserialize(deserializer) {
            Self::from_bytes(match &s {
                Helper::S(v) => v.as_bytes(),
                Helper::B(v) => v.as_slice(),
            })
            .map_err(|_| de::Error::custom("invalid header name value"))
        } else {
            Err(de::Error::custom("invalid header name value"))
        }
    }
}

impl Serialize for HeaderName {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'a> From<&'a HeaderName> for HeaderName {
    fn from(src: &'a HeaderName) -> Self {
        src.clone()
    }
}

impl From<&HeaderName> for Cow<'static, str> {
    fn from(src: &HeaderName) -> Self {
        match src.inner {
            Repr::Static(s) => Cow::Borrowed(s),
            Repr::Custom(_) => Cow::Owned(src.to_string()),
        }
    }
}

impl<'a> TryFrom<&'a str> for HeaderName {
    type Error = InvalidHeaderName;

    #[inline]
    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        Self::from_bytes(s.as_bytes())
    }
}

impl<'a> TryFrom<&'a String> for HeaderName {
    type Error = InvalidHeaderName;

    #[inline]
    fn try_from(s: &'a String) -> Result<Self, Self::Error> {
        Self::from_bytes(s.as_bytes())
    }
}

impl<'a> TryFrom<&'a [u8]> for HeaderName {
    type Error = InvalidHeaderName;

    #[inline]
    fn try_from(s: &'a [u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(s)
    }
}

impl TryFrom<String> for HeaderName {
    type Error = InvalidHeaderName;

    #[inline]
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_bytes(s.as_bytes())
    }
}

impl TryFrom<Vec<u8>> for HeaderName {
    type Error = InvalidHeaderName;

    #[inline]
    fn try_from(vec: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_bytes(&vec)
    }
}

impl<'a> PartialEq<&'a HeaderName> for HeaderName {
    #[inline]
    fn eq(&self, other: &&'a HeaderName) -> bool {
        *self == **other
    }
}

impl<'a> PartialEq<HeaderName> for &'a HeaderName {
    #[inline]
    fn eq(&self, other: &HeaderName) -> bool {
        *other == *self
    }
}

impl PartialEq<str> for HeaderName {
    /// Performs a case-insensitive comparison of the string against the header
    /// name
    ///
    /// # Examples
    ///
    /// ```
    /// use mailheaders::email::headers::HeaderName;
    ///
    /// assert_eq!(HeaderName::MESSAGE_ID, "message-id");
    /// assert_eq!(HeaderName::MESSAGE_ID, "Message-ID");
    /// assert_ne!(HeaderName::MESSAGE_ID, "message id");
    /// ```
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }
}

impl PartialEq<HeaderName> for str {
    #[inline]
    fn eq(&self, other: &HeaderName) -> bool {
        *other == *self
    }
}

impl<'a> PartialEq<&'a str> for HeaderName {
    #[inline]
    fn eq(&self, other: &&'a str) -> bool {
        *self == **other
    }
}

impl<'a> PartialEq<HeaderName> for &'a str {
    #[inline]
    fn eq(&self, other: &HeaderName) -> bool {
        *other == *self
    }
}
