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

//! The MIME part tree a message body is made of.
//!
//! Only what the header layer needs is modelled: each part carries its own
//! `Content-*` header list and the parsed `Content-Type`. Leaf bodies are
//! kept as they are, without transfer decoding.

use std::{
    cell::RefCell,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Write,
    rc::Rc,
};

use crate::{
    conf::HeaderOptions,
    email::{
        headers::{HeaderList, HeaderName, HeaderOp},
        parser,
    },
    error::Result,
};

/// Shared handle to a part. A message and a caller may hold the same part.
pub type MimePartRef = Rc<RefCell<MimeObject>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MultipartType {
    Mixed,
    Alternative,
    Digest,
    Related,
    Signed,
    Encrypted,
}

impl Default for MultipartType {
    fn default() -> Self {
        Self::Mixed
    }
}

impl Display for MultipartType {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            Self::Mixed => write!(f, "mixed"),
            Self::Alternative => write!(f, "alternative"),
            Self::Digest => write!(f, "digest"),
            Self::Related => write!(f, "related"),
            Self::Signed => write!(f, "signed"),
            Self::Encrypted => write!(f, "encrypted"),
        }
    }
}

impl From<&str> for MultipartType {
    fn from(val: &str) -> Self {
        if val.eq_ignore_ascii_case("alternative") {
            Self::Alternative
        } else if val.eq_ignore_ascii_case("digest") {
            Self::Digest
        } else if val.eq_ignore_ascii_case("related") {
            Self::Related
        } else if val.eq_ignore_ascii_case("signed") {
            Self::Signed
        } else if val.eq_ignore_ascii_case("encrypted") {
            Self::Encrypted
        } else {
            Self::default()
        }
    }
}

/// A parsed `Content-Type` value. Type and subtype are kept in lowercase.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    kind: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::new("text", "plain")
    }
}

impl ContentType {
    pub fn new(kind: &str, subtype: &str) -> Self {
        Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parameters: vec![],
        }
    }

    pub fn parse(value: &[u8]) -> Option<Self> {
        let (_, (kind, subtype, parameters)) = parser::mime::content_type(value).ok()?;
        Some(Self {
            kind: String::from_utf8_lossy(kind).to_ascii_lowercase(),
            subtype: String::from_utf8_lossy(subtype).to_ascii_lowercase(),
            parameters: parameters
                .into_iter()
                .map(|(name, value)| {
                    (
                        String::from_utf8_lossy(name).into_owned(),
                        String::from_utf8_lossy(value).into_owned(),
                    )
                })
                .collect(),
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Case-insensitive match, `*` matching any type or subtype.
    pub fn is_type(&self, kind: &str, subtype: &str) -> bool {
        (kind == "*" || self.kind.eq_ignore_ascii_case(kind))
            && (subtype == "*" || self.subtype.eq_ignore_ascii_case(subtype))
    }

    pub fn is_text(&self) -> bool {
        self.is_type("text", "*")
    }

    pub fn is_multipart(&self) -> bool {
        self.is_type("multipart", "*")
    }

    pub fn multipart_type(&self) -> Option<MultipartType> {
        self.is_multipart()
            .then(|| MultipartType::from(self.subtype.as_str()))
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_parameter(&mut self, name: &str, value: &str) {
        match self
            .parameters
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.parameters.push((name.to_string(), value.to_string())),
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        const TSPECIALS: &[u8] = b"()<>@,;:\\\"/[]?= \t";
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (name, value) in &self.parameters {
            if value.is_empty() || value.bytes().any(|b| TSPECIALS.contains(&b)) {
                write!(f, "; {}=\"{}\"", name, value)?;
            } else {
                write!(f, "; {}={}", name, value)?;
            }
        }
        Ok(())
    }
}

/// A leaf part.
#[derive(Clone, Debug, Default)]
pub struct Part {
    headers: HeaderList,
    content_type: ContentType,
    body: Vec<u8>,
}

impl Part {
    pub fn new(content_type: ContentType) -> Self {
        let mut headers = HeaderList::new();
        headers.set(
            HeaderName::CONTENT_TYPE,
            Some(&content_type.to_string()),
            None,
        );
        Self {
            headers,
            content_type,
            body: vec![],
        }
    }

    /// A part made of already parsed headers. The content type is read from
    /// them, falling back to `text/plain`.
    pub fn from_headers(headers: HeaderList, body: Vec<u8>) -> Self {
        let content_type = headers
            .get(HeaderName::CONTENT_TYPE)
            .and_then(|v| ContentType::parse(v.as_bytes()))
            .unwrap_or_default();
        Self {
            headers,
            content_type,
            body,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, new_val: Vec<u8>) {
        self.body = new_val;
    }
}

/// A container part.
#[derive(Clone, Debug)]
pub struct Multipart {
    headers: HeaderList,
    content_type: ContentType,
    children: Vec<MimePartRef>,
}

impl Multipart {
    pub fn new(kind: MultipartType) -> Self {
        let mut content_type = ContentType::new("multipart", &kind.to_string());
        content_type.set_parameter("boundary", &format!("=-{}", uuid::Uuid::new_v4().simple()));
        let mut headers = HeaderList::new();
        headers.set(
            HeaderName::CONTENT_TYPE,
            Some(&content_type.to_string()),
            None,
        );
        Self {
            headers,
            content_type,
            children: vec![],
        }
    }

    pub fn boundary(&self) -> &str {
        self.content_type.parameter("boundary").unwrap_or_default()
    }

    pub fn children(&self) -> &[MimePartRef] {
        &self.children
    }

    pub fn add(&mut self, part: MimePartRef) {
        self.children.push(part);
    }
}

#[derive(Clone, Debug)]
pub enum MimeObject {
    Part(Part),
    Multipart(Multipart),
}

impl From<Part> for MimeObject {
    fn from(val: Part) -> Self {
        Self::Part(val)
    }
}

impl From<Multipart> for MimeObject {
    fn from(val: Multipart) -> Self {
        Self::Multipart(val)
    }
}

impl MimeObject {
    pub fn into_ref(self) -> MimePartRef {
        Rc::new(RefCell::new(self))
    }

    pub fn headers(&self) -> &HeaderList {
        match self {
            Self::Part(p) => &p.headers,
            Self::Multipart(m) => &m.headers,
        }
    }

    fn headers_mut(&mut self) -> &mut HeaderList {
        match self {
            Self::Part(p) => &mut p.headers,
            Self::Multipart(m) => &mut m.headers,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        match self {
            Self::Part(p) => &p.content_type,
            Self::Multipart(m) => &m.content_type,
        }
    }

    fn content_type_mut(&mut self) -> &mut ContentType {
        match self {
            Self::Part(p) => &mut p.content_type,
            Self::Multipart(m) => &mut m.content_type,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    pub fn children(&self) -> &[MimePartRef] {
        match self {
            Self::Part(_) => &[],
            Self::Multipart(m) => m.children(),
        }
    }

    pub fn get_header<T: TryInto<HeaderName>>(&self, name: T) -> Option<&str> {
        self.headers().get(name)
    }

    /// Mutates a header of the part, keeping the parsed content type in sync
    /// with `Content-Type`. Unparseable content types leave it unchanged.
    pub fn apply_header(&mut self, op: HeaderOp, name: HeaderName, value: &str) {
        if name == HeaderName::CONTENT_TYPE {
            match ContentType::parse(value.as_bytes()) {
                Some(content_type) => *self.content_type_mut() = content_type,
                None => log::debug!("ignoring invalid content type {:?}", value),
            }
        }
        self.headers_mut().apply(op, name, value, None);
    }

    /// Replaces the content type and rewrites the `Content-Type` header.
    pub fn set_content_type(&mut self, content_type: ContentType) {
        let value = content_type.to_string();
        *self.content_type_mut() = content_type;
        self.headers_mut()
            .set(HeaderName::CONTENT_TYPE, Some(&value), None);
    }

    pub fn remove_header(&mut self, name: &HeaderName) -> bool {
        if name == &HeaderName::CONTENT_TYPE {
            *self.content_type_mut() = match self {
                Self::Part(_) => ContentType::default(),
                Self::Multipart(_) => ContentType::new("multipart", "mixed"),
            };
        }
        self.headers_mut().remove(name)
    }

    pub fn reset_offsets(&mut self) {
        self.headers_mut().reset_offsets();
    }

    /// Writes what follows the part's header block. Multipart children are
    /// written with their own headers between boundary lines.
    pub fn write_content<W: Write>(&self, writer: &mut W, options: &HeaderOptions) -> Result<usize> {
        match self {
            Self::Part(p) => {
                writer.write_all(&p.body)?;
                Ok(p.body.len())
            }
            Self::Multipart(m) => {
                let newline = options.line_ending.as_str();
                let mut written = 0;
                let boundary = m.boundary();
                for child in &m.children {
                    let child = child.borrow();
                    let delimiter = format!("--{}{}", boundary, newline);
                    writer.write_all(delimiter.as_bytes())?;
                    written += delimiter.len();
                    written += child.headers().write_to(writer, options)?;
                    writer.write_all(newline.as_bytes())?;
                    written += newline.len();
                    written += child.write_content(writer, options)?;
                    writer.write_all(newline.as_bytes())?;
                    written += newline.len();
                }
                let close = format!("--{}--{}", boundary, newline);
                writer.write_all(close.as_bytes())?;
                Ok(written + close.len())
            }
        }
    }
}

/// Calls `f` on `part` and then on every part below it, depth first.
pub fn foreach(part: &MimePartRef, f: &mut dyn FnMut(&MimePartRef)) {
    f(part);
    let children = part.borrow().children().to_vec();
    for child in &children {
        foreach(child, f);
    }
}

/// Best-effort guess of the part holding a message's main text.
///
/// Encrypted and alternative multiparts are returned as a whole. Of a signed
/// multipart only the signed content is considered. Otherwise the first
/// textual leaf is returned, depth first.
pub fn guess_body(part: &MimePartRef) -> Option<MimePartRef> {
    let children = {
        let object = part.borrow();
        match &*object {
            MimeObject::Part(p) => return p.content_type.is_text().then(|| part.clone()),
            MimeObject::Multipart(m) => match m.content_type.multipart_type() {
                Some(MultipartType::Encrypted | MultipartType::Alternative) => {
                    return Some(part.clone())
                }
                Some(MultipartType::Signed) => m.children.iter().take(1).cloned().collect(),
                _ => m.children.clone(),
            },
        }
    };
    children.iter().find_map(guess_body)
}
