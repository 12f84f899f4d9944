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

//! Ordered list of header fields with case-insensitive lookup by
//! [`HeaderName`].
//!
//! A name may occur any number of times. Lookups by name return the first
//! occurrence in list order, and serialization walks the list in order.

pub mod fold;
pub mod names;
#[cfg(test)]
mod tests;

use std::{
    collections::{HashMap, VecDeque},
    convert::TryInto,
    io::Write,
};

pub use fold::HeaderKind;
use indexmap::IndexMap;
pub use names::{HeaderName, InvalidHeaderName};

use crate::{
    conf::{HeaderOptions, LineEnding},
    error::Result,
};

type EntryId = u64;

/// A single header field.
///
/// An entry without a value is a placeholder: it holds a position in the
/// list for a header that has not been given a value yet, and is skipped by
/// lookups and serialization.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HeaderEntry {
    name: HeaderName,
    value: Option<String>,
    raw_value: Option<Vec<u8>>,
    offset: Option<u64>,
}

impl HeaderEntry {
    pub fn new(name: HeaderName, value: String) -> Self {
        Self {
            name,
            value: Some(value),
            raw_value: None,
            offset: None,
        }
    }

    pub fn placeholder(name: HeaderName) -> Self {
        Self {
            name,
            value: None,
            raw_value: None,
            offset: None,
        }
    }

    /// An entry read from a message. `raw_value` is everything after the
    /// colon, folds included, and is written back verbatim until the entry
    /// is modified.
    pub fn from_raw(name: HeaderName, raw_value: &[u8], offset: Option<u64>) -> Self {
        Self {
            name,
            value: Some(crate::email::parser::headers::unfold(raw_value)),
            raw_value: Some(raw_value.to_vec()),
            offset,
        }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn raw_value(&self) -> Option<&[u8]> {
        self.raw_value.as_deref()
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn is_placeholder(&self) -> bool {
        self.value.is_none()
    }

    /// Replaces the value. The entry is folded anew when written.
    pub fn set_value(&mut self, new_val: String) {
        self.value = Some(new_val);
        self.raw_value = None;
    }

    pub fn set_offset(&mut self, new_val: Option<u64>) {
        self.offset = new_val;
    }

    /// Writes the entry, including the final line break, and returns the
    /// number of bytes written. A raw value is written back byte for byte.
    /// Placeholders write nothing.
    pub fn write_field<W: Write>(&self, writer: &mut W, options: &HeaderOptions) -> Result<usize> {
        let newline = options.line_ending.as_str();
        match (&self.value, &self.raw_value) {
            (None, _) => Ok(0),
            (Some(_), Some(raw)) => {
                let name = self.name.as_str();
                writer.write_all(name.as_bytes())?;
                writer.write_all(b":")?;
                writer.write_all(raw)?;
                writer.write_all(newline.as_bytes())?;
                Ok(name.len() + 1 + raw.len() + newline.len())
            }
            (Some(value), None) => {
                let mut field = HeaderKind::of(&self.name).format(&self.name, value, options);
                if options.line_ending == LineEnding::CrLf {
                    field = field.replace('\n', newline);
                }
                writer.write_all(field.as_bytes())?;
                Ok(field.len())
            }
        }
    }

    /// The entry as [`write_field`](Self::write_field) writes it. 8-bit raw
    /// bytes that are not UTF-8 are replaced.
    pub fn to_field(&self, options: &HeaderOptions) -> String {
        let mut ret = vec![];
        // Writing into a vector does not fail.
        let _ = self.write_field(&mut ret, options);
        match String::from_utf8(ret) {
            Ok(field) => field,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }
}

/// How a header mutation places its value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeaderOp {
    Prepend,
    Append,
    Set,
}

/// Ordered list of header fields.
///
/// Can be looked up by:
///
/// - `usize` position with [`HeaderList::get_at`],
/// - `&str`, `&[u8]` or [`HeaderName`] with [`HeaderList::get`]. Invalid
///   names are never found.
#[derive(Clone, Debug, Default)]
pub struct HeaderList {
    order: VecDeque<EntryId>,
    store: HashMap<EntryId, HeaderEntry>,
    index: IndexMap<HeaderName, VecDeque<EntryId>>,
    next_id: EntryId,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, entry: HeaderEntry) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;
        self.store.insert(id, entry);
        id
    }

    fn first_placeholder(&self, name: &HeaderName) -> Option<EntryId> {
        self.index
            .get(name)?
            .iter()
            .copied()
            .find(|id| self.store.get(id).map_or(false, HeaderEntry::is_placeholder))
    }

    fn fill_placeholder(&mut self, name: &HeaderName, value: &str, offset: Option<u64>) -> bool {
        let Some(id) = self.first_placeholder(name) else {
            return false;
        };
        if let Some(entry) = self.store.get_mut(&id) {
            entry.set_value(value.to_string());
            entry.offset = offset;
        }
        true
    }

    pub fn append_entry(&mut self, entry: HeaderEntry) {
        let name = entry.name.clone();
        let id = self.alloc(entry);
        self.order.push_back(id);
        self.index.entry(name).or_default().push_back(id);
    }

    pub fn prepend_entry(&mut self, entry: HeaderEntry) {
        let name = entry.name.clone();
        let id = self.alloc(entry);
        self.order.push_front(id);
        self.index.entry(name).or_default().push_front(id);
    }

    /// Adds a field at the end of the list. If a placeholder of the same name
    /// was reserved, it receives the value instead, keeping its position.
    pub fn append(&mut self, name: HeaderName, value: &str, offset: Option<u64>) {
        if self.fill_placeholder(&name, value, offset) {
            return;
        }
        let mut entry = HeaderEntry::new(name, value.to_string());
        entry.offset = offset;
        self.append_entry(entry);
    }

    /// Adds a field at the start of the list. If a placeholder of the same
    /// name was reserved, it receives the value instead, keeping its
    /// position.
    pub fn prepend(&mut self, name: HeaderName, value: &str, offset: Option<u64>) {
        if self.fill_placeholder(&name, value, offset) {
            return;
        }
        let mut entry = HeaderEntry::new(name, value.to_string());
        entry.offset = offset;
        self.prepend_entry(entry);
    }

    /// Sets the value of the first field named `name` in place and removes
    /// every other field of that name. The field is appended if there was
    /// none. The existing offset is kept when `offset` is `None`.
    ///
    /// A `None` value removes all fields named `name`.
    pub fn set(&mut self, name: HeaderName, value: Option<&str>, offset: Option<u64>) {
        let Some(value) = value else {
            self.remove(&name);
            return;
        };
        let Some(ids) = self.index.get_mut(&name) else {
            self.append(name, value, offset);
            return;
        };
        let Some(first) = ids.pop_front() else {
            self.index.shift_remove(&name);
            self.append(name, value, offset);
            return;
        };
        let rest = std::mem::replace(ids, VecDeque::from([first]));
        if let Some(entry) = self.store.get_mut(&first) {
            entry.set_value(value.to_string());
            if offset.is_some() {
                entry.offset = offset;
            }
        }
        if !rest.is_empty() {
            for id in &rest {
                self.store.remove(id);
            }
            self.order.retain(|id| !rest.contains(id));
        }
    }

    pub fn apply(&mut self, op: HeaderOp, name: HeaderName, value: &str, offset: Option<u64>) {
        match op {
            HeaderOp::Prepend => self.prepend(name, value, offset),
            HeaderOp::Append => self.append(name, value, offset),
            HeaderOp::Set => self.set(name, Some(value), offset),
        }
    }

    /// Removes every field named `name`. Returns whether there was any.
    pub fn remove<T: TryInto<HeaderName>>(&mut self, name: T) -> bool {
        let Ok(name) = name.try_into() else {
            return false;
        };
        let Some(ids) = self.index.shift_remove(&name) else {
            return false;
        };
        for id in &ids {
            self.store.remove(id);
        }
        self.order.retain(|id| !ids.contains(id));
        !ids.is_empty()
    }

    /// Removes the field at position `index`. Returns `false` if out of
    /// range.
    pub fn remove_at(&mut self, index: usize) -> bool {
        let Some(id) = self.order.remove(index) else {
            return false;
        };
        let Some(entry) = self.store.remove(&id) else {
            return true;
        };
        if let Some(ids) = self.index.get_mut(&entry.name) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.index.shift_remove(&entry.name);
            }
        }
        true
    }

    /// The value of the first field named `name` that is not a placeholder.
    pub fn get<T: TryInto<HeaderName>>(&self, name: T) -> Option<&str> {
        self.get_entry(name)?.value()
    }

    pub fn get_entry<T: TryInto<HeaderName>>(&self, name: T) -> Option<&HeaderEntry> {
        let name = name.try_into().ok()?;
        self.index
            .get(&name)?
            .iter()
            .filter_map(|id| self.store.get(id))
            .find(|entry| !entry.is_placeholder())
    }

    /// All values of fields named `name`, in list order.
    pub fn get_all<T: TryInto<HeaderName>>(&self, name: T) -> Vec<&str> {
        let Ok(name) = name.try_into() else {
            return vec![];
        };
        self.index
            .get(&name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.store.get(id)?.value())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_at(&self, index: usize) -> Option<&HeaderEntry> {
        self.store.get(self.order.get(index)?)
    }

    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut HeaderEntry> {
        let id = self.order.get(index)?;
        self.store.get_mut(id)
    }

    /// Whether a field named `name` has a value.
    pub fn contains<T: TryInto<HeaderName>>(&self, name: T) -> bool {
        self.get_entry(name).is_some()
    }

    /// Number of fields named `name`, placeholders included.
    pub fn count<T: TryInto<HeaderName>>(&self, name: T) -> usize {
        name.try_into()
            .ok()
            .and_then(|name| self.index.get(&name).map(VecDeque::len))
            .unwrap_or(0)
    }

    /// Number of fields, placeholders included.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> + '_ {
        self.order.iter().filter_map(|id| self.store.get(id))
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.store.clear();
        self.index.clear();
    }

    /// Reserves a position for `name` at the end of the list, unless a field
    /// of that name already exists.
    pub fn reserve(&mut self, name: HeaderName) {
        if self.index.contains_key(&name) {
            return;
        }
        self.append_entry(HeaderEntry::placeholder(name));
    }

    /// Forgets the source positions of all fields.
    pub fn reset_offsets(&mut self) {
        for entry in self.store.values_mut() {
            entry.offset = None;
        }
    }

    /// Writes every field that has a value, in order. Returns the number of
    /// bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W, options: &HeaderOptions) -> Result<usize> {
        let mut written = 0;
        for entry in self.iter() {
            written += entry.write_field(writer, options)?;
        }
        Ok(written)
    }

    pub fn to_string_with(&self, options: &HeaderOptions) -> String {
        self.iter().map(|entry| entry.to_field(options)).collect()
    }
}

impl std::fmt::Display for HeaderList {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_string_with(&HeaderOptions::default()))
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a HeaderEntry;
    type IntoIter = Box<dyn Iterator<Item = &'a HeaderEntry> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
