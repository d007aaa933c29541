// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pull-parser and writer helpers on top of `quick-xml` used by the NETCONF
//! message model.

use crate::NETCONF_NS_STR;
use quick_xml::{
    events::{BytesStart, BytesText, Event},
    name::{Namespace, ResolveResult},
    reader::NsReader,
};
use std::{fmt, io};

/// Serialize a Rust value into an XML event stream
pub trait XmlSerialize {
    fn xml_serialize<T: io::Write>(&self, xml: &mut XmlWriter<T>) -> Result<(), quick_xml::Error>;
}

/// Build a Rust value from the events of an [XmlParser]
pub trait XmlDeserialize<T: Sized> {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<T, ParsingError>;
}

/// Thin wrapper around [quick_xml::Writer] that attaches a default
/// namespace declaration to the next element it creates.
pub struct XmlWriter<T: io::Write> {
    inner: quick_xml::writer::Writer<T>,
    pending_namespace: Option<&'static str>,
}

impl<T: io::Write> XmlWriter<T> {
    /// Writer whose first element declares the NETCONF base namespace
    pub fn new(inner: quick_xml::writer::Writer<T>) -> Self {
        Self::with_default_namespace(inner, NETCONF_NS_STR)
    }

    pub const fn with_default_namespace(
        inner: quick_xml::writer::Writer<T>,
        namespace: &'static str,
    ) -> Self {
        Self {
            inner,
            pending_namespace: Some(namespace),
        }
    }

    pub fn create_element(&mut self, name: &'static str) -> BytesStart<'static> {
        let mut start = BytesStart::new(name);
        if let Some(namespace) = self.pending_namespace.take() {
            start.push_attribute(("xmlns", namespace));
        }
        start
    }

    /// Write `<name>text</name>`, escaping the text
    pub fn write_text_element(
        &mut self,
        name: &'static str,
        text: &str,
    ) -> Result<(), quick_xml::Error> {
        let start = self.create_element(name);
        let end = start.to_end().into_owned();
        self.write_event(Event::Start(start))?;
        self.write_event(Event::Text(BytesText::new(text)))?;
        self.write_event(Event::End(end))?;
        Ok(())
    }

    pub fn write_event<'a, E: Into<Event<'a>>>(&mut self, event: E) -> io::Result<()> {
        self.inner.write_event(event.into())
    }

    /// Write an already serialized XML fragment as is
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.get_mut().write_all(buf)
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[derive(Debug, strum_macros::Display)]
pub enum ParsingError {
    #[strum(to_string = "std::io:Error: `{0}`")]
    StdIo(io::Error),

    /// The element is not the one the caller is looking for, the caller may
    /// try another alternative.
    Recoverable,

    #[strum(to_string = "expecting {expecting} but found `{found:?}`")]
    WrongToken {
        expecting: String,
        found: Event<'static>,
    },

    #[strum(to_string = "required XML attribute `{0}` is missing")]
    MissingAttribute(String),

    #[strum(to_string = "required XML element `{0}` is missing")]
    MissingElement(String),

    #[strum(to_string = "invalid value: {0}")]
    InvalidValue(String),

    #[strum(to_string = "cannot skip element: {0}")]
    SkipError(String),

    #[strum(to_string = "UTF-8 decoding error: `{0}`")]
    Utf8Error(std::str::Utf8Error),

    #[strum(to_string = "XML error: `{0}`")]
    QuickXml(quick_xml::Error),

    #[strum(to_string = "integer parsing error: `{0}`")]
    Int(std::num::ParseIntError),

    #[strum(to_string = "found EOF while expecting data")]
    Eof,

    #[strum(to_string = "XML encoding error: `{0}`")]
    EncodingError(quick_xml::encoding::EncodingError),
}

impl PartialEq for ParsingError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::StdIo(left), Self::StdIo(right)) => left.kind() == right.kind(),
            (Self::Recoverable, Self::Recoverable) => true,
            (
                Self::WrongToken {
                    expecting: left_expecting,
                    found: left_found,
                },
                Self::WrongToken {
                    expecting: right_expecting,
                    found: right_found,
                },
            ) => left_expecting == right_expecting && left_found == right_found,
            (Self::MissingAttribute(left), Self::MissingAttribute(right)) => left == right,
            (Self::MissingElement(left), Self::MissingElement(right)) => left == right,
            (Self::InvalidValue(left), Self::InvalidValue(right)) => left == right,
            (Self::SkipError(left), Self::SkipError(right)) => left == right,
            (Self::Utf8Error(left), Self::Utf8Error(right)) => left == right,
            (Self::QuickXml(left), Self::QuickXml(right)) => left.to_string() == right.to_string(),
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Eof, Self::Eof) => true,
            (Self::EncodingError(left), Self::EncodingError(right)) => left == right,
            _ => false,
        }
    }
}

impl std::error::Error for ParsingError {}

impl From<quick_xml::Error> for ParsingError {
    fn from(value: quick_xml::Error) -> Self {
        Self::QuickXml(value)
    }
}

impl From<std::str::Utf8Error> for ParsingError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl From<std::num::ParseIntError> for ParsingError {
    fn from(value: std::num::ParseIntError) -> Self {
        Self::Int(value)
    }
}

impl From<io::Error> for ParsingError {
    fn from(value: io::Error) -> Self {
        Self::StdIo(value)
    }
}

impl From<quick_xml::encoding::EncodingError> for ParsingError {
    fn from(value: quick_xml::encoding::EncodingError) -> Self {
        Self::EncodingError(value)
    }
}

/// Resolve the name of a general entity reference (`&name;`) to its text.
///
/// Covers the five predefined XML entities and numeric character references.
pub fn resolve_entity(name: &str) -> Option<String> {
    let resolved = match name {
        "quot" => "\"",
        "apos" => "'",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            return char::from_u32(code).map(String::from);
        }
    };
    Some(resolved.to_string())
}

/// Add the `declarations` that `start` does not override
fn carry_declarations(
    start: &BytesStart<'_>,
    declarations: &[(Vec<u8>, Vec<u8>)],
) -> BytesStart<'static> {
    let mut start = start.clone().into_owned();
    let declared: Vec<Vec<u8>> = start
        .attributes()
        .flatten()
        .map(|attr| attr.key.as_ref().to_vec())
        .collect();
    for (key, value) in declarations {
        if !declared.contains(key) {
            start.push_attribute((key.as_slice(), value.as_slice()));
        }
    }
    start
}

/// Pull parser with one event of look-ahead that keeps track of the
/// elements opened by the caller.
pub struct XmlParser<R: Sized> {
    ns_reader: NsReader<R>,
    current: Event<'static>,
    parents: Vec<Event<'static>>,
    buf: Vec<u8>,
}

impl<R: io::BufRead> XmlParser<R> {
    pub fn new(mut ns_reader: NsReader<R>) -> Result<Self, ParsingError> {
        let mut buf = Vec::new();
        let current = ns_reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();
        Ok(Self {
            ns_reader,
            current,
            parents: Vec::new(),
            buf,
        })
    }

    pub const fn ns_reader(&self) -> &NsReader<R> {
        &self.ns_reader
    }

    /// Advance by one event, returning the event that was under the cursor
    pub fn next_event(&mut self) -> Result<Event<'static>, ParsingError> {
        self.buf.clear();
        let event = self.ns_reader.read_event_into(&mut self.buf)?.into_owned();
        Ok(std::mem::replace(&mut self.current, event))
    }

    pub const fn peek(&self) -> &Event<'static> {
        &self.current
    }

    /// Skip the element (with all of its content) or the single event under
    /// the cursor.
    pub fn skip(&mut self) -> Result<Event<'static>, ParsingError> {
        match &self.current {
            Event::Start(start) => {
                let end = start.to_end().into_owned();
                self.buf.clear();
                self.ns_reader.read_to_end_into(end.name(), &mut self.buf)?;
                self.next_event()
            }
            Event::End(end) => Err(ParsingError::SkipError(format!(
                "call close() to close </{}>",
                std::str::from_utf8(end.local_name().into_inner())?
            ))),
            Event::Eof => Err(ParsingError::Eof),
            _ => self.next_event(),
        }
    }

    /// Skip text, comments and processing instructions
    pub fn skip_text(&mut self) -> Result<(), ParsingError> {
        while matches!(
            self.peek(),
            Event::Text(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)
        ) {
            self.next_event()?;
        }
        Ok(())
    }

    /// Skip the XML declaration and any whitespace in front of the root
    pub fn skip_prolog(&mut self) -> Result<(), ParsingError> {
        loop {
            match self.peek() {
                Event::Decl(_) | Event::Text(_) | Event::Comment(_) | Event::PI(_) => {
                    self.next_event()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Check if the element under the cursor is `{ns}key`
    pub fn is_tag(&self, ns: Option<Namespace<'_>>, key: &str) -> bool {
        let qname = match self.peek() {
            Event::Start(start) | Event::Empty(start) => start.name(),
            Event::End(end) => end.name(),
            _ => return false,
        };
        let (resolved, local) = self.ns_reader.resolve_element(qname);
        if local.into_inner() != key.as_bytes() {
            return false;
        }
        match ns {
            Some(ns) => resolved == ResolveResult::Bound(ns),
            None => resolved == ResolveResult::Unbound,
        }
    }

    /// Open the element `{ns}key` under the cursor, fails with
    /// [ParsingError::WrongToken] if another event is found.
    pub fn open(
        &mut self,
        ns: Option<Namespace<'_>>,
        key: &str,
    ) -> Result<BytesStart<'static>, ParsingError> {
        let event = match self.peek() {
            // An empty element has no content to consume, the cursor stays on
            // it until close() is called.
            Event::Empty(_) if self.is_tag(ns, key) => self.current.clone(),
            Event::Start(_) if self.is_tag(ns, key) => self.next_event()?,
            found => {
                return Err(ParsingError::WrongToken {
                    expecting: format!("<{key}>"),
                    found: found.clone(),
                });
            }
        };
        let start = match &event {
            Event::Start(start) | Event::Empty(start) => start.clone(),
            _ => unreachable!("only start and empty events are opened"),
        };
        self.parents.push(event);
        Ok(start)
    }

    /// Open `{ns}key` if it is the next element, otherwise leave the cursor
    /// untouched and return `None`.
    pub fn maybe_open(
        &mut self,
        ns: Option<Namespace<'_>>,
        key: &str,
    ) -> Result<Option<BytesStart<'static>>, ParsingError> {
        self.skip_text()?;
        match self.open(ns, key) {
            Ok(start) => Ok(Some(start)),
            Err(ParsingError::Recoverable) | Err(ParsingError::WrongToken { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// `true` if the last opened element has content (it is not `<x/>`)
    #[inline]
    pub fn parent_has_child(&self) -> bool {
        matches!(self.parents.last(), Some(Event::Start(_)) | None)
    }

    /// Read the text content of the opened element, resolving entity and
    /// character references and CDATA sections.
    pub fn tag_string(&mut self) -> Result<Box<str>, ParsingError> {
        if !self.parent_has_child() {
            return Err(ParsingError::Recoverable);
        }
        let mut text = String::new();
        loop {
            match self.peek() {
                Event::Text(escaped) => {
                    text.push_str(escaped.decode()?.as_ref());
                }
                Event::CData(cdata) => {
                    text.push_str(cdata.decode()?.as_ref());
                }
                Event::GeneralRef(reference) => {
                    let name = reference.decode()?;
                    match resolve_entity(name.as_ref()) {
                        Some(resolved) => text.push_str(&resolved),
                        None => {
                            return Err(ParsingError::InvalidValue(format!(
                                "unknown entity reference `&{name};`"
                            )))
                        }
                    }
                }
                Event::End(_) | Event::Start(_) | Event::Empty(_) | Event::Eof => {
                    if text.is_empty() {
                        return Err(ParsingError::WrongToken {
                            expecting: "text".to_string(),
                            found: self.peek().clone(),
                        });
                    }
                    return Ok(text.into());
                }
                _ => {}
            }
            self.next_event()?;
        }
    }

    /// Like [XmlParser::tag_string] but an element without text yields an
    /// empty string.
    pub fn tag_string_or_empty(&mut self) -> Result<Box<str>, ParsingError> {
        match self.tag_string() {
            Ok(text) => Ok(text),
            Err(ParsingError::Recoverable) => Ok("".into()),
            Err(ParsingError::WrongToken {
                found: Event::End(_),
                ..
            }) => Ok("".into()),
            Err(err) => Err(err),
        }
    }

    /// Close the last opened element, skipping any content left in it
    pub fn close(&mut self) -> Result<Event<'static>, ParsingError> {
        if !self.parent_has_child() {
            self.parents.pop();
            return self.next_event();
        }
        loop {
            match self.peek() {
                Event::End(_) => {
                    self.parents.pop();
                    return self.next_event();
                }
                Event::Eof => return Err(ParsingError::Eof),
                _ => {
                    self.skip()?;
                }
            }
        }
    }

    /// Namespace declarations (`xmlns` and `xmlns:prefix` attributes) in
    /// scope of the opened elements, innermost declaration wins.
    fn namespaces_in_scope(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut declarations: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        for parent in &self.parents {
            let start = match parent {
                Event::Start(start) | Event::Empty(start) => start,
                _ => continue,
            };
            for attr in start.attributes().flatten() {
                let key = attr.key.as_ref();
                if key != b"xmlns" && !key.starts_with(b"xmlns:") {
                    continue;
                }
                let value = attr.value.to_vec();
                match declarations.iter_mut().find(|(k, _)| k.as_slice() == key) {
                    Some(existing) => existing.1 = value,
                    None => declarations.push((key.to_vec(), value)),
                }
            }
        }
        declarations
    }

    /// Copy the raw content of the opened element up to its closing tag
    /// `tag`, leaving the cursor on that closing tag.
    ///
    /// Namespace declarations in scope of the opened element are copied onto
    /// each top-level element of the fragment, so the fragment can be parsed
    /// on its own.
    pub fn inner_xml(&mut self, tag: &[u8]) -> Result<Box<str>, ParsingError> {
        let declarations = self.namespaces_in_scope();
        let mut writer = quick_xml::writer::Writer::new(io::Cursor::new(Vec::new()));
        let mut depth = 0usize;
        loop {
            match &self.current {
                Event::Eof => return Err(ParsingError::Eof),
                Event::End(end) if depth == 0 => {
                    if end.local_name().into_inner() == tag {
                        break;
                    }
                    return Err(ParsingError::WrongToken {
                        expecting: format!("</{}>", String::from_utf8_lossy(tag)),
                        found: self.current.clone(),
                    });
                }
                Event::End(_) => {
                    depth -= 1;
                    writer.write_event(self.current.clone())?;
                }
                Event::Start(start) | Event::Empty(start) if depth == 0 => {
                    let start = carry_declarations(start, &declarations);
                    if matches!(self.current, Event::Start(_)) {
                        depth += 1;
                        writer.write_event(Event::Start(start))?;
                    } else {
                        writer.write_event(Event::Empty(start))?;
                    }
                }
                Event::Start(_) => {
                    depth += 1;
                    writer.write_event(self.current.clone())?;
                }
                _ => {
                    writer.write_event(self.current.clone())?;
                }
            }
            self.next_event()?;
        }
        let copied = String::from_utf8(writer.into_inner().into_inner())
            .map_err(|err| ParsingError::Utf8Error(err.utf8_error()))?;
        Ok(copied.into())
    }

    /// Copy the element under the cursor with all of its content, leaving
    /// the cursor after its closing tag.
    ///
    /// Namespace declarations in scope are copied onto the element, as in
    /// [XmlParser::inner_xml].
    pub fn element_xml(&mut self) -> Result<Box<str>, ParsingError> {
        let declarations = self.namespaces_in_scope();
        let mut writer = quick_xml::writer::Writer::new(io::Cursor::new(Vec::new()));
        match &self.current {
            Event::Empty(start) => {
                writer.write_event(Event::Empty(carry_declarations(start, &declarations)))?;
            }
            Event::Start(start) => {
                writer.write_event(Event::Start(carry_declarations(start, &declarations)))?;
                self.next_event()?;
                let mut depth = 1usize;
                loop {
                    match &self.current {
                        Event::Eof => return Err(ParsingError::Eof),
                        Event::Start(_) => depth += 1,
                        Event::End(_) => depth -= 1,
                        _ => {}
                    }
                    writer.write_event(self.current.clone())?;
                    if depth == 0 {
                        break;
                    }
                    self.next_event()?;
                }
            }
            other => {
                return Err(ParsingError::WrongToken {
                    expecting: "element".to_string(),
                    found: other.clone(),
                })
            }
        }
        self.next_event()?;
        let copied = String::from_utf8(writer.into_inner().into_inner())
            .map_err(|err| ParsingError::Utf8Error(err.utf8_error()))?;
        Ok(copied.into())
    }

    /// Deserialize every `{ns}tag` element of the opened element, stopping
    /// at the first element with another name.
    pub fn collect_xml_sequence_with_tag<N: XmlDeserialize<N> + fmt::Debug>(
        &mut self,
        ns: Option<Namespace<'_>>,
        tag: &str,
    ) -> Result<Vec<N>, ParsingError> {
        let mut collected = Vec::new();
        if !self.parent_has_child() {
            return Ok(collected);
        }
        loop {
            self.skip_text()?;
            if !self.is_tag(ns, tag) || matches!(self.peek(), Event::End(_)) {
                return Ok(collected);
            }
            collected.push(N::xml_deserialize(self)?);
        }
    }

    /// Deserialize all the children of the opened element, skipping children
    /// that `N` does not recognize.
    pub fn collect_xml_sequence<N: XmlDeserialize<N> + fmt::Debug>(
        &mut self,
    ) -> Result<Vec<N>, ParsingError> {
        let mut collected = Vec::new();
        if !self.parent_has_child() {
            return Ok(collected);
        }
        loop {
            self.skip_text()?;
            if matches!(self.peek(), Event::End(_) | Event::Eof) {
                return Ok(collected);
            }
            match N::xml_deserialize(self) {
                Ok(value) => collected.push(value),
                Err(ParsingError::WrongToken { .. }) | Err(ParsingError::Recoverable) => {
                    self.skip()?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
