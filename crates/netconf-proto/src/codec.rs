// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Codec to read NETCONF in accordance with [RFC 6242](https://datatracker.ietf.org/doc/html/rfc6242).
//!
//! The `<hello>` exchange always uses the end-of-message marker. Afterward,
//! the chunked framing is used if the peer announced `base:1.1`, otherwise
//! the codec stays with the end-of-message framing of NETCONF 1.0.

use crate::{
    capabilities::{Capability, NetconfVersion},
    protocol::{Hello, NetConfMessage},
    xml_utils::{ParsingError, XmlDeserialize, XmlParser, XmlSerialize, XmlWriter},
};
use quick_xml::NsReader;
use tokio_util::{
    bytes::{Buf, BytesMut},
    codec::{Decoder, Encoder},
};

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const EOM_TERMINATOR: &str = "]]>]]>";
const CHUNK_START: &str = "\n#";
const MESSAGE_TERMINATOR: &str = "\n##\n";

/// Maximum chunk size as per RFC 6242
const MAX_CHUNK_SIZE: usize = 4294967295;

/// Maximum length of chunk size in characters
const MAX_CHUNK_SIZE_LEN: usize = 10;

/// Message framing in use on the session
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum Framing {
    /// NETCONF 1.0 `]]>]]>` delimited messages
    #[strum(to_string = "end-of-message")]
    EndOfMessage,
    /// NETCONF 1.1 chunked framing
    #[strum(to_string = "chunked")]
    Chunked,
}

/// SshCodec is a codec for encoding and decoding NETCONF messages over SSH as
/// per [RFC 6242](https://datatracker.ietf.org/doc/html/rfc6242).
#[derive(Debug)]
pub struct SshCodec {
    in_hello: bool,
    framing: Framing,
    buf: BytesMut,
}

impl SshCodec {
    pub fn new() -> Self {
        Self {
            in_hello: true,
            framing: Framing::EndOfMessage,
            buf: BytesMut::new(),
        }
    }

    pub const fn framing(&self) -> Framing {
        self.framing
    }

    /// Force the framing, used when the hello exchange is handled elsewhere
    pub fn set_framing(&mut self, framing: Framing) {
        self.in_hello = false;
        self.framing = framing;
    }
}

impl Default for SshCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, strum_macros::Display)]
pub enum SshCodecError {
    #[strum(to_string = "std::io:Error: `{0}`")]
    IO(std::io::Error),

    #[strum(to_string = "UTF decoding error: `{0}`")]
    Utf(std::str::Utf8Error),

    #[strum(to_string = "Integer decoding error: `{0}`")]
    Int(std::num::ParseIntError),

    #[strum(to_string = "NETCONF XML parsing error: `{0}`")]
    Parsing(ParsingError),

    #[strum(to_string = "XML encoding error: `{0}`")]
    Serialization(quick_xml::Error),

    #[strum(to_string = "Invalid NETCONF framing: {0}")]
    InvalidFraming(String),
}

impl From<std::io::Error> for SshCodecError {
    fn from(err: std::io::Error) -> SshCodecError {
        SshCodecError::IO(err)
    }
}

impl std::error::Error for SshCodecError {}

impl From<std::str::Utf8Error> for SshCodecError {
    fn from(value: std::str::Utf8Error) -> Self {
        Self::Utf(value)
    }
}

impl From<std::num::ParseIntError> for SshCodecError {
    fn from(value: std::num::ParseIntError) -> Self {
        Self::Int(value)
    }
}

impl From<ParsingError> for SshCodecError {
    fn from(value: ParsingError) -> Self {
        Self::Parsing(value)
    }
}

impl From<quick_xml::Error> for SshCodecError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Serialization(value)
    }
}

impl PartialEq for SshCodecError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::IO(_), Self::IO(_)) => true,
            (Self::Utf(v1), Self::Utf(v2)) => v1.eq(v2),
            (Self::Int(v1), Self::Int(v2)) => v1.eq(v2),
            (Self::Parsing(v1), Self::Parsing(v2)) => v1.eq(v2),
            (Self::InvalidFraming(v1), Self::InvalidFraming(v2)) => v1.eq(v2),
            _ => false,
        }
    }
}

fn parse_message(data: &[u8]) -> Result<NetConfMessage, SshCodecError> {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!("Parsing netconf message: `{:?}`", std::str::from_utf8(data));
    }
    let reader = NsReader::from_reader(data);
    let mut xml_parser = XmlParser::new(reader)?;
    Ok(NetConfMessage::xml_deserialize(&mut xml_parser)?)
}

impl SshCodec {
    fn decode_hello(&mut self, src: &mut BytesMut) -> Result<Option<Hello>, SshCodecError> {
        let pos = match find(src, EOM_TERMINATOR.as_bytes()) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        let data = src.split_to(pos + EOM_TERMINATOR.len());
        let data = &data[..pos];
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("Parsing hello message: `{:?}`", std::str::from_utf8(data));
        }
        let reader = NsReader::from_reader(data);
        let mut xml_parser = XmlParser::new(reader)?;
        let hello = Hello::xml_deserialize(&mut xml_parser)?;
        self.in_hello = false;
        self.framing = if hello
            .capabilities()
            .contains(&Capability::NetconfBase(NetconfVersion::V1_1))
        {
            Framing::Chunked
        } else {
            Framing::EndOfMessage
        };
        tracing::debug!("NETCONF hello received, using {} framing", self.framing);
        Ok(Some(hello))
    }

    fn decode_end_of_message(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<NetConfMessage>, SshCodecError> {
        let pos = match find(src, EOM_TERMINATOR.as_bytes()) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        let data = src.split_to(pos + EOM_TERMINATOR.len());
        parse_message(&data[..pos]).map(Some)
    }

    fn decode_chunked(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<NetConfMessage>, SshCodecError> {
        loop {
            // Shortest valid header is either "\n##\n" or "\n#N\n"
            if src.len() < MESSAGE_TERMINATOR.len() {
                return Ok(None);
            }
            if !src.starts_with(CHUNK_START.as_bytes()) {
                return Err(SshCodecError::InvalidFraming(
                    "expected chunk start sequence or message terminator".to_string(),
                ));
            }
            if src[CHUNK_START.len()] == b'#' {
                if src[CHUNK_START.len() + 1] != b'\n' {
                    return Err(SshCodecError::InvalidFraming(
                        "message terminator is not followed by a newline".to_string(),
                    ));
                }
                src.advance(MESSAGE_TERMINATOR.len());
                if self.buf.is_empty() {
                    return Err(SshCodecError::InvalidFraming(
                        "message terminator without any chunk".to_string(),
                    ));
                }
                let data = self.buf.split();
                return parse_message(&data).map(Some);
            }

            let size_start = CHUNK_START.len();
            let search_end = src.len().min(size_start + MAX_CHUNK_SIZE_LEN + 1);
            let size_end = match src[size_start..search_end].iter().position(|&b| b == b'\n') {
                Some(pos) => size_start + pos,
                None if search_end < size_start + MAX_CHUNK_SIZE_LEN + 1 => return Ok(None),
                None => {
                    return Err(SshCodecError::InvalidFraming(
                        "chunk size is not properly terminated with a newline".to_string(),
                    ))
                }
            };
            let chunk_size_slice = &src[size_start..size_end];
            // chunk-size = [1-9][0-9]*
            if chunk_size_slice.is_empty()
                || chunk_size_slice[0] == b'0'
                || !chunk_size_slice.iter().all(u8::is_ascii_digit)
            {
                return Err(SshCodecError::InvalidFraming(format!(
                    "invalid chunk size `{}`",
                    String::from_utf8_lossy(chunk_size_slice)
                )));
            }
            let chunk_size = std::str::from_utf8(chunk_size_slice)?.parse::<usize>()?;
            if chunk_size > MAX_CHUNK_SIZE {
                return Err(SshCodecError::InvalidFraming(format!(
                    "chunk size {chunk_size} is larger than {MAX_CHUNK_SIZE}"
                )));
            }

            let chunk_start_pos = size_end + 1;
            if src.len() < chunk_start_pos + chunk_size {
                return Ok(None);
            }
            self.buf
                .extend_from_slice(&src[chunk_start_pos..chunk_start_pos + chunk_size]);
            src.advance(chunk_start_pos + chunk_size);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl Decoder for SshCodec {
    type Item = NetConfMessage;
    type Error = SshCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.in_hello {
            return Ok(self.decode_hello(src)?.map(NetConfMessage::Hello));
        }
        match self.framing {
            Framing::EndOfMessage => self.decode_end_of_message(src),
            Framing::Chunked => self.decode_chunked(src),
        }
    }
}

impl Encoder<NetConfMessage> for SshCodec {
    type Error = SshCodecError;
    fn encode(&mut self, item: NetConfMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let writer = quick_xml::writer::Writer::new(std::io::Cursor::new(Vec::new()));
        let mut xml_writer = XmlWriter::new(writer);
        item.xml_serialize(&mut xml_writer)?;
        let buf = xml_writer.into_inner().into_inner();
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("Serialized payload: `{}`", std::str::from_utf8(&buf)?);
        }
        let framing = if matches!(item, NetConfMessage::Hello(_)) {
            Framing::EndOfMessage
        } else {
            self.framing
        };
        match framing {
            Framing::EndOfMessage => {
                dst.extend_from_slice(XML_HEADER.as_bytes());
                dst.extend_from_slice(&buf);
                dst.extend_from_slice(EOM_TERMINATOR.as_bytes());
            }
            Framing::Chunked => {
                let size = buf.len();
                dst.extend_from_slice(format!("{CHUNK_START}{size}\n").as_bytes());
                dst.extend_from_slice(&buf);
                dst.extend_from_slice(MESSAGE_TERMINATOR.as_bytes());
            }
        }
        Ok(())
    }
}
