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

//! NETCONF messages in Rust with XML encoding and decoding capabilities.

use crate::{
    capabilities::Capability,
    xml_utils::{ParsingError, XmlDeserialize, XmlParser, XmlSerialize, XmlWriter},
    NETCONF_NS,
};
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, io, str::FromStr};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum NetConfMessage {
    Hello(Hello),
    Rpc(Rpc),
    RpcReply(RpcReply),
}

impl XmlDeserialize<NetConfMessage> for NetConfMessage {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Self, ParsingError> {
        parser.skip_prolog()?;
        let name = match parser.peek() {
            Event::Start(start) | Event::Empty(start) => start.local_name().into_inner().to_vec(),
            token => {
                return Err(ParsingError::WrongToken {
                    expecting: "<hello>, <rpc>, or <rpc-reply>".to_string(),
                    found: token.clone(),
                })
            }
        };
        match name.as_slice() {
            b"hello" => Ok(NetConfMessage::Hello(Hello::xml_deserialize(parser)?)),
            b"rpc" => Ok(NetConfMessage::Rpc(Rpc::xml_deserialize(parser)?)),
            b"rpc-reply" => Ok(NetConfMessage::RpcReply(RpcReply::xml_deserialize(parser)?)),
            other => Err(ParsingError::InvalidValue(format!(
                "unexpected NETCONF message <{}>",
                std::str::from_utf8(other)?
            ))),
        }
    }
}

impl XmlSerialize for NetConfMessage {
    fn xml_serialize<T: io::Write>(&self, xml: &mut XmlWriter<T>) -> Result<(), quick_xml::Error> {
        match self {
            NetConfMessage::Hello(hello) => hello.xml_serialize(xml),
            NetConfMessage::Rpc(rpc) => rpc.xml_serialize(xml),
            NetConfMessage::RpcReply(reply) => reply.xml_serialize(xml),
        }
    }
}

/// ```xml
///  <xs:element name="hello">
///    <xs:complexType>
///      <xs:sequence>
///        <xs:element name="capabilities">
///          <xs:complexType>
///            <xs:sequence>
///              <xs:element name="capability" type="xs:anyURI"
///                          maxOccurs="unbounded"/>
///            </xs:sequence>
///          </xs:complexType>
///        </xs:element>
///        <xs:element name="session-id" type="SessionId"
///                    minOccurs="0"/>
///      </xs:sequence>
///    </xs:complexType>
///  </xs:element>
/// ```
#[derive(PartialEq, Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename = "hello")]
pub struct Hello {
    #[serde(rename = "session-id")]
    session_id: Option<u32>,
    capabilities: HashSet<Capability>,
}

impl Hello {
    pub const fn new(session_id: Option<u32>, capabilities: HashSet<Capability>) -> Self {
        Self {
            session_id,
            capabilities,
        }
    }

    pub const fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    pub const fn capabilities(&self) -> &HashSet<Capability> {
        &self.capabilities
    }
}

impl XmlDeserialize<Hello> for Hello {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Hello, ParsingError> {
        parser.skip_prolog()?;
        parser.open(Some(NETCONF_NS), "hello")?;
        parser.skip_text()?;
        parser.open(Some(NETCONF_NS), "capabilities")?;
        let capabilities = parser.collect_xml_sequence::<Capability>()?;
        parser.close()?;
        let session_id = if parser.maybe_open(Some(NETCONF_NS), "session-id")?.is_some() {
            let value = parser.tag_string()?.trim().parse::<u32>()?;
            parser.close()?;
            Some(value)
        } else {
            None
        };
        parser.close()?;
        Ok(Hello::new(session_id, HashSet::from_iter(capabilities)))
    }
}

impl XmlSerialize for Hello {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let hello_start = writer.create_element("hello");
        let capabilities_start = writer.create_element("capabilities");
        writer.write_event(Event::Start(hello_start.clone()))?;
        writer.write_event(Event::Start(capabilities_start.clone()))?;
        for cap in &self.capabilities {
            cap.xml_serialize(writer)?;
        }
        writer.write_event(Event::End(capabilities_start.to_end()))?;
        if let Some(session_id) = self.session_id {
            writer.write_text_element("session-id", &session_id.to_string())?;
        }
        writer.write_event(Event::End(hello_start.to_end()))?;
        Ok(())
    }
}

/// Arbitrary attributes are ignored
/// ```xml
/// <xs:complexType name="rpcType">
///     <xs:sequence>
///         <xs:element ref="rpcOperation"/>
///     </xs:sequence>
///     <xs:attribute name="message-id" type="messageIdType"
///                   use="required"/>
///     <xs:anyAttribute processContents="lax"/>
/// </xs:complexType>
/// <xs:element name="rpc" type="rpcType"/>
/// ```
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Rpc {
    message_id: Box<str>,
    operation: RpcOperation,
}

impl Rpc {
    pub const fn new(message_id: Box<str>, operation: RpcOperation) -> Self {
        Self {
            message_id,
            operation,
        }
    }

    pub const fn message_id(&self) -> &str {
        &self.message_id
    }

    pub const fn operation(&self) -> &RpcOperation {
        &self.operation
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum RpcOperation {
    /// Pre-serialized operation element(s), written verbatim inside `<rpc>`
    Raw(Box<str>),
    CloseSession,
}

fn extract_attribute(start: &BytesStart<'_>, attribute_name: &[u8]) -> Option<Box<str>> {
    start
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().into_inner() == attribute_name)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned().into_boxed_str())
}

/// ```xml
/// <xs:simpleType name="messageIdType">
///     <xs:restriction base="xs:string">
///         <xs:maxLength value="4095"/>
///     </xs:restriction>
/// </xs:simpleType>
/// ```
fn extract_message_id(open: &BytesStart<'_>) -> Result<Option<Box<str>>, ParsingError> {
    let message_id = extract_attribute(open, b"message-id");
    if let Some(id) = &message_id {
        if id.len() > 4095 {
            return Err(ParsingError::InvalidValue(format!(
                "message-id length: {} is larger than max 4095",
                id.len()
            )));
        }
    }
    Ok(message_id)
}

impl XmlDeserialize<Rpc> for Rpc {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Rpc, ParsingError> {
        parser.skip_prolog()?;
        let open = parser.open(Some(NETCONF_NS), "rpc")?;
        let message_id = extract_message_id(&open)?
            .ok_or_else(|| ParsingError::MissingAttribute("message-id".to_string()))?;
        parser.skip_text()?;
        let operation = if !parser.parent_has_child() {
            RpcOperation::Raw("".into())
        } else if parser.is_tag(Some(NETCONF_NS), "close-session") {
            parser.open(Some(NETCONF_NS), "close-session")?;
            parser.close()?;
            parser.skip_text()?;
            RpcOperation::CloseSession
        } else {
            RpcOperation::Raw(parser.inner_xml(b"rpc")?)
        };
        parser.close()?;
        Ok(Rpc {
            message_id,
            operation,
        })
    }
}

impl XmlSerialize for Rpc {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let mut start = writer.create_element("rpc");
        start.push_attribute(("message-id", self.message_id.as_ref()));
        writer.write_event(Event::Start(start.clone()))?;
        match &self.operation {
            RpcOperation::Raw(operation) => {
                writer.write_all(operation.as_bytes())?;
            }
            RpcOperation::CloseSession => {
                let close = writer.create_element("close-session");
                writer.write_event(Event::Empty(close))?;
            }
        }
        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }
}

/// RPC Reply
/// ```xml
///   <xs:complexType name="rpcReplyType">
///      <xs:choice>
///        <xs:element name="ok"/>
///        <xs:sequence>
///          <xs:element ref="rpc-error"
///                      minOccurs="0" maxOccurs="unbounded"/>
///          <xs:element ref="rpcResponse"
///                      minOccurs="0" maxOccurs="unbounded"/>
///        </xs:sequence>
///      </xs:choice>
///      <xs:attribute name="message-id" type="messageIdType"
///                    use="optional"/>
///      <xs:anyAttribute processContents="lax"/>
///    </xs:complexType>
///    <xs:element name="rpc-reply" type="rpcReplyType"/>
/// ```
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcReply {
    message_id: Option<Box<str>>,
    reply: RpcReplyContent,
}

impl RpcReply {
    pub const fn new(message_id: Option<Box<str>>, reply: RpcReplyContent) -> Self {
        Self { message_id, reply }
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub const fn reply(&self) -> &RpcReplyContent {
        &self.reply
    }
}

impl XmlDeserialize<RpcReply> for RpcReply {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Self, ParsingError> {
        parser.skip_prolog()?;
        let rpc_reply = parser.open(Some(NETCONF_NS), "rpc-reply")?;
        let message_id = extract_message_id(&rpc_reply)?;
        if !parser.parent_has_child() {
            parser.close()?;
            return Ok(RpcReply {
                message_id,
                reply: RpcReplyContent::ErrorsAndData {
                    errors: vec![],
                    responses: "".into(),
                },
            });
        }
        if parser.maybe_open(Some(NETCONF_NS), "ok")?.is_some() {
            parser.close()?;
            parser.close()?;
            return Ok(RpcReply {
                message_id,
                reply: RpcReplyContent::Ok,
            });
        }
        let errors: Vec<RpcError> =
            parser.collect_xml_sequence_with_tag(Some(NETCONF_NS), "rpc-error")?;
        let responses = parser.inner_xml(b"rpc-reply")?;
        parser.close()?;
        Ok(RpcReply {
            message_id,
            reply: RpcReplyContent::ErrorsAndData { errors, responses },
        })
    }
}

impl XmlSerialize for RpcReply {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let mut start = writer.create_element("rpc-reply");
        if let Some(message_id) = self.message_id.as_ref() {
            start.push_attribute(("message-id", message_id.as_ref()));
        }
        writer.write_event(Event::Start(start.clone()))?;
        match &self.reply {
            RpcReplyContent::Ok => {
                let ok = writer.create_element("ok");
                writer.write_event(Event::Empty(ok))?;
            }
            RpcReplyContent::ErrorsAndData { errors, responses } => {
                for error in errors {
                    error.xml_serialize(writer)?;
                }
                writer.write_all(responses.as_bytes())?;
            }
        }
        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }
}

/// ```xml
/// <xs:choice>
///     <xs:element name="ok"/>
///     <xs:sequence>
///         <xs:element ref="rpc-error"
///                     minOccurs="0" maxOccurs="unbounded"/>
///         <xs:element ref="rpcResponse"
///                     minOccurs="0" maxOccurs="unbounded"/>
///     </xs:sequence>
/// </xs:choice>
/// ```
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged, rename_all = "kebab-case")]
pub enum RpcReplyContent {
    #[default]
    Ok,
    ErrorsAndData {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        errors: Vec<RpcError>,
        /// Raw XML of the reply content following the errors, usually a
        /// single `<data>` element.
        responses: Box<str>,
    },
}

impl RpcReplyContent {
    pub const fn is_ok(&self) -> bool {
        matches!(self, RpcReplyContent::Ok)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().iter().any(|err| err.is_error())
    }

    pub fn errors(&self) -> &[RpcError] {
        match self {
            RpcReplyContent::ErrorsAndData { errors, .. } => errors.as_slice(),
            RpcReplyContent::Ok => &[],
        }
    }

    pub fn responses(&self) -> Option<&str> {
        match self {
            RpcReplyContent::ErrorsAndData { responses, .. } => Some(responses),
            RpcReplyContent::Ok => None,
        }
    }
}

/// ```xml
///  <xs:complexType name="rpcErrorType">
///      <xs:sequence>
///          <xs:element name="error-type" type="ErrorType"/>
///          <xs:element name="error-tag" type="ErrorTag"/>
///          <xs:element name="error-severity" type="ErrorSeverity"/>
///          <xs:element name="error-app-tag" type="xs:string"
///                      minOccurs="0"/>
///          <xs:element name="error-path" type="xs:string" minOccurs="0"/>
///          <xs:element name="error-message" minOccurs="0"/>
///          <xs:element name="error-info" type="errorInfoType"
///                      minOccurs="0"/>
///      </xs:sequence>
///  </xs:complexType>
/// ```
///
/// Devices do not always respect the sequence order, children are accepted
/// in any order.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcError {
    error_type: ErrorType,
    error_tag: ErrorTag,
    error_severity: ErrorSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_app_tag: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_path: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_info: Option<ErrorInfo>,
}

impl RpcError {
    pub const fn new(
        error_type: ErrorType,
        error_tag: ErrorTag,
        error_severity: ErrorSeverity,
        error_app_tag: Option<Box<str>>,
        error_path: Option<Box<str>>,
        error_message: Option<Box<str>>,
        error_info: Option<ErrorInfo>,
    ) -> Self {
        Self {
            error_type,
            error_tag,
            error_severity,
            error_app_tag,
            error_path,
            error_message,
            error_info,
        }
    }

    pub const fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub const fn error_tag(&self) -> ErrorTag {
        self.error_tag
    }

    pub const fn error_severity(&self) -> ErrorSeverity {
        self.error_severity
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.error_severity, ErrorSeverity::Error)
    }

    pub fn error_app_tag(&self) -> Option<&str> {
        self.error_app_tag.as_deref()
    }

    pub fn error_path(&self) -> Option<&str> {
        self.error_path.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub const fn error_info(&self) -> Option<&ErrorInfo> {
        self.error_info.as_ref()
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} error `{}`", self.error_severity, self.error_type, self.error_tag)?;
        if let Some(message) = &self.error_message {
            write!(f, ": {}", message.trim())?;
        }
        if let Some(path) = &self.error_path {
            write!(f, " (path: {})", path.trim())?;
        }
        if let Some(bad_element) = self.error_info.as_ref().and_then(|x| x.bad_element()) {
            write!(f, " (bad-element: {bad_element})")?;
        }
        Ok(())
    }
}

fn read_enum_value<E: FromStr>(
    parser: &mut XmlParser<impl io::BufRead>,
    tag: &str,
) -> Result<E, ParsingError> {
    parser.open(Some(NETCONF_NS), tag)?;
    let value = parser.tag_string()?;
    let parsed = E::from_str(value.trim())
        .map_err(|_| ParsingError::InvalidValue(format!("unexpected <{tag}> '{value}'")))?;
    parser.close()?;
    Ok(parsed)
}

fn read_text_value(
    parser: &mut XmlParser<impl io::BufRead>,
    tag: &str,
) -> Result<Box<str>, ParsingError> {
    parser.open(Some(NETCONF_NS), tag)?;
    let value = parser.tag_string_or_empty()?;
    parser.close()?;
    Ok(value)
}

impl XmlDeserialize<RpcError> for RpcError {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Self, ParsingError> {
        let mut rpc_error = RpcError::default();
        parser.open(Some(NETCONF_NS), "rpc-error")?;
        if !parser.parent_has_child() {
            parser.close()?;
            return Ok(rpc_error);
        }
        loop {
            parser.skip_text()?;
            if matches!(parser.peek(), Event::End(_) | Event::Eof) {
                break;
            }
            if parser.is_tag(Some(NETCONF_NS), "error-type") {
                rpc_error.error_type = read_enum_value(parser, "error-type")?;
            } else if parser.is_tag(Some(NETCONF_NS), "error-tag") {
                rpc_error.error_tag = read_enum_value(parser, "error-tag")?;
            } else if parser.is_tag(Some(NETCONF_NS), "error-severity") {
                rpc_error.error_severity = read_enum_value(parser, "error-severity")?;
            } else if parser.is_tag(Some(NETCONF_NS), "error-app-tag") {
                rpc_error.error_app_tag = Some(read_text_value(parser, "error-app-tag")?);
            } else if parser.is_tag(Some(NETCONF_NS), "error-path") {
                rpc_error.error_path = Some(read_text_value(parser, "error-path")?);
            } else if parser.is_tag(Some(NETCONF_NS), "error-message") {
                rpc_error.error_message = Some(read_text_value(parser, "error-message")?);
            } else if parser.is_tag(Some(NETCONF_NS), "error-info") {
                rpc_error.error_info = Some(ErrorInfo::xml_deserialize(parser)?);
            } else {
                parser.skip()?;
            }
        }
        parser.close()?;
        Ok(rpc_error)
    }
}

impl XmlSerialize for RpcError {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let start = writer.create_element("rpc-error");
        writer.write_event(Event::Start(start.clone()))?;
        writer.write_text_element("error-type", &self.error_type.to_string())?;
        writer.write_text_element("error-tag", &self.error_tag.to_string())?;
        writer.write_text_element("error-severity", &self.error_severity.to_string())?;
        if let Some(error_app_tag) = &self.error_app_tag {
            writer.write_text_element("error-app-tag", error_app_tag)?;
        }
        if let Some(error_path) = &self.error_path {
            writer.write_text_element("error-path", error_path)?;
        }
        if let Some(error_message) = &self.error_message {
            writer.write_text_element("error-message", error_message)?;
        }
        if let Some(error_info) = &self.error_info {
            error_info.xml_serialize(writer)?;
        }
        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }
}

/// ```xml
/// <xs:simpleType name="ErrorType">
///     <xs:restriction base="xs:string">
///         <xs:enumeration value="transport"/>
///         <xs:enumeration value="rpc"/>
///         <xs:enumeration value="protocol"/>
///         <xs:enumeration value="application"/>
///     </xs:restriction>
/// </xs:simpleType>
/// ```
#[derive(
    PartialEq,
    Eq,
    Debug,
    Copy,
    Clone,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorType {
    #[strum(serialize = "transport")]
    Transport,
    #[strum(serialize = "rpc")]
    Rpc,
    #[strum(serialize = "protocol")]
    Protocol,
    #[default]
    #[strum(serialize = "application")]
    Application,
}

/// Error tags from [RFC 6241 Appendix A](https://datatracker.ietf.org/doc/html/rfc6241#appendix-A)
#[derive(
    PartialEq,
    Eq,
    Debug,
    Copy,
    Clone,
    Default,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    #[strum(serialize = "in-use")]
    InUse,
    #[strum(serialize = "invalid-value")]
    InvalidValue,
    #[strum(serialize = "too-big")]
    TooBig,
    #[strum(serialize = "missing-attribute")]
    MissingAttribute,
    #[strum(serialize = "bad-attribute")]
    BadAttribute,
    #[strum(serialize = "unknown-attribute")]
    UnknownAttribute,
    #[strum(serialize = "missing-element")]
    MissingElement,
    #[strum(serialize = "bad-element")]
    BadElement,
    #[strum(serialize = "unknown-element")]
    UnknownElement,
    #[strum(serialize = "unknown-namespace")]
    UnknownNamespace,
    #[strum(serialize = "access-denied")]
    AccessDenied,
    #[strum(serialize = "lock-denied")]
    LockDenied,
    #[strum(serialize = "resource-denied")]
    ResourceDenied,
    #[strum(serialize = "rollback-failed")]
    RollbackFailed,
    #[strum(serialize = "data-exists")]
    DataExists,
    #[strum(serialize = "data-missing")]
    DataMissing,
    #[strum(serialize = "operation-not-supported")]
    OperationNotSupported,
    #[default]
    #[strum(serialize = "operation-failed")]
    OperationFailed,
    #[strum(serialize = "partial-operation")]
    PartialOperation,
    #[strum(serialize = "malformed-message")]
    MalformedMessage,
}

/// ```xml
/// <xs:simpleType name="ErrorSeverity">
///     <xs:restriction base="xs:string">
///         <xs:enumeration value="error"/>
///         <xs:enumeration value="warning"/>
///     </xs:restriction>
/// </xs:simpleType>
/// ```
#[derive(
    PartialEq,
    Eq,
    Debug,
    Copy,
    Clone,
    Serialize,
    Deserialize,
    Default,
    strum::EnumString,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorSeverity {
    #[default]
    #[strum(serialize = "error")]
    Error,
    #[strum(serialize = "warning")]
    Warning,
}

/// The NETCONF defined children of `<error-info>`, elements from other
/// namespaces are skipped.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ErrorInfo {
    session_id: Option<u32>,
    bad_attribute: Option<Box<str>>,
    bad_element: Option<Box<str>>,
    bad_namespace: Option<Box<str>>,
}

impl ErrorInfo {
    pub const fn new(
        session_id: Option<u32>,
        bad_attribute: Option<Box<str>>,
        bad_element: Option<Box<str>>,
        bad_namespace: Option<Box<str>>,
    ) -> Self {
        Self {
            session_id,
            bad_attribute,
            bad_element,
            bad_namespace,
        }
    }

    pub const fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    pub fn bad_attribute(&self) -> Option<&str> {
        self.bad_attribute.as_deref()
    }

    pub fn bad_element(&self) -> Option<&str> {
        self.bad_element.as_deref()
    }

    pub fn bad_namespace(&self) -> Option<&str> {
        self.bad_namespace.as_deref()
    }
}

impl XmlDeserialize<ErrorInfo> for ErrorInfo {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Self, ParsingError> {
        let mut info = ErrorInfo::default();
        parser.open(Some(NETCONF_NS), "error-info")?;
        if !parser.parent_has_child() {
            parser.close()?;
            return Ok(info);
        }
        loop {
            parser.skip_text()?;
            if matches!(parser.peek(), Event::End(_) | Event::Eof) {
                break;
            }
            if parser.is_tag(Some(NETCONF_NS), "session-id") {
                info.session_id = Some(read_text_value(parser, "session-id")?.trim().parse()?);
            } else if parser.is_tag(Some(NETCONF_NS), "bad-attribute") {
                info.bad_attribute = Some(read_text_value(parser, "bad-attribute")?);
            } else if parser.is_tag(Some(NETCONF_NS), "bad-element") {
                info.bad_element = Some(read_text_value(parser, "bad-element")?);
            } else if parser.is_tag(Some(NETCONF_NS), "bad-namespace") {
                info.bad_namespace = Some(read_text_value(parser, "bad-namespace")?);
            } else {
                parser.skip()?;
            }
        }
        parser.close()?;
        Ok(info)
    }
}

impl XmlSerialize for ErrorInfo {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let start = writer.create_element("error-info");
        writer.write_event(Event::Start(start.clone()))?;
        if let Some(session_id) = self.session_id {
            writer.write_text_element("session-id", &session_id.to_string())?;
        }
        if let Some(value) = &self.bad_attribute {
            writer.write_text_element("bad-attribute", value)?;
        }
        if let Some(value) = &self.bad_element {
            writer.write_text_element("bad-element", value)?;
        }
        if let Some(value) = &self.bad_namespace {
            writer.write_text_element("bad-namespace", value)?;
        }
        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capabilities::{NetconfVersion, StandardCapability},
        tests::{parse_str, test_xml_value},
    };

    #[test]
    fn test_hello() -> Result<(), ParsingError> {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
    <capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>
  </capabilities>
  <session-id>4</session-id>
</hello>"#;
        let expected = Hello::new(
            Some(4),
            HashSet::from([
                Capability::NetconfBase(NetconfVersion::V1_0),
                Capability::Standard(StandardCapability::Candidate),
            ]),
        );
        test_xml_value(input, expected)
    }

    #[test]
    fn test_rpc_raw() -> Result<(), ParsingError> {
        let input = r#"<rpc message-id="101" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><get><filter type="subtree"><system xmlns="urn:example:system"/></filter></get></rpc>"#;
        let expected = Rpc::new(
            "101".into(),
            RpcOperation::Raw(
                r#"<get xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><filter type="subtree"><system xmlns="urn:example:system"/></filter></get>"#.into(),
            ),
        );
        test_xml_value(input, expected)
    }

    #[test]
    fn test_rpc_missing_message_id() {
        let input = r#"<rpc xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><get/></rpc>"#;
        assert_eq!(
            parse_str::<Rpc>(input),
            Err(ParsingError::MissingAttribute("message-id".to_string()))
        );
    }

    #[test]
    fn test_rpc_reply_ok() -> Result<(), ParsingError> {
        let input = r#"<rpc-reply message-id="101" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <ok/>
</rpc-reply>"#;
        test_xml_value(input, RpcReply::new(Some("101".into()), RpcReplyContent::Ok))
    }

    #[test]
    fn test_rpc_reply_data_keeps_namespaces() {
        let input = r#"<nc:rpc-reply message-id="7" xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><nc:data><system xmlns="urn:example:system"><hostname>router1</hostname></system></nc:data></nc:rpc-reply>"#;
        let reply = parse_str::<RpcReply>(input).expect("failed to parse reply");
        assert_eq!(reply.message_id(), Some("7"));
        assert!(!reply.reply().has_errors());
        assert_eq!(
            reply.reply().responses(),
            Some(r#"<nc:data xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><system xmlns="urn:example:system"><hostname>router1</hostname></system></nc:data>"#)
        );
    }

    #[test]
    fn test_rpc_reply_errors() -> Result<(), ParsingError> {
        let input = r#"<rpc-reply message-id="101" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><rpc-error>
    <error-type>application</error-type>
    <error-tag>invalid-value</error-tag>
    <error-severity>error</error-severity>
    <error-path>/system/mtu</error-path>
    <error-message xml:lang="en">MTU out of range</error-message>
    <error-info><bad-element>mtu</bad-element></error-info>
  </rpc-error></rpc-reply>"#;
        let error = RpcError::new(
            ErrorType::Application,
            ErrorTag::InvalidValue,
            ErrorSeverity::Error,
            None,
            Some("/system/mtu".into()),
            Some("MTU out of range".into()),
            Some(ErrorInfo::new(None, None, Some("mtu".into()), None)),
        );
        assert_eq!(
            error.to_string(),
            "error application error `invalid-value`: MTU out of range (path: /system/mtu) (bad-element: mtu)"
        );
        let expected = RpcReply::new(
            Some("101".into()),
            RpcReplyContent::ErrorsAndData {
                errors: vec![error],
                responses: "".into(),
            },
        );
        test_xml_value(input, expected)
    }

    #[test]
    fn test_rpc_reply_warning_is_not_error() {
        let content = RpcReplyContent::ErrorsAndData {
            errors: vec![RpcError::new(
                ErrorType::Protocol,
                ErrorTag::OperationFailed,
                ErrorSeverity::Warning,
                None,
                None,
                None,
                None,
            )],
            responses: "".into(),
        };
        assert!(!content.has_errors());
        assert_eq!(content.errors().len(), 1);
    }

    #[test]
    fn test_unknown_message() {
        let input = r#"<notification xmlns="urn:ietf:params:xml:ns:netconf:notification:1.0"/>"#;
        assert_eq!(
            parse_str::<NetConfMessage>(input),
            Err(ParsingError::InvalidValue(
                "unexpected NETCONF message <notification>".to_string()
            ))
        );
    }
}
