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

//! Schema retrieval as defined in
//! [RFC 6022](https://datatracker.ietf.org/doc/html/rfc6022): listing the
//! schemas of `/netconf-state/schemas` and fetching them with
//! `<get-schema>`.

use crate::{
    xml_utils::{ParsingError, XmlDeserialize, XmlParser, XmlSerialize, XmlWriter},
    NETCONF_MONITORING_NS, NETCONF_MONITORING_NS_STR, NETCONF_NS,
};
use quick_xml::{events::Event, NsReader};
use serde::{Deserialize, Serialize};
use std::io;

/// Subtree filter selecting the schema list of the device
pub const SCHEMAS_FILTER: &str = r#"<netconf-state xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring"><schemas/></netconf-state>"#;

/// `<get>` operation for [SCHEMAS_FILTER]
pub fn schemas_request() -> String {
    format!(r#"<get><filter type="subtree">{SCHEMAS_FILTER}</filter></get>"#)
}

/// An entry of `/netconf-state/schemas/schema`
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    identifier: Box<str>,
    version: Box<str>,
    format: Box<str>,
    namespace: Option<Box<str>>,
    locations: Vec<Box<str>>,
}

impl Schema {
    pub const fn new(
        identifier: Box<str>,
        version: Box<str>,
        format: Box<str>,
        namespace: Option<Box<str>>,
        locations: Vec<Box<str>>,
    ) -> Self {
        Self {
            identifier,
            version,
            format,
            namespace,
            locations,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn locations(&self) -> &[Box<str>] {
        &self.locations
    }

    /// The format is an identityref, devices send it with any prefix, e.g.,
    /// `yang`, `ncm:yang`.
    pub fn is_yang(&self) -> bool {
        let format = self.format.trim();
        let local = format.rsplit_once(':').map_or(format, |(_, local)| local);
        local == "yang"
    }
}

impl XmlDeserialize<Schema> for Schema {
    fn xml_deserialize(parser: &mut XmlParser<impl io::BufRead>) -> Result<Self, ParsingError> {
        let mut schema = Schema::default();
        parser.open(Some(NETCONF_MONITORING_NS), "schema")?;
        if !parser.parent_has_child() {
            parser.close()?;
            return Err(ParsingError::MissingElement("identifier".to_string()));
        }
        let mut has_identifier = false;
        loop {
            parser.skip_text()?;
            if matches!(parser.peek(), Event::End(_) | Event::Eof) {
                break;
            }
            let field = ["identifier", "version", "format", "namespace", "location"]
                .into_iter()
                .find(|name| parser.is_tag(Some(NETCONF_MONITORING_NS), name));
            let field = match field {
                Some(field) => field,
                None => {
                    parser.skip()?;
                    continue;
                }
            };
            parser.open(Some(NETCONF_MONITORING_NS), field)?;
            let value: Box<str> = parser.tag_string_or_empty()?.trim().into();
            parser.close()?;
            match field {
                "identifier" => {
                    has_identifier = true;
                    schema.identifier = value;
                }
                "version" => schema.version = value,
                "format" => schema.format = value,
                "namespace" => schema.namespace = Some(value),
                _ => schema.locations.push(value),
            }
        }
        parser.close()?;
        if !has_identifier {
            return Err(ParsingError::MissingElement("identifier".to_string()));
        }
        Ok(schema)
    }
}

fn create_parser(xml: &str) -> Result<XmlParser<&[u8]>, ParsingError> {
    let mut reader = NsReader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(false);
    let mut parser = XmlParser::new(reader)?;
    parser.skip_prolog()?;
    Ok(parser)
}

/// Parse the `responses` of the `<rpc-reply>` to [schemas_request].
///
/// A `<data/>` element without content means the device exposes no schema.
pub fn parse_schema_list(responses: &str) -> Result<Vec<Schema>, ParsingError> {
    let mut parser = create_parser(responses)?;
    parser.open(Some(NETCONF_NS), "data")?;
    if !parser.parent_has_child() {
        return Ok(vec![]);
    }
    if parser
        .maybe_open(Some(NETCONF_MONITORING_NS), "netconf-state")?
        .is_none()
    {
        return Ok(vec![]);
    }
    let mut schemas = vec![];
    if parser
        .maybe_open(Some(NETCONF_MONITORING_NS), "schemas")?
        .is_some()
    {
        schemas = parser.collect_xml_sequence_with_tag(Some(NETCONF_MONITORING_NS), "schema")?;
        parser.close()?;
    }
    parser.close()?;
    parser.close()?;
    Ok(schemas)
}

/// The `<get-schema>` operation
/// ```xml
/// <get-schema xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring">
///   <identifier>example-system</identifier>
///   <version>2024-01-01</version>
///   <format>yang</format>
/// </get-schema>
/// ```
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct GetSchema {
    identifier: Box<str>,
    version: Option<Box<str>>,
    format: Option<Box<str>>,
}

impl GetSchema {
    pub const fn new(
        identifier: Box<str>,
        version: Option<Box<str>>,
        format: Option<Box<str>>,
    ) -> Self {
        Self {
            identifier,
            version,
            format,
        }
    }

    /// Request the YANG source of a listed schema
    pub fn yang(schema: &Schema) -> Self {
        let version = if schema.version().is_empty() {
            None
        } else {
            Some(schema.version().into())
        };
        Self::new(schema.identifier().into(), version, Some("yang".into()))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Serialized operation to be sent inside `<rpc>`
    pub fn to_payload(&self) -> Result<String, quick_xml::Error> {
        let writer = quick_xml::writer::Writer::new(io::Cursor::new(Vec::new()));
        let mut writer = XmlWriter::with_default_namespace(writer, NETCONF_MONITORING_NS_STR);
        self.xml_serialize(&mut writer)?;
        let payload = String::from_utf8(writer.into_inner().into_inner())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(payload)
    }
}

impl XmlSerialize for GetSchema {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let start = writer.create_element("get-schema");
        writer.write_event(Event::Start(start.clone()))?;
        writer.write_text_element("identifier", &self.identifier)?;
        if let Some(version) = &self.version {
            writer.write_text_element("version", version)?;
        }
        if let Some(format) = &self.format {
            writer.write_text_element("format", format)?;
        }
        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }
}

/// Extract the YANG source from the `responses` of a `<get-schema>` reply.
///
/// RFC 6022 puts `<data>` in the monitoring namespace, some devices use the
/// NETCONF base namespace instead.
pub fn parse_get_schema_reply(responses: &str) -> Result<Box<str>, ParsingError> {
    let mut parser = create_parser(responses)?;
    if parser
        .maybe_open(Some(NETCONF_MONITORING_NS), "data")?
        .is_none()
    {
        parser.open(Some(NETCONF_NS), "data")?;
    }
    let schema = parser.tag_string()?;
    parser.close()?;
    Ok(schema)
}
