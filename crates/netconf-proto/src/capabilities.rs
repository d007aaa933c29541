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

//! NETCONF capabilities exchanged in the `<hello>` message.

use crate::{
    xml_utils::{ParsingError, XmlDeserialize, XmlParser, XmlSerialize, XmlWriter},
    NETCONF_NS,
};
use quick_xml::events::{BytesText, Event};
use serde::{Deserialize, Serialize};
use std::{io, str::FromStr};

const CAP_BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";
const CAP_BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";
const CAP_WRITABLE_RUNNING: &str = "urn:ietf:params:netconf:capability:writable-running:1.0";
const CAP_CANDIDATE: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
const CAP_STARTUP: &str = "urn:ietf:params:netconf:capability:startup:1.0";
const CAP_VALIDATE_1_1: &str = "urn:ietf:params:netconf:capability:validate:1.1";
const CAP_XPATH: &str = "urn:ietf:params:netconf:capability:xpath:1.0";

/// NETCONF capabilities as defined in
/// [RFC 6241](https://www.rfc-editor.org/rfc/rfc6241.html).
///
/// Only the capabilities this client acts upon get their own variant, the
/// rest are kept verbatim in [Capability::Custom].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Capability {
    #[strum(serialize = "{0}")]
    NetconfBase(NetconfVersion),

    #[strum(serialize = "{0}")]
    Standard(StandardCapability),

    #[strum(serialize = "{0}")]
    Yang(YangCapability),

    #[strum(serialize = "{0}")]
    Custom(Box<str>),
}

impl FromStr for Capability {
    type Err = ParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let cap = match s {
            CAP_BASE_1_0 => Capability::NetconfBase(NetconfVersion::V1_0),
            CAP_BASE_1_1 => Capability::NetconfBase(NetconfVersion::V1_1),
            CAP_WRITABLE_RUNNING => Capability::Standard(StandardCapability::WritableRunning),
            CAP_CANDIDATE => Capability::Standard(StandardCapability::Candidate),
            CAP_STARTUP => Capability::Standard(StandardCapability::Startup),
            CAP_VALIDATE_1_1 => Capability::Standard(StandardCapability::Validate),
            CAP_XPATH => Capability::Standard(StandardCapability::Xpath),
            "" => return Err(ParsingError::InvalidValue("empty capability".to_string())),
            _ => match YangCapability::from_uri(s) {
                Some(yang) => Capability::Yang(yang),
                None => Capability::Custom(s.into()),
            },
        };
        Ok(cap)
    }
}

impl XmlDeserialize<Capability> for Capability {
    fn xml_deserialize(
        parser: &mut XmlParser<impl io::BufRead>,
    ) -> Result<Capability, ParsingError> {
        parser.open(Some(NETCONF_NS), "capability")?;
        let body = parser.tag_string()?;
        let cap = Capability::from_str(&body)?;
        parser.close()?;
        Ok(cap)
    }
}

impl XmlSerialize for Capability {
    fn xml_serialize<T: io::Write>(
        &self,
        writer: &mut XmlWriter<T>,
    ) -> Result<(), quick_xml::Error> {
        let start = writer.create_element("capability");
        let end = start.to_end().into_owned();
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&self.to_string())))?;
        writer.write_event(Event::End(end))?;
        Ok(())
    }
}

/// NETCONF protocol version, selects the framing used after `<hello>`
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum NetconfVersion {
    #[strum(serialize = "urn:ietf:params:netconf:base:1.0")]
    V1_0,
    #[strum(serialize = "urn:ietf:params:netconf:base:1.1")]
    V1_1,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum StandardCapability {
    #[strum(serialize = "urn:ietf:params:netconf:capability:writable-running:1.0")]
    WritableRunning,
    #[strum(serialize = "urn:ietf:params:netconf:capability:candidate:1.0")]
    Candidate,
    #[strum(serialize = "urn:ietf:params:netconf:capability:startup:1.0")]
    Startup,
    #[strum(serialize = "urn:ietf:params:netconf:capability:validate:1.1")]
    Validate,
    #[strum(serialize = "urn:ietf:params:netconf:capability:xpath:1.0")]
    Xpath,
}

/// A YANG module announced as `NAMESPACE?module=NAME[&revision=DATE]...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YangCapability {
    namespace: Box<str>,
    module: Box<str>,
    revision: Option<Box<str>>,
    raw: Box<str>,
}

impl YangCapability {
    fn from_uri(uri: &str) -> Option<Self> {
        let (namespace, params) = uri.split_once('?')?;
        let mut module = None;
        let mut revision = None;
        for param in params.split('&') {
            match param.split_once('=') {
                Some(("module", value)) => module = Some(value.into()),
                Some(("revision", value)) => revision = Some(value.into()),
                _ => {}
            }
        }
        Some(Self {
            namespace: namespace.into(),
            module: module?,
            revision,
            raw: uri.into(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }
}

impl std::fmt::Display for YangCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_xml_value;
    use rstest::rstest;

    #[rstest]
    #[case(CAP_BASE_1_0, Capability::NetconfBase(NetconfVersion::V1_0))]
    #[case(CAP_BASE_1_1, Capability::NetconfBase(NetconfVersion::V1_1))]
    #[case(CAP_CANDIDATE, Capability::Standard(StandardCapability::Candidate))]
    #[case(
        "urn:ietf:params:netconf:capability:with-defaults:1.0?basic-mode=explicit",
        Capability::Custom("urn:ietf:params:netconf:capability:with-defaults:1.0?basic-mode=explicit".into())
    )]
    fn test_parse_capability(#[case] input: &str, #[case] expected: Capability) {
        assert_eq!(Capability::from_str(input), Ok(expected.clone()));
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn test_yang_capability() {
        let uri = "urn:example:system?module=example-system&revision=2024-01-01&features=ntp";
        let cap = Capability::from_str(uri).expect("failed to parse");
        let yang = match &cap {
            Capability::Yang(yang) => yang,
            other => panic!("unexpected capability {other:?}"),
        };
        assert_eq!(yang.namespace(), "urn:example:system");
        assert_eq!(yang.module(), "example-system");
        assert_eq!(yang.revision(), Some("2024-01-01"));
        assert_eq!(cap.to_string(), uri);
    }

    #[test]
    fn test_capability_xml() -> Result<(), ParsingError> {
        let input = r#"<capability xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
          urn:ietf:params:netconf:base:1.1
        </capability>"#;
        test_xml_value(input, Capability::NetconfBase(NetconfVersion::V1_1))
    }
}
