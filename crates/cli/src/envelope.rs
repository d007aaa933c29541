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

//! Wrap tree fragments into NETCONF operations and unwrap the replies.

use crate::{
    error::{Error, RpcErrors},
    materializer::Operation,
};
use ncxpath_netconf_proto::{
    protocol::{RpcError, RpcReply},
    xml_utils::{ParsingError, XmlParser},
    NETCONF_NS, NETCONF_NS_STR,
};
use quick_xml::{
    events::{BytesEnd, BytesStart, Event},
    NsReader, Writer,
};
use std::io;

/// Serialize the operation for `fragment`, the content of the `<rpc>`
pub fn build_request(
    operation: &Operation,
    fragment: &str,
    datastore: &str,
) -> Result<String, Error> {
    let mut writer = Writer::new(Vec::new());
    let written = match operation {
        Operation::Query => write_get(&mut writer, fragment),
        Operation::Mutate { .. } => {
            if !is_xml_name(datastore) {
                return Err(Error::InvalidDatastore(datastore.to_string()));
            }
            write_edit_config(&mut writer, fragment, datastore)
        }
    };
    written
        .and_then(|_| {
            String::from_utf8(writer.into_inner())
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
        })
        .map_err(|err| Error::ConstructionFailed {
            path: String::new(),
            reason: err.to_string(),
        })
}

fn write_get(writer: &mut Writer<Vec<u8>>, fragment: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("get")))?;
    let mut filter = BytesStart::new("filter");
    filter.push_attribute(("type", "subtree"));
    writer.write_event(Event::Start(filter))?;
    writer.get_mut().extend_from_slice(fragment.as_bytes());
    writer.write_event(Event::End(BytesEnd::new("filter")))?;
    writer.write_event(Event::End(BytesEnd::new("get")))?;
    Ok(())
}

fn write_edit_config(
    writer: &mut Writer<Vec<u8>>,
    fragment: &str,
    datastore: &str,
) -> io::Result<()> {
    let mut edit = BytesStart::new("edit-config");
    edit.push_attribute(("xmlns:nc", NETCONF_NS_STR));
    writer.write_event(Event::Start(edit))?;
    writer.write_event(Event::Start(BytesStart::new("target")))?;
    writer.write_event(Event::Empty(BytesStart::new(datastore)))?;
    writer.write_event(Event::End(BytesEnd::new("target")))?;
    writer.write_event(Event::Start(BytesStart::new("config")))?;
    writer.get_mut().extend_from_slice(fragment.as_bytes());
    writer.write_event(Event::End(BytesEnd::new("config")))?;
    writer.write_event(Event::End(BytesEnd::new("edit-config")))?;
    Ok(())
}

/// Datastore names are unprefixed XML names
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.to_ascii_lowercase().starts_with("xml")
}

/// The first element inside the `<data>` of a reply, with the namespace
/// declarations in scope copied onto it.
pub fn extract_data_payload(responses: &str) -> Result<String, Error> {
    let reply_error = |err: ParsingError| Error::ReplyParseFailed(err.to_string());
    let mut reader = NsReader::from_reader(responses.as_bytes());
    reader.config_mut().trim_text(false);
    let mut parser = XmlParser::new(reader).map_err(reply_error)?;
    parser.skip_prolog().map_err(reply_error)?;
    if parser
        .maybe_open(Some(NETCONF_NS), "data")
        .map_err(reply_error)?
        .is_none()
    {
        return Err(Error::NoReplyPayload);
    }
    if !parser.parent_has_child() {
        return Err(Error::NoReplyPayload);
    }
    parser.skip_text().map_err(reply_error)?;
    match parser.peek() {
        Event::Start(_) | Event::Empty(_) => {
            let payload = parser.element_xml().map_err(reply_error)?;
            Ok(payload.into())
        }
        _ => Err(Error::NoReplyPayload),
    }
}

/// Fail with the `<rpc-error>`s of severity error, warnings are logged
pub fn check_reply(reply: &RpcReply) -> Result<(), Error> {
    let content = reply.reply();
    for warning in content.errors().iter().filter(|err| !err.is_error()) {
        tracing::warn!("Device reported: {warning}");
    }
    if !content.has_errors() {
        return Ok(());
    }
    let errors: Vec<RpcError> = content
        .errors()
        .iter()
        .filter(|err| err.is_error())
        .cloned()
        .collect();
    Err(Error::RpcError(RpcErrors(errors)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncxpath_netconf_proto::xml_utils::XmlDeserialize;
    use rstest::rstest;

    const FRAGMENT: &str = r#"<system xmlns="urn:example:system"><hostname/></system>"#;

    fn parse_reply(xml: &str) -> RpcReply {
        let mut reader = NsReader::from_reader(xml.as_bytes());
        reader.config_mut().trim_text(false);
        let mut parser = XmlParser::new(reader).expect("valid xml");
        RpcReply::xml_deserialize(&mut parser).expect("valid reply")
    }

    #[test]
    fn test_get_request() {
        let request = build_request(&Operation::Query, FRAGMENT, "running").expect("valid request");
        assert_eq!(
            request,
            format!(r#"<get><filter type="subtree">{FRAGMENT}</filter></get>"#)
        );
    }

    #[test]
    fn test_get_ignores_datastore() {
        assert!(build_request(&Operation::Query, FRAGMENT, "not a name").is_ok());
    }

    #[test]
    fn test_edit_config_request() {
        let operation = Operation::Mutate {
            value: "r2".to_string(),
        };
        let fragment = r#"<system xmlns="urn:example:system"><hostname>r2</hostname></system>"#;
        let request = build_request(&operation, fragment, "candidate").expect("valid request");
        assert_eq!(
            request,
            format!(
                r#"<edit-config xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0"><target><candidate/></target><config>{fragment}</config></edit-config>"#
            )
        );
    }

    #[rstest]
    #[case("running", true)]
    #[case("candidate", true)]
    #[case("startup", true)]
    #[case("_private-store.v2", true)]
    #[case("", false)]
    #[case("1st", false)]
    #[case("run ning", false)]
    #[case("a/>", false)]
    #[case("nc:running", false)]
    #[case("xmlstore", false)]
    fn test_datastore_name(#[case] datastore: &str, #[case] valid: bool) {
        let operation = Operation::Mutate {
            value: "x".to_string(),
        };
        let result = build_request(&operation, FRAGMENT, datastore);
        if valid {
            assert!(result.is_ok(), "{datastore} should be accepted");
        } else {
            assert!(
                matches!(result, Err(Error::InvalidDatastore(_))),
                "{datastore} should be rejected"
            );
        }
    }

    #[test]
    fn test_extract_payload() {
        let responses = r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
  <system xmlns="urn:example:system"><hostname>router1</hostname></system>
</data>"#;
        assert_eq!(
            extract_data_payload(responses).expect("payload"),
            r#"<system xmlns="urn:example:system"><hostname>router1</hostname></system>"#
        );
    }

    #[test]
    fn test_extract_payload_carries_prefixes() {
        let responses = r#"<nc:data xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0" xmlns:sys="urn:example:system"><sys:system><sys:hostname>r1</sys:hostname></sys:system></nc:data>"#;
        let payload = extract_data_payload(responses).expect("payload");
        assert!(payload.starts_with("<sys:system "), "{payload}");
        assert!(payload.contains(r#"xmlns:sys="urn:example:system""#), "{payload}");
        assert!(payload.ends_with("<sys:hostname>r1</sys:hostname></sys:system>"), "{payload}");
    }

    #[rstest]
    #[case(r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"/>"#)]
    #[case(r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"></data>"#)]
    #[case(r#"<data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">  </data>"#)]
    #[case("")]
    #[case(r#"<other xmlns="urn:example"/>"#)]
    fn test_no_payload(#[case] responses: &str) {
        assert!(matches!(
            extract_data_payload(responses),
            Err(Error::NoReplyPayload)
        ));
    }

    #[test]
    fn test_check_ok_reply() {
        let reply = parse_reply(
            r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1"><ok/></rpc-reply>"#,
        );
        assert!(check_reply(&reply).is_ok());
    }

    #[test]
    fn test_check_warning_reply() {
        let reply = parse_reply(
            r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1">
  <rpc-error>
    <error-type>application</error-type>
    <error-tag>operation-failed</error-tag>
    <error-severity>warning</error-severity>
  </rpc-error>
  <data/>
</rpc-reply>"#,
        );
        assert!(check_reply(&reply).is_ok());
    }

    #[test]
    fn test_check_error_reply() {
        let reply = parse_reply(
            r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="1">
  <rpc-error>
    <error-type>application</error-type>
    <error-tag>invalid-value</error-tag>
    <error-severity>error</error-severity>
    <error-message>bad hostname</error-message>
  </rpc-error>
</rpc-reply>"#,
        );
        match check_reply(&reply) {
            Err(Error::RpcError(errors)) => {
                assert_eq!(errors.0.len(), 1);
                assert!(errors.to_string().contains("bad hostname"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
