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

//! NETCONF client plumbing: message model, SSH framing, session handling and
//! the `ietf-netconf-monitoring` schema retrieval helpers.

use quick_xml::name::Namespace;

pub mod capabilities;
pub mod client;
pub mod codec;
pub mod monitoring;
pub mod protocol;
pub mod xml_utils;

pub const NETCONF_NS_STR: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETCONF_NS: Namespace<'static> = Namespace(NETCONF_NS_STR.as_bytes());

pub const NETCONF_MONITORING_NS_STR: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring";
pub const NETCONF_MONITORING_NS: Namespace<'static> =
    Namespace(NETCONF_MONITORING_NS_STR.as_bytes());
