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

//! Query and edit NETCONF devices with simple absolute YANG data paths.
//!
//! The [session::Session] discovers the device schemas, turns a path (and an
//! optional value) into a `<get>` subtree filter or an `<edit-config>`, and
//! flattens the reply into `path value` lines.

pub mod config;
pub mod envelope;
pub mod error;
pub mod flatten;
pub mod materializer;
pub mod path_builder;
pub mod session;
pub mod transport;
pub mod xpath;
pub mod yang;

pub use error::Error;

#[cfg(test)]
pub(crate) mod tests {
    use crate::yang::{ModuleFile, SchemaContext};

    pub(crate) const SYSTEM_MODULE: &str = r#"module example-system {
  namespace "urn:example:system";
  prefix sys;

  container system {
    leaf hostname { type string; }
    leaf location { type string; }
    leaf-list dns-server { type string; }
    list user {
      key "name";
      leaf name { type string; }
      leaf role { type string; }
      container profile {
        leaf shell { type string; }
      }
    }
    container clock {
      leaf timezone { type string; }
    }
  }
}"#;

    pub(crate) fn test_context() -> SchemaContext {
        let mut schema = SchemaContext::new().expect("failed to create a libyang context");
        let module = ModuleFile::new("example-system", None);
        schema
            .store(&module, SYSTEM_MODULE)
            .expect("failed to store example-system");
        schema.load(&module).expect("failed to load example-system");
        schema
    }
}
