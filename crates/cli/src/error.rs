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

use crate::transport::TransportError;
use ncxpath_netconf_proto::protocol::RpcError;
use std::fmt;

/// The `<rpc-error>` elements with severity `error` of a reply
#[derive(Debug, Clone, PartialEq)]
pub struct RpcErrors(pub Vec<RpcError>);

impl fmt::Display for RpcErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

#[derive(Debug, strum_macros::Display)]
pub enum Error {
    #[strum(to_string = "failed to connect to the NETCONF server: {0}")]
    ConnectFailed(String),

    #[strum(to_string = "failed to discover the device schemas: {0}")]
    SchemaDiscoveryFailed(String),

    #[strum(to_string = "failed to load YANG module `{module}`: {reason}")]
    ModuleParseFailed { module: String, reason: String },

    #[strum(to_string = "failed to build a data tree for `{path}`: {reason}")]
    ConstructionFailed { path: String, reason: String },

    #[strum(to_string = "the reply carries no data")]
    NoReplyPayload,

    #[strum(to_string = "no data found for `{0}`")]
    NoMatchFound(String),

    #[strum(to_string = "{0}")]
    TransportError(TransportError),

    #[strum(to_string = "the device rejected the request: {0}")]
    RpcError(RpcErrors),

    #[strum(to_string = "the reply does not match the schema: {0}")]
    ReplyParseFailed(String),

    #[strum(to_string = "`{0}` is not a valid datastore name")]
    InvalidDatastore(String),
}

impl Error {
    /// Errors that end the run before the operation phase
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::ConnectFailed(_) | Error::SchemaDiscoveryFailed(_))
    }
}

impl std::error::Error for Error {}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::TransportError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::ConnectFailed("refused".to_string()), true)]
    #[case(Error::SchemaDiscoveryFailed("timeout".to_string()), true)]
    #[case(Error::NoReplyPayload, false)]
    #[case(Error::NoMatchFound("/system".to_string()), false)]
    #[case(Error::TransportError(TransportError::SessionClosed), false)]
    #[case(Error::InvalidDatastore("a b".to_string()), false)]
    fn test_is_fatal(#[case] error: Error, #[case] expected: bool) {
        assert_eq!(error.is_fatal(), expected);
    }

    #[test]
    fn test_display() {
        let error = Error::ConstructionFailed {
            path: "/system/nope".to_string(),
            reason: "unknown node".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "failed to build a data tree for `/system/nope`: unknown node"
        );
        assert_eq!(
            Error::NoMatchFound("/system/hostname".to_string()).to_string(),
            "no data found for `/system/hostname`"
        );
    }
}
