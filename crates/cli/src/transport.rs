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

//! The seam between the session and the NETCONF client.

use crate::{config::Config, error::Error};
use ncxpath_netconf_proto::{
    client::{connect, NetConfSshClient, NetConfSshClientError, NetconfSshConnectConfig, SshHandler},
    protocol::{RpcOperation, RpcReply},
};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex,
};

#[derive(Debug, strum_macros::Display)]
pub enum TransportError {
    #[strum(to_string = "NETCONF session is closed")]
    SessionClosed,

    #[strum(to_string = "no reply received within {0:?}")]
    Timeout(Duration),

    #[strum(to_string = "{0}")]
    Client(NetConfSshClientError),
}

impl std::error::Error for TransportError {}

impl From<NetConfSshClientError> for TransportError {
    fn from(err: NetConfSshClientError) -> Self {
        match err {
            NetConfSshClientError::SessionClosed => TransportError::SessionClosed,
            err => TransportError::Client(err),
        }
    }
}

/// Executes raw NETCONF operations, each call is one request and its reply.
pub trait NetconfTransport: Send + Sync {
    /// Send `payload` as the content of an `<rpc>` and wait for the reply
    fn exec_raw(&self, payload: &str)
        -> impl Future<Output = Result<RpcReply, TransportError>> + Send;

    /// End the NETCONF session, later calls to [NetconfTransport::exec_raw]
    /// fail with [TransportError::SessionClosed].
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// NETCONF over SSH, the client is locked for a whole request/reply
/// exchange.
pub struct SshTransport<S = russh::ChannelStream<russh::client::Msg>> {
    peer: SocketAddr,
    client: Mutex<Option<NetConfSshClient<S>>>,
    rpc_timeout: Duration,
}

impl SshTransport {
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let host = resolve(config).await?;
        let auth = config.ssh_auth()?;
        let ssh_config = Arc::new(russh::client::Config::default());
        let connect_config =
            NetconfSshConnectConfig::new(auth, host, SshHandler::default(), ssh_config);
        tracing::debug!("[{host}] Connecting as `{}`", config.username);
        let client = match tokio::time::timeout(config.connect_timeout, connect(connect_config)).await {
            Ok(Ok(client)) => client,
            Ok(Err(err)) => return Err(Error::ConnectFailed(format!("{host}: {err}"))),
            Err(_) => {
                return Err(Error::ConnectFailed(format!(
                    "{host}: no answer within {:?}",
                    config.connect_timeout
                )))
            }
        };
        Ok(SshTransport::new(client, config.rpc_timeout))
    }
}

async fn resolve(config: &Config) -> Result<SocketAddr, Error> {
    if config.ip.is_empty() {
        return Err(Error::ConnectFailed("no server address is configured".to_string()));
    }
    let mut addrs = tokio::net::lookup_host((config.ip.as_str(), config.port))
        .await
        .map_err(|err| Error::ConnectFailed(format!("cannot resolve `{}`: {err}", config.ip)))?;
    addrs
        .next()
        .ok_or_else(|| Error::ConnectFailed(format!("no address found for `{}`", config.ip)))
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> SshTransport<S> {
    pub fn new(client: NetConfSshClient<S>, rpc_timeout: Duration) -> Self {
        Self {
            peer: client.peer(),
            client: Mutex::new(Some(client)),
            rpc_timeout,
        }
    }

    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> NetconfTransport for SshTransport<S> {
    async fn exec_raw(&self, payload: &str) -> Result<RpcReply, TransportError> {
        let peer = self.peer;
        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or(TransportError::SessionClosed)?;
        let request = client.request(RpcOperation::Raw(payload.into()));
        match tokio::time::timeout(self.rpc_timeout, request).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => {
                let err = TransportError::from(err);
                if matches!(err, TransportError::SessionClosed) {
                    tracing::debug!("[{peer}] Session closed by the peer");
                    guard.take();
                }
                Err(err)
            }
            Err(_) => {
                // A late reply would answer the next request, the session is unusable
                tracing::warn!(
                    "[{peer}] No reply within {:?}, dropping the session",
                    self.rpc_timeout
                );
                guard.take();
                Err(TransportError::Timeout(self.rpc_timeout))
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let Some(client) = self.client.lock().await.take() else {
            return Ok(());
        };
        tracing::debug!("[{}] Closing NETCONF session", self.peer);
        match tokio::time::timeout(self.rpc_timeout, client.close()).await {
            Ok(result) => result.map_err(TransportError::from),
            Err(_) => Err(TransportError::Timeout(self.rpc_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use ncxpath_netconf_proto::{
        capabilities::{Capability, NetconfVersion},
        codec::{Framing, SshCodec},
        protocol::{Hello, NetConfMessage, RpcReplyContent},
    };
    use std::collections::HashSet;
    use tokio::io::DuplexStream;
    use tokio_util::codec::Framed;

    /// NETCONF 1.1 server answering every RPC after `delay`
    async fn slow_server(stream: DuplexStream, delay: Duration) {
        let mut framed = Framed::new(stream, SshCodec::default());
        let hello = Hello::new(
            Some(7),
            HashSet::from([Capability::NetconfBase(NetconfVersion::V1_1)]),
        );
        framed
            .send(NetConfMessage::Hello(hello))
            .await
            .expect("failed to send hello");
        while let Some(Ok(msg)) = framed.next().await {
            match msg {
                NetConfMessage::Hello(_) => framed.codec_mut().set_framing(Framing::Chunked),
                NetConfMessage::Rpc(rpc) => {
                    tokio::time::sleep(delay).await;
                    let reply = RpcReply::new(Some(rpc.message_id().into()), RpcReplyContent::Ok);
                    if framed.send(NetConfMessage::RpcReply(reply)).await.is_err() {
                        break;
                    }
                }
                NetConfMessage::RpcReply(_) => panic!("unexpected reply sent to the server"),
            }
        }
    }

    #[test]
    fn test_session_closed_mapping() {
        assert!(matches!(
            TransportError::from(NetConfSshClientError::SessionClosed),
            TransportError::SessionClosed
        ));
        assert!(matches!(
            TransportError::from(NetConfSshClientError::SessionIdIsNotDefined),
            TransportError::Client(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_without_address() {
        let config = Config::default();
        let result = SshTransport::connect(&config).await;
        assert!(matches!(result, Err(Error::ConnectFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_drops_session() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let _server = tokio::spawn(slow_server(server_io, Duration::from_secs(5)));
        let peer = SocketAddr::from(([127, 0, 0, 1], 830));
        let client = NetConfSshClient::connect(peer, client_io)
            .await
            .expect("failed to connect");
        let transport = SshTransport::new(client, Duration::from_secs(2));

        let first = transport.exec_raw("<get/>").await;
        assert!(matches!(first, Err(TransportError::Timeout(timeout)) if timeout == Duration::from_secs(2)));
        // The late reply of the first request is never read as the reply of the second
        let second = transport.exec_raw("<get/>").await;
        assert!(matches!(second, Err(TransportError::SessionClosed)));
        transport.close().await.expect("closing a dropped session");
    }
}
