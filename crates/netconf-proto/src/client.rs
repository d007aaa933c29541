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

//! NETCONF client session over an SSH `netconf` subsystem channel

use crate::{
    capabilities::{Capability, NetconfVersion},
    codec::{Framing, SshCodec, SshCodecError},
    protocol::{Hello, NetConfMessage, Rpc, RpcOperation, RpcReply},
};
use futures_util::{stream::StreamExt, SinkExt};
use secrecy::ExposeSecret;
use std::{collections::HashSet, net::SocketAddr, sync::Arc};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

/// First message id used on a new session
const INITIAL_MESSAGE_ID: u32 = 10110;

/// SSH client handler to enable certain behaviors in the russh::client
/// at the moment, this is simple implementation that accepts connections to all
/// servers.
///
/// TODO: extend the handler to handle known hosts or host certs checks
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SshHandler {}

impl russh::client::Handler for SshHandler {
    type Error = russh::Error;
    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Don't check the server public key
        Ok(true)
    }
}

/// This error type encapsulates all possible errors that can occur when using
/// the NetConfSshClient.
#[derive(Debug, strum::Display)]
pub enum NetConfSshClientError {
    #[strum(to_string = "SSH connection error {0}")]
    SshError(russh::Error),

    #[strum(to_string = "SSH codec error {0}")]
    SshCodec(SshCodecError),

    #[strum(to_string = "SSH authentication failed for user `{0}`")]
    AuthenticationFailed(String),

    #[strum(
        to_string = "Unexpected NETCONF message, expecting `{expected}` but received `{actual:?}`"
    )]
    UnexpectedMessage {
        expected: String,
        actual: Box<NetConfMessage>,
    },

    #[strum(
        to_string = "Session ID is not defined in the <hello> message received from the server"
    )]
    SessionIdIsNotDefined,

    #[strum(to_string = "NETCONF session is closed by the peer")]
    SessionClosed,
}

impl std::error::Error for NetConfSshClientError {}

impl From<SshCodecError> for NetConfSshClientError {
    fn from(err: SshCodecError) -> Self {
        NetConfSshClientError::SshCodec(err)
    }
}

impl From<russh::Error> for NetConfSshClientError {
    fn from(err: russh::Error) -> Self {
        NetConfSshClientError::SshError(err)
    }
}

/// SSH authentication methods supported by the NetConfSshClient
#[derive(Debug)]
pub enum SshAuth {
    /// Username/Password authentication
    Password {
        user: String,
        password: secrecy::SecretBox<String>,
    },
    /// UserName/Private key authentication
    Key {
        user: String,
        private_key: Arc<russh::keys::ssh_key::PrivateKey>,
    },
}

impl SshAuth {
    pub fn user(&self) -> &str {
        match self {
            SshAuth::Password { user, .. } | SshAuth::Key { user, .. } => user,
        }
    }
}

pub struct NetconfSshConnectConfig<H> {
    auth: SshAuth,
    host: SocketAddr,
    handler: H,
    config: Arc<russh::client::Config>,
}

impl<H: russh::client::Handler> NetconfSshConnectConfig<H> {
    pub const fn new(
        auth: SshAuth,
        host: SocketAddr,
        handler: H,
        config: Arc<russh::client::Config>,
    ) -> Self {
        Self {
            auth,
            host,
            handler,
            config,
        }
    }

    pub const fn auth(&self) -> &SshAuth {
        &self.auth
    }

    pub const fn host(&self) -> SocketAddr {
        self.host
    }

    pub const fn handler(&self) -> &H {
        &self.handler
    }

    pub fn config(&self) -> &russh::client::Config {
        self.config.as_ref()
    }
}

/// Open an SSH session, authenticate, request the `netconf` subsystem and
/// run the `<hello>` exchange.
pub async fn connect<H: russh::client::Handler + 'static>(
    config: NetconfSshConnectConfig<H>,
) -> Result<NetConfSshClient<russh::ChannelStream<russh::client::Msg>>, NetConfSshClientError>
where
    NetConfSshClientError: From<<H as russh::client::Handler>::Error>,
{
    let peer = config.host;
    tracing::debug!("[{peer}] Initiating TCP connection");
    let mut session = russh::client::connect(config.config, config.host, config.handler).await?;
    tracing::debug!("[{peer}] TCP connected");

    let (user, auth_result) = match &config.auth {
        SshAuth::Password { user, password } => {
            tracing::debug!("[{peer}] Using password authentication for user `{user}`");
            (
                user,
                session
                    .authenticate_password(user, password.expose_secret())
                    .await?,
            )
        }
        SshAuth::Key { user, private_key } => {
            tracing::debug!("[{peer}] Using private key authentication for user `{user}`");
            let private_key = russh::keys::PrivateKeyWithHashAlg::new(
                Arc::clone(private_key),
                session.best_supported_rsa_hash().await?.flatten(),
            );
            tracing::debug!(
                "[{peer}] Negotiated private key and using `{}` hashing algorithm",
                private_key.algorithm()
            );
            (
                user,
                session.authenticate_publickey(user, private_key).await?,
            )
        }
    };
    if !auth_result.success() {
        tracing::error!("[{peer}] Authentication failed");
        return Err(NetConfSshClientError::AuthenticationFailed(user.clone()));
    }
    tracing::debug!(
        "[{peer}] Authentication successful to `{user}@{}`, requesting the NETCONF subsystem",
        config.host
    );
    let channel = session.channel_open_session().await?;
    channel.request_subsystem(true, "netconf").await?;
    tracing::info!(
        "[{peer}] NETCONF subsystem connected to `{user}@{}`",
        config.host
    );
    let stream = channel.into_stream();
    NetConfSshClient::connect(config.host, stream).await
}

pub struct NetConfSshClient<T> {
    /// Address of NETCONF server
    peer: SocketAddr,

    /// Bidirectional channel to the NETCONF peer
    framed: Framed<T, SshCodec>,

    /// Capabilities announced by the NETCONF peer
    peer_caps: HashSet<Capability>,

    /// Session ID assigned by the NETCONF server
    session_id: u32,

    /// Keep track of the message IDs sent to the peer
    next_message_id: u32,
}

impl<T> NetConfSshClient<T> {
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub const fn peer_caps(&self) -> &HashSet<Capability> {
        &self.peer_caps
    }

    pub const fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn framing(&self) -> Framing {
        self.framed.codec().framing()
    }

    pub const fn next_message_id(&mut self) -> u32 {
        let ret = self.next_message_id;
        self.next_message_id += 1;
        ret
    }
}

/// Capabilities announced by this client
fn client_capabilities() -> HashSet<Capability> {
    HashSet::from([
        Capability::NetconfBase(NetconfVersion::V1_0),
        Capability::NetconfBase(NetconfVersion::V1_1),
    ])
}

impl<T: AsyncRead + AsyncWrite + Unpin> NetConfSshClient<T> {
    async fn exchange_hello(
        framed: &mut Framed<T, SshCodec>,
    ) -> Result<(u32, HashSet<Capability>), NetConfSshClientError> {
        // Both ends send their hello without waiting for the peer's one
        let hello = NetConfMessage::Hello(Hello::new(None, client_capabilities()));
        framed.send(hello).await?;
        let msg = framed
            .next()
            .await
            .ok_or(NetConfSshClientError::SessionClosed)??;
        let received_hello = match msg {
            NetConfMessage::Hello(hello) => hello,
            msg => {
                return Err(NetConfSshClientError::UnexpectedMessage {
                    expected: "hello".to_string(),
                    actual: Box::new(msg),
                });
            }
        };
        let session_id = received_hello
            .session_id()
            .ok_or(NetConfSshClientError::SessionIdIsNotDefined)?;
        Ok((session_id, received_hello.capabilities().clone()))
    }

    pub async fn connect(peer: SocketAddr, stream: T) -> Result<Self, NetConfSshClientError> {
        let mut framed = Framed::new(stream, SshCodec::default());
        let (session_id, peer_caps) = Self::exchange_hello(&mut framed).await?;
        tracing::info!(
            "[{peer}] NETCONF session {session_id} established using {} framing",
            framed.codec().framing()
        );
        Ok(Self {
            peer,
            framed,
            peer_caps,
            session_id,
            next_message_id: INITIAL_MESSAGE_ID,
        })
    }

    pub async fn rpc(
        &mut self,
        operation: RpcOperation,
    ) -> Result<Box<str>, NetConfSshClientError> {
        let message_id = self.next_message_id().to_string().into_boxed_str();
        let rpc = Rpc::new(message_id.clone(), operation);
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(
                "[{}] Sending RPC Request with message id `{}` and payload `{rpc:?}`",
                self.peer,
                message_id
            );
        }
        self.framed.send(NetConfMessage::Rpc(rpc)).await?;
        Ok(message_id)
    }

    pub async fn rpc_reply(&mut self) -> Result<RpcReply, NetConfSshClientError> {
        let msg = self.framed.next().await;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("[{}] Received NETCONF message: `{msg:?}`", self.peer);
        }
        match msg {
            None => {
                tracing::warn!("[{}] Broken connection", self.peer);
                Err(NetConfSshClientError::SessionClosed)
            }
            Some(Ok(NetConfMessage::RpcReply(reply))) => Ok(reply),
            Some(Ok(msg)) => Err(NetConfSshClientError::UnexpectedMessage {
                expected: "<rpc-reply>".to_string(),
                actual: Box::new(msg),
            }),
            Some(Err(e)) => Err(e.into()),
        }
    }

    /// Send one RPC and wait for its reply
    pub async fn request(
        &mut self,
        operation: RpcOperation,
    ) -> Result<RpcReply, NetConfSshClientError> {
        let message_id = self.rpc(operation).await?;
        let reply = self.rpc_reply().await?;
        self.validate_message_id(&message_id, &reply)?;
        Ok(reply)
    }

    pub async fn close(mut self) -> Result<(), NetConfSshClientError> {
        let message_id = self.next_message_id().to_string().into_boxed_str();
        tracing::debug!(
            "[{}] sending close message RPC with id `{message_id}`",
            self.peer
        );
        self.framed
            .send(NetConfMessage::Rpc(Rpc::new(
                message_id,
                RpcOperation::CloseSession,
            )))
            .await?;
        let reply = self.rpc_reply().await?;
        if reply.reply().is_ok() {
            tracing::debug!("[{}] received ok response to close connection", self.peer);
        } else {
            tracing::warn!(
                "[{}] received unexpected response to close connection: {reply:?}",
                self.peer
            );
            return Err(NetConfSshClientError::UnexpectedMessage {
                expected: "ok".to_string(),
                actual: Box::new(NetConfMessage::RpcReply(reply)),
            });
        }
        self.framed.close().await?;
        tracing::info!("[{}] gracefully closed connection", self.peer);
        Ok(())
    }

    /// Helper to validate message ID matches between request and reply
    fn validate_message_id(
        &self,
        expected_id: &str,
        reply: &RpcReply,
    ) -> Result<(), NetConfSshClientError> {
        let received_id = reply.message_id().unwrap_or(expected_id);
        if expected_id != received_id {
            Err(NetConfSshClientError::UnexpectedMessage {
                expected: format!("<rpc-reply message-id=\"{expected_id}\">"),
                actual: Box::new(NetConfMessage::RpcReply(reply.clone())),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RpcReplyContent;
    use tokio::io::DuplexStream;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 830))
    }

    fn server_hello(version: NetconfVersion) -> NetConfMessage {
        NetConfMessage::Hello(Hello::new(
            Some(7),
            HashSet::from([Capability::NetconfBase(version)]),
        ))
    }

    /// Minimal NETCONF server answering every RPC with `reply_with`
    async fn run_server(
        stream: DuplexStream,
        version: NetconfVersion,
        reply_with: impl Fn(&Rpc) -> RpcReply,
    ) -> Vec<Rpc> {
        let mut framed = Framed::new(stream, SshCodec::default());
        framed
            .send(server_hello(version))
            .await
            .expect("failed to send hello");
        let mut received = vec![];
        while let Some(Ok(msg)) = framed.next().await {
            match msg {
                NetConfMessage::Hello(_) => {
                    // the server side codec follows the client announcement,
                    // force the version the server announced
                    let framing = match version {
                        NetconfVersion::V1_0 => Framing::EndOfMessage,
                        NetconfVersion::V1_1 => Framing::Chunked,
                    };
                    framed.codec_mut().set_framing(framing);
                }
                NetConfMessage::Rpc(rpc) => {
                    let close = matches!(rpc.operation(), RpcOperation::CloseSession);
                    let reply = reply_with(&rpc);
                    received.push(rpc);
                    framed
                        .send(NetConfMessage::RpcReply(reply))
                        .await
                        .expect("failed to send reply");
                    if close {
                        break;
                    }
                }
                NetConfMessage::RpcReply(_) => panic!("unexpected reply sent to the server"),
            }
        }
        received
    }

    fn echo_ok(rpc: &Rpc) -> RpcReply {
        RpcReply::new(Some(rpc.message_id().into()), RpcReplyContent::Ok)
    }

    #[tokio::test]
    async fn test_hello_negotiates_framing() {
        for (version, framing) in [
            (NetconfVersion::V1_0, Framing::EndOfMessage),
            (NetconfVersion::V1_1, Framing::Chunked),
        ] {
            let (client_io, server_io) = tokio::io::duplex(64 * 1024);
            let server = tokio::spawn(run_server(server_io, version, echo_ok));
            let client = NetConfSshClient::connect(peer(), client_io)
                .await
                .expect("failed to connect");
            assert_eq!(client.session_id(), 7);
            assert_eq!(client.framing(), framing);
            client.close().await.expect("failed to close");
            let received = server.await.expect("server task failed");
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].message_id(), "10110");
        }
    }

    #[tokio::test]
    async fn test_request_reply() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(run_server(server_io, NetconfVersion::V1_1, |rpc| {
            match rpc.operation() {
                RpcOperation::CloseSession => echo_ok(rpc),
                RpcOperation::Raw(_) => RpcReply::new(
                    Some(rpc.message_id().into()),
                    RpcReplyContent::ErrorsAndData {
                        errors: vec![],
                        responses: r#"<data><system xmlns="urn:example:system"><hostname>router1</hostname></system></data>"#.into(),
                    },
                ),
            }
        }));
        let mut client = NetConfSshClient::connect(peer(), client_io)
            .await
            .expect("failed to connect");
        let reply = client
            .request(RpcOperation::Raw("<get/>".into()))
            .await
            .expect("request failed");
        let responses = reply.reply().responses().expect("expected data");
        assert!(responses.contains("<hostname>router1</hostname>"));
        client.close().await.expect("failed to close");
        let received = server.await.expect("server task failed");
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].operation(), &RpcOperation::CloseSession);
    }

    #[tokio::test]
    async fn test_mismatched_message_id() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let _server = tokio::spawn(run_server(server_io, NetconfVersion::V1_1, |_| {
            RpcReply::new(Some("1".into()), RpcReplyContent::Ok)
        }));
        let mut client = NetConfSshClient::connect(peer(), client_io)
            .await
            .expect("failed to connect");
        let result = client.request(RpcOperation::Raw("<get/>".into())).await;
        assert!(matches!(
            result,
            Err(NetConfSshClientError::UnexpectedMessage { .. })
        ));
    }

    #[tokio::test]
    async fn test_peer_closed() {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        drop(server_io);
        let result = NetConfSshClient::connect(peer(), client_io).await;
        assert!(result.is_err());
    }
}
