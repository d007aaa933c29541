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

//! One run of the tool: connect, load the device schemas, execute one
//! operation and close the session.

use crate::{
    config::Config,
    envelope::{build_request, check_reply, extract_data_payload},
    error::Error,
    flatten::{flatten_match, ResultLine},
    materializer::{build_fragment, resolve_path, Operation},
    transport::{NetconfTransport, SshTransport, TransportError},
    yang::{parse_data, to_xml, ModuleFile, SchemaContext, SchemaError},
};
use ncxpath_netconf_proto::monitoring::{
    parse_get_schema_reply, parse_schema_list, schemas_request, GetSchema, Schema,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use yang3::data::Data;

/// No-op operation keeping the session alive, the device answers it with an
/// `<rpc-error>` that is ignored.
pub const KEEPALIVE_PAYLOAD: &str = "<keep-alive/>";

#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum SessionState {
    Disconnected,
    Authenticated,
    SchemaLoaded,
    OperationComplete,
    Closed,
}

/// Outcome of the schema discovery
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaLoadReport {
    /// Modules in the order they were loaded
    pub loaded: Vec<String>,
    /// Modules that could not be fetched or parsed, with the reason
    pub skipped: Vec<(String, String)>,
}

impl SchemaLoadReport {
    fn skip(&mut self, module: &str, reason: String) {
        let err = Error::ModuleParseFailed {
            module: module.to_string(),
            reason: reason.clone(),
        };
        tracing::warn!("{err}");
        self.skipped.push((module.to_string(), reason));
    }
}

/// Background task sending [KEEPALIVE_PAYLOAD] periodically
#[derive(Debug)]
struct KeepAlive {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl KeepAlive {
    fn spawn<T: NetconfTransport + 'static>(transport: Arc<T>, interval: Duration) -> Self {
        // A zero period panics in tokio::time::interval
        let interval = interval.max(Duration::from_secs(1));
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        tracing::debug!("Keep-alive cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        match transport.exec_raw(KEEPALIVE_PAYLOAD).await {
                            Ok(_) => tracing::trace!("Keep-alive sent"),
                            Err(TransportError::SessionClosed) => {
                                tracing::debug!("Session is closed, stopping keep-alive");
                                break;
                            }
                            Err(err) => tracing::debug!("Keep-alive failed: {err}"),
                        }
                    }
                }
            }
        });
        Self { token, handle }
    }

    async fn stop(&mut self) {
        self.token.cancel();
        if let Err(err) = (&mut self.handle).await {
            tracing::warn!("Keep-alive task failed: {err}");
        }
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct Session<T> {
    transport: Arc<T>,
    state: SessionState,
    schema: Option<SchemaContext>,
    datastore: String,
    keepalive_interval: Duration,
    yang_search_dir: Option<PathBuf>,
    keepalive: Option<KeepAlive>,
}

impl Session<SshTransport> {
    /// Connect and authenticate to the device of `config`
    pub async fn connect(config: &Config) -> Result<Self, Error> {
        let transport = SshTransport::connect(config).await?;
        Ok(Session::new(transport, config))
    }
}

impl<T: NetconfTransport + 'static> Session<T> {
    /// Session over an authenticated transport
    pub fn new(transport: T, config: &Config) -> Self {
        Self {
            transport: Arc::new(transport),
            state: SessionState::Authenticated,
            schema: None,
            datastore: config.datastore.clone(),
            keepalive_interval: config.keepalive_interval,
            yang_search_dir: config.yang_search_dir.clone(),
            keepalive: None,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn schema(&self) -> Option<&SchemaContext> {
        self.schema.as_ref()
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("Session state {} -> {next}", self.state);
        self.state = next;
    }

    /// Load the modules of the search directory, then every YANG schema the
    /// device lists, and start the keep-alive.
    ///
    /// All sources are fetched before any module is loaded, so a module
    /// finds its imports whatever order the device lists them in.
    pub async fn load_schema(&mut self) -> Result<SchemaLoadReport, Error> {
        let mut schema =
            SchemaContext::new().map_err(|err| Error::SchemaDiscoveryFailed(err.to_string()))?;
        let mut report = SchemaLoadReport::default();
        let mut pending: Vec<ModuleFile> = vec![];
        if let Some(dir) = &self.yang_search_dir {
            match schema.add_search_dir(dir) {
                Ok(modules) => {
                    tracing::info!("Found {} YANG modules in {}", modules.len(), dir.display());
                    pending.extend(modules);
                }
                Err(err) => tracing::warn!(
                    "Cannot read the YANG search directory {}: {err}",
                    dir.display()
                ),
            }
        }
        let schemas = self.discover_schemas().await?;
        tracing::info!("Device lists {} schemas", schemas.len());
        for entry in &schemas {
            if !entry.is_yang() {
                tracing::debug!(
                    "Skipping schema `{}` in format `{}`",
                    entry.identifier(),
                    entry.format()
                );
                continue;
            }
            let module = ModuleFile::new(entry.identifier(), Some(entry.version()));
            if pending.iter().any(|known| known.name() == module.name()) {
                tracing::debug!("YANG module `{}` is already available", module.name());
                continue;
            }
            let stored = match self.fetch_module(entry).await {
                Ok(source) => schema.store(&module, &source),
                Err(reason) => {
                    report.skip(module.name(), reason);
                    continue;
                }
            };
            match stored {
                Ok(()) => pending.push(module),
                Err(SchemaError::Submodule(name)) => {
                    tracing::debug!("Stored submodule `{name}` for its module")
                }
                Err(err) => report.skip(module.name(), err.to_string()),
            }
        }
        for module in &pending {
            match schema.load(module) {
                Ok(name) => report.loaded.push(name),
                Err(err) => report.skip(module.name(), err.to_string()),
            }
        }
        tracing::info!(
            "Schema loaded: {} modules, {} skipped",
            report.loaded.len(),
            report.skipped.len()
        );
        self.schema = Some(schema);
        self.transition(SessionState::SchemaLoaded);
        self.keepalive = Some(KeepAlive::spawn(
            Arc::clone(&self.transport),
            self.keepalive_interval,
        ));
        Ok(report)
    }

    async fn discover_schemas(&self) -> Result<Vec<Schema>, Error> {
        let discovery_failed = Error::SchemaDiscoveryFailed;
        let reply = self
            .transport
            .exec_raw(&schemas_request())
            .await
            .map_err(|err| discovery_failed(err.to_string()))?;
        check_reply(&reply).map_err(|err| discovery_failed(err.to_string()))?;
        let responses = reply
            .reply()
            .responses()
            .ok_or_else(|| discovery_failed("the reply carries no data".to_string()))?;
        parse_schema_list(responses).map_err(|err| discovery_failed(err.to_string()))
    }

    async fn fetch_module(&self, schema: &Schema) -> Result<String, String> {
        tracing::debug!(
            "Fetching YANG module `{}` revision `{}`",
            schema.identifier(),
            schema.version()
        );
        let payload = GetSchema::yang(schema)
            .to_payload()
            .map_err(|err| err.to_string())?;
        let reply = self
            .transport
            .exec_raw(&payload)
            .await
            .map_err(|err| err.to_string())?;
        check_reply(&reply).map_err(|err| err.to_string())?;
        let responses = reply
            .reply()
            .responses()
            .ok_or_else(|| "the reply carries no schema".to_string())?;
        parse_get_schema_reply(responses).map_err(|err| err.to_string())
    }

    /// Run one operation, returns the result lines of a query
    pub async fn execute(
        &mut self,
        path: &str,
        operation: &Operation,
    ) -> Result<Vec<ResultLine>, Error> {
        let result = self.run_operation(path, operation).await;
        self.transition(SessionState::OperationComplete);
        result
    }

    async fn run_operation(
        &self,
        path: &str,
        operation: &Operation,
    ) -> Result<Vec<ResultLine>, Error> {
        let schema = self.schema.as_ref().ok_or_else(|| Error::ConstructionFailed {
            path: path.to_string(),
            reason: "no schema is loaded".to_string(),
        })?;
        let ctx = schema.context();
        let xpath = resolve_path(ctx, path)?;
        // The fragment is freed before waiting for the device
        let serialized = {
            let fragment = build_fragment(ctx, &xpath, operation)?;
            to_xml(&fragment).map_err(|err| Error::ConstructionFailed {
                path: path.to_string(),
                reason: err.to_string(),
            })?
        };
        let request = build_request(operation, &serialized, &self.datastore)?;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!("Sending {request}");
        }
        let reply = self.transport.exec_raw(&request).await?;
        check_reply(&reply)?;
        match operation {
            Operation::Mutate { .. } => {
                tracing::info!("`{path}` updated in the {} datastore", self.datastore);
                Ok(vec![])
            }
            Operation::Query => {
                let responses = reply.reply().responses().ok_or(Error::NoReplyPayload)?;
                let payload = extract_data_payload(responses)?;
                let tree = parse_data(ctx, &payload)
                    .map_err(|err| Error::ReplyParseFailed(err.to_string()))?;
                if tree.reference().is_none() {
                    return Err(Error::NoMatchFound(path.to_string()));
                }
                let matches: Vec<_> = tree
                    .find_xpath(&xpath.to_string())
                    .map_err(|err| Error::ReplyParseFailed(err.to_string()))?
                    .collect();
                if matches.is_empty() {
                    return Err(Error::NoMatchFound(path.to_string()));
                }
                let lines = matches.into_iter().flat_map(flatten_match).collect();
                Ok(lines)
            }
        }
    }

    /// Stop the keep-alive, drop the schema and close the NETCONF session.
    ///
    /// Closing an already closed session does nothing.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        if let Some(mut keepalive) = self.keepalive.take() {
            keepalive.stop().await;
        }
        self.schema = None;
        let result = self.transport.close().await;
        self.transition(SessionState::Closed);
        result.map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncxpath_netconf_proto::protocol::{RpcReply, RpcReplyContent};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl RecordingTransport {
        fn count(&self, payload: &str) -> usize {
            self.requests
                .lock()
                .expect("poisoned")
                .iter()
                .filter(|request| request.as_str() == payload)
                .count()
        }
    }

    impl NetconfTransport for RecordingTransport {
        async fn exec_raw(&self, payload: &str) -> Result<RpcReply, TransportError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(TransportError::SessionClosed);
            }
            self.requests.lock().expect("poisoned").push(payload.to_string());
            Ok(RpcReply::new(Some("1".into()), RpcReplyContent::Ok))
        }

        async fn close(&self) -> Result<(), TransportError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_interval() {
        let transport = Arc::new(RecordingTransport::default());
        let mut keepalive = KeepAlive::spawn(Arc::clone(&transport), Duration::from_secs(18));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.count(KEEPALIVE_PAYLOAD), 0);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.count(KEEPALIVE_PAYLOAD), 2);
        keepalive.stop().await;
        assert!(keepalive.handle.is_finished());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.count(KEEPALIVE_PAYLOAD), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_stops_on_closed_session() {
        let transport = Arc::new(RecordingTransport::default());
        let keepalive = KeepAlive::spawn(Arc::clone(&transport), Duration::from_secs(18));
        transport.close().await.expect("close");
        tokio::time::sleep(Duration::from_secs(20)).await;
        tokio::task::yield_now().await;
        assert!(keepalive.handle.is_finished());
        assert_eq!(transport.count(KEEPALIVE_PAYLOAD), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_execute_without_schema() {
        let mut session = Session::new(RecordingTransport::default(), &Config::default());
        assert_eq!(session.state(), SessionState::Authenticated);
        let result = session.execute("/system/hostname", &Operation::Query).await;
        assert!(matches!(result, Err(Error::ConstructionFailed { .. })));
        assert_eq!(session.state(), SessionState::OperationComplete);
        assert!(logs_contain("Session state Authenticated -> OperationComplete"));
        session.close().await.expect("close");
        assert_eq!(session.state(), SessionState::Closed);
        session.close().await.expect("closing twice");
    }
}
