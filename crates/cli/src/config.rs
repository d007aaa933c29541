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

//! `config.json` handling, values may be overridden with `NCXPATH_`
//! prefixed environment variables.

use crate::error::Error;
use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use ncxpath_netconf_proto::client::SshAuth;
use serde_with::serde_as;
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

const ENV_PREFIX: &str = "NCXPATH_";

pub(crate) const fn default_port() -> u16 {
    830
}

pub(crate) fn default_datastore() -> String {
    "running".to_string()
}

pub(crate) const fn default_keepalive_interval() -> Duration {
    Duration::from_secs(18)
}

pub(crate) const fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

pub(crate) const fn default_rpc_timeout() -> Duration {
    Duration::from_secs(60)
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    #[serde(default)]
    pub ip: String,

    #[serde(default = "default_port")]
    #[serde_as(as = "serde_with::PickFirst<(_, serde_with::DisplayFromStr)>")]
    pub port: u16,

    #[serde(default = "default_datastore")]
    pub datastore: String,

    /// Authenticate with this key instead of the password, the password
    /// then unlocks the key.
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub private_key: Option<PathBuf>,

    #[serde(default = "default_keepalive_interval")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub keepalive_interval: Duration,

    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub connect_timeout: Duration,

    #[serde(default = "default_rpc_timeout")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub rpc_timeout: Duration,

    /// Directory of `.yang` files loaded before the device schemas
    #[serde(default, skip_serializing_if = "::std::option::Option::is_none")]
    pub yang_search_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            ip: String::new(),
            port: default_port(),
            datastore: default_datastore(),
            private_key: None,
            keepalive_interval: default_keepalive_interval(),
            connect_timeout: default_connect_timeout(),
            rpc_timeout: default_rpc_timeout(),
            yang_search_dir: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"***")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("datastore", &self.datastore)
            .field("private_key", &self.private_key)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("rpc_timeout", &self.rpc_timeout)
            .field("yang_search_dir", &self.yang_search_dir)
            .finish()
    }
}

impl Config {
    /// SSH credentials, loading the private key when one is configured
    pub fn ssh_auth(&self) -> Result<SshAuth, Error> {
        match &self.private_key {
            Some(path) => {
                let passphrase = (!self.password.is_empty()).then_some(self.password.as_str());
                let key = russh::keys::load_secret_key(path, passphrase).map_err(|err| {
                    Error::ConnectFailed(format!(
                        "cannot load private key {}: {err}",
                        path.display()
                    ))
                })?;
                Ok(SshAuth::Key {
                    user: self.username.clone(),
                    private_key: Arc::new(key),
                })
            }
            None => Ok(SshAuth::Password {
                user: self.username.clone(),
                password: secrecy::SecretBox::new(Box::new(self.password.clone())),
            }),
        }
    }
}

fn extract(figment: Figment) -> Result<Config, figment::Error> {
    figment.merge(Env::prefixed(ENV_PREFIX)).extract()
}

/// Load the configuration file.
///
/// A missing or malformed file is logged and the defaults are used, the run
/// then fails when connecting.
pub fn load_config(path: &Path) -> Config {
    let mut figment = Figment::new();
    if path.is_file() {
        figment = figment.merge(Json::file(path));
    } else {
        tracing::error!("Configuration file {} not found", path.display());
    }
    match extract(figment) {
        Ok(config) => {
            tracing::debug!("Loaded configuration {config:?}");
            config
        }
        Err(err) => {
            tracing::error!(
                "Parsing config file {} failed, using defaults: {err}",
                path.display()
            );
            Config::default()
        }
    }
}

/// `config.json` next to the executable
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.json")))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}
