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

//! Dump the YANG schemas of a device into a directory, the directory can be
//! used as `yang_search_dir` to skip the schema download on later runs.

use anyhow::anyhow;
use clap::Parser;
use ncxpath_netconf_proto::{
    client::{connect, NetconfSshConnectConfig, SshAuth, SshHandler},
    monitoring::{parse_get_schema_reply, parse_schema_list, schemas_request, GetSchema},
    protocol::RpcOperation,
};
use std::{path::PathBuf, sync::Arc, time::Duration};

#[derive(clap::Parser, Debug)]
struct Args {
    #[arg(help = "Host address (IP:port or hostname:port)")]
    host: String,

    #[clap(short, long)]
    user: String,

    /// Password for authentication by username/password or the
    /// password for the key if provided.
    #[clap(short, long)]
    password: Option<String>,

    /// Path of the private key to be used in authentication
    #[clap(short, long)]
    key: Option<PathBuf>,

    /// Directory to write the `name@revision.yang` files to
    #[clap(short, long, default_value = "yang")]
    output: PathBuf,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let host = std::net::ToSocketAddrs::to_socket_addrs(&args.host)?
        .next()
        .ok_or_else(|| anyhow!("Failed to resolve host from: {}", &args.host))?;

    let ssh_config = russh::client::Config {
        inactivity_timeout: Some(Duration::from_secs(60)),
        ..<_>::default()
    };
    let config = NetconfSshConnectConfig::new(
        get_auth(&args)?,
        host,
        SshHandler::default(),
        Arc::new(ssh_config),
    );
    let mut client = connect(config).await?;
    tracing::info!("connected to {}", args.host);

    let reply = client
        .request(RpcOperation::Raw(schemas_request().into()))
        .await?;
    let responses = reply
        .reply()
        .responses()
        .ok_or_else(|| anyhow!("the device did not return the schema list"))?;
    let schemas = parse_schema_list(responses)?;
    tracing::info!("device lists {} schemas", schemas.len());

    std::fs::create_dir_all(&args.output)?;
    for schema in schemas.iter().filter(|schema| schema.is_yang()) {
        let payload = GetSchema::yang(schema).to_payload()?;
        let reply = client.request(RpcOperation::Raw(payload.into())).await?;
        let Some(responses) = reply.reply().responses() else {
            tracing::warn!("no source returned for `{}`", schema.identifier());
            continue;
        };
        let source = match parse_get_schema_reply(responses) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!("failed to read `{}`: {err}", schema.identifier());
                continue;
            }
        };
        let filename = if schema.version().is_empty() {
            format!("{}.yang", schema.identifier())
        } else {
            format!("{}@{}.yang", schema.identifier(), schema.version())
        };
        let path = args.output.join(filename);
        tracing::info!("writing yang module `{}` to {path:?}", schema.identifier());
        std::fs::write(&path, source.as_ref())?;
    }
    client.close().await?;
    Ok(())
}

fn get_auth(args: &Args) -> anyhow::Result<SshAuth> {
    let auth = if let Some(private_key_path) = &args.key {
        tracing::info!("Loading the private key at: {}", private_key_path.display());
        let private_key =
            russh::keys::load_secret_key(private_key_path, args.password.as_deref())?;
        SshAuth::Key {
            user: args.user.clone(),
            private_key: Arc::new(private_key),
        }
    } else if let Some(password) = &args.password {
        SshAuth::Password {
            user: args.user.clone(),
            password: secrecy::SecretBox::new(password.clone().into()),
        }
    } else {
        anyhow::bail!("Either username/password or username/private key need to be defined");
    };
    Ok(auth)
}
