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

use clap::Parser;
use ncxpath_cli::{
    config::{default_config_path, load_config},
    materializer::Operation,
    session::Session,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Query or edit a NETCONF device with a YANG data path.
///
/// Without VALUE the data selected by XPATH is printed as `path value`
/// lines, with VALUE the leaf selected by XPATH is set in the configured
/// datastore.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Absolute data path, e.g., /system/user[name='alice']/role
    xpath: String,

    /// Value to write to the leaf selected by XPATH
    value: Option<String>,

    /// Configuration file, defaults to config.json next to the executable
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directives, RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);
    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = load_config(&config_path);
    let operation = Operation::from_value(args.value);

    let mut session = Session::connect(&config).await?;
    if let Err(err) = session.load_schema().await {
        if let Err(close_err) = session.close().await {
            tracing::warn!("Failed to close the NETCONF session: {close_err}");
        }
        return Err(err.into());
    }
    match session.execute(&args.xpath, &operation).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(err) => eprintln!("ERROR: {err}"),
    }
    if let Err(err) = session.close().await {
        tracing::warn!("Failed to close the NETCONF session: {err}");
    }
    Ok(())
}
