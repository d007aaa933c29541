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

use crate::{error::Error, path_builder::resolve_prefix, xpath::XPath};
use yang3::{context::Context, data::DataTree, schema::SchemaNodeKind};

/// The operation requested on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Read the data selected by the path
    Query,
    /// Set the leaf or leaf-list selected by the path
    Mutate { value: String },
}

impl Operation {
    pub fn from_value(value: Option<String>) -> Self {
        match value {
            Some(value) => Operation::Mutate { value },
            None => Operation::Query,
        }
    }
}

fn construction_failed(path: &str, reason: impl ToString) -> Error {
    Error::ConstructionFailed {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse `path`, name the module of its first step and check that every step
/// is a node of the loaded schemas. Nothing is sent to the device for a path
/// that fails here.
pub fn resolve_path(ctx: &Context, path: &str) -> Result<XPath, Error> {
    let xpath = path
        .parse::<XPath>()
        .map_err(|err| construction_failed(path, err))?
        .qualify(ctx)
        .map_err(|err| construction_failed(path, err))?;
    ctx.find_path(&xpath.schema_path())
        .map_err(|err| construction_failed(path, err))?;
    Ok(xpath)
}

/// Only configuration leaves and leaf-lists take a value
fn check_editable(ctx: &Context, xpath: &XPath) -> Result<(), Error> {
    let path = xpath.to_string();
    let node = ctx
        .find_path(&xpath.schema_path())
        .map_err(|err| construction_failed(&path, err))?;
    if !matches!(node.kind(), SchemaNodeKind::Leaf | SchemaNodeKind::LeafList) {
        return Err(construction_failed(
            &path,
            format!("`{}` is not a leaf or leaf-list", node.name()),
        ));
    }
    if !node.is_config() {
        return Err(construction_failed(
            &path,
            format!("`{}` is state data", node.name()),
        ));
    }
    Ok(())
}

/// Build the tree fragment sent to the device for `operation` on a path
/// returned by [resolve_path]
pub fn build_fragment<'a>(
    ctx: &'a Context,
    xpath: &XPath,
    operation: &Operation,
) -> Result<DataTree<'a>, Error> {
    match operation {
        Operation::Mutate { value } => {
            check_editable(ctx, xpath)?;
            let path = xpath.to_string();
            let mut tree = DataTree::new(ctx);
            let built = tree.new_path(&path, Some(value), false).map(|_| ());
            built.map_err(|err| construction_failed(&path, err))?;
            Ok(tree)
        }
        Operation::Query => resolve_prefix(ctx, xpath).ok_or_else(|| {
            construction_failed(
                &xpath.to_string(),
                "no part of the path matches the loaded schemas",
            )
        }),
    }
}
