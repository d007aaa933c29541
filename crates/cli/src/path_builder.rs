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

//! Build the deepest tree the schema allows for a query path.

use crate::xpath::XPath;
use yang3::{context::Context, data::DataTree};

/// Build a selection tree for the longest prefix of `xpath` that can be built
/// on its own. The path must already name the module of its first step.
///
/// Shorter prefixes are tried first and replaced by every deeper prefix that
/// builds. A failing prefix is expected (a list without its keys), the
/// following deeper prefixes are still tried.
pub fn resolve_prefix<'a>(ctx: &'a Context, xpath: &XPath) -> Option<DataTree<'a>> {
    let mut best = None;
    for len in 1..=xpath.len() {
        let Some(prefix) = xpath.prefix(len) else {
            break;
        };
        let candidate = prefix.to_string();
        let mut tree = DataTree::new(ctx);
        let built = tree.new_path(&candidate, None, false).map(|_| ());
        match built {
            Ok(()) => {
                tracing::trace!("Built selection tree for `{candidate}`");
                best = Some(tree);
            }
            Err(err) => tracing::trace!("Cannot build selection tree for `{candidate}`: {err}"),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::test_context, yang::to_xml};
    use rstest::rstest;

    fn deepest_path(tree: &DataTree<'_>) -> String {
        tree.traverse()
            .last()
            .expect("tree is not empty")
            .path()
    }

    fn qualified(ctx: &Context, path: &str) -> XPath {
        path.parse::<XPath>()
            .expect("valid path")
            .qualify(ctx)
            .expect("known top-level node")
    }

    #[rstest]
    #[case("/system/hostname", "/example-system:system/hostname")]
    #[case("/system", "/example-system:system")]
    #[case("/system/user", "/example-system:system")]
    #[case("/system/user/role", "/example-system:system")]
    #[case("/system/user[name='alice']/role", "/example-system:system/user[name='alice']/role")]
    #[case(
        "/system/user[name='alice']/profile/shell",
        "/example-system:system/user[name='alice']/profile/shell"
    )]
    #[case("/system/hostname/nope", "/example-system:system/hostname")]
    #[case("/system/clock/nope", "/example-system:system/clock")]
    #[case("/system/dns-server", "/example-system:system/dns-server")]
    fn test_resolve_prefix(#[case] path: &str, #[case] expected: &str) {
        let schema = test_context();
        let xpath = qualified(schema.context(), path);
        let tree = resolve_prefix(schema.context(), &xpath).expect("a prefix builds");
        assert_eq!(deepest_path(&tree), expected);
    }

    #[rstest]
    #[case("/nothing")]
    #[case("/nothing/hostname")]
    #[case("/example-system:nothing")]
    fn test_resolve_nothing(#[case] path: &str) {
        let schema = test_context();
        let xpath: XPath = path.parse().expect("valid path");
        assert!(resolve_prefix(schema.context(), &xpath).is_none());
    }

    #[test]
    fn test_leaf_is_selection_node() {
        let schema = test_context();
        let xpath = qualified(schema.context(), "/system/clock/timezone");
        let tree = resolve_prefix(schema.context(), &xpath).expect("a prefix builds");
        assert_eq!(
            to_xml(&tree).expect("printable"),
            r#"<system xmlns="urn:example:system"><clock><timezone/></clock></system>"#
        );
    }
}
