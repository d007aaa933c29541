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

//! Turn a data tree into `path value` lines.

use std::fmt;
use yang3::{data::DataNodeRef, iter::NodeIterable, schema::SchemaNodeKind};

/// One leaf or leaf-list entry of a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub xpath: String,
    pub value: String,
}

impl ResultLine {
    pub fn new(xpath: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
            value: value.into(),
        }
    }

    fn of(node: &DataNodeRef<'_>) -> Self {
        Self::new(node.path(), node.value_canonical().unwrap_or_default())
    }
}

impl fmt::Display for ResultLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.xpath, self.value)
    }
}

fn is_terminal(node: &DataNodeRef<'_>) -> bool {
    matches!(
        node.schema().kind(),
        SchemaNodeKind::Leaf | SchemaNodeKind::LeafList
    )
}

/// Walk the tree from `root` in document order, emitting a line for every
/// leaf and leaf-list entry.
///
/// With `scope_parent`, a node whose parent is not `scope_parent` ends the
/// walk of its sibling chain. The siblings of `root` are walked too.
pub fn flatten<'a>(
    root: DataNodeRef<'a>,
    first_match_only: bool,
    scope_parent: Option<DataNodeRef<'a>>,
) -> Vec<ResultLine> {
    let mut lines = vec![];
    let mut stack = vec![(root, scope_parent)];
    while let Some((node, scope)) = stack.pop() {
        let parent = node.parent();
        if scope.is_some() && parent != scope {
            continue;
        }
        if is_terminal(&node) {
            lines.push(ResultLine::of(&node));
            if first_match_only {
                break;
            }
        }
        // Children are popped before the next sibling
        if let Some(next) = node.next_sibling() {
            stack.push((next, parent));
        }
        if let Some(child) = node.first_child() {
            stack.push((child, Some(node)));
        }
    }
    lines
}

/// Lines of the subtree of one lookup match
pub fn flatten_match(node: DataNodeRef<'_>) -> Vec<ResultLine> {
    if is_terminal(&node) {
        return vec![ResultLine::of(&node)];
    }
    match node.first_child() {
        Some(child) => flatten(child, false, Some(node)),
        None => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::test_context, yang::parse_data};
    use rstest::rstest;
    use yang3::data::{Data, DataTree};

    const DATA: &str = r#"<system xmlns="urn:example:system">
  <hostname>r1</hostname>
  <dns-server>1.1.1.1</dns-server>
  <dns-server>8.8.8.8</dns-server>
  <user><name>alice</name><role>admin</role><profile><shell>zsh</shell></profile></user>
  <user><name>bob</name></user>
  <clock/>
</system>"#;

    fn lines(lines: &[ResultLine]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    fn root<'a>(tree: &'a DataTree<'a>) -> DataNodeRef<'a> {
        tree.reference().expect("not empty")
    }

    #[test]
    fn test_flatten_all() {
        let schema = test_context();
        let tree = parse_data(schema.context(), DATA).expect("valid data");
        assert_eq!(
            lines(&flatten(root(&tree), false, None)),
            vec![
                "/example-system:system/hostname r1",
                "/example-system:system/dns-server[.='1.1.1.1'] 1.1.1.1",
                "/example-system:system/dns-server[.='8.8.8.8'] 8.8.8.8",
                "/example-system:system/user[name='alice']/name alice",
                "/example-system:system/user[name='alice']/role admin",
                "/example-system:system/user[name='alice']/profile/shell zsh",
                "/example-system:system/user[name='bob']/name bob",
            ]
        );
    }

    #[test]
    fn test_flatten_first_match() {
        let schema = test_context();
        let tree = parse_data(schema.context(), DATA).expect("valid data");
        assert_eq!(
            lines(&flatten(root(&tree), true, None)),
            vec!["/example-system:system/hostname r1"]
        );
    }

    #[test]
    fn test_flatten_first_match_without_leaf() {
        let schema = test_context();
        let tree = parse_data(
            schema.context(),
            r#"<system xmlns="urn:example:system"><clock/></system>"#,
        )
        .expect("valid data");
        assert!(flatten(root(&tree), true, None).is_empty());
    }

    #[test]
    fn test_scope_stops_at_foreign_parent() {
        let schema = test_context();
        let tree = parse_data(schema.context(), DATA).expect("valid data");
        let users: Vec<_> = tree
            .find_xpath("/example-system:system/user")
            .expect("valid path")
            .collect();
        assert_eq!(users.len(), 2);
        // bob's entry is not a child of alice's, it is skipped with its siblings
        assert!(flatten(users[1].clone(), false, Some(users[0].clone())).is_empty());
    }

    #[rstest]
    #[case("/example-system:system/user[name='alice']", vec![
        "/example-system:system/user[name='alice']/name alice",
        "/example-system:system/user[name='alice']/role admin",
        "/example-system:system/user[name='alice']/profile/shell zsh",
    ])]
    #[case("/example-system:system/user[name='bob']", vec![
        "/example-system:system/user[name='bob']/name bob",
    ])]
    #[case("/example-system:system/hostname", vec!["/example-system:system/hostname r1"])]
    #[case("/example-system:system/user[name='alice']/profile", vec![
        "/example-system:system/user[name='alice']/profile/shell zsh",
    ])]
    #[case("/example-system:system/clock", vec![])]
    fn test_flatten_match(#[case] xpath: &str, #[case] expected: Vec<&str>) {
        let schema = test_context();
        let tree = parse_data(schema.context(), DATA).expect("valid data");
        let found: Vec<_> = tree.find_xpath(xpath).expect("valid path").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(lines(&flatten_match(found[0].clone())), expected);
    }

    #[test]
    fn test_flatten_leaf_list_matches() {
        let schema = test_context();
        let tree = parse_data(schema.context(), DATA).expect("valid data");
        let lines: Vec<String> = tree
            .find_xpath("/example-system:system/dns-server")
            .expect("valid path")
            .flat_map(flatten_match)
            .map(|line| line.to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "/example-system:system/dns-server[.='1.1.1.1'] 1.1.1.1",
                "/example-system:system/dns-server[.='8.8.8.8'] 8.8.8.8",
            ]
        );
    }

    #[test]
    fn test_long_sibling_chain() {
        let mut xml = String::from(r#"<system xmlns="urn:example:system">"#);
        for idx in 0..5_000 {
            xml.push_str(&format!("<dns-server>10.0.{}.{}</dns-server>", idx / 256, idx % 256));
        }
        xml.push_str("</system>");
        let schema = test_context();
        let tree = parse_data(schema.context(), &xml).expect("valid data");
        assert_eq!(flatten(root(&tree), false, None).len(), 5_000);
    }
}
