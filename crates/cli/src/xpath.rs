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

//! Absolute data paths as typed on the command line,
//! e.g., `/system/user[name='alice']/role`.
//!
//! Steps are split on `/` outside predicates and quotes. Predicates are kept
//! verbatim and handed to libyang as written.

use std::{fmt, str::FromStr};
use yang3::context::Context;

#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum PathError {
    #[strum(to_string = "the path must start with `/`")]
    NotAbsolute,

    #[strum(to_string = "step {0} has no node name")]
    EmptyStep(usize),

    #[strum(to_string = "step {0} has an invalid node name `{1}`")]
    InvalidName(usize, String),

    #[strum(to_string = "unbalanced brackets or quotes")]
    Unbalanced,
}

impl std::error::Error for PathError {}

/// One step of a path: an optional module name, the node name and the
/// predicates that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    module: Option<String>,
    name: String,
    predicates: String,
}

impl Step {
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn predicates(&self) -> &str {
        &self.predicates
    }

    fn parse(idx: usize, text: &str) -> Result<Self, PathError> {
        let (head, predicates) = match text.find('[') {
            Some(pos) => text.split_at(pos),
            None => (text, ""),
        };
        if !predicates.is_empty() && !predicates.ends_with(']') {
            return Err(PathError::Unbalanced);
        }
        let (module, name) = match head.split_once(':') {
            Some((module, name)) => (Some(module), name),
            None => (None, head),
        };
        if name.is_empty() {
            return Err(PathError::EmptyStep(idx));
        }
        if !is_identifier(name) || module.is_some_and(|module| !is_identifier(module)) {
            return Err(PathError::InvalidName(idx, head.to_string()));
        }
        Ok(Self {
            module: module.map(str::to_string),
            name: name.to_string(),
            predicates: predicates.to_string(),
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(module) = &self.module {
            write!(f, "{module}:")?;
        }
        write!(f, "{}{}", self.name, self.predicates)
    }
}

/// YANG identifier: `[a-zA-Z_][a-zA-Z0-9_.-]*`
fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

/// Split the text after the leading `/` into steps
fn split_steps(path: &str) -> Result<Vec<&str>, PathError> {
    let rest = path.strip_prefix('/').ok_or(PathError::NotAbsolute)?;
    let mut steps = vec![];
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (idx, ch) in rest.char_indices() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1).ok_or(PathError::Unbalanced)?,
            (None, '/') if depth == 0 => {
                steps.push(&rest[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth > 0 || quote.is_some() {
        return Err(PathError::Unbalanced);
    }
    steps.push(&rest[start..]);
    Ok(steps)
}

/// A parsed absolute path, never empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    steps: Vec<Step>,
}

impl XPath {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The first `len` steps, `None` when `len` is zero or too large
    pub fn prefix(&self, len: usize) -> Option<XPath> {
        if len == 0 || len > self.steps.len() {
            return None;
        }
        Some(XPath {
            steps: self.steps[..len].to_vec(),
        })
    }

    /// The path without predicates, it addresses schema nodes
    pub fn schema_path(&self) -> String {
        self.steps
            .iter()
            .map(|step| match &step.module {
                Some(module) => format!("/{module}:{}", step.name),
                None => format!("/{}", step.name),
            })
            .collect()
    }

    /// Name the module of the first step when the path does not.
    ///
    /// libyang expects the first step of a data path to carry its module
    /// name, the owner is the only loaded module defining a top-level node
    /// with that name.
    pub fn qualify(mut self, ctx: &Context) -> Result<XPath, String> {
        let owner = {
            let Some(first) = self.steps.first() else {
                return Ok(self);
            };
            if first.module.is_some() {
                return Ok(self);
            }
            let mut owners = ctx
                .modules(false)
                .map(|module| module.name().to_string())
                .filter(|module| ctx.find_path(&format!("/{module}:{}", first.name)).is_ok());
            match (owners.next(), owners.next()) {
                (Some(owner), None) => owner,
                (None, _) => {
                    return Err(format!(
                        "no loaded module defines a top-level node `{}`",
                        first.name
                    ))
                }
                (Some(one), Some(other)) => {
                    return Err(format!(
                        "`{name}` is defined by several modules ({one}, {other}), write it as `module:{name}`",
                        name = first.name
                    ))
                }
            }
        };
        self.steps[0].module = Some(owner);
        Ok(self)
    }
}

impl FromStr for XPath {
    type Err = PathError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let steps = split_steps(path)?
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Step::parse(idx, text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(XPath { steps })
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}
