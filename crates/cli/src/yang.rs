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

//! The YANG schema of one session, backed by a libyang context.
//!
//! Modules fetched from the device are written to a private directory the
//! context searches, so imports between them resolve whatever order the
//! device lists them in. The directory is removed with the
//! [SchemaContext].

use std::{
    fs, io,
    path::Path,
    sync::Once,
};
use tempfile::TempDir;
use yang3::{
    context::{Context, ContextFlags},
    data::{Data, DataFormat, DataParserFlags, DataPrinterFlags, DataTree, DataValidationFlags},
};

static QUIET_LIBYANG: Once = Once::new();

#[derive(Debug, strum_macros::Display)]
pub enum SchemaError {
    #[strum(to_string = "I/O error: {0}")]
    Io(io::Error),

    #[strum(to_string = "{0}")]
    Engine(yang3::Error),

    #[strum(to_string = "`{0}` is a submodule, it is loaded with its module")]
    Submodule(String),
}

impl std::error::Error for SchemaError {}

impl From<io::Error> for SchemaError {
    fn from(err: io::Error) -> Self {
        SchemaError::Io(err)
    }
}

impl From<yang3::Error> for SchemaError {
    fn from(err: yang3::Error) -> Self {
        SchemaError::Engine(err)
    }
}

/// A module as libyang looks it up: `name.yang` or `name@revision.yang`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    name: String,
    revision: Option<String>,
}

impl ModuleFile {
    /// An empty revision is the same as no revision
    pub fn new(name: &str, revision: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            revision: revision
                .filter(|revision| !revision.is_empty())
                .map(str::to_string),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".yang")?;
        let (name, revision) = match stem.split_once('@') {
            Some((name, revision)) => (name, Some(revision)),
            None => (stem, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, revision))
    }

    pub fn file_name(&self) -> String {
        match &self.revision {
            Some(revision) => format!("{}@{revision}.yang", self.name),
            None => format!("{}.yang", self.name),
        }
    }
}

/// Whether the first statement of a YANG source is `submodule`
fn is_submodule(source: &str) -> bool {
    let mut rest = source.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("//") {
            rest = comment.split_once('\n').map_or("", |(_, next)| next).trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, next)| next).trim_start();
        } else {
            break;
        }
    }
    rest.strip_prefix("submodule")
        .is_some_and(|next| next.starts_with(char::is_whitespace))
}

pub struct SchemaContext {
    context: Context,
    module_dir: TempDir,
}

impl SchemaContext {
    pub fn new() -> Result<Self, SchemaError> {
        // libyang messages reach the user through the returned errors
        QUIET_LIBYANG.call_once(|| {
            // SAFETY: only changes the global libyang logging options
            unsafe {
                yang3::ffi::ly_log_options(yang3::ffi::LY_LOSTORE_LAST);
            }
        });
        let module_dir = tempfile::Builder::new().prefix("ncxpath-yang-").tempdir()?;
        let mut context = Context::new(ContextFlags::NO_YANGLIBRARY | ContextFlags::REF_IMPLEMENTED)?;
        context.set_searchdir(module_dir.path())?;
        tracing::debug!("YANG modules are stored in {}", module_dir.path().display());
        Ok(Self {
            context,
            module_dir,
        })
    }

    pub const fn context(&self) -> &Context {
        &self.context
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.context.modules(false).any(|module| module.name() == name)
    }

    /// Search `dir` for imports too and list the modules it holds, sorted by
    /// file name. Submodules are left to their modules.
    pub fn add_search_dir(&mut self, dir: &Path) -> Result<Vec<ModuleFile>, SchemaError> {
        self.context.set_searchdir(dir)?;
        let mut modules = vec![];
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Some(module) = entry.file_name().to_str().and_then(ModuleFile::from_file_name)
            else {
                continue;
            };
            if is_submodule(&fs::read_to_string(entry.path())?) {
                tracing::debug!("Skipping submodule `{}` of {}", module.name(), dir.display());
                continue;
            }
            modules.push(module);
        }
        modules.sort_by_key(ModuleFile::file_name);
        Ok(modules)
    }

    /// Make the `source` of `module` available to the context, a submodule
    /// is stored for its module and reported as [SchemaError::Submodule].
    pub fn store(&self, module: &ModuleFile, source: &str) -> Result<(), SchemaError> {
        fs::write(self.module_dir.path().join(module.file_name()), source)?;
        if is_submodule(source) {
            return Err(SchemaError::Submodule(module.name().to_string()));
        }
        Ok(())
    }

    /// Load and implement `module` from the search directories, returns
    /// the name of the loaded module.
    pub fn load(&mut self, module: &ModuleFile) -> Result<String, SchemaError> {
        let loaded = self
            .context
            .load_module(module.name(), module.revision(), &[])?;
        Ok(loaded.name().to_string())
    }
}

/// Render a data tree (and its siblings) as XML
pub fn to_xml(tree: &DataTree<'_>) -> Result<String, yang3::Error> {
    tree.print_string(
        DataFormat::XML,
        DataPrinterFlags::WITH_SIBLINGS | DataPrinterFlags::SHRINK,
    )
}

/// Parse the XML data of a `<get>` reply, nodes unknown to the schema are
/// errors. Only the values are checked, the data is a partial view of the
/// datastore.
pub fn parse_data<'a>(ctx: &'a Context, xml: &str) -> Result<DataTree<'a>, yang3::Error> {
    DataTree::parse_string(
        ctx,
        xml,
        DataFormat::XML,
        DataParserFlags::NO_VALIDATION | DataParserFlags::STRICT,
        DataValidationFlags::empty(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{test_context, SYSTEM_MODULE};
    use rstest::rstest;

    const TYPES_MODULE: &str = r#"module example-types {
  namespace "urn:example:types";
  prefix t;
  typedef name-type { type string { length "1..16"; } }
}"#;

    const USES_TYPES_MODULE: &str = r#"module example-box {
  namespace "urn:example:box";
  prefix box;
  import example-types { prefix t; }
  revision 2024-01-01;
  container box { leaf name { type t:name-type; } }
}"#;

    const SUBMODULE: &str = r#"// shared definitions
submodule example-sub {
  belongs-to example-box { prefix box; }
}"#;

    #[rstest]
    #[case("example-system.yang", Some(ModuleFile::new("example-system", None)))]
    #[case("example-system@2024-01-01.yang", Some(ModuleFile::new("example-system", Some("2024-01-01"))))]
    #[case("example-system@.yang", Some(ModuleFile::new("example-system", None)))]
    #[case("example-system.yin", None)]
    #[case("@2024-01-01.yang", None)]
    #[case("README", None)]
    fn test_module_file_name(#[case] file_name: &str, #[case] expected: Option<ModuleFile>) {
        assert_eq!(ModuleFile::from_file_name(file_name), expected);
    }

    #[test]
    fn test_module_file_round_trip() {
        let module = ModuleFile::new("example-system", Some("2024-01-01"));
        assert_eq!(module.file_name(), "example-system@2024-01-01.yang");
        assert_eq!(ModuleFile::from_file_name(&module.file_name()), Some(module));
    }

    #[rstest]
    #[case(SYSTEM_MODULE, false)]
    #[case(SUBMODULE, true)]
    #[case("/* header\n */\n  submodule x { }", true)]
    #[case("submodules-are-not-a-keyword", false)]
    #[case("", false)]
    fn test_is_submodule(#[case] source: &str, #[case] expected: bool) {
        assert_eq!(is_submodule(source), expected);
    }

    #[test]
    fn test_load_module() {
        let schema = test_context();
        assert!(schema.has_module("example-system"));
        assert!(!schema.has_module("example-box"));
    }

    #[test]
    fn test_imports_resolve_in_any_order() {
        let mut schema = SchemaContext::new().expect("libyang context");
        let types = ModuleFile::new("example-types", None);
        let boxed = ModuleFile::new("example-box", None);
        schema.store(&boxed, USES_TYPES_MODULE).expect("store");
        schema.store(&types, TYPES_MODULE).expect("store");
        assert_eq!(schema.load(&boxed).expect("load"), "example-box");
        assert!(schema.has_module("example-types"));
    }

    #[test]
    fn test_broken_module() {
        let mut schema = SchemaContext::new().expect("libyang context");
        let module = ModuleFile::new("broken", None);
        schema
            .store(&module, "module broken { namespace \"urn:broken\"; prefix b; leaf x {")
            .expect("store");
        assert!(matches!(schema.load(&module), Err(SchemaError::Engine(_))));
        assert!(!schema.has_module("broken"));
    }

    #[test]
    fn test_store_submodule() {
        let schema = SchemaContext::new().expect("libyang context");
        let module = ModuleFile::new("example-sub", None);
        assert!(matches!(
            schema.store(&module, SUBMODULE),
            Err(SchemaError::Submodule(name)) if name == "example-sub"
        ));
    }

    #[test]
    fn test_add_search_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("example-types.yang"), TYPES_MODULE).expect("write");
        fs::write(dir.path().join("example-box@2024-01-01.yang"), USES_TYPES_MODULE).expect("write");
        fs::write(dir.path().join("example-sub.yang"), SUBMODULE).expect("write");
        fs::write(dir.path().join("notes.txt"), "not yang").expect("write");
        let mut schema = SchemaContext::new().expect("libyang context");
        let modules = schema.add_search_dir(dir.path()).expect("readable dir");
        assert_eq!(
            modules,
            vec![
                ModuleFile::new("example-box", Some("2024-01-01")),
                ModuleFile::new("example-types", None),
            ]
        );
        for module in &modules {
            schema.load(module).expect("load");
        }
        assert!(schema.has_module("example-box"));
    }

    #[test]
    fn test_missing_search_dir() {
        let mut schema = SchemaContext::new().expect("libyang context");
        assert!(schema
            .add_search_dir(Path::new("/nonexistent/ncxpath/yang"))
            .is_err());
    }

    #[test]
    fn test_data_round_trip() {
        let schema = test_context();
        let xml = r#"<system xmlns="urn:example:system"><hostname>r1</hostname></system>"#;
        let tree = parse_data(schema.context(), xml).expect("valid data");
        assert_eq!(to_xml(&tree).expect("printable"), xml);
    }

    #[rstest]
    #[case(r#"<unknown xmlns="urn:example:other"/>"#)]
    #[case(r#"<system xmlns="urn:example:system"><nope>1</nope></system>"#)]
    fn test_parse_data_rejects_unknown_nodes(#[case] xml: &str) {
        let schema = test_context();
        assert!(parse_data(schema.context(), xml).is_err());
    }
}
