use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Resolves module names to source text for `imp`. File layout, search
/// paths and caching policy all live behind this seam; the executor only
/// ever asks for text by name.
pub trait SourceProvider {
    fn source(&self, name: &str) -> Option<String>;
}

/// Looks up `<base>/<name>.boa`.
pub struct DirSource {
    base: PathBuf,
}

impl DirSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl SourceProvider for DirSource {
    fn source(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.base.join(format!("{name}.boa"))).ok()
    }
}

/// In-memory module table, for embedders and tests.
#[derive(Default)]
pub struct MemorySource {
    modules: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.modules.insert(name.into(), source.into());
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }
}

impl SourceProvider for MemorySource {
    fn source(&self, name: &str) -> Option<String> {
        self.modules.get(name).cloned()
    }
}
