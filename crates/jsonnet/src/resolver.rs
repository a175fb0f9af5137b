//! Import resolution: the capability an embedder plugs in to answer
//! "given the file that wrote this `import`, where does the requested
//! path point, and what's in it." Keeping this behind a trait (rather than
//! hard-coding `std::fs`) is what lets the library run the same evaluator
//! against files on disk, an in-memory bundle, or a virtual filesystem
//! embedded in a larger tool, per spec.md §4.9.
//!
//! The filesystem-backed implementation lives in the CLI crate, since a
//! library crate has no business deciding how paths on disk are searched;
//! this module only ships the trait and an in-memory implementation
//! suitable for tests and for embedders who already hold their sources in
//! memory.

use std::fmt;

use ahash::AHashMap;

/// Raised when a resolver can't find or read the requested path. Carries
/// only a message; the evaluator wraps it with the `import` span before it
/// becomes a [`crate::error::Diagnostic`].
#[derive(Debug, Clone)]
pub struct ImportError(pub String);

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ImportError {}

/// Resolves one `import`/`importstr`/`importbin` request.
///
/// `importer` is the canonical path of the file containing the `import`
/// expression (the entry file's own path for top-level imports);
/// `requested` is the string literal written after `import`. Implementations
/// decide what "canonical" means (e.g. absolute, symlink-resolved) — the
/// evaluator only uses the returned path as a cache key and as `importer`
/// for any further imports the resolved file itself contains.
pub trait ImportResolver: fmt::Debug {
    fn resolve(&mut self, importer: &str, requested: &str) -> Result<(String, String), ImportError>;
}

/// An in-memory resolver over a fixed path-to-source map, for tests and for
/// embedders that already have every source file loaded. Paths are looked
/// up exactly as requested (no directory-relative search, no search path) —
/// `importer` is accepted but unused, which is enough for flat bundles; an
/// embedder that wants directory semantics in memory can implement
/// [`ImportResolver`] itself against its own structure.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResolver {
    files: AHashMap<String, String>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl ImportResolver for InMemoryResolver {
    fn resolve(&mut self, _importer: &str, requested: &str) -> Result<(String, String), ImportError> {
        self.files
            .get(requested)
            .map(|contents| (requested.to_string(), contents.clone()))
            .ok_or_else(|| ImportError(format!("no such file or has no permission to read: {requested}")))
    }
}

/// A resolver that never resolves anything, used as the default for
/// embeddings that don't expect `import` to appear in their input.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl ImportResolver for NullResolver {
    fn resolve(&mut self, _importer: &str, requested: &str) -> Result<(String, String), ImportError> {
        Err(ImportError(format!("imports are not supported in this embedding (requested: {requested})")))
    }
}
