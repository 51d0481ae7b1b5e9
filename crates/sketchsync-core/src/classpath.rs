//! Class path assembly and caching.
//!
//! Building a resolver is the most expensive part of a rebuild, so the
//! [`ClassPathCache`] keeps the last one and only asks its
//! [`ClassPathProvider`] for a new one when libraries or the code folder were
//! reported as changed, or when the program's import list differs from the
//! previous rebuild.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sketchsync_frontend::{CompositeResolver, ImportResolver, StaticClassPath};
use tracing::{debug, info, warn};

use crate::imports::{ImportStatement, imports_changed};

/// Imports every sketch gets.
pub const CORE_IMPORTS: &[&str] = &[
    "processing.core.*",
    "processing.data.*",
    "processing.event.*",
    "processing.opengl.*",
];

pub const DEFAULT_IMPORTS: &[&str] = &[
    "java.util.HashMap",
    "java.util.ArrayList",
    "java.io.File",
    "java.io.BufferedReader",
    "java.io.PrintWriter",
    "java.io.InputStream",
    "java.io.OutputStream",
    "java.io.IOException",
];

/// External collaborator that knows where compiled symbols live.
pub trait ClassPathProvider: Send + Sync {
    /// Core and default imports, in emission order.
    fn core_imports(&self) -> Vec<ImportStatement>;

    /// Packages defined in the sketch's code folder.
    fn code_folder_packages(&self) -> Vec<String>;

    /// Resolver the binder compiles against: the runtime, the libraries
    /// `program_imports` pull in, and the code folder.
    fn build_resolver(&self, program_imports: &[ImportStatement]) -> Arc<dyn ImportResolver>;

    /// Resolver over everything installed, imported or not. Used to suggest
    /// imports for unknown names.
    fn build_search_resolver(&self) -> Arc<dyn ImportResolver>;
}

/// A library's catalog as loaded from disk.
#[derive(Debug, Clone)]
pub struct LibraryCatalog {
    pub name: String,
    pub classes: Arc<StaticClassPath>,
}

impl LibraryCatalog {
    fn is_used_by(&self, imports: &[ImportStatement]) -> bool {
        imports.iter().any(|imp| {
            let pkg = imp.package_name();
            self.classes.has_package(pkg)
                || self.classes.resolve_type(pkg).is_some()
                || self.classes.resolve_type(&imp.full_member_name()).is_some()
        })
    }
}

/// Reads `*.json` catalogs (the format of [`StaticClassPath::from_json`]) in
/// a directory, sorted by file name. Unreadable or malformed files are
/// skipped with a warning.
pub fn load_catalogs(dir: &Path) -> Vec<LibraryCatalog> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "No catalogs");
            return Vec::new();
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| {
            let name = path.file_stem()?.to_string_lossy().into_owned();
            let json = match std::fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read catalog");
                    return None;
                }
            };
            match StaticClassPath::from_json(&json) {
                Ok(classes) => Some(LibraryCatalog {
                    name,
                    classes: Arc::new(classes),
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed catalog");
                    None
                }
            }
        })
        .collect()
}

/// Provider backed by the bundled core catalog plus optional directories of
/// library and code-folder catalogs.
#[derive(Debug, Clone, Default)]
pub struct DefaultClassPathProvider {
    library_dir: Option<PathBuf>,
    code_folder: Option<PathBuf>,
}

impl DefaultClassPathProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(dir.into());
        self
    }

    pub fn with_code_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.code_folder = Some(dir.into());
        self
    }

    fn libraries(&self) -> Vec<LibraryCatalog> {
        self.library_dir.as_deref().map(load_catalogs).unwrap_or_default()
    }

    fn code_folder_catalogs(&self) -> Vec<LibraryCatalog> {
        self.code_folder.as_deref().map(load_catalogs).unwrap_or_default()
    }
}

impl ClassPathProvider for DefaultClassPathProvider {
    fn core_imports(&self) -> Vec<ImportStatement> {
        CORE_IMPORTS
            .iter()
            .chain(DEFAULT_IMPORTS)
            .filter_map(|imp| ImportStatement::parse(imp))
            .collect()
    }

    fn code_folder_packages(&self) -> Vec<String> {
        let mut packages: Vec<String> = self
            .code_folder_catalogs()
            .iter()
            .flat_map(|catalog| catalog.classes.packages())
            .collect();
        packages.sort();
        packages.dedup();
        packages
    }

    fn build_resolver(&self, program_imports: &[ImportStatement]) -> Arc<dyn ImportResolver> {
        let core: Arc<dyn ImportResolver> = StaticClassPath::core();
        let mut resolver = CompositeResolver::new(vec![core]);
        for library in self.libraries() {
            if library.is_used_by(program_imports) {
                debug!(library = %library.name, "Adding library to class path");
                resolver.push(library.classes);
            }
        }
        for catalog in self.code_folder_catalogs() {
            resolver.push(catalog.classes);
        }
        Arc::new(resolver)
    }

    fn build_search_resolver(&self) -> Arc<dyn ImportResolver> {
        let core: Arc<dyn ImportResolver> = StaticClassPath::core();
        let mut resolver = CompositeResolver::new(vec![core]);
        for catalog in self.libraries().into_iter().chain(self.code_folder_catalogs()) {
            resolver.push(catalog.classes);
        }
        Arc::new(resolver)
    }
}

/// Change notifications shared between the service handle and the cache.
///
/// Both flags start set so the first rebuild loads everything.
#[derive(Debug)]
pub struct ClassPathFlags {
    libraries_changed: AtomicBool,
    code_folder_changed: AtomicBool,
}

impl Default for ClassPathFlags {
    fn default() -> Self {
        Self {
            libraries_changed: AtomicBool::new(true),
            code_folder_changed: AtomicBool::new(true),
        }
    }
}

impl ClassPathFlags {
    pub fn mark_libraries_changed(&self) {
        self.libraries_changed.store(true, Ordering::SeqCst);
    }

    pub fn mark_code_folder_changed(&self) {
        self.code_folder_changed.store(true, Ordering::SeqCst);
    }

    fn take_libraries_changed(&self) -> bool {
        self.libraries_changed.swap(false, Ordering::SeqCst)
    }

    fn take_code_folder_changed(&self) -> bool {
        self.code_folder_changed.swap(false, Ordering::SeqCst)
    }

    /// Take both flags; they are set again unless the reload completes.
    fn take(&self) -> PendingReload<'_> {
        PendingReload {
            flags: self,
            code_folder: self.take_code_folder_changed(),
            libraries: self.take_libraries_changed(),
            completed: false,
        }
    }
}

/// Change flags taken by a rebuild that has not finished yet.
struct PendingReload<'a> {
    flags: &'a ClassPathFlags,
    code_folder: bool,
    libraries: bool,
    completed: bool,
}

impl PendingReload<'_> {
    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for PendingReload<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self.code_folder {
            self.flags.mark_code_folder_changed();
        }
        if self.libraries {
            self.flags.mark_libraries_changed();
        }
    }
}

/// What one rebuild compiles against.
#[derive(Clone)]
pub struct ClassPath {
    pub core_imports: Vec<ImportStatement>,
    pub code_folder_imports: Vec<ImportStatement>,
    pub resolver: Arc<dyn ImportResolver>,
    pub search_resolver: Arc<dyn ImportResolver>,
}

impl fmt::Debug for ClassPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPath")
            .field("core_imports", &self.core_imports.len())
            .field("code_folder_imports", &self.code_folder_imports.len())
            .finish_non_exhaustive()
    }
}

/// Last assembled class path plus the inputs it was built from.
pub struct ClassPathCache {
    provider: Arc<dyn ClassPathProvider>,
    flags: Arc<ClassPathFlags>,
    core_imports: Option<Vec<ImportStatement>>,
    code_folder_imports: Vec<ImportStatement>,
    program_imports: Vec<ImportStatement>,
    resolver: Option<Arc<dyn ImportResolver>>,
    search_resolver: Option<Arc<dyn ImportResolver>>,
    rebuilds: usize,
}

impl fmt::Debug for ClassPathCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassPathCache")
            .field("program_imports", &self.program_imports)
            .field("rebuilds", &self.rebuilds)
            .finish_non_exhaustive()
    }
}

impl ClassPathCache {
    pub fn new(provider: Arc<dyn ClassPathProvider>) -> Self {
        ClassPathCache {
            provider,
            flags: Arc::new(ClassPathFlags::default()),
            core_imports: None,
            code_folder_imports: Vec::new(),
            program_imports: Vec::new(),
            resolver: None,
            search_resolver: None,
            rebuilds: 0,
        }
    }

    /// Handle for the change-notification entry points.
    pub fn flags(&self) -> Arc<ClassPathFlags> {
        Arc::clone(&self.flags)
    }

    /// How many times the compile resolver has been assembled.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// Class path for a rebuild whose sketch imports `program_imports`.
    ///
    /// A provider that panics leaves the change flags set, so the next
    /// rebuild reloads again.
    pub fn prepare(&mut self, program_imports: &[ImportStatement]) -> ClassPath {
        let flags = Arc::clone(&self.flags);
        let pending = flags.take();
        let (reload_code_folder, reload_libraries) = (pending.code_folder, pending.libraries);

        let core_imports = self
            .core_imports
            .get_or_insert_with(|| self.provider.core_imports())
            .clone();

        if reload_code_folder {
            self.code_folder_imports = self
                .provider
                .code_folder_packages()
                .into_iter()
                .map(ImportStatement::whole_package)
                .collect();
        }

        let rebuild_libraries = reload_libraries || imports_changed(&self.program_imports, program_imports);
        let reuse = !reload_code_folder && !rebuild_libraries;
        let resolver = match self.resolver.clone() {
            Some(resolver) if reuse => resolver,
            _ => {
                self.rebuilds += 1;
                info!(
                    imports = program_imports.len(),
                    reload_libraries,
                    reload_code_folder,
                    "Rebuilding class path"
                );
                let resolver = self.provider.build_resolver(program_imports);
                self.resolver = Some(Arc::clone(&resolver));
                resolver
            }
        };
        let search_resolver = match self.search_resolver.clone() {
            Some(search) if !reload_code_folder && !reload_libraries => search,
            _ => {
                let search = self.provider.build_search_resolver();
                self.search_resolver = Some(Arc::clone(&search));
                search
            }
        };
        self.program_imports = program_imports.to_vec();
        pending.complete();

        ClassPath {
            core_imports,
            code_folder_imports: self.code_folder_imports.clone(),
            resolver,
            search_resolver,
        }
    }
}
