//! Name resolution against a class path.
//!
//! The binder never looks at jars or class files. Everything outside the
//! sketch is answered by an [`ImportResolver`]; the bundled
//! [`StaticClassPath`] describes the core runtime and further catalogs can be
//! layered on top with [`CompositeResolver`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalKind {
    Package,
    Type,
    Method,
    Field,
}

/// Something defined on the class path rather than in the sketch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedHandle {
    /// `java.util`, `java.util.ArrayList` or `processing.core.PApplet.ellipse`
    pub qualified_name: String,
    pub kind: ExternalKind,
}

impl ResolvedHandle {
    pub fn new(qualified_name: impl Into<String>, kind: ExternalKind) -> Self {
        ResolvedHandle {
            qualified_name: qualified_name.into(),
            kind,
        }
    }

    pub fn simple_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid class path catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

pub trait ImportResolver: Send + Sync {
    fn has_package(&self, package: &str) -> bool;

    fn resolve_type(&self, qualified: &str) -> Option<ResolvedHandle>;

    /// Look `member` up on `type_name` and its supertypes.
    fn resolve_member(&self, type_name: &str, member: &str, kind: ExternalKind) -> Option<ResolvedHandle>;

    /// Fully qualified names of every known type called `simple`.
    fn find_types_named(&self, simple: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub interface: bool,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl TypeEntry {
    pub fn package(&self) -> &str {
        self.name.rsplit_once('.').map_or("", |(pkg, _)| pkg)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit_once('.').map_or(&self.name, |(_, simple)| simple)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    types: Vec<TypeEntry>,
}

/// Class path described by a JSON catalog of types and their members.
#[derive(Debug, Clone, Default)]
pub struct StaticClassPath {
    types: HashMap<String, TypeEntry>,
    packages: HashSet<String>,
    by_simple_name: HashMap<String, BTreeSet<String>>,
}

static CORE: Lazy<Arc<StaticClassPath>> = Lazy::new(|| {
    let json = include_str!("../data/core_classpath.json");
    Arc::new(StaticClassPath::from_json(json).expect("Invalid core class path catalog"))
});

impl StaticClassPath {
    /// The Processing core, `java.lang`, `java.util`, `java.io` and a few
    /// other commonly imported packages.
    pub fn core() -> Arc<StaticClassPath> {
        Arc::clone(&CORE)
    }

    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::from_types(file.types))
    }

    pub fn from_types(types: impl IntoIterator<Item = TypeEntry>) -> Self {
        let mut cp = StaticClassPath::default();
        for entry in types {
            let mut pkg = entry.package();
            while !pkg.is_empty() {
                cp.packages.insert(pkg.to_string());
                pkg = pkg.rsplit_once('.').map_or("", |(parent, _)| parent);
            }
            cp.by_simple_name
                .entry(entry.simple_name().to_string())
                .or_default()
                .insert(entry.name.clone());
            cp.types.insert(entry.name.clone(), entry);
        }
        cp
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn get(&self, qualified: &str) -> Option<&TypeEntry> {
        self.types.get(qualified)
    }

    /// Packages that directly contain a type, sorted.
    pub fn packages(&self) -> Vec<String> {
        let direct: BTreeSet<&str> = self.types.values().map(TypeEntry::package).collect();
        direct
            .into_iter()
            .filter(|pkg| !pkg.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl ImportResolver for StaticClassPath {
    fn has_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    fn resolve_type(&self, qualified: &str) -> Option<ResolvedHandle> {
        self.types
            .contains_key(qualified)
            .then(|| ResolvedHandle::new(qualified, ExternalKind::Type))
    }

    fn resolve_member(&self, type_name: &str, member: &str, kind: ExternalKind) -> Option<ResolvedHandle> {
        let mut pending = vec![type_name.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(entry) = self.types.get(&current) else {
                continue;
            };
            let members = match kind {
                ExternalKind::Method => &entry.methods,
                ExternalKind::Field => &entry.fields,
                ExternalKind::Package | ExternalKind::Type => return None,
            };
            if members.iter().any(|m| m == member) {
                return Some(ResolvedHandle::new(format!("{current}.{member}"), kind));
            }
            pending.extend(entry.interfaces.iter().rev().cloned());
            pending.extend(entry.superclass.iter().cloned());
        }
        None
    }

    fn find_types_named(&self, simple: &str) -> Vec<String> {
        self.by_simple_name
            .get(simple)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Several resolvers consulted in order; the first answer wins.
#[derive(Clone, Default)]
pub struct CompositeResolver {
    parts: Vec<Arc<dyn ImportResolver>>,
}

impl std::fmt::Debug for CompositeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeResolver")
            .field("parts", &self.parts.len())
            .finish()
    }
}

impl CompositeResolver {
    pub fn new(parts: Vec<Arc<dyn ImportResolver>>) -> Self {
        CompositeResolver { parts }
    }

    pub fn push(&mut self, part: Arc<dyn ImportResolver>) {
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl ImportResolver for CompositeResolver {
    fn has_package(&self, package: &str) -> bool {
        self.parts.iter().any(|p| p.has_package(package))
    }

    fn resolve_type(&self, qualified: &str) -> Option<ResolvedHandle> {
        self.parts.iter().find_map(|p| p.resolve_type(qualified))
    }

    fn resolve_member(&self, type_name: &str, member: &str, kind: ExternalKind) -> Option<ResolvedHandle> {
        self.parts
            .iter()
            .find_map(|p| p.resolve_member(type_name, member, kind))
    }

    fn find_types_named(&self, simple: &str) -> Vec<String> {
        let names: BTreeSet<String> = self
            .parts
            .iter()
            .flat_map(|p| p.find_types_named(simple))
            .collect();
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_catalog_loads() {
        let core = StaticClassPath::core();
        assert!(core.type_count() > 50);
        assert!(core.has_package("processing.core"));
        assert!(core.has_package("java"));
        assert!(!core.has_package("processing.video"));
    }

    #[test]
    fn test_member_lookup_follows_supertypes() {
        let core = StaticClassPath::core();
        let pi = core.resolve_member("processing.core.PApplet", "PI", ExternalKind::Field);
        assert_eq!(
            pi.map(|h| h.qualified_name),
            Some("processing.core.PConstants.PI".to_string())
        );
        let to_string = core.resolve_member("processing.core.PVector", "toString", ExternalKind::Method);
        assert_eq!(
            to_string.map(|h| h.qualified_name),
            Some("java.lang.Object.toString".to_string())
        );
    }

    #[test]
    fn test_field_and_method_with_same_name() {
        let core = StaticClassPath::core();
        assert!(core.resolve_member("processing.core.PApplet", "mousePressed", ExternalKind::Field).is_some());
        assert!(core.resolve_member("processing.core.PApplet", "mousePressed", ExternalKind::Method).is_some());
        assert!(core.resolve_member("processing.core.PApplet", "elipse", ExternalKind::Method).is_none());
    }

    #[test]
    fn test_find_types_named_is_sorted() {
        let core = StaticClassPath::core();
        assert_eq!(
            core.find_types_named("List"),
            vec!["java.awt.List".to_string(), "java.util.List".to_string()]
        );
    }

    #[test]
    fn test_composite_prefers_first_part() {
        let library = StaticClassPath::from_json(
            r#"{"types": [{"name": "video.Movie", "methods": ["play"]}]}"#,
        )
        .unwrap();
        let parts: Vec<Arc<dyn ImportResolver>> = vec![StaticClassPath::core(), Arc::new(library)];
        let composite = CompositeResolver::new(parts);
        assert!(composite.resolve_type("video.Movie").is_some());
        assert!(composite.resolve_type("java.util.ArrayList").is_some());
        assert!(composite.has_package("video"));
        assert_eq!(composite.len(), 2);
    }

    #[test]
    fn test_bad_catalog_is_an_error() {
        assert!(StaticClassPath::from_json("{\"types\": 3}").is_err());
    }
}
