//! Module definition types
//!
//! A `ModuleDefinition` is the validated, immutable form of a module
//! descriptor. It is produced by discovery, ordered by the resolver and
//! consumed once by the lifecycle manager.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Module version (semantic versioning)
///
/// Accepts `major.minor` or `major.minor.patch` with optional pre-release
/// and build metadata. A missing patch component is read as `0`, so `1.0`
/// and `1.0.0` compare equal. The text as written is kept for display.
#[derive(Debug, Clone)]
pub struct ModuleVersion {
    raw: String,
    parsed: semver::Version,
}

impl ModuleVersion {
    /// Parse a module version
    pub fn parse(version: &str) -> Result<Self, semver::Error> {
        let raw = version.trim();
        let parsed = semver::Version::parse(&pad_patch(raw))?;
        Ok(Self {
            raw: raw.to_string(),
            parsed,
        })
    }

    /// Version as written in the descriptor
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Normalized semantic version
    pub fn semver(&self) -> &semver::Version {
        &self.parsed
    }
}

/// Insert a `.0` patch component when only `major.minor` is given
fn pad_patch(version: &str) -> String {
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(core_end);
    if core.matches('.').count() == 1 {
        format!("{}.0{}", core, suffix)
    } else {
        version.to_string()
    }
}

impl PartialEq for ModuleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parsed == other.parsed
    }
}

impl Eq for ModuleVersion {}

impl Hash for ModuleVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parsed.hash(state);
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parsed.cmp(&other.parsed)
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ModuleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ModuleVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ModuleVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Version constraint on a dependency
///
/// Uses semver requirement syntax: `>=1.0`, `^1.2`, `~1.2.3`, `=1.0.0`,
/// `*`, or comma-separated combinations. A bare version such as `1.0` is a
/// caret requirement (`^1.0`). The legacy `==` prefix is accepted as `=`.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    raw: String,
    req: semver::VersionReq,
}

impl VersionConstraint {
    /// Parse a version constraint
    pub fn parse(constraint: &str) -> Result<Self, semver::Error> {
        let raw = constraint.trim();
        let normalized = match raw.strip_prefix("==") {
            Some(rest) => format!("={}", rest),
            None => raw.to_string(),
        };
        let req = semver::VersionReq::parse(&normalized)?;
        Ok(Self {
            raw: raw.to_string(),
            req,
        })
    }

    /// Constraint as written in the descriptor
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check whether a version satisfies this constraint
    pub fn matches(&self, version: &ModuleVersion) -> bool {
        self.req.matches(version.semver())
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.req == other.req
    }
}

impl Eq for VersionConstraint {}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// Module identity: unique `(name, version)` pair
///
/// Ordering is by name, then version. The resolver relies on this to break
/// ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId {
    /// Module name
    pub name: String,
    /// Module version
    pub version: ModuleVersion,
}

impl ModuleId {
    /// Create a module identity
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse `name@version`
    pub fn parse(id: &str) -> Option<Self> {
        let (name, version) = id.split_once('@')?;
        if name.is_empty() {
            return None;
        }
        let version = ModuleVersion::parse(version).ok()?;
        Some(Self::new(name, version))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A declared dependency on another module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    name: String,
    constraint: VersionConstraint,
}

impl Dependency {
    /// Create a dependency
    pub fn new(name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    /// Parse a dependency from a name and constraint string
    pub fn parse(name: &str, constraint: &str) -> Result<Self, semver::Error> {
        Ok(Self::new(name, VersionConstraint::parse(constraint)?))
    }

    /// Name of the required module
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version constraint on the required module
    pub fn constraint(&self) -> &VersionConstraint {
        &self.constraint
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.constraint)
    }
}

/// Opaque reference used to look up a module's startup behavior
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryRef(String);

impl EntryRef {
    /// Create an entry reference
    pub fn new(entry: impl Into<String>) -> Self {
        Self(entry.into())
    }

    /// Entry reference as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryRef {
    fn from(entry: &str) -> Self {
        Self::new(entry)
    }
}

impl From<String> for EntryRef {
    fn from(entry: String) -> Self {
        Self(entry)
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed, validated module metadata
///
/// Immutable once constructed. Dependencies are kept sorted by name so two
/// definitions built from the same descriptor compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDefinition {
    id: ModuleId,
    dependencies: Vec<Dependency>,
    entry: EntryRef,
    source_dir: PathBuf,
    description: Option<String>,
    author: Option<String>,
}

impl ModuleDefinition {
    /// Create a module definition
    pub fn new(
        id: ModuleId,
        entry: EntryRef,
        source_dir: impl Into<PathBuf>,
        mut dependencies: Vec<Dependency>,
    ) -> Self {
        dependencies.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            id,
            dependencies,
            entry,
            source_dir: source_dir.into(),
            description: None,
            author: None,
        }
    }

    /// Attach descriptive metadata
    pub fn with_metadata(mut self, description: Option<String>, author: Option<String>) -> Self {
        self.description = description;
        self.author = author;
        self
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn version(&self) -> &ModuleVersion {
        &self.id.version
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn entry(&self) -> &EntryRef {
        &self.entry
    }

    /// Directory the descriptor was parsed from
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
}
