//! Header accessor (spec.md §6): the external collaborator that reads tags
//! off a package header. The engine never parses a real on-disk header
//! format (explicit non-goal, spec.md §1) -- [`Header`] is the one in-memory
//! implementation it ships, built directly from whatever a caller (tests,
//! the CLI's JSON loader) already knows about a package.

use std::fmt;

use crate::depset::Dependency;
use crate::evr::Evr;

/// Tags of interest (spec.md §6). Only the ones the engine actually reads
/// are modeled; `BASENAMES`/`DIRNAMES`/`DIRINDEXES` collapse into
/// [`HeaderAccessor::files`] since the engine only ever needs the
/// reconstructed full paths, never the packed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Name,
    Version,
    Release,
    Epoch,
    RequireName,
    RequireVersion,
    RequireFlags,
    ProvideName,
    ProvideVersion,
    ProvideFlags,
    ConflictName,
    ConflictVersion,
    ConflictFlags,
    ObsoleteName,
    ObsoleteVersion,
    ObsoleteFlags,
    BaseNames,
    DirNames,
    DirIndexes,
    SourcePackage,
    Multilibs,
}

/// `has_tag` / `get_entry` over the fixed tag set above. One in-memory
/// implementation ([`Header`]) ships with the crate; the trait exists so a
/// real header reader could stand in without touching the checker or
/// orderer.
pub trait HeaderAccessor: fmt::Debug {
    fn has_tag(&self, tag: Tag) -> bool;
    fn name(&self) -> &str;
    fn evr(&self) -> &Evr;
    fn is_source_package(&self) -> bool;
    fn multilib_mask(&self) -> u32;
    fn requires(&self) -> &[Dependency];
    fn provides(&self) -> &[Dependency];
    fn conflicts(&self) -> &[Dependency];
    fn obsoletes(&self) -> &[Dependency];
    fn files(&self) -> &[String];
}

/// An in-memory package header: everything `add_package` or the checker
/// needs to know about a package.
#[derive(Debug, Clone)]
pub struct Header {
    pub name: String,
    pub evr: Evr,
    pub is_source_package: bool,
    pub multilib_mask: u32,
    pub requires: Vec<Dependency>,
    pub provides: Vec<Dependency>,
    pub conflicts: Vec<Dependency>,
    pub obsoletes: Vec<Dependency>,
    pub files: Vec<String>,
}

impl Header {
    #[must_use]
    pub fn new(name: impl Into<String>, evr: Evr) -> Self {
        Self {
            name: name.into(),
            evr,
            is_source_package: false,
            multilib_mask: 0,
            requires: Vec::new(),
            provides: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn nevr(&self) -> String {
        format!("{}-{}", self.name, self.evr)
    }

    #[must_use]
    pub fn with_requires(mut self, deps: Vec<Dependency>) -> Self {
        self.requires = deps;
        self
    }

    #[must_use]
    pub fn with_provides(mut self, deps: Vec<Dependency>) -> Self {
        self.provides = deps;
        self
    }

    #[must_use]
    pub fn with_conflicts(mut self, deps: Vec<Dependency>) -> Self {
        self.conflicts = deps;
        self
    }

    #[must_use]
    pub fn with_obsoletes(mut self, deps: Vec<Dependency>) -> Self {
        self.obsoletes = deps;
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    #[must_use]
    pub fn with_multilib_mask(mut self, mask: u32) -> Self {
        self.multilib_mask = mask;
        self
    }

    #[must_use]
    pub fn as_source_package(mut self) -> Self {
        self.is_source_package = true;
        self
    }
}

impl HeaderAccessor for Header {
    fn has_tag(&self, tag: Tag) -> bool {
        match tag {
            Tag::Name | Tag::Version => true,
            Tag::Release => self.evr.release.is_some(),
            Tag::Epoch => self.evr.epoch.is_some(),
            Tag::RequireName | Tag::RequireVersion | Tag::RequireFlags => !self.requires.is_empty(),
            Tag::ProvideName | Tag::ProvideVersion | Tag::ProvideFlags => !self.provides.is_empty(),
            Tag::ConflictName | Tag::ConflictVersion | Tag::ConflictFlags => {
                !self.conflicts.is_empty()
            }
            Tag::ObsoleteName | Tag::ObsoleteVersion | Tag::ObsoleteFlags => {
                !self.obsoletes.is_empty()
            }
            Tag::BaseNames | Tag::DirNames | Tag::DirIndexes => !self.files.is_empty(),
            Tag::SourcePackage => self.is_source_package,
            Tag::Multilibs => self.multilib_mask != 0,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn evr(&self) -> &Evr {
        &self.evr
    }

    fn is_source_package(&self) -> bool {
        self.is_source_package
    }

    fn multilib_mask(&self) -> u32 {
        self.multilib_mask
    }

    fn requires(&self) -> &[Dependency] {
        &self.requires
    }

    fn provides(&self) -> &[Dependency] {
        &self.provides
    }

    fn conflicts(&self) -> &[Dependency] {
        &self.conflicts
    }

    fn obsoletes(&self) -> &[Dependency] {
        &self.obsoletes
    }

    fn files(&self) -> &[String] {
        &self.files
    }
}
