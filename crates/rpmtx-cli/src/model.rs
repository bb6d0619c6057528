//! JSON transaction description consumed by the demo binary (SPEC_FULL.md
//! §10.3): packages already installed, packages to add (with an `upgrade`
//! flag), optional suggester candidates, and the transaction-wide flags of
//! `rpmtx_core::transaction::TransactionFlags`.
//!
//! This is deliberately the only place in the workspace that knows a JSON
//! shape at all -- the engine itself never serializes anything (spec.md §6:
//! "no on-wire protocol").

use std::collections::HashMap;
use std::rc::Rc;

use rpmtx_core::{Dependency, Evr, Flags, Header, MemoryDatabase, Transaction, TransactionFlags};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TransactionDoc {
    #[serde(default)]
    pub flags: DocFlags,
    #[serde(default)]
    pub whiteout: String,
    #[serde(default)]
    pub installed: Vec<DocHeader>,
    #[serde(default)]
    pub add: Vec<DocAdd>,
    #[serde(default)]
    pub available: Vec<DocHeader>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocFlags {
    #[serde(default)]
    pub chainsaw: bool,
    #[serde(default)]
    pub no_suggests: bool,
}

#[derive(Debug, Deserialize)]
pub struct DocAdd {
    #[serde(flatten)]
    pub header: DocHeader,
    #[serde(default)]
    pub upgrade: bool,
}

#[derive(Debug, Deserialize)]
pub struct DocHeader {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub epoch: Option<u32>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub source_package: bool,
    #[serde(default)]
    pub multilib_mask: u32,
    #[serde(default)]
    pub requires: Vec<DocDep>,
    #[serde(default)]
    pub provides: Vec<DocDep>,
    #[serde(default)]
    pub conflicts: Vec<DocDep>,
    #[serde(default)]
    pub obsoletes: Vec<DocDep>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocDep {
    pub name: String,
    #[serde(default)]
    pub evr: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl DocHeader {
    fn into_header(self) -> Header {
        let evr = Evr::new(self.epoch, self.version, self.release);
        let mut h = Header::new(self.name, evr)
            .with_requires(self.requires.into_iter().map(DocDep::into_dependency).collect())
            .with_provides(self.provides.into_iter().map(DocDep::into_dependency).collect())
            .with_conflicts(self.conflicts.into_iter().map(DocDep::into_dependency).collect())
            .with_obsoletes(self.obsoletes.into_iter().map(DocDep::into_dependency).collect())
            .with_files(self.files)
            .with_multilib_mask(self.multilib_mask);
        if self.source_package {
            h = h.as_source_package();
        }
        h
    }
}

impl DocDep {
    fn into_dependency(self) -> Dependency {
        let evr = self.evr.as_deref().map(parse_evr);
        let flags = self.flags.iter().fold(Flags::NONE, |acc, name| acc | flag_named(name));
        Dependency::new(self.name, flags, evr)
    }
}

fn flag_named(name: &str) -> Flags {
    match name {
        "LESS" => Flags::LESS,
        "GREATER" => Flags::GREATER,
        "EQUAL" => Flags::EQUAL,
        "PREREQ" => Flags::PREREQ,
        "SCRIPT_PRE" => Flags::SCRIPT_PRE,
        "SCRIPT_POST" => Flags::SCRIPT_POST,
        "SCRIPT_PREUN" => Flags::SCRIPT_PREUN,
        "SCRIPT_POSTUN" => Flags::SCRIPT_POSTUN,
        "SCRIPT_VERIFY" => Flags::SCRIPT_VERIFY,
        "FIND_REQUIRES" => Flags::FIND_REQUIRES,
        "RPMLIB" => Flags::RPMLIB,
        "MULTILIB" => Flags::MULTILIB,
        _ => Flags::NONE,
    }
}

/// Parse an `[epoch:]version[-release]` string into an [`Evr`]. This is the
/// one bit of string parsing the CLI needs that the engine itself never
/// does -- the engine only ever compares already-structured `Evr` values.
fn parse_evr(s: &str) -> Evr {
    let (epoch, rest) = match s.split_once(':') {
        Some((e, rest)) => (e.parse::<u32>().ok(), rest),
        None => (None, s),
    };
    match rest.split_once('-') {
        Some((version, release)) => Evr::new(epoch, version, Some(release.to_string())),
        None => Evr::new(epoch, rest, None),
    }
}

/// Build a [`Transaction`] from the parsed document: installed packages
/// populate a [`MemoryDatabase`], then every `add` entry is run through
/// `add_package` in document order, and every `available` entry through
/// `add_available`. The returned map lets the output layer resolve a
/// suggestion's opaque `ExternalKey` back to the package name the caller
/// gave it.
pub fn build_transaction(doc: TransactionDoc) -> anyhow::Result<(Transaction, HashMap<u64, String>)> {
    let mut db = MemoryDatabase::new();
    for installed in doc.installed {
        db.install(Rc::new(installed.into_header()));
    }

    let mut ts = Transaction::new(if db.is_empty() { None } else { Some(Box::new(db)) }).with_flags(TransactionFlags {
        chainsaw: doc.flags.chainsaw,
        no_suggests: doc.flags.no_suggests,
    });

    if !doc.whiteout.trim().is_empty() {
        ts = ts.with_macros(Box::new(
            rpmtx_core::StaticMacroExpander::new().with("_dependency_whiteout", doc.whiteout.clone()),
        ));
    }

    let mut next_key = 0u64;
    let mut names_by_key: HashMap<u64, String> = HashMap::new();
    for add in doc.add {
        let name = add.header.name.clone();
        let header = Rc::new(add.header.into_header());
        let key = rpmtx_core::ExternalKey(next_key);
        names_by_key.insert(next_key, name);
        next_key += 1;
        ts.add_package(header, Some(key), add.upgrade, vec![])?;
    }

    for available in doc.available {
        let name = available.name.clone();
        let header = Rc::new(available.into_header());
        let key = rpmtx_core::ExternalKey(next_key);
        names_by_key.insert(next_key, name);
        next_key += 1;
        ts.add_available(header, key);
    }

    Ok((ts, names_by_key))
}
