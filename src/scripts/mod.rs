//! Metadata script model
//!
//! A script travels through three steps:
//! 1. [`url`] / [`fetch`] - locate and download remote script bodies
//! 2. [`resolve`] - turn a raw metadata value into a runnable [`ScriptRecord`]
//! 3. [`runner`] - write it to a temp file and execute it

pub mod fetch;
pub mod resolve;
pub mod runner;
pub mod url;

use std::collections::HashMap;

use crate::Phase;

/// Kind of script a metadata attribute holds
///
/// Variant order is the execution order within a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScriptKind {
    /// PowerShell script
    Ps1,
    /// Batch script stored under the `cmd` key
    Cmd,
    /// Batch script stored under the `bat` key
    Bat,
    /// URL pointing at a `.ps1`, `.cmd` or `.bat` script
    Url,
}

impl ScriptKind {
    /// All kinds in execution order
    pub const ALL: [ScriptKind; 4] = [
        ScriptKind::Ps1,
        ScriptKind::Cmd,
        ScriptKind::Bat,
        ScriptKind::Url,
    ];

    /// Suffix of the metadata key for this kind
    pub fn suffix(&self) -> &'static str {
        match self {
            ScriptKind::Ps1 => "ps1",
            ScriptKind::Cmd => "cmd",
            ScriptKind::Bat => "bat",
            ScriptKind::Url => "url",
        }
    }

    /// Concrete kind for a file extension, if it names one
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ps1" => Some(ScriptKind::Ps1),
            "cmd" => Some(ScriptKind::Cmd),
            "bat" => Some(ScriptKind::Bat),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A script ready to hand to the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    pub kind: ScriptKind,
    /// Script contents, written to disk byte for byte
    pub body: Vec<u8>,
    /// Metadata attribute the script came from
    pub key: String,
}

impl ScriptRecord {
    pub fn new(kind: ScriptKind, body: impl Into<Vec<u8>>, key: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
            key: key.into(),
        }
    }
}

/// Attribute names queried for one phase, keyed by script kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataKeySet {
    keys: [String; 4],
}

impl MetadataKeySet {
    /// Build the key set for a phase, e.g. `windows-startup-script-ps1`
    pub fn for_phase(phase: Phase) -> Self {
        let prefix = phase.key_prefix();
        Self {
            keys: ScriptKind::ALL.map(|kind| format!("{}-script-{}", prefix, kind.suffix())),
        }
    }

    /// Attribute name for a kind
    pub fn key(&self, kind: ScriptKind) -> &str {
        &self.keys[kind as usize]
    }

    /// (kind, key) pairs in execution order
    pub fn iter(&self) -> impl Iterator<Item = (ScriptKind, &str)> {
        ScriptKind::ALL.into_iter().map(move |kind| (kind, self.key(kind)))
    }

    /// Populated entries of a metadata snapshot, in execution order
    ///
    /// Absent and empty attributes are skipped.
    pub fn select<'a>(
        &'a self,
        attributes: &'a HashMap<String, String>,
    ) -> impl Iterator<Item = (ScriptKind, &'a str, &'a str)> {
        self.iter().filter_map(move |(kind, key)| {
            attributes
                .get(key)
                .filter(|value| !value.is_empty())
                .map(|value| (kind, key, value.as_str()))
        })
    }
}
