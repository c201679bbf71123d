// Language registry
// Maps human-readable language names and aliases to judge execution targets

use crate::types::ExecutionTarget;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// (canonical name, aliases, judge target id)
///
/// Ids follow the Judge0 CE language table.
const BUILTIN_LANGUAGES: &[(&str, &[&str], u32)] = &[
    ("assembly", &["asm", "nasm"], 45),
    ("bash", &["sh", "shell"], 46),
    ("c", &["gcc"], 50),
    ("csharp", &["c#", "cs", "mono"], 51),
    ("cpp", &["c++", "g++", "cxx"], 54),
    ("fortran", &["gfortran"], 59),
    ("go", &["golang"], 60),
    ("haskell", &["hs", "ghc"], 61),
    ("java", &["openjdk"], 62),
    ("javascript", &["js", "node", "nodejs"], 63),
    ("lua", &[], 64),
    ("pascal", &["fpc"], 67),
    ("php", &[], 68),
    ("python2", &["py2"], 70),
    ("python", &["python3", "py", "py3"], 71),
    ("ruby", &["rb"], 72),
    ("rust", &["rs", "rustc"], 73),
    ("typescript", &["ts"], 74),
    ("kotlin", &["kt"], 78),
    ("r", &["rscript"], 80),
    ("scala", &[], 81),
    ("sql", &["sqlite"], 82),
    ("swift", &[], 83),
    ("perl", &["pl"], 85),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown language: {0}")]
pub struct UnknownLanguage(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("alias '{alias}' maps to both target {existing} and target {incoming}")]
    Conflict {
        alias: String,
        existing: ExecutionTarget,
        incoming: ExecutionTarget,
    },
    #[error("language name must not be empty")]
    EmptyName,
}

/// A language as advertised by the judge's `/languages` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeLanguage {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub target: ExecutionTarget,
}

/// Single authoritative alias table. Lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    entries: Vec<LanguageEntry>,
    by_alias: HashMap<String, ExecutionTarget>,
}

impl LanguageRegistry {
    /// Registry built from the bundled language table
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_table(BUILTIN_LANGUAGES)
    }

    /// Build a registry, rejecting any alias that would map to two targets
    pub fn from_table(table: &[(&str, &[&str], u32)]) -> Result<Self, RegistryError> {
        let mut entries = Vec::with_capacity(table.len());
        let mut by_alias: HashMap<String, ExecutionTarget> = HashMap::new();

        for (name, aliases, id) in table {
            let target = ExecutionTarget(*id);
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                return Err(RegistryError::EmptyName);
            }

            let mut listed: Vec<String> = Vec::with_capacity(aliases.len());
            for alias in aliases.iter().map(|a| a.trim().to_lowercase()) {
                if !alias.is_empty() && alias != name && !listed.contains(&alias) {
                    listed.push(alias);
                }
            }
            let aliases = listed;

            for key in std::iter::once(&name).chain(aliases.iter()) {
                match by_alias.get(key) {
                    Some(existing) if *existing != target => {
                        return Err(RegistryError::Conflict {
                            alias: key.clone(),
                            existing: *existing,
                            incoming: target,
                        });
                    }
                    _ => {
                        by_alias.insert(key.clone(), target);
                    }
                }
            }

            entries.push(LanguageEntry { name, aliases, target });
        }

        Ok(Self { entries, by_alias })
    }

    /// Resolve a language name, alias, or raw numeric target id.
    ///
    /// Numeric input that is not an alias is accepted verbatim, which lets
    /// callers address any target the judge supports.
    pub fn resolve(&self, name_or_id: &str) -> Result<ExecutionTarget, UnknownLanguage> {
        let key = name_or_id.trim().to_lowercase();
        if let Some(target) = self.by_alias.get(&key) {
            return Ok(*target);
        }

        key.parse::<u32>()
            .map(ExecutionTarget)
            .map_err(|_| UnknownLanguage(name_or_id.to_string()))
    }

    pub fn entries(&self) -> &[LanguageEntry] {
        &self.entries
    }

    /// Canonical name for a target, if the table knows it
    pub fn name_of(&self, target: ExecutionTarget) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.target == target)
            .map(|e| e.name.as_str())
    }

    /// Entries whose target the judge does not advertise
    pub fn verify_against(&self, available: &[JudgeLanguage]) -> Vec<&LanguageEntry> {
        let ids: BTreeSet<u32> = available.iter().map(|l| l.id).collect();
        self.entries
            .iter()
            .filter(|e| !ids.contains(&e.target.id()))
            .collect()
    }
}
