//! Canonical document addresses for scoped collections.
//!
//! Every collection lives at
//! `users/{userId}/farms/{farmId}/lambingSeasonGroups/{groupId}/{collection}`
//! and every record at that address plus `/{id}`. Segments are escaped so that
//! an identifier containing `/` can never alias another scope.

use crate::types::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three record collections stored under a lambing season group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    BreedingEvents,
    ScanningEvents,
    LambingRecords,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::BreedingEvents => "breedingEvents",
            CollectionKind::ScanningEvents => "scanningEvents",
            CollectionKind::LambingRecords => "lambingRecords",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a collection of documents.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(scope: &Scope, kind: CollectionKind) -> Self {
        CollectionPath(format!(
            "users/{}/farms/{}/lambingSeasonGroups/{}/{}",
            escape_segment(&scope.user_id),
            escape_segment(&scope.farm_id),
            escape_segment(&scope.lambing_season_group_id),
            kind.as_str()
        ))
    }

    /// Address of the document `id` inside this collection.
    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath {
            path: format!("{}/{}", self.0, escape_segment(id)),
            id: id.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of a single document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath {
    path: String,
    id: String,
}

impl DocumentPath {
    pub fn new(scope: &Scope, kind: CollectionKind, id: &str) -> Self {
        CollectionPath::new(scope, kind).doc(id)
    }

    /// The unescaped document id (last segment).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address of the collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        let cut = self.path.rfind('/').unwrap_or(0);
        CollectionPath(self.path[..cut].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Percent-escape `%` and `/`; everything else is emitted as is.
fn escape_segment(segment: &str) -> String {
    if !segment.contains(['%', '/']) {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len() + 4);
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}
