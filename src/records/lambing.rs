//! Per-ewe lambing records.

use super::{header_document, read_header, Entity};
use crate::document::Document;
use crate::error::DecodeError;
use crate::paths::CollectionKind;
use crate::types::{Scope, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Assistance {
    #[default]
    Unassisted,
    Assisted,
    Veterinary,
}

impl Assistance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Assistance::Unassisted => "unassisted",
            Assistance::Assisted => "assisted",
            Assistance::Veterinary => "veterinary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unassisted" => Some(Assistance::Unassisted),
            "assisted" => Some(Assistance::Assisted),
            "veterinary" => Some(Assistance::Veterinary),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambingRecord {
    pub id: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub ewe_tag: String,
    pub lambs_born: u32,
    pub lambs_alive: u32,
    pub assistance: Assistance,
    pub notes: Option<String>,
}

impl LambingRecord {
    pub fn new(
        id: impl Into<String>,
        scope: Scope,
        created_at: Timestamp,
        ewe_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            scope,
            created_at,
            updated_at: created_at,
            ewe_tag: ewe_tag.into(),
            lambs_born: 0,
            lambs_alive: 0,
            assistance: Assistance::Unassisted,
            notes: None,
        }
    }

    pub fn losses(&self) -> u32 {
        self.lambs_born.saturating_sub(self.lambs_alive)
    }
}

impl Entity for LambingRecord {
    const KIND: CollectionKind = CollectionKind::LambingRecords;

    fn id(&self) -> &str {
        &self.id
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    fn set_created_at(&mut self, ts: Timestamp) {
        self.created_at = ts;
    }

    fn set_updated_at(&mut self, ts: Timestamp) {
        self.updated_at = ts;
    }

    fn display_date(&self) -> Option<Timestamp> {
        Some(self.created_at)
    }

    fn to_document(&self) -> Document {
        header_document(&self.scope, self.created_at, self.updated_at)
            .with("eweTag", self.ewe_tag.as_str())
            .with("lambsBorn", self.lambs_born)
            .with("lambsAlive", self.lambs_alive)
            .with("assistance", self.assistance.as_str())
            .with("notes", self.notes.clone())
    }

    fn from_document(id: &str, doc: &Document) -> Result<Self, DecodeError> {
        let header = read_header(doc)?;
        let assistance = match doc.opt_string("assistance")? {
            None => Assistance::Unassisted,
            Some(raw) => Assistance::parse(&raw).ok_or(DecodeError::InvalidValue {
                field: "assistance",
                value: raw,
            })?,
        };
        Ok(Self {
            id: id.to_string(),
            scope: header.scope,
            created_at: header.created_at,
            updated_at: header.updated_at,
            ewe_tag: doc.string("eweTag")?,
            lambs_born: doc.u32("lambsBorn")?,
            lambs_alive: doc.u32_or_zero("lambsAlive")?,
            assistance,
            notes: doc.opt_string("notes")?,
        })
    }
}
