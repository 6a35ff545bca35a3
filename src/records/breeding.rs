//! Breeding events: a ram joined with a group of ewes, or an AI session.

use super::{header_document, read_header, Entity};
use crate::document::Document;
use crate::error::DecodeError;
use crate::paths::CollectionKind;
use crate::types::{Scope, Timestamp};
use serde::{Deserialize, Serialize};

/// Mean sheep gestation in days.
const GESTATION_DAYS: i64 = 147;

/// Spread either side of the mean used for the expected lambing window.
const GESTATION_SPREAD_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatingType {
    NaturalService,
    ArtificialInsemination,
}

impl MatingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatingType::NaturalService => "naturalService",
            MatingType::ArtificialInsemination => "artificialInsemination",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "naturalService" => Some(MatingType::NaturalService),
            "artificialInsemination" => Some(MatingType::ArtificialInsemination),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingEvent {
    pub id: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub mating_type: MatingType,
    /// Ram put in with the ewes.
    pub date_of_joining: Option<Timestamp>,
    /// Ram taken out.
    pub date_of_retrieval: Option<Timestamp>,
    pub date_of_insemination: Option<Timestamp>,
    pub ewes_joined: u32,
    pub ram_tag: Option<String>,
    pub notes: Option<String>,
}

impl BreedingEvent {
    /// A natural-service event with no dates set.
    pub fn new(id: impl Into<String>, scope: Scope, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            scope,
            created_at,
            updated_at: created_at,
            mating_type: MatingType::NaturalService,
            date_of_joining: None,
            date_of_retrieval: None,
            date_of_insemination: None,
            ewes_joined: 0,
            ram_tag: None,
            notes: None,
        }
    }

    /// The date that anchors this event: insemination for AI, joining for
    /// natural service.
    pub fn breeding_date(&self) -> Option<Timestamp> {
        match self.mating_type {
            MatingType::ArtificialInsemination => self.date_of_insemination,
            MatingType::NaturalService => self.date_of_joining,
        }
    }

    /// First and last expected lambing dates.
    pub fn expected_lambing_window(&self) -> Option<(Timestamp, Timestamp)> {
        let start = self.breeding_date()?;
        let end = match self.mating_type {
            MatingType::NaturalService => self.date_of_retrieval.unwrap_or(start),
            MatingType::ArtificialInsemination => start,
        };
        Some((
            start.plus_days(GESTATION_DAYS - GESTATION_SPREAD_DAYS),
            end.plus_days(GESTATION_DAYS + GESTATION_SPREAD_DAYS),
        ))
    }

    /// Days the ram spent with the ewes, once retrieved.
    pub fn days_with_ram(&self) -> Option<i64> {
        match (self.date_of_joining, self.date_of_retrieval) {
            (Some(joined), Some(retrieved)) => Some(retrieved.days_since(joined)),
            _ => None,
        }
    }
}

impl Entity for BreedingEvent {
    const KIND: CollectionKind = CollectionKind::BreedingEvents;

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
        self.breeding_date()
    }

    fn to_document(&self) -> Document {
        header_document(&self.scope, self.created_at, self.updated_at)
            .with("matingType", self.mating_type.as_str())
            .with("dateOfJoining", self.date_of_joining)
            .with("dateOfRetrieval", self.date_of_retrieval)
            .with("dateOfInsemination", self.date_of_insemination)
            .with("ewesJoined", self.ewes_joined)
            .with("ramTag", self.ram_tag.clone())
            .with("notes", self.notes.clone())
    }

    fn from_document(id: &str, doc: &Document) -> Result<Self, DecodeError> {
        let header = read_header(doc)?;
        let raw_type = doc.string("matingType")?;
        let mating_type = MatingType::parse(&raw_type).ok_or(DecodeError::InvalidValue {
            field: "matingType",
            value: raw_type,
        })?;
        Ok(Self {
            id: id.to_string(),
            scope: header.scope,
            created_at: header.created_at,
            updated_at: header.updated_at,
            mating_type,
            date_of_joining: doc.opt_timestamp("dateOfJoining")?,
            date_of_retrieval: doc.opt_timestamp("dateOfRetrieval")?,
            date_of_insemination: doc.opt_timestamp("dateOfInsemination")?,
            ewes_joined: doc.u32_or_zero("ewesJoined")?,
            ram_tag: doc.opt_string("ramTag")?,
            notes: doc.opt_string("notes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(days_ago: i64) -> BreedingEvent {
        let now = Timestamp::from_secs(1_700_000_000);
        let mut event = BreedingEvent::new("b1", Scope::new("u", "f", "g"), now);
        event.date_of_joining = Some(now.minus_days(days_ago));
        event
    }

    #[test]
    fn display_date_follows_mating_type() {
        let mut event = joined(30);
        assert_eq!(event.display_date(), event.date_of_joining);

        event.mating_type = MatingType::ArtificialInsemination;
        assert_eq!(event.display_date(), None);

        event.date_of_insemination = Some(Timestamp::from_secs(5));
        assert_eq!(event.display_date(), Some(Timestamp::from_secs(5)));
    }

    #[test]
    fn lambing_window_spans_ram_time() {
        let mut event = joined(40);
        let joining = event.date_of_joining.unwrap();
        event.date_of_retrieval = Some(joining.plus_days(34));

        let (first, last) = event.expected_lambing_window().unwrap();
        assert_eq!(first.days_since(joining), 140);
        assert_eq!(last.days_since(joining), 34 + 154);
        assert_eq!(event.days_with_ram(), Some(34));
    }

    #[test]
    fn document_roundtrip() {
        let mut event = joined(10);
        event.ram_tag = Some("RAM-9".into());
        event.ewes_joined = 45;
        let decoded = BreedingEvent::from_document("b1", &event.to_document()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn unknown_mating_type_is_rejected() {
        let doc = joined(1).to_document().with("matingType", "teaser");
        assert!(matches!(
            BreedingEvent::from_document("b1", &doc),
            Err(DecodeError::InvalidValue { field: "matingType", .. })
        ));
    }
}
