//! Pregnancy scanning results for a group.

use super::{header_document, read_header, Entity};
use crate::document::Document;
use crate::error::DecodeError;
use crate::paths::CollectionKind;
use crate::types::{Scope, Timestamp};
use serde::{Deserialize, Serialize};

/// Ewe counts by number of foetuses seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResults {
    pub empty: u32,
    pub singles: u32,
    pub twins: u32,
    pub triplets: u32,
    pub quadruplets_or_more: u32,
}

impl ScanResults {
    fn to_document(self) -> Document {
        Document::new()
            .with("empty", self.empty)
            .with("singles", self.singles)
            .with("twins", self.twins)
            .with("triplets", self.triplets)
            .with("quadruplets", self.quadruplets_or_more)
    }

    fn from_document(doc: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            empty: doc.u32_or_zero("empty")?,
            singles: doc.u32_or_zero("singles")?,
            twins: doc.u32_or_zero("twins")?,
            triplets: doc.u32_or_zero("triplets")?,
            quadruplets_or_more: doc.u32_or_zero("quadruplets")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanningEvent {
    pub id: String,
    #[serde(flatten)]
    pub scope: Scope,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub scanned_on: Option<Timestamp>,
    pub scanner_name: Option<String>,
    pub results: ScanResults,
    pub notes: Option<String>,
}

impl ScanningEvent {
    pub fn new(id: impl Into<String>, scope: Scope, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            scope,
            created_at,
            updated_at: created_at,
            scanned_on: None,
            scanner_name: None,
            results: ScanResults::default(),
            notes: None,
        }
    }

    pub fn ewes_scanned(&self) -> u32 {
        let r = &self.results;
        [r.empty, r.singles, r.twins, r.triplets, r.quadruplets_or_more]
            .into_iter()
            .fold(0u32, u32::saturating_add)
    }

    /// Lambs expected from the scan, counting quads and above as four.
    pub fn expected_lambs(&self) -> u32 {
        let r = &self.results;
        [
            r.singles,
            r.twins.saturating_mul(2),
            r.triplets.saturating_mul(3),
            r.quadruplets_or_more.saturating_mul(4),
        ]
        .into_iter()
        .fold(0u32, u32::saturating_add)
    }

    /// Expected lambs per hundred ewes scanned.
    pub fn scanning_percentage(&self) -> Option<f64> {
        match self.ewes_scanned() {
            0 => None,
            n => Some(self.expected_lambs() as f64 * 100.0 / n as f64),
        }
    }
}

impl Entity for ScanningEvent {
    const KIND: CollectionKind = CollectionKind::ScanningEvents;

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
            .with("scannedOn", self.scanned_on)
            .with("scannerName", self.scanner_name.clone())
            .with("results", self.results.to_document())
            .with("notes", self.notes.clone())
    }

    fn from_document(id: &str, doc: &Document) -> Result<Self, DecodeError> {
        let header = read_header(doc)?;
        Ok(Self {
            id: id.to_string(),
            scope: header.scope,
            created_at: header.created_at,
            updated_at: header.updated_at,
            scanned_on: doc.opt_timestamp("scannedOn")?,
            scanner_name: doc.opt_string("scannerName")?,
            results: ScanResults::from_document(doc.map("results")?)?,
            notes: doc.opt_string("notes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(results: ScanResults) -> ScanningEvent {
        let mut event = ScanningEvent::new("s1", Scope::new("u", "f", "g"), Timestamp(100));
        event.results = results;
        event
    }

    #[test]
    fn percentage_counts_expected_lambs() {
        let event = scan(ScanResults {
            empty: 10,
            singles: 30,
            twins: 50,
            triplets: 10,
            quadruplets_or_more: 0,
        });
        assert_eq!(event.ewes_scanned(), 100);
        assert_eq!(event.expected_lambs(), 160);
        assert_eq!(event.scanning_percentage(), Some(160.0));
    }

    #[test]
    fn huge_counts_saturate() {
        let event = scan(ScanResults {
            singles: u32::MAX,
            quadruplets_or_more: u32::MAX / 2,
            ..Default::default()
        });
        assert_eq!(event.ewes_scanned(), u32::MAX);
        assert_eq!(event.expected_lambs(), u32::MAX);
    }

    #[test]
    fn empty_scan_has_no_percentage() {
        assert_eq!(scan(ScanResults::default()).scanning_percentage(), None);
    }

    #[test]
    fn results_are_a_nested_map() {
        let event = scan(ScanResults {
            twins: 3,
            ..Default::default()
        });
        let doc = event.to_document();
        assert_eq!(doc.map("results").unwrap().u32("twins").unwrap(), 3);
        assert_eq!(ScanningEvent::from_document("s1", &doc).unwrap(), event);
    }

    #[test]
    fn results_must_be_present() {
        let mut doc = scan(ScanResults::default()).to_document();
        doc.remove("results");
        assert_eq!(
            ScanningEvent::from_document("s1", &doc),
            Err(DecodeError::MissingField("results"))
        );
    }
}
