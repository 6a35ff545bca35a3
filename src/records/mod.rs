//! Record kinds kept per lambing season group.
//!
//! All three kinds share the same header (`id`, scope, `createdAt`,
//! `updatedAt`) and differ only in their own fields and display date.

mod breeding;
mod lambing;
mod scanning;

pub use breeding::{BreedingEvent, MatingType};
pub use lambing::{Assistance, LambingRecord};
pub use scanning::{ScanResults, ScanningEvent};

use crate::document::Document;
use crate::error::DecodeError;
use crate::paths::CollectionKind;
use crate::types::{Scope, Timestamp};
use std::fmt;

/// A record that can live in a collection store.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Collection this kind is stored in.
    const KIND: CollectionKind;

    fn id(&self) -> &str;
    fn scope(&self) -> &Scope;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Timestamp;
    fn set_created_at(&mut self, ts: Timestamp);
    fn set_updated_at(&mut self, ts: Timestamp);

    /// Ordering key for snapshots. `None` sorts after every dated record.
    fn display_date(&self) -> Option<Timestamp>;

    /// Encode every field except the id, which is the document address.
    fn to_document(&self) -> Document;

    fn from_document(id: &str, doc: &Document) -> Result<Self, DecodeError>;
}

// Header field names shared by every kind.
pub(crate) const USER_ID: &str = "userId";
pub(crate) const FARM_ID: &str = "farmId";
pub(crate) const GROUP_ID: &str = "lambingSeasonGroupId";
pub(crate) const CREATED_AT: &str = "createdAt";
pub(crate) const UPDATED_AT: &str = "updatedAt";

fn header_document(scope: &Scope, created_at: Timestamp, updated_at: Timestamp) -> Document {
    Document::new()
        .with(USER_ID, scope.user_id.as_str())
        .with(FARM_ID, scope.farm_id.as_str())
        .with(GROUP_ID, scope.lambing_season_group_id.as_str())
        .with(CREATED_AT, created_at)
        .with(UPDATED_AT, updated_at)
}

struct Header {
    scope: Scope,
    created_at: Timestamp,
    updated_at: Timestamp,
}

fn read_header(doc: &Document) -> Result<Header, DecodeError> {
    let created_at = doc.timestamp(CREATED_AT)?;
    Ok(Header {
        scope: Scope::new(doc.string(USER_ID)?, doc.string(FARM_ID)?, doc.string(GROUP_ID)?),
        created_at,
        // Older documents may predate updatedAt.
        updated_at: doc.opt_timestamp(UPDATED_AT)?.unwrap_or(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let scope = Scope::new("u", "f", "g");
        let doc = header_document(&scope, Timestamp(1), Timestamp(2));
        let header = read_header(&doc).unwrap();
        assert_eq!(header.scope, scope);
        assert_eq!(header.created_at, Timestamp(1));
        assert_eq!(header.updated_at, Timestamp(2));
    }

    #[test]
    fn missing_updated_at_falls_back_to_created_at() {
        let mut doc = header_document(&Scope::new("u", "f", "g"), Timestamp(7), Timestamp(9));
        doc.remove(UPDATED_AT);
        assert_eq!(read_header(&doc).unwrap().updated_at, Timestamp(7));
    }

    #[test]
    fn missing_scope_field_is_a_decode_error() {
        let mut doc = header_document(&Scope::new("u", "f", "g"), Timestamp(7), Timestamp(9));
        doc.remove(FARM_ID);
        assert!(matches!(read_header(&doc), Err(DecodeError::MissingField("farmId"))));
    }
}
