//! The collection store contract, run against both store implementations.

mod common;

use common::*;
use flock_store::{
    Assistance, BreedingEvent, CollectionStore, LambingRecord, MatingType, ScanningEvent,
    Timestamp,
};
use std::time::Duration;

// --- Reads ---

#[test]
fn test_fetch_all_orders_newest_breeding_date_first() {
    let fixture = Fixture::<BreedingEvent>::new();
    for (name, store) in fixture.stores() {
        store.create(joined("older", scope(), 30)).unwrap();
        store.create(joined("newer", scope(), 10)).unwrap();

        let ids: Vec<_> = store
            .fetch_all(&scope())
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, ["newer", "older"], "{name}");
    }
}

#[test]
fn test_undated_events_sort_last() {
    let fixture = Fixture::<BreedingEvent>::new();
    for (name, store) in fixture.stores() {
        store.create(BreedingEvent::new("undated", scope(), NOW)).unwrap();
        store.create(joined("dated", scope(), 3)).unwrap();

        let mut ai = BreedingEvent::new("ai", scope(), NOW);
        ai.mating_type = MatingType::ArtificialInsemination;
        ai.date_of_insemination = Some(Timestamp(NOW.0 - DAY));
        store.create(ai).unwrap();

        let ids: Vec<_> = store
            .fetch_all(&scope())
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, ["ai", "dated", "undated"], "{name}");
    }
}

#[test]
fn test_fetch_of_empty_scope() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        assert!(store.fetch_all(&scope()).unwrap().is_empty(), "{name}");
        assert_eq!(store.fetch_by_id(&scope(), "missing").unwrap(), None, "{name}");
    }
}

#[test]
fn test_scopes_are_isolated() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        store
            .create(LambingRecord::new("same-id", scope(), NOW, "UK01"))
            .unwrap();
        store
            .create(LambingRecord::new("same-id", other_scope(), NOW, "UK02"))
            .unwrap();

        store.delete(&other_scope(), "same-id").unwrap();

        let remaining = store.fetch_by_id(&scope(), "same-id").unwrap().unwrap();
        assert_eq!(remaining.ewe_tag, "UK01", "{name}");
        assert!(store.fetch_all(&other_scope()).unwrap().is_empty(), "{name}");
    }
}

// --- Writes ---

#[test]
fn test_create_then_fetch_by_id() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        let mut record = LambingRecord::new("l1", scope(), NOW, "UK0123");
        record.lambs_born = 3;
        record.lambs_alive = 2;
        record.assistance = Assistance::Veterinary;
        record.notes = Some("breech".into());
        store.create(record.clone()).unwrap();

        assert_eq!(store.fetch_by_id(&scope(), "l1").unwrap(), Some(record), "{name}");
    }
}

#[test]
fn test_create_normalizes_updated_at() {
    let fixture = Fixture::<ScanningEvent>::new();
    for (name, store) in fixture.stores() {
        let mut event = ScanningEvent::new("s1", scope(), NOW);
        event.updated_at = Timestamp(NOW.0 + 5 * DAY);
        store.create(event).unwrap();

        let stored = store.fetch_by_id(&scope(), "s1").unwrap().unwrap();
        assert_eq!(stored.updated_at, stored.created_at, "{name}");
    }
}

#[test]
fn test_create_with_existing_id_replaces() {
    let fixture = Fixture::<ScanningEvent>::new();
    for (name, store) in fixture.stores() {
        let mut first = ScanningEvent::new("s1", scope(), NOW);
        first.results.twins = 40;
        store.create(first).unwrap();

        let mut second = ScanningEvent::new("s1", scope(), NOW);
        second.results.singles = 12;
        store.create(second.clone()).unwrap();

        let all = store.fetch_all(&scope()).unwrap();
        assert_eq!(all, vec![second], "{name}");
    }
}

#[test]
fn test_update_preserves_created_at() {
    let fixture = Fixture::<ScanningEvent>::new();
    for (name, store) in fixture.stores() {
        store.create(ScanningEvent::new("s1", scope(), NOW)).unwrap();
        fixture.clock.advance(Duration::from_secs(60));

        let mut edited = ScanningEvent::new("s1", scope(), Timestamp(NOW.0 + 99 * DAY));
        edited.results.triplets = 4;
        store.update(edited).unwrap();

        let stored = store.fetch_by_id(&scope(), "s1").unwrap().unwrap();
        assert_eq!(stored.created_at, NOW, "{name}");
        assert!(stored.updated_at >= NOW, "{name}");
        assert_eq!(stored.results.triplets, 4, "{name}");
    }
}

#[test]
fn test_update_never_moves_updated_at_backwards() {
    let fixture = Fixture::<ScanningEvent>::new();
    let ahead = Timestamp(NOW.0 + DAY);
    for (name, store) in fixture.stores() {
        store.create(ScanningEvent::new("s1", scope(), ahead)).unwrap();
        let prior = store.fetch_by_id(&scope(), "s1").unwrap().unwrap().updated_at;
        assert_eq!(prior, ahead, "{name}");

        store.update(ScanningEvent::new("s1", scope(), NOW)).unwrap();
        let stored = store.fetch_by_id(&scope(), "s1").unwrap().unwrap();
        assert!(stored.updated_at >= prior, "{name}: {:?} < {:?}", stored.updated_at, prior);
        assert_eq!(stored.created_at, ahead, "{name}");
    }
}

#[test]
fn test_update_of_unknown_id_is_not_found() {
    let fixture = Fixture::<BreedingEvent>::new();
    for (name, store) in fixture.stores() {
        let err = store.update(joined("ghost", scope(), 1)).unwrap_err();
        assert!(err.is_not_found(), "{name}: {err}");
        assert!(store.fetch_all(&scope()).unwrap().is_empty(), "{name}");
    }
}

#[test]
fn test_delete_is_idempotent() {
    let fixture = Fixture::<BreedingEvent>::new();
    for (name, store) in fixture.stores() {
        store.create(joined("b1", scope(), 1)).unwrap();
        store.delete(&scope(), "b1").unwrap();
        store.delete(&scope(), "b1").unwrap();
        assert_eq!(store.fetch_by_id(&scope(), "b1").unwrap(), None, "{name}");
    }
}

// --- Subscriptions ---

#[test]
fn test_subscribe_replays_empty_snapshot() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        let recorder = Recorder::attach(store, &scope());
        assert_eq!(recorder.ids(), vec![Vec::<String>::new()], "{name}");
    }
}

#[test]
fn test_subscribe_then_create() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        let recorder = Recorder::attach(store, &scope());
        store
            .create(LambingRecord::new("l1", scope(), NOW, "UK01"))
            .unwrap();
        assert_eq!(
            recorder.ids(),
            vec![vec![], vec!["l1".to_string()]],
            "{name}"
        );
    }
}

#[test]
fn test_every_delivery_matches_fetch_all() {
    let fixture = Fixture::<BreedingEvent>::new();
    for (name, store) in fixture.stores() {
        let recorder = Recorder::attach(store, &scope());

        store.create(joined("a", scope(), 5)).unwrap();
        assert_eq!(recorder.last().unwrap().unwrap(), store.fetch_all(&scope()).unwrap(), "{name}");

        store.create(joined("b", scope(), 2)).unwrap();
        assert_eq!(recorder.last().unwrap().unwrap(), store.fetch_all(&scope()).unwrap(), "{name}");

        let mut edited = joined("a", scope(), 1);
        edited.ram_tag = Some("RAM-7".into());
        store.update(edited).unwrap();
        assert_eq!(recorder.last().unwrap().unwrap(), store.fetch_all(&scope()).unwrap(), "{name}");

        store.delete(&scope(), "b").unwrap();
        assert_eq!(recorder.last().unwrap().unwrap(), store.fetch_all(&scope()).unwrap(), "{name}");
        assert_eq!(recorder.len(), 5, "{name}");
    }
}

#[test]
fn test_listeners_see_identical_sequences() {
    let fixture = Fixture::<BreedingEvent>::new();
    for (name, store) in fixture.stores() {
        let first = Recorder::attach(store, &scope());
        let second = Recorder::attach(store, &scope());

        store.create(joined("a", scope(), 5)).unwrap();
        store.create(joined("b", scope(), 9)).unwrap();
        store.delete(&scope(), "a").unwrap();

        assert_eq!(first.ids(), second.ids(), "{name}");
        assert_eq!(
            first.ids(),
            vec![
                vec![],
                vec!["a".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["b".to_string()],
            ],
            "{name}"
        );
    }
}

#[test]
fn test_other_scope_mutations_are_not_delivered() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        let recorder = Recorder::attach(store, &scope());
        store
            .create(LambingRecord::new("elsewhere", other_scope(), NOW, "UK9"))
            .unwrap();
        assert_eq!(recorder.len(), 1, "{name}");
    }
}

#[test]
fn test_no_delivery_after_cancel() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        let recorder = Recorder::attach(store, &scope());
        recorder.subscription.cancel();
        assert!(recorder.subscription.is_cancelled(), "{name}");

        store
            .create(LambingRecord::new("l1", scope(), NOW, "UK01"))
            .unwrap();
        assert_eq!(recorder.len(), 1, "{name}");

        // Cancelling again is harmless.
        recorder.subscription.cancel();
    }
}

#[test]
fn test_dropping_a_subscription_keeps_it_active() {
    let fixture = Fixture::<LambingRecord>::new();
    for (name, store) in fixture.stores() {
        let recorder = Recorder::attach(store, &scope());
        let seen = std::sync::Arc::clone(&recorder.seen);
        drop(recorder.subscription);

        store
            .create(LambingRecord::new("l1", scope(), NOW, "UK01"))
            .unwrap();
        assert_eq!(seen.lock().len(), 2, "{name}");
    }
}
