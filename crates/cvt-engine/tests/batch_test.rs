//! Batched lookups via `get_tlm_values`.
//!
//! Covers:
//! - result shape for live and overridden items
//! - staleness against RECEIVED_TIMESECONDS
//! - one store read per packet per batch
//! - all-or-nothing failures

mod common;

use common::{counting_engine, engine, now, packet, SCOPE};
use cvt_core::{Error, HashStore, ItemValue, LimitsState, ValueType, ValueTypeSet};
use cvt_engine::{ItemRecord, TlmValue};

fn live(value: impl Into<ItemValue>, limits_state: Option<LimitsState>) -> TlmValue {
    TlmValue::Live {
        value: value.into(),
        limits_state,
    }
}

#[test]
fn test_worked_example() {
    let engine = engine();
    let now = now();
    let values = packet(
        now,
        vec![
            ("TYPE", ItemRecord::new(0)),
            ("DURATION", ItemRecord::new(5).with_converted(5.0)),
        ],
    );
    engine.set(&values, "INST", "COLLECT", SCOPE).unwrap();

    let result = engine
        .get_tlm_values(
            &["INST__COLLECT__TYPE__RAW", "INST__COLLECT__DURATION__CONVERTED"],
            30.0,
            SCOPE,
        )
        .expect("Failed to resolve batch");

    assert_eq!(result, vec![live(0, None), live(5.0, None)]);
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        "[[0,null],[5.0,null]]"
    );
}

#[test]
fn test_stale_packet_overrides_limits_state() {
    let engine = engine();
    let now = 1_700_000_000.0;
    let values = packet(
        now - 60.0,
        vec![(
            "TEMP1",
            ItemRecord::new(10).with_limits_state(LimitsState::Red),
        )],
    );
    engine.set(&values, "INST", "HEALTH_STATUS", SCOPE).unwrap();

    let stale = engine
        .get_tlm_values_at(&["INST__HEALTH_STATUS__TEMP1__RAW"], 30.0, now, SCOPE)
        .unwrap();
    assert_eq!(stale, vec![live(10, Some(LimitsState::Stale))]);

    let fresh = engine
        .get_tlm_values_at(&["INST__HEALTH_STATUS__TEMP1__RAW"], 120.0, now, SCOPE)
        .unwrap();
    assert_eq!(fresh, vec![live(10, Some(LimitsState::Red))]);
}

#[test]
fn test_limits_read_from_item_name() {
    let engine = engine();
    let now = 1_000.0;
    let values = packet(
        now,
        vec![(
            "TEMP1",
            ItemRecord::new(10)
                .with_converted(1.0)
                .with_units("1.0 C")
                .with_limits_state(LimitsState::GreenHigh),
        )],
    );
    engine.set(&values, "INST", "HEALTH_STATUS", SCOPE).unwrap();

    let result = engine
        .get_tlm_values_at(&["INST__HEALTH_STATUS__TEMP1__WITH_UNITS"], 30.0, now, SCOPE)
        .unwrap();
    assert_eq!(result, vec![live("1.0 C", Some(LimitsState::GreenHigh))]);
}

#[test]
fn test_falsy_values_resolve() {
    let engine = engine();
    let now = 1_000.0;
    let values = packet(
        now,
        vec![
            ("ZERO", ItemRecord::new(0).with_converted(0)),
            ("OFF", ItemRecord::new(false)),
        ],
    );
    engine.set(&values, "INST", "P", SCOPE).unwrap();

    let result = engine
        .get_tlm_values_at(
            &["INST__P__ZERO__CONVERTED", "INST__P__OFF__FORMATTED", "INST__P__OFF__RAW"],
            30.0,
            now,
            SCOPE,
        )
        .unwrap();
    assert_eq!(
        result,
        vec![live(0, None), live("false", None), live(false, None)]
    );
}

#[test]
fn test_formatted_falls_back_to_converted() {
    let engine = engine();
    let now = 1_000.0;
    engine
        .set(
            &packet(now, vec![("V", ItemRecord::new(3).with_converted(2.5))]),
            "INST",
            "P",
            SCOPE,
        )
        .unwrap();

    let result = engine
        .get_tlm_values_at(&["INST__P__V__FORMATTED"], 30.0, now, SCOPE)
        .unwrap();
    assert_eq!(result[0].value(), &ItemValue::from("2.5"));
}

#[test]
fn test_overridden_items_have_no_limits_state() {
    let engine = engine();
    let now = 1_000.0;
    engine
        .set(
            &packet(
                now - 100.0,
                vec![("A", ItemRecord::new(1).with_limits_state(LimitsState::Red))],
            ),
            "INST",
            "P",
            SCOPE,
        )
        .unwrap();
    engine
        .override_item(
            "INST",
            "P",
            "A",
            ItemValue::Int(42),
            ValueTypeSet::Only(ValueType::Converted),
            SCOPE,
        )
        .unwrap();

    let result = engine
        .get_tlm_values_at(&["INST__P__A__CONVERTED", "INST__P__A__RAW"], 30.0, now, SCOPE)
        .unwrap();
    assert_eq!(
        result,
        vec![
            TlmValue::Overridden(ItemValue::Int(42)),
            live(1, Some(LimitsState::Stale)),
        ]
    );
    assert_eq!(serde_json::to_string(&result[0]).unwrap(), "[42]");
}

#[test]
fn test_fully_overridden_packet_needs_no_live_blob() {
    let engine = engine();
    engine
        .override_item(
            "INST",
            "P",
            "X",
            ItemValue::Int(9),
            ValueTypeSet::Only(ValueType::Raw),
            SCOPE,
        )
        .unwrap();

    let result = engine
        .get_tlm_values(&["INST__P__X__RAW"], 30.0, SCOPE)
        .expect("Overridden items should resolve without a live packet");
    assert_eq!(result, vec![TlmValue::Overridden(ItemValue::Int(9))]);
}

#[test]
fn test_partially_overridden_packet_still_needs_live_blob() {
    let engine = engine();
    engine
        .override_item(
            "INST",
            "P",
            "X",
            ItemValue::Int(9),
            ValueTypeSet::Only(ValueType::Raw),
            SCOPE,
        )
        .unwrap();

    let result = engine.get_tlm_values(&["INST__P__X__RAW", "INST__P__Y__RAW"], 30.0, SCOPE);
    assert!(matches!(
        result,
        Err(Error::PacketNotFound { target, packet }) if target == "INST" && packet == "P"
    ));
}

#[test]
fn test_null_limits_token_after_rewrite() {
    let engine = engine();
    let now = 1_000.0;
    let blob = format!(r#"{{"A":1,"A__L":null,"RECEIVED_TIMESECONDS":{now:.1}}}"#);
    engine
        .store()
        .hset("DEFAULT__tlm__INST", "P", blob.as_bytes())
        .unwrap();
    engine
        .set_item("INST", "P", "B", ItemValue::Int(2), ValueTypeSet::All, SCOPE)
        .unwrap();

    let result = engine
        .get_tlm_values_at(&["INST__P__A__RAW"], 30.0, now, SCOPE)
        .unwrap();
    assert_eq!(result, vec![live(1, None)]);
}

#[test]
fn test_fetch_counts_per_packet() {
    let (engine, store) = counting_engine();
    let now = 1_000.0;
    engine
        .set(
            &packet(
                now,
                vec![
                    ("A", ItemRecord::new(1)),
                    ("B", ItemRecord::new(2)),
                    ("C", ItemRecord::new(3)),
                ],
            ),
            "INST",
            "ONE",
            SCOPE,
        )
        .unwrap();
    engine
        .set(
            &packet(now, vec![("D", ItemRecord::new(4)), ("E", ItemRecord::new(5))]),
            "INST",
            "TWO",
            SCOPE,
        )
        .unwrap();
    store.reset();

    let result = engine
        .get_tlm_values_at(
            &[
                "INST__ONE__A__RAW",
                "INST__TWO__D__RAW",
                "INST__ONE__B__CONVERTED",
                "INST__TWO__E__WITH_UNITS",
                "INST__ONE__C__FORMATTED",
            ],
            30.0,
            now,
            SCOPE,
        )
        .unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(result[3].value(), &ItemValue::from("5"));
    assert!(store.live_reads() <= 2, "live reads: {}", store.live_reads());
    assert!(store.override_reads() <= 2, "override reads: {}", store.override_reads());
}

#[test]
fn test_missing_packet_fails_whole_batch() {
    let engine = engine();
    engine
        .set(&packet(0.0, vec![("A", ItemRecord::new(1))]), "INST", "P", SCOPE)
        .unwrap();

    let result = engine.get_tlm_values(&["INST__P__A__RAW", "INST__NOPE__A__RAW"], 30.0, SCOPE);
    assert!(matches!(
        result,
        Err(Error::PacketNotFound { packet, .. }) if packet == "NOPE"
    ));
}

#[test]
fn test_missing_item_fails_whole_batch() {
    let engine = engine();
    engine
        .set(&packet(0.0, vec![("A", ItemRecord::new(1))]), "INST", "P", SCOPE)
        .unwrap();

    let result = engine.get_tlm_values(&["INST__P__A__RAW", "INST__P__B__RAW"], 30.0, SCOPE);
    assert!(matches!(
        result,
        Err(Error::ItemNotFound { item, .. }) if item == "B"
    ));
}

#[test]
fn test_bad_specifiers_fail_whole_batch() {
    let engine = engine();
    engine
        .set(&packet(0.0, vec![("A", ItemRecord::new(1))]), "INST", "P", SCOPE)
        .unwrap();

    assert!(matches!(
        engine.get_tlm_values(&["INST__P__A__RAW", "INST__P__A"], 30.0, SCOPE),
        Err(Error::MalformedSpecifier(_))
    ));
    assert!(matches!(
        engine.get_tlm_values(&["INST__P__A__RAW", "INST__P__A__SOMETHING"], 30.0, SCOPE),
        Err(Error::UnknownValueType(_))
    ));
}

#[test]
fn test_empty_batch() {
    let engine = engine();
    let items: [&str; 0] = [];
    assert!(engine.get_tlm_values(&items, 30.0, SCOPE).unwrap().is_empty());
}
