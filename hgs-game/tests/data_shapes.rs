use std::collections::{BTreeMap, BTreeSet};

use hgs_game::{
    Catalog, ConfigFormat, LoadSource, PoolKey, PronounOption, StoredConfig, TributeSetup,
    builtin_config, players_involved, roster_from_json, roster_to_json,
};

#[test]
fn builtin_events_are_well_formed() {
    let config = builtin_config();
    assert_eq!(config.version, Some(1));
    let declared: BTreeSet<&str> = config
        .tags
        .iter()
        .flatten()
        .map(|tag| tag.name.as_str())
        .collect();

    let catalog = Catalog::with_builtin_events();
    for (key, event) in catalog.pool.iter() {
        assert_eq!(
            event.players_involved(),
            players_involved(event.message()),
            "{}: {}",
            key.key(),
            event.message()
        );
        assert!(event.enabled);
        for requirement in event.requirements() {
            let name = catalog.tags.name_of(requirement.tag).unwrap();
            assert!(declared.contains(name), "undeclared tag {name}");
        }
    }
    for key in PoolKey::ALL {
        assert!(!catalog.pool.bucket(key).is_empty(), "{} is empty", key.key());
    }
}

#[test]
fn every_stage_has_fatal_and_harmless_events() {
    let catalog = Catalog::with_builtin_events();
    let snapshot = catalog.pool.stage_events();
    for stage in hgs_game::Stage::ALL {
        let events = snapshot.for_stage(stage);
        assert!(events.iter().any(|e| e.is_fatal()), "{stage} has no deaths");
        assert!(
            events
                .iter()
                .any(|e| !e.is_fatal() && e.players_involved() == 1 && e.requirements().is_empty()),
            "{stage} cannot place a lone tribute"
        );
    }
}

#[test]
fn save_load_roundtrip_preserves_pool_and_tags() {
    let mut original = Catalog::with_builtin_events();
    original
        .add_custom_event(PoolKey::Day, "%0 trades %G0 boots with %1.", "", "")
        .unwrap();
    let disabled = original.pool.bucket(PoolKey::Night)[2].id;
    original.set_enabled(disabled, false);
    original.tags.intern("volunteer");

    let json = original.save_config().to_json().unwrap();
    let parsed: StoredConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, original.save_config());

    let mut restored = Catalog::empty();
    let report = restored
        .load_config(&json, false, LoadSource::User)
        .unwrap();
    assert_eq!(report.format, Some(ConfigFormat::V1));
    assert_eq!(report.added, original.pool.len());
    assert_eq!(restored.save_config(), original.save_config());

    let by_message = |catalog: &Catalog| -> BTreeMap<(String, String), bool> {
        catalog
            .pool
            .iter()
            .map(|(key, e)| ((key.key().to_string(), e.message().to_string()), e.enabled))
            .collect()
    };
    assert_eq!(by_message(&restored), by_message(&original));
}

#[test]
fn legacy_documents_merge_into_builtin_pool() {
    let legacy = r#"{
        "events": {
            "day": [
                { "message": "%0 goes hunting.", "fatalities": [], "killers": [], "enabled": false, "type": "BUILTIN" },
                { "message": "%0 paints a portrait of %1.", "fatalities": [], "killers": [], "enabled": true, "type": "ART" }
            ]
        }
    }"#;
    let mut catalog = Catalog::with_builtin_events();
    let before = catalog.pool.len();
    let report = catalog.load_config(legacy, false, LoadSource::User).unwrap();
    assert_eq!(report.format, Some(ConfigFormat::Legacy));
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(catalog.pool.len(), before + 1);

    catalog.reset_to_builtin();
    assert_eq!(catalog.pool.len(), before);
}

#[test]
fn roster_files_roundtrip() {
    let roster = vec![
        TributeSetup::new("Katniss", PronounOption::Feminine).with_tag("volunteer"),
        TributeSetup::new("Zee", PronounOption::Custom("ze/zir/zir/zirself".into())),
        TributeSetup::new("Mutt", PronounOption::None),
    ];
    let json = roster_to_json(&roster).unwrap();
    assert_eq!(roster_from_json(&json).unwrap(), roster);
}
