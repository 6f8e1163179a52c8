//! Integration tests for schema loading
//!
//! These tests write binary schema files into a fake client install directory
//! and check that:
//! - The reader and definition builder agree on the vendor layout
//! - Localized strings resolve with the documented fallbacks
//! - Failed loads never leave partial definitions behind

use camino::{Utf8Path, Utf8PathBuf};
use statkeeper::StateManager;
use statkeeper::models::StatDefinition;
use statkeeper::schema::{SchemaNode, SchemaValue, encode_schema, load_schema_file, schema_path};
use statkeeper::services::{DefinitionError, SchemaDefinitions};
use std::fs;
use tempfile::TempDir;

fn text(name: &str, value: &str) -> SchemaNode {
    SchemaNode::leaf(name, SchemaValue::String(value.to_string()))
}

fn int(name: &str, value: i32) -> SchemaNode {
    SchemaNode::leaf(name, SchemaValue::Int32(value))
}

fn localized(name: &str, entries: &[(&str, &str)]) -> SchemaNode {
    SchemaNode::tree(
        name,
        entries.iter().map(|(lang, value)| text(lang, value)).collect(),
    )
}

fn game_schema(game_id: u32, stats: Vec<SchemaNode>) -> SchemaNode {
    SchemaNode::tree(
        "",
        vec![SchemaNode::tree(
            game_id.to_string(),
            vec![
                text("gamename", "Test Game"),
                SchemaNode::tree("stats", stats),
            ],
        )],
    )
}

fn sample_stats() -> Vec<SchemaNode> {
    vec![
        SchemaNode::tree(
            "1",
            vec![
                int("type", 1),
                text("name", "kills"),
                int("min", 0),
                int("max", 1000),
                int("incrementonly", 1),
                SchemaNode::tree(
                    "display",
                    vec![localized("name", &[("english", "Kills"), ("german", "Abschüsse")])],
                ),
            ],
        ),
        SchemaNode::tree(
            "2",
            vec![
                int("type", 2),
                text("name", "distance"),
                SchemaNode::leaf("max", SchemaValue::Float32(42.5)),
            ],
        ),
        SchemaNode::tree(
            "3",
            vec![
                int("type", 4),
                SchemaNode::tree(
                    "bits",
                    vec![
                        SchemaNode::tree(
                            "0",
                            vec![
                                text("name", "ACH_01"),
                                SchemaNode::tree(
                                    "display",
                                    vec![
                                        localized(
                                            "name",
                                            &[("english", "First Blood"), ("german", "Erstes Blut")],
                                        ),
                                        localized("desc", &[("english", "Win a match")]),
                                        text("icon", "a.jpg"),
                                    ],
                                ),
                            ],
                        ),
                        SchemaNode::tree(
                            "1",
                            vec![
                                text("name", "ACH_02"),
                                int("permission", 2),
                                SchemaNode::tree(
                                    "display",
                                    vec![
                                        localized("name", &[("english", "#ACH_02_NAME")]),
                                        text("icon", "b.jpg"),
                                        text("icon_gray", "b_gray.jpg"),
                                        int("hidden", 1),
                                    ],
                                ),
                            ],
                        ),
                    ],
                ),
            ],
        ),
    ]
}

/// Fake install directory with the schema written where the client keeps it.
fn install_with_schema(game_id: u32, root: &SchemaNode) -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let install_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();

    let path = schema_path(&install_dir, game_id);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, encode_schema(root)).unwrap();

    (temp_dir, install_dir)
}

#[test]
fn test_schema_file_round_trips_through_reader() {
    let (_temp_dir, install_dir) = install_with_schema(480, &game_schema(480, sample_stats()));

    let root = load_schema_file(&schema_path(&install_dir, 480)).unwrap();
    assert_eq!(root.get("480").get("gamename").as_string(""), "Test Game");
    assert_eq!(root.get("480").get("STATS").children().len(), 3);
}

#[test]
fn test_definitions_from_file() {
    let (_temp_dir, install_dir) = install_with_schema(480, &game_schema(480, sample_stats()));
    let root = load_schema_file(&schema_path(&install_dir, 480)).unwrap();

    let mut definitions = SchemaDefinitions::new();
    definitions.build(&root, 480, "english").unwrap();

    let stats = definitions.stats();
    assert_eq!(stats.len(), 2);
    let StatDefinition::Integer(kills) = &stats[0] else {
        panic!("expected integer stat, got {:?}", stats[0]);
    };
    assert_eq!(kills.display_name, "Kills");
    assert_eq!((kills.min_value, kills.max_value), (0, 1000));
    assert!(kills.increment_only);

    let StatDefinition::Float(distance) = &stats[1] else {
        panic!("expected float stat, got {:?}", stats[1]);
    };
    assert_eq!(distance.display_name, "distance");
    assert_eq!(distance.max_value, 42.5);
    assert_eq!(distance.min_value, f32::MIN);

    let achievements = definitions.achievements();
    assert_eq!(achievements.len(), 2);
    assert_eq!(achievements[0].id, "ACH_01");
    assert_eq!(achievements[0].description, "Win a match");
    assert_eq!(achievements[0].icon_locked, "a.jpg");
    assert_eq!(achievements[1].icon_locked, "b_gray.jpg");
    assert_eq!(achievements[1].permission, 2);
    assert!(achievements[1].is_hidden);
}

#[test]
fn test_language_fallback() {
    let root = game_schema(480, sample_stats());

    let mut definitions = SchemaDefinitions::new();
    definitions.build(&root, 480, "german").unwrap();
    assert_eq!(definitions.achievements()[0].name, "Erstes Blut");
    // No german description: falls back to english
    assert_eq!(definitions.achievements()[0].description, "Win a match");

    definitions.build(&root, 480, "french").unwrap();
    assert_eq!(definitions.achievements()[0].name, "First Blood");
    assert_eq!(definitions.stats()[0].display_name(), "Kills");
}

#[test]
fn test_unknown_stat_type_aborts_load() {
    let mut stats = sample_stats();
    stats.push(SchemaNode::tree(
        "4",
        vec![int("type", 99), text("name", "mystery")],
    ));
    let (_temp_dir, install_dir) = install_with_schema(480, &game_schema(480, stats));

    let manager = StateManager::new();
    let err = manager
        .load_schema_from_install(&install_dir, 480, "english")
        .unwrap_err();

    assert!(matches!(
        err,
        DefinitionError::UnknownStatType { raw_type: 99, .. }
    ));
    assert!(err.is_fatal());
    assert!(manager.read(|s| s.definitions.is_empty()));
}

#[test]
fn test_missing_schema_file_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let install_dir = Utf8Path::from_path(temp_dir.path()).unwrap();

    let manager = StateManager::new();
    let err = manager
        .load_schema_from_install(install_dir, 480, "english")
        .unwrap_err();

    assert!(matches!(err, DefinitionError::SchemaUnavailable { game_id: 480, .. }));
    assert!(!err.is_fatal());
    assert!(manager.read(|s| s.status.starts_with("Failed to load schema")));
}

#[test]
fn test_truncated_schema_file_is_unavailable() {
    let (_temp_dir, install_dir) = install_with_schema(480, &game_schema(480, sample_stats()));
    let path = schema_path(&install_dir, 480);
    let data = fs::read(&path).unwrap();
    fs::write(&path, &data[..data.len() / 2]).unwrap();

    let manager = StateManager::new();
    let err = manager
        .load_schema_from_install(&install_dir, 480, "english")
        .unwrap_err();
    assert!(matches!(err, DefinitionError::SchemaUnavailable { .. }));
}

#[test]
fn test_deeply_nested_schema_file_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let install_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let path = schema_path(&install_dir, 480);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    // Subtree tag plus empty name, repeated far past any real schema's depth
    fs::write(&path, [0u8, 0].repeat(200_000)).unwrap();

    let manager = StateManager::new();
    let err = manager
        .load_schema_from_install(&install_dir, 480, "english")
        .unwrap_err();
    assert!(matches!(err, DefinitionError::SchemaUnavailable { game_id: 480, .. }));
    assert!(!err.is_fatal());
}

#[test]
fn test_schema_without_stats_clears_loaded_game() {
    let (_temp_dir, install_dir) = install_with_schema(480, &game_schema(480, sample_stats()));
    let manager = StateManager::new();
    manager
        .load_schema_from_install(&install_dir, 480, "english")
        .unwrap();
    assert!(manager.read(|s| s.is_loaded()));

    let empty = SchemaNode::tree("", vec![SchemaNode::tree("480", vec![text("gamename", "x")])]);
    assert!(manager.load_schema(&empty, 480, "english").is_err());
    assert!(!manager.read(|s| s.is_loaded()));
    assert!(manager.read(|s| s.definitions.achievements().is_empty()));
}
