//! Model directory loading across layouts and graph variants.

mod common;

use common::Fixture;
use kaldo_asr::error::{ConfigError, Error, ModelError};
use kaldo_asr::model::{Model, ModelLayout, SearchGraph};
use kaldo_asr::symbols::SymbolTable;
use std::sync::Arc;

#[test]
fn flat_layout_uses_built_in_defaults() {
    let dir = Fixture::flat().build();
    let model = Model::from_dir(dir.path()).unwrap();

    assert_eq!(model.layout(), ModelLayout::Flat);
    assert_eq!(model.symbols().find("[unk]"), Some(1));
    assert!(matches!(model.graph(), SearchGraph::Combined(_)));

    let config = model.config();
    assert_eq!(config.decodable.frame_subsampling_factor, 3);
    assert_eq!(config.decoder.max_active, 3000);
    assert_eq!(config.endpoint.silence_phones, (1..=10).collect::<Vec<_>>());
    assert!((config.endpoint.rules[1].min_trailing_silence - 0.5).abs() < 1e-6);
    assert!((model.decoder_frame_shift() - 0.03).abs() < 1e-6);
}

#[test]
fn structured_layout_reads_model_conf() {
    let dir = Fixture::structured().build();
    let model = Model::from_dir(dir.path()).unwrap();

    assert_eq!(model.layout(), ModelLayout::Structured);
    assert!(!model.symbols().is_empty());
    assert!((model.config().decodable.acoustic_scale - 1.0).abs() < 1e-6);
    assert!(model.features().allow_downsample);
}

#[test]
fn missing_graph_is_reported() {
    let dir = Fixture::flat().build();
    std::fs::remove_file(dir.path().join("HCLG.fst")).unwrap();

    let result = Model::from_dir(dir.path());
    assert!(matches!(result, Err(Error::Model(ModelError::NoGraph { .. }))));
}

#[test]
fn missing_symbols_are_reported() {
    let dir = Fixture {
        words_txt: None,
        ..Fixture::flat()
    }
    .build();

    let result = Model::from_dir(dir.path());
    assert!(matches!(result, Err(Error::Model(ModelError::NoSymbolTable { .. }))));
}

#[test]
fn empty_words_file_is_no_symbol_table() {
    let dir = Fixture {
        words_txt: Some(""),
        ..Fixture::flat()
    }
    .build();

    let result = Model::from_dir(dir.path());
    assert!(matches!(result, Err(Error::Model(ModelError::NoSymbolTable { .. }))));
}

#[test]
fn embedded_symbols_take_precedence() {
    let mut embedded = SymbolTable::new("embedded");
    embedded.insert("<eps>", 0);
    embedded.insert("[unk]", 5);

    let dir = Fixture {
        embedded_symbols: Some(embedded),
        ..Fixture::flat()
    }
    .build();
    let model = Model::from_dir(dir.path()).unwrap();

    assert_eq!(model.symbols().name(), "embedded");
    assert_eq!(model.symbols().find("[unk]"), Some(5));
    assert_eq!(model.symbols().find("hello"), None);
}

#[test]
fn embedded_symbols_are_shared_not_copied() {
    let mut embedded = SymbolTable::new("embedded");
    embedded.insert("[unk]", 1);

    let dir = Fixture {
        embedded_symbols: Some(embedded),
        ..Fixture::flat()
    }
    .build();
    let model = Model::from_dir(dir.path()).unwrap();

    let graph_symbols = model.graph().output_symbols().unwrap();
    assert!(Arc::ptr_eq(graph_symbols, model.symbols()));
}

#[test]
fn two_part_graph_loads_disambiguation_ids() {
    let dir = Fixture {
        two_part: true,
        ..Fixture::structured()
    }
    .build();
    let model = Model::from_dir(dir.path()).unwrap();

    match model.graph() {
        SearchGraph::TwoPart { disambig, .. } => assert_eq!(disambig, &[5001, 5002]),
        other => panic!("expected two-part graph, got {other:?}"),
    }
}

#[test]
fn combined_graph_wins_over_two_part() {
    let dir = Fixture::flat().build();
    let two_part = Fixture {
        two_part: true,
        ..Fixture::flat()
    }
    .build();
    for name in ["HCLr.fst", "Gr.fst", "disambig_tid.int"] {
        std::fs::copy(two_part.path().join(name), dir.path().join(name)).unwrap();
    }

    let model = Model::from_dir(dir.path()).unwrap();
    assert!(matches!(model.graph(), SearchGraph::Combined(_)));
}

#[test]
fn two_part_graph_requires_disambiguation_file() {
    let dir = Fixture {
        two_part: true,
        ..Fixture::flat()
    }
    .build();
    std::fs::remove_file(dir.path().join("disambig_tid.int")).unwrap();

    let result = Model::from_dir(dir.path());
    assert!(matches!(result, Err(Error::Model(_))));
}

#[test]
fn optional_components_are_detected() {
    let dir = Fixture {
        word_boundary: true,
        ivector: true,
        ..Fixture::structured()
    }
    .build();
    let model = Model::from_dir(dir.path()).unwrap();

    assert_eq!(model.word_boundary().map(|t| t.len()), Some(2));
    let ivector = model.ivector().unwrap();
    assert_eq!(ivector.splice.len(), 2);
    assert!(model.rescore().is_none());
    assert!(model.silence_weighting().active());
}

#[test]
fn overrides_apply_after_layout_defaults() {
    let dir = Fixture::flat().build();
    let repo = kaldo_asr::types::ModelRepo::Path(dir.path().to_path_buf());

    let model = Model::from_repo_with_overrides(
        &repo,
        [("--beam", "13.5"), ("endpoint.rule2.min-trailing-silence", "0.3")],
    )
    .unwrap();

    assert!((model.config().decoder.beam - 13.5).abs() < 1e-6);
    assert!((model.config().endpoint.rules[1].min_trailing_silence - 0.3).abs() < 1e-6);
}

#[test]
fn invalid_override_is_config_error() {
    let dir = Fixture::flat().build();
    let repo = kaldo_asr::types::ModelRepo::Path(dir.path().to_path_buf());

    let result = Model::from_repo_with_overrides(&repo, [("endpoint.rule9.min-trailing-silence", "1")]);
    assert!(matches!(result, Err(Error::Config(ConfigError::InvalidRule(9)))));
}

#[test]
fn malformed_words_file_is_rejected() {
    let dir = Fixture {
        words_txt: Some("<eps> zero\n"),
        ..Fixture::flat()
    }
    .build();

    let result = Model::from_dir(dir.path());
    assert!(matches!(
        result,
        Err(Error::Model(ModelError::InvalidSymbolTable { line: 1, .. }))
    ));
}
