//! Integration tests for the kal CLI.

use clap::Parser;
use kaldo::cli::{Cli, run_cli};
use kaldo::decode::{Config, decode_to};
use kaldo_asr::fst::{Fst, FstHeader};
use std::path::Path;
use tempfile::TempDir;

/// Flat-layout model directory understood by the reference engine.
fn model_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(root.join("final.mdl"), b"acoustic").unwrap();
    std::fs::write(root.join("mfcc.conf"), "--sample-frequency=16000\n").unwrap();
    std::fs::write(root.join("words.txt"), "<eps> 0\n[unk] 1\n").unwrap();
    Fst::new(FstHeader::new("vector", "standard"))
        .to_file(&root.join("HCLG.fst"))
        .unwrap();

    dir
}

/// Two tone bursts separated by a pause, as 16 kHz 16-bit PCM.
fn write_wav(path: &Path) {
    write_segments(
        path,
        &[(false, 8000), (true, 16000), (false, 24000), (true, 16000), (false, 3200)],
    );
}

/// Write `(is_tone, samples)` segments as 16 kHz 16-bit PCM.
fn write_segments(path: &Path, segments: &[(bool, usize)]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    for &(loud, len) in segments {
        for i in 0..len {
            let sample = if loud {
                (3000.0 * (i as f32 * 0.3).sin()) as i16
            } else {
                0
            };
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn decode(model: &Path, audio: &Path, extra: &[&str]) -> Vec<serde_json::Value> {
    let mut argv = vec![
        "kal",
        "decode",
        model.to_str().unwrap(),
        audio.to_str().unwrap(),
    ];
    argv.extend_from_slice(extra);

    let cli = Cli::parse_from(argv);
    let kaldo::cli::Commands::Decode(args) = cli.command;
    let config = Config::try_from(args).unwrap();

    let mut out = Vec::new();
    decode_to(&config, &mut out).unwrap();

    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn decode_prints_one_line_per_utterance() {
    let model = model_dir();
    let audio = model.path().join("audio.wav");
    write_wav(&audio);

    let lines = decode(model.path(), &audio, &[]);

    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line["text"], "[unk]");
        assert_eq!(line["result"].as_array().map(Vec::len), Some(1));
    }
    let first_end = lines[0]["result"][0]["end"].as_f64().unwrap();
    let second_start = lines[1]["result"][0]["start"].as_f64().unwrap();
    assert!(first_end <= second_start);
}

#[test]
fn output_does_not_depend_on_chunk_size() {
    let model = model_dir();
    let audio = model.path().join("audio.wav");
    write_wav(&audio);

    let default = decode(model.path(), &audio, &[]);
    let small = decode(model.path(), &audio, &["--chunk-samples", "1234"]);

    assert_eq!(default, small);
}

#[test]
fn long_speech_does_not_depend_on_chunk_size() {
    let model = model_dir();
    let audio = model.path().join("long.wav");
    // 25 s of tone, past the 20 s utterance length rule
    write_segments(&audio, &[(false, 4800), (true, 400_000), (false, 4800)]);

    let default = decode(model.path(), &audio, &[]);
    let small = decode(model.path(), &audio, &["--chunk-samples", "1234"]);

    assert!(default.len() >= 2);
    assert_eq!(default, small);
}

#[test]
fn overrides_reach_the_endpointer() {
    let model = model_dir();
    let audio = model.path().join("audio.wav");
    write_wav(&audio);

    // No rule can fire, so everything ends up in the final utterance
    let lines = decode(
        model.path(),
        &audio,
        &[
            "--set",
            "endpoint.rule1.min-trailing-silence=100",
            "--set",
            "endpoint.rule2.min-trailing-silence=100",
            "--set",
            "endpoint.rule3.min-trailing-silence=100",
            "--set",
            "endpoint.rule4.min-trailing-silence=100",
            "--set",
            "endpoint.rule5.min-utterance-length=100",
        ],
    );

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["text"], "[unk] [unk]");
}

#[test]
fn missing_model_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("audio.wav");
    write_wav(&audio);

    let cli = Cli::parse_from([
        "kal",
        "decode",
        "--model-source",
        "path",
        dir.path().join("missing").to_str().unwrap(),
        audio.to_str().unwrap(),
    ]);

    assert!(run_cli(cli).is_err());
}
