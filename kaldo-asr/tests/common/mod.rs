//! Shared fixtures: on-disk model directories and synthetic audio.

#![allow(dead_code)]

use kaldo_asr::fst::{Fst, FstHeader};
use kaldo_asr::symbols::SymbolTable;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const SAMPLE_RATE: usize = 16000;

pub const WORDS_TXT: &str = "<eps> 0\n[unk] 1\nhello 2\n";

pub const MFCC_CONF: &str = "--sample-frequency=16000\n--use-energy=false\n";

pub const MODEL_CONF: &str = "\
--min-active=200
--max-active=3000
--beam=10.0
--lattice-beam=2.0
--acoustic-scale=1.0
--frame-subsampling-factor=3
--endpoint.silence-phones=1:2:3:4:5:6:7:8:9:10
--endpoint.rule2.min-trailing-silence=0.5
--endpoint.rule3.min-trailing-silence=1.0
--endpoint.rule4.min-trailing-silence=2.0
";

/// Which optional pieces a fixture model carries.
#[derive(Clone, Debug, Default)]
pub struct Fixture {
    pub structured: bool,
    pub two_part: bool,
    pub embedded_symbols: Option<SymbolTable>,
    pub words_txt: Option<&'static str>,
    pub word_boundary: bool,
    pub ivector: bool,
}

impl Fixture {
    pub fn flat() -> Self {
        Self {
            words_txt: Some(WORDS_TXT),
            ..Self::default()
        }
    }

    pub fn structured() -> Self {
        Self {
            structured: true,
            ..Self::flat()
        }
    }

    /// Write the model into a fresh temporary directory.
    pub fn build(&self) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let prefix = |flat: &'static str, structured: &'static str| {
            if self.structured { structured } else { flat }
        };

        if self.structured {
            for sub in ["am", "graph/phones", "conf"] {
                fs::create_dir_all(root.join(sub)).unwrap();
            }
            fs::write(root.join("conf/model.conf"), MODEL_CONF).unwrap();
        }

        fs::write(root.join(prefix("final.mdl", "am/final.mdl")), b"acoustic").unwrap();
        fs::write(root.join(prefix("mfcc.conf", "conf/mfcc.conf")), MFCC_CONF).unwrap();

        let graph = |header: FstHeader| match &self.embedded_symbols {
            Some(symbols) => Fst::new(header).with_output_symbols(symbols.clone()),
            None => Fst::new(header),
        };

        if self.two_part {
            Fst::new(FstHeader::new("const", "standard"))
                .to_file(&root.join(prefix("HCLr.fst", "graph/HCLr.fst")))
                .unwrap();
            graph(FstHeader::new("const", "standard"))
                .to_file(&root.join(prefix("Gr.fst", "graph/Gr.fst")))
                .unwrap();
            fs::write(
                root.join(prefix("disambig_tid.int", "graph/disambig_tid.int")),
                "5001\n5002\n",
            )
            .unwrap();
        } else {
            graph(FstHeader::new("vector", "standard"))
                .to_file(&root.join(prefix("HCLG.fst", "graph/HCLG.fst")))
                .unwrap();
        }

        if let Some(words) = self.words_txt {
            fs::write(root.join(prefix("words.txt", "graph/words.txt")), words).unwrap();
        }

        if self.word_boundary {
            fs::write(
                root.join(prefix("word_boundary.int", "graph/phones/word_boundary.int")),
                "1 nonword\n11 internal\n",
            )
            .unwrap();
        }

        if self.ivector {
            write_ivector(root);
        }

        dir
    }
}

fn write_ivector(root: &Path) {
    let ivector = root.join("ivector");
    fs::create_dir_all(&ivector).unwrap();

    for name in ["final.ie", "final.mat", "final.dubm", "global_cmvn.stats"] {
        fs::write(ivector.join(name), b"ivector").unwrap();
    }
    fs::write(ivector.join("online_cmvn.conf"), "# defaults\n").unwrap();
    fs::write(ivector.join("splice.conf"), "--left-context=3\n--right-context=3\n").unwrap();
}

pub fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; (seconds * SAMPLE_RATE as f32) as usize]
}

/// A loud tone, well above the speech threshold.
pub fn speech(seconds: f32) -> Vec<f32> {
    (0..(seconds * SAMPLE_RATE as f32) as usize)
        .map(|i| 3000.0 * (i as f32 * 0.3).sin())
        .collect()
}

/// Concatenate `(is_speech, seconds)` segments.
pub fn script(segments: &[(bool, f32)]) -> Vec<f32> {
    segments
        .iter()
        .flat_map(|&(is_speech, seconds)| {
            if is_speech {
                speech(seconds)
            } else {
                silence(seconds)
            }
        })
        .collect()
}
