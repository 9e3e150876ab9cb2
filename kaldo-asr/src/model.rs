//! Model bundle: everything read from a model directory.
//!
//! Two on-disk layouts are recognized, told apart by the marker
//! `am/final.mdl`:
//!
//! | file            | flat                  | structured                        |
//! |-----------------|-----------------------|-----------------------------------|
//! | acoustic model  | `final.mdl`           | `am/final.mdl`                    |
//! | combined graph  | `HCLG.fst`            | `graph/HCLG.fst`                  |
//! | two-part graph  | `HCLr.fst`, `Gr.fst`  | `graph/HCLr.fst`, `graph/Gr.fst`  |
//! | disambiguation  | `disambig_tid.int`    | `graph/disambig_tid.int`          |
//! | words           | `words.txt`           | `graph/words.txt`                 |
//! | word boundaries | `word_boundary.int`   | `graph/phones/word_boundary.int`  |
//! | features        | `mfcc.conf`           | `conf/mfcc.conf`                  |
//! | decoding        | built-in defaults     | `conf/model.conf`                 |
//!
//! Both layouts may carry `ivector/` and `rescore/`.
//!
//! A [`Model`] is immutable after loading; share it between recognizers with
//! `Arc<Model>`.

use crate::config::{FeatureConfig, ModelConfig, OptionEntry, read_options};
use crate::error::{ModelError, Result};
use crate::fst::Fst;
use crate::logging;
use crate::silence::SilenceWeightingConfig;
use crate::symbols::SymbolTable;
use crate::types::ModelRepo;
use crate::word_boundary::WordBoundaryTable;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// On-disk arrangement of a model directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelLayout {
    /// Everything at the top level; decoding options are built in
    Flat,
    /// `am/`, `graph/`, `conf/` subdirectories
    Structured,
}

/// Relative paths of one layout.
#[derive(Clone, Copy, Debug)]
struct LayoutFiles {
    acoustic: &'static str,
    hclg: &'static str,
    hclr: &'static str,
    gr: &'static str,
    disambig: &'static str,
    words: &'static str,
    word_boundary: &'static str,
    mfcc_conf: &'static str,
    model_conf: Option<&'static str>,
}

impl ModelLayout {
    /// File whose presence selects the structured layout.
    pub const MARKER: &str = "am/final.mdl";

    pub fn detect(repo: &ModelRepo) -> Self {
        match repo.locate(Self::MARKER) {
            Some(_) => ModelLayout::Structured,
            None => ModelLayout::Flat,
        }
    }

    fn files(self) -> LayoutFiles {
        match self {
            ModelLayout::Flat => LayoutFiles {
                acoustic: "final.mdl",
                hclg: "HCLG.fst",
                hclr: "HCLr.fst",
                gr: "Gr.fst",
                disambig: "disambig_tid.int",
                words: "words.txt",
                word_boundary: "word_boundary.int",
                mfcc_conf: "mfcc.conf",
                model_conf: None,
            },
            ModelLayout::Structured => LayoutFiles {
                acoustic: "am/final.mdl",
                hclg: "graph/HCLG.fst",
                hclr: "graph/HCLr.fst",
                gr: "graph/Gr.fst",
                disambig: "graph/disambig_tid.int",
                words: "graph/words.txt",
                word_boundary: "graph/phones/word_boundary.int",
                mfcc_conf: "conf/mfcc.conf",
                model_conf: Some("conf/model.conf"),
            },
        }
    }
}

fn read_blob(path: &Path) -> std::result::Result<Vec<u8>, ModelError> {
    std::fs::read(path).map_err(|e| ModelError::io(path, e))
}

/// Parse a whitespace-separated integer list such as `disambig_tid.int`.
pub fn parse_int_list(path: &Path, text: &str) -> std::result::Result<Vec<i32>, ModelError> {
    let mut values = Vec::new();

    for (i, line) in text.lines().enumerate() {
        for field in line.split_whitespace() {
            let value = field.parse().map_err(|_| ModelError::InvalidTable {
                path: path.to_path_buf(),
                line: i + 1,
                reason: format!("not an integer: {field:?}"),
            })?;
            values.push(value);
        }
    }

    Ok(values)
}

/// Acoustic scorer parameters, opaque to this crate.
#[derive(Clone, Debug)]
pub struct AcousticModel {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Decoding graph. Exactly one variant is present in any model.
#[derive(Clone, Debug)]
pub enum SearchGraph {
    /// Precompiled `HCLG`
    Combined(Fst),
    /// Lookahead pair composed at runtime
    TwoPart {
        hcl: Fst,
        g: Fst,
        /// Disambiguation transition ids
        disambig: Vec<i32>,
    },
}

impl SearchGraph {
    /// Output symbols embedded in the graph that emits words.
    pub fn output_symbols(&self) -> Option<&Arc<SymbolTable>> {
        match self {
            SearchGraph::Combined(hclg) => hclg.output_symbols.as_ref(),
            SearchGraph::TwoPart { g, .. } => g.output_symbols.as_ref(),
        }
    }
}

/// Online i-vector extractor files under `ivector/`.
#[derive(Clone, Debug)]
pub struct IvectorExtractor {
    pub extractor: Vec<u8>,
    pub lda: Vec<u8>,
    pub diag_ubm: Vec<u8>,
    pub global_cmvn_stats: Vec<u8>,
    pub online_cmvn: Vec<OptionEntry>,
    pub splice: Vec<OptionEntry>,
}

impl IvectorExtractor {
    /// Marks the presence of an extractor.
    pub const MARKER: &str = "ivector/final.ie";

    fn load(repo: &ModelRepo) -> Result<Option<Self>> {
        let Some(extractor) = repo.locate(Self::MARKER) else {
            return Ok(None);
        };

        let blob = |name: &str| -> Result<Vec<u8>> { Ok(read_blob(&repo.resolve(name)?)?) };
        let options = |name: &str| -> Result<Vec<OptionEntry>> {
            Ok(read_options(&repo.resolve(name)?)?)
        };

        Ok(Some(Self {
            extractor: read_blob(&extractor)?,
            lda: blob("ivector/final.mat")?,
            diag_ubm: blob("ivector/final.dubm")?,
            global_cmvn_stats: blob("ivector/global_cmvn.stats")?,
            online_cmvn: options("ivector/online_cmvn.conf")?,
            splice: options("ivector/splice.conf")?,
        }))
    }
}

/// Language model for lattice rescoring.
#[derive(Clone, Debug)]
pub struct RescoreModel {
    /// Constant-arpa LM
    pub carpa: Vec<u8>,
    /// Grammar whose scores are removed before rescoring
    pub fst: Fst,
}

impl RescoreModel {
    const CARPA: &str = "rescore/G.carpa";
    const FST: &str = "rescore/G.fst";

    fn load(repo: &ModelRepo) -> Result<Option<Self>> {
        match (repo.locate(Self::CARPA), repo.locate(Self::FST)) {
            (Some(carpa), Some(fst)) => Ok(Some(Self {
                carpa: read_blob(&carpa)?,
                fst: Fst::from_file(&fst)?,
            })),
            (None, None) => Ok(None),
            _ => {
                tracing::warn!("rescore/ needs both G.carpa and G.fst, skipping rescoring model");
                Ok(None)
            }
        }
    }
}

/// Loaded model bundle.
#[derive(Debug)]
pub struct Model {
    layout: ModelLayout,
    location: String,
    acoustic: AcousticModel,
    graph: SearchGraph,
    symbols: Arc<SymbolTable>,
    word_boundary: Option<WordBoundaryTable>,
    ivector: Option<IvectorExtractor>,
    rescore: Option<RescoreModel>,
    config: ModelConfig,
    features: FeatureConfig,
    silence_weighting: SilenceWeightingConfig,
}

impl Model {
    /// Load from a local directory.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_repo(&ModelRepo::Path(path.as_ref().to_path_buf()))
    }

    pub fn from_repo(repo: &ModelRepo) -> Result<Self> {
        Self::from_repo_with_overrides(repo, std::iter::empty::<(&str, &str)>())
    }

    /// Load, then apply `--key=value` overrides on top of the layout's
    /// decoding options.
    pub fn from_repo_with_overrides<I, K, V>(repo: &ModelRepo, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        logging::install();

        let location = repo.location();
        let layout = ModelLayout::detect(repo);
        let files = layout.files();
        tracing::info!(%location, ?layout, "loading model");

        let mut config = match files.model_conf {
            Some(name) => {
                let mut config = ModelConfig::default();
                config.apply(&read_options(&repo.resolve(name)?)?)?;
                config
            }
            None => ModelConfig::flat_defaults()?,
        };
        config.apply_overrides(overrides)?;

        let mut features = FeatureConfig::default();
        features.apply(&read_options(&repo.resolve(files.mfcc_conf)?)?)?;
        features.allow_downsample = true;

        tracing::info!(
            beam = config.decoder.beam,
            max_active = config.decoder.max_active,
            lattice_beam = config.decoder.lattice_beam,
            silence_phones = ?config.endpoint.silence_phones,
            "decoding params"
        );

        let acoustic_path = repo.resolve(files.acoustic)?;
        let acoustic = AcousticModel {
            bytes: read_blob(&acoustic_path)?,
            path: acoustic_path,
        };

        let graph = Self::load_graph(repo, &files, &location)?;
        let symbols = Self::resolve_symbols(repo, &files, &graph, &location)?;

        let word_boundary = match repo.locate(files.word_boundary) {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading word boundaries");
                Some(WordBoundaryTable::from_file(&path)?)
            }
            None => {
                tracing::debug!("no word boundary table, word alignment disabled");
                None
            }
        };

        let ivector = IvectorExtractor::load(repo)?;
        let rescore = RescoreModel::load(repo)?;
        let silence_weighting = SilenceWeightingConfig::from_endpoint(&config.endpoint);

        tracing::info!(
            words = symbols.len(),
            two_part = matches!(graph, SearchGraph::TwoPart { .. }),
            ivector = ivector.is_some(),
            rescore = rescore.is_some(),
            "model loaded"
        );

        Ok(Self {
            layout,
            location,
            acoustic,
            graph,
            symbols,
            word_boundary,
            ivector,
            rescore,
            config,
            features,
            silence_weighting,
        })
    }

    fn load_graph(repo: &ModelRepo, files: &LayoutFiles, location: &str) -> Result<SearchGraph> {
        if let Some(path) = repo.locate(files.hclg) {
            tracing::info!(path = %path.display(), "loading combined graph");
            return Ok(SearchGraph::Combined(Fst::from_file(&path)?));
        }

        let (Some(hcl), Some(g)) = (repo.locate(files.hclr), repo.locate(files.gr)) else {
            return Err(ModelError::NoGraph {
                location: location.to_string(),
            }
            .into());
        };

        tracing::info!(hcl = %hcl.display(), g = %g.display(), "loading two-part graph");
        let disambig_path = repo.resolve(files.disambig)?;
        let text =
            std::fs::read_to_string(&disambig_path).map_err(|e| ModelError::io(&disambig_path, e))?;

        Ok(SearchGraph::TwoPart {
            hcl: Fst::from_file(&hcl)?,
            g: Fst::from_file(&g)?,
            disambig: parse_int_list(&disambig_path, &text)?,
        })
    }

    fn resolve_symbols(
        repo: &ModelRepo,
        files: &LayoutFiles,
        graph: &SearchGraph,
        location: &str,
    ) -> Result<Arc<SymbolTable>> {
        let symbols = match graph.output_symbols().filter(|s| !s.is_empty()) {
            Some(embedded) => {
                tracing::debug!(table = embedded.name(), "using symbols embedded in graph");
                Arc::clone(embedded)
            }
            None => match repo.locate(files.words) {
                Some(path) => Arc::new(SymbolTable::from_text_file(&path)?),
                None => {
                    return Err(ModelError::NoSymbolTable {
                        location: location.to_string(),
                    }
                    .into());
                }
            },
        };

        if symbols.is_empty() {
            return Err(ModelError::NoSymbolTable {
                location: location.to_string(),
            }
            .into());
        }

        Ok(symbols)
    }

    pub fn layout(&self) -> ModelLayout {
        self.layout
    }

    /// Where the model was loaded from.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn acoustic(&self) -> &AcousticModel {
        &self.acoustic
    }

    pub fn graph(&self) -> &SearchGraph {
        &self.graph
    }

    /// Word symbol table, shared with the graph when embedded there.
    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn word_boundary(&self) -> Option<&WordBoundaryTable> {
        self.word_boundary.as_ref()
    }

    pub fn ivector(&self) -> Option<&IvectorExtractor> {
        self.ivector.as_ref()
    }

    pub fn rescore(&self) -> Option<&RescoreModel> {
        self.rescore.as_ref()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn features(&self) -> &FeatureConfig {
        &self.features
    }

    pub fn silence_weighting(&self) -> &SilenceWeightingConfig {
        &self.silence_weighting
    }

    /// Seconds per decoder frame.
    pub fn decoder_frame_shift(&self) -> f32 {
        self.config.decoder_frame_shift(&self.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_list_spans_lines() {
        let values = parse_int_list(Path::new("disambig_tid.int"), "11\n12 13\n\n").unwrap();
        assert_eq!(values, vec![11, 12, 13]);
    }

    #[test]
    fn int_list_reports_line() {
        let result = parse_int_list(Path::new("disambig_tid.int"), "11\nx\n");
        assert!(matches!(result, Err(ModelError::InvalidTable { line: 2, .. })));
    }

    #[test]
    fn layout_detection_uses_marker() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ModelRepo::Path(dir.path().to_path_buf());
        assert_eq!(ModelLayout::detect(&repo), ModelLayout::Flat);

        std::fs::create_dir(dir.path().join("am")).unwrap();
        std::fs::write(dir.path().join(ModelLayout::MARKER), b"mdl").unwrap();
        assert_eq!(ModelLayout::detect(&repo), ModelLayout::Structured);
    }

    #[test]
    fn structured_layout_reads_model_conf() {
        let files = ModelLayout::Structured.files();
        assert_eq!(files.model_conf, Some("conf/model.conf"));
        assert!(ModelLayout::Flat.files().model_conf.is_none());
    }

    #[test]
    fn graph_symbols_come_from_word_emitting_fst() {
        use crate::fst::FstHeader;

        let mut words = SymbolTable::new("words");
        words.insert("<eps>", 0);
        words.insert("speech", 1);

        let graph = SearchGraph::TwoPart {
            hcl: Fst::new(FstHeader::new("const", "standard")),
            g: Fst::new(FstHeader::new("const", "standard")).with_output_symbols(words),
            disambig: vec![],
        };

        assert_eq!(graph.output_symbols().map(|s| s.len()), Some(2));
    }
}
