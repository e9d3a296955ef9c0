use bianzheng_core::{
    load_records, split_document_path, CatalogValidator, LoadReport, MatchConfig, PatternCatalog,
    RecordSource, Result, Settings, SkippedRecord, SyndromeElement, SyndromePattern,
    ValidationReport, ZhengsuRegistry,
};
use bianzheng_graph::{ChainGroups, ChainIndex, EvolutionGraph, PairIndex};
use bianzheng_match::{MatchOutcome, PatternMatcher, Selection};
use serde::Serialize;
use tracing::{info, warn};

/// The evolution view either loaded or failed as a whole.
#[derive(Debug, Clone)]
pub enum GraphView {
    Loaded(EvolutionGraph),
    /// Why the graph could not be shown; the rest of the knowledge base is unaffected.
    Unavailable(String),
}

impl GraphView {
    pub fn as_loaded(&self) -> Option<&EvolutionGraph> {
        match self {
            GraphView::Loaded(graph) => Some(graph),
            GraphView::Unavailable(_) => None,
        }
    }

    pub fn as_loaded_mut(&mut self) -> Option<&mut EvolutionGraph> {
        match self {
            GraphView::Loaded(graph) => Some(graph),
            GraphView::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, GraphView::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            GraphView::Loaded(_) => None,
            GraphView::Unavailable(reason) => Some(reason),
        }
    }
}

impl From<Result<EvolutionGraph>> for GraphView {
    fn from(result: Result<EvolutionGraph>) -> Self {
        match result {
            Ok(graph) => GraphView::Loaded(graph),
            Err(e) => {
                warn!("Evolution graph unavailable: {}", e);
                GraphView::Unavailable(e.to_string())
            }
        }
    }
}

/// Everything a validation run found, including records dropped while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub elements: usize,
    pub patterns: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
    pub skipped: Vec<String>,
}

impl ValidationSummary {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Explicit context holding everything the matcher and graph queries read.
/// Loaded once, then read-only apart from the graph's position cache.
#[derive(Debug)]
pub struct KnowledgeBase {
    registry: ZhengsuRegistry,
    catalog: PatternCatalog,
    graph: GraphView,
    chains: ChainIndex,
    pairs: PairIndex,
    matching: MatchConfig,
    skipped: Vec<SkippedRecord>,
}

impl KnowledgeBase {
    pub fn new(
        registry: ZhengsuRegistry,
        catalog: PatternCatalog,
        graph: GraphView,
        pairs: PairIndex,
        matching: MatchConfig,
    ) -> Self {
        let chains = match &graph {
            GraphView::Loaded(g) => ChainIndex::new(g, ChainGroups::default()),
            GraphView::Unavailable(_) => ChainIndex::empty(),
        };
        Self {
            registry,
            catalog,
            graph,
            chains,
            pairs,
            matching,
            skipped: Vec::new(),
        }
    }

    /// Issue the element, pattern, graph and pair loads concurrently and wait
    /// for all of them. Never fails: bad records are skipped, a bad graph
    /// becomes [`GraphView::Unavailable`], missing pairs an empty index.
    pub async fn load<S>(source: &S, settings: &Settings) -> Self
    where
        S: RecordSource + ?Sized,
    {
        let data = &settings.data;

        let elements = load_records::<SyndromeElement, S>(source, &data.zhengsu_dir, &data.zhengsu_files);
        let patterns = load_records::<SyndromePattern, S>(source, &data.zhengxing_dir, &data.zhengxing_files);
        let graph = async {
            let (collection, name) = split_document_path(&data.evolution_graph);
            let body = source.fetch(collection, name).await?;
            EvolutionGraph::from_json(&body, settings.graph.duplicate_edges)
        };
        let pairs = async {
            let (collection, name) = split_document_path(&data.comparison_pairs);
            let body = source.fetch(collection, name).await?;
            PairIndex::from_json(&body)
        };

        let (elements, patterns, graph, pairs): (
            LoadReport<SyndromeElement>,
            LoadReport<SyndromePattern>,
            Result<EvolutionGraph>,
            Result<PairIndex>,
        ) = tokio::join!(elements, patterns, graph, pairs);

        let pairs = pairs.unwrap_or_else(|e| {
            warn!("Comparison pairs unavailable: {}", e);
            PairIndex::default()
        });

        let mut skipped = elements.skipped;
        skipped.extend(patterns.skipped);

        let mut kb = Self::new(
            ZhengsuRegistry::new(elements.records),
            PatternCatalog::with_policy(patterns.records, settings.matching.duplicate_compositions),
            GraphView::from(graph),
            pairs,
            settings.matching.clone(),
        );
        kb.skipped = skipped;

        info!(
            "Knowledge base ready: {} elements, {} patterns, graph {}, {} pairs, {} skipped",
            kb.registry.len(),
            kb.catalog.len(),
            if kb.graph.is_available() { "loaded" } else { "unavailable" },
            kb.pairs.len(),
            kb.skipped.len()
        );
        kb
    }

    pub fn registry(&self) -> &ZhengsuRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn graph(&self) -> &GraphView {
        &self.graph
    }

    /// Mutable access for the layout step that fills the position cache.
    pub fn graph_mut(&mut self) -> Option<&mut EvolutionGraph> {
        self.graph.as_loaded_mut()
    }

    pub fn chains(&self) -> &ChainIndex {
        &self.chains
    }

    pub fn pairs(&self) -> &PairIndex {
        &self.pairs
    }

    /// Records dropped during [`KnowledgeBase::load`].
    pub fn skipped(&self) -> &[SkippedRecord] {
        &self.skipped
    }

    pub fn matcher(&self) -> PatternMatcher<'_> {
        PatternMatcher::new(&self.registry, &self.catalog, &self.matching)
    }

    pub fn match_selection(&self, selection: &Selection) -> MatchOutcome<'_> {
        self.matcher().match_selection(selection)
    }

    pub fn validate(&self) -> ValidationReport {
        CatalogValidator::new(&self.registry, &self.catalog)
            .with_policy(self.matching.duplicate_compositions)
            .run()
    }

    /// Validation report plus load-time skips, for the maintenance command.
    pub fn validation_summary(&self) -> ValidationSummary {
        let report = self.validate();
        ValidationSummary {
            elements: self.registry.len(),
            patterns: self.catalog.len(),
            errors: report.errors,
            warnings: report.warnings,
            info: report.info,
            skipped: self
                .skipped
                .iter()
                .map(|s| format!("{}: {}", s.name, s.error))
                .collect(),
        }
    }
}
