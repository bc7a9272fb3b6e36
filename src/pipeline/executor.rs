//! Built pipelines and their execution.

use crate::algorithm::AlgorithmHandle;
use crate::context::Context;
use crate::error::Result;
use crate::pipeline::id::InstanceId;
use std::collections::HashMap;
use std::time::Instant;

/// A resolved dynamic link: `to.input` reads `from.output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub from: InstanceId,
    pub output: String,
    pub to: InstanceId,
    pub input: String,
}

/// One declared instance.
#[derive(Debug, Clone)]
pub struct PipelineNode {
    pub id: InstanceId,
    pub name: String,
    /// Algorithm kind (`id` in the description)
    pub algorithm: String,
    pub instance: AlgorithmHandle,
    pub default_source: Option<InstanceId>,
}

/// Summary counts of a built pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub instances: usize,
    pub links: usize,
    pub literals: usize,
    pub default_sources: usize,
}

/// Algorithm instances in declaration order plus their link table.
///
/// The pipeline owns its instances; links between them are non-owning, so
/// dropping the pipeline releases everything it built.
pub struct Pipeline {
    context: Context,
    nodes: Vec<PipelineNode>,
    links: Vec<LinkEdge>,
    by_name: HashMap<String, InstanceId>,
    stats: PipelineStats,
}

impl Pipeline {
    pub(crate) fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            nodes: Vec::new(),
            links: Vec::new(),
            by_name: HashMap::new(),
            stats: PipelineStats::default(),
        }
    }

    // ── Construction (builder only) ──

    pub(crate) fn add_node(
        &mut self,
        name: &str,
        algorithm: &str,
        instance: AlgorithmHandle,
        default_source: Option<InstanceId>,
    ) -> InstanceId {
        let id = InstanceId(self.nodes.len() as u32);
        self.by_name.insert(name.to_string(), id);
        if default_source.is_some() {
            self.stats.default_sources += 1;
        }
        self.nodes.push(PipelineNode {
            id,
            name: name.to_string(),
            algorithm: algorithm.to_string(),
            instance,
            default_source,
        });
        self.stats.instances = self.nodes.len();
        id
    }

    pub(crate) fn add_link(&mut self, link: LinkEdge) {
        self.links.push(link);
        self.stats.links = self.links.len();
    }

    pub(crate) fn count_literal(&mut self) {
        self.stats.literals += 1;
    }

    // ── Lookup ──

    pub fn id_of(&self, name: &str) -> Option<InstanceId> {
        self.by_name.get(name).copied()
    }

    pub fn node(&self, id: InstanceId) -> Option<&PipelineNode> {
        self.nodes.get(id.index())
    }

    /// Instance declared under `name`.
    pub fn get(&self, name: &str) -> Option<&AlgorithmHandle> {
        self.id_of(name)
            .and_then(|id| self.node(id))
            .map(|node| &node.instance)
    }

    /// Nodes in declaration (= execution) order.
    pub fn instances(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkEdge] {
        &self.links
    }

    /// Links feeding into `id`.
    pub fn links_into(&self, id: InstanceId) -> impl Iterator<Item = &LinkEdge> + '_ {
        self.links.iter().filter(move |l| l.to == id)
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Execution ──

    /// Run every instance once, in declaration order. Stops at the first
    /// failure; outputs of instances that already ran are kept.
    pub fn run(&self) -> Result<()> {
        let started = Instant::now();
        tracing::info!("Running pipeline with {} instance(s)", self.nodes.len());

        for node in &self.nodes {
            tracing::debug!("Running '{}' ({})", node.name, node.algorithm);
            if let Err(e) = node.instance.run() {
                tracing::error!("Pipeline stopped at '{}': {}", node.name, e);
                return self.context.record(Err(e));
            }
        }

        tracing::info!("Pipeline finished in {:?}", started.elapsed());
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "instances",
                &self.nodes.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
            )
            .field("links", &self.links.len())
            .finish()
    }
}
