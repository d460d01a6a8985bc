//! Graph Documents
//!
//! JSON exchange format for follow networks. Node ids in a document are
//! arbitrary integers; they are renumbered densely, in document order, when a
//! [`SocialGraph`] is built. An edge `[u, v]` means `u` follows `v`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use meme_core::analysis::per_agent_average_quality;
use meme_core::SocialGraph;
use serde::{Deserialize, Serialize};

use crate::error::{IoError, IoResult};

/// One node of a graph document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    #[serde(default)]
    pub bot: bool,
    /// Average feed quality, present in visualization exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_quality: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Undirected documents are expanded to mutual follows
    #[serde(default = "default_directed")]
    pub directed: bool,
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<[u64; 2]>,
}

fn default_directed() -> bool {
    true
}

impl GraphDocument {
    /// Document for the topology and roles of `graph`
    pub fn from_graph(graph: &SocialGraph) -> Self {
        let nodes = graph
            .agents()
            .iter()
            .map(|agent| NodeRecord {
                id: agent.id as u64,
                bot: agent.is_bot(),
                avg_quality: None,
            })
            .collect();
        let edges = graph
            .topology()
            .edges()
            .map(|(u, v)| [u as u64, v as u64])
            .collect();
        Self {
            directed: true,
            nodes,
            edges,
        }
    }

    /// Same as [`from_graph`](Self::from_graph), annotating each node with its
    /// average feed quality. Agents with empty feeds carry no value.
    pub fn with_average_quality(graph: &SocialGraph) -> Self {
        let mut document = Self::from_graph(graph);
        for (node, quality) in document
            .nodes
            .iter_mut()
            .zip(per_agent_average_quality(graph))
        {
            node.avg_quality = quality;
        }
        document
    }

    /// Build a social graph with empty feeds
    pub fn to_social_graph(&self) -> IoResult<SocialGraph> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if index.insert(node.id, i).is_some() {
                return Err(IoError::InvalidGraph(format!("duplicate node id {}", node.id)));
            }
        }
        let lookup = |id: u64| {
            index
                .get(&id)
                .copied()
                .ok_or_else(|| IoError::InvalidGraph(format!("edge references unknown node {id}")))
        };

        let mut edges = Vec::with_capacity(self.edges.len() * if self.directed { 1 } else { 2 });
        let mut self_loops = 0usize;
        for &[u, v] in &self.edges {
            let (u, v) = (lookup(u)?, lookup(v)?);
            if u == v {
                self_loops += 1;
                continue;
            }
            edges.push((u, v));
            if !self.directed {
                edges.push((v, u));
            }
        }
        if self_loops > 0 {
            tracing::warn!(self_loops, "ignoring self-follow edges");
        }

        let flags: Vec<bool> = self.nodes.iter().map(|n| n.bot).collect();
        Ok(SocialGraph::from_edges(&flags, edges)?)
    }

    pub fn to_json(&self) -> IoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> IoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Read a graph document from a JSON file
pub fn read_graph(path: &Path) -> IoResult<GraphDocument> {
    let content = fs::read_to_string(path)?;
    let document = GraphDocument::from_json(&content)?;
    tracing::debug!(
        path = %path.display(),
        nodes = document.nodes.len(),
        edges = document.edges.len(),
        "read graph document"
    );
    Ok(document)
}

/// Write a graph document as pretty JSON, creating parent directories
pub fn write_graph(path: &Path, document: &GraphDocument) -> IoResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, document)?;
    Ok(())
}
