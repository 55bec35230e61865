use std::{
    collections::{HashMap, HashSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        })
    }
}

impl FromStr for Level {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(GenerationError::InvalidRequest(format!(
                "Unknown level {other:?}, expected beginner, intermediate or advanced"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapRequest {
    pub subject: String,
    #[serde(default)]
    pub level: Level,
}

impl RoadmapRequest {
    pub fn new(subject: impl Into<String>, level: Level) -> Self {
        Self {
            subject: subject.into(),
            level,
        }
    }

    pub fn validated(mut self) -> Result<Self, GenerationError> {
        self.subject = self.subject.trim().to_string();
        if self.subject.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "Please enter a subject".to_string(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub data: NodeData,
    pub position: Position,
    #[serde(default)]
    pub style: NodeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    pub background: String,
    pub color: String,
    pub border: String,
    pub width: f64,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            background: "#3b82f6".to_string(),
            color: "white".to_string(),
            border: "1px solid #2563eb".to_string(),
            width: 180.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
}

impl RoadmapGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Renders the graph as an indented outline, walking edges from every
    /// node that nothing points at. Nodes reachable from several parents are
    /// listed once, under the first parent that reaches them.
    pub fn outline(&self) -> Vec<(usize, &str)> {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut has_parent: HashSet<&str> = HashSet::new();
        for edge in &self.edges {
            children
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
            has_parent.insert(edge.target.as_str());
        }

        let mut lines = Vec::new();
        let mut seen = HashSet::new();
        let roots = self
            .nodes
            .iter()
            .filter(|node| !has_parent.contains(node.id.as_str()));
        for root in roots {
            self.walk(root.id.as_str(), 0, &children, &mut seen, &mut lines);
        }
        // Cycles without an entry point still get listed.
        for node in &self.nodes {
            self.walk(node.id.as_str(), 0, &children, &mut seen, &mut lines);
        }
        lines
    }

    fn walk<'a>(
        &'a self,
        id: &'a str,
        depth: usize,
        children: &HashMap<&'a str, Vec<&'a str>>,
        seen: &mut HashSet<&'a str>,
        lines: &mut Vec<(usize, &'a str)>,
    ) {
        if !seen.insert(id) {
            return;
        }
        if let Some(node) = self.node(id) {
            lines.push((depth, node.data.label.as_str()));
        }
        for child in children.get(id).into_iter().flatten().copied() {
            self.walk(child, depth + 1, children, seen, lines);
        }
    }
}
