// SPDX-License-Identifier: MIT
//! Host project model.
//!
//! A project is a list of modules; each module contributes zero or more
//! content roots (absolute paths). The tracked-workspace granularity is the
//! content root, so the desired root set for a project is the union of every
//! module's content roots with duplicates collapsed.
//!
//! The daemon reads the model from a `project.toml` manifest:
//!
//! ```toml
//! [[module]]
//! name = "app"
//! content_roots = ["/home/dev/proj/app"]
//!
//! [[module]]
//! name = "shared"
//! content_roots = ["/home/dev/proj/shared", "/home/dev/proj/gen"]
//! ```

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ─── Model ────────────────────────────────────────────────────────────────────

/// One module of the host project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleView {
    /// Human-readable module name. Informational only.
    pub name: String,
    /// Absolute content-root paths belonging to this module.
    #[serde(default)]
    pub content_roots: Vec<String>,
}

/// Read-only snapshot of the host's project layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectView {
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleView>,
}

impl ProjectView {
    /// Load a project manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not read project manifest at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("could not parse project manifest at {}", path.display()))
    }
}

/// Project the desired root set out of a project view.
///
/// Pure: no side effects, order irrelevant, duplicates collapse. A module
/// with no content roots contributes nothing.
pub fn collect_desired_roots(view: &ProjectView) -> HashSet<String> {
    let mut roots = HashSet::new();
    for module in &view.modules {
        for root in &module.content_roots {
            roots.insert(root.clone());
        }
    }
    roots
}

// ─── Tests ────────────────────────────────────────────────────────────────────
