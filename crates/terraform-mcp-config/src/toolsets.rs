// crates/terraform-mcp-config/src/toolsets.rs
// ============================================================================
// Module: Toolset Selection
// Description: Named tool groups and the parsing rules for enabling them.
// Purpose: Decide which tool groups the server exposes.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Tools are grouped into toolsets. Callers enable toolsets by name; the
//! special names `all` and `default` expand to every toolset and to the
//! default set respectively. Unknown names are reported back to the caller
//! and otherwise ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Special toolset name enabling every toolset.
pub const ALL_TOOLSETS: &str = "all";
/// Special toolset name expanding to the default toolsets.
pub const DEFAULT_TOOLSETS: &str = "default";

// ============================================================================
// SECTION: Toolset
// ============================================================================

/// Named group of tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Toolset {
    /// Public Terraform Registry tools.
    Registry,
    /// Private registry tools (requires TFE credentials).
    RegistryPrivate,
    /// Terraform Cloud/Enterprise workspace and run tools.
    Terraform,
}

impl Toolset {
    /// Returns the canonical toolset name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::RegistryPrivate => "registry-private",
            Self::Terraform => "terraform",
        }
    }

    /// Returns a short human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Registry => "Public Terraform Registry (providers, modules, policies)",
            Self::RegistryPrivate => {
                "Private registry access (TFE/TFC private modules and providers)"
            }
            Self::Terraform => {
                "Terraform Cloud/Enterprise operations (workspaces, runs, variables)"
            }
        }
    }

    /// Returns all toolsets in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Registry, Self::RegistryPrivate, Self::Terraform]
    }

    /// Returns the toolsets enabled when no selection is made.
    #[must_use]
    pub const fn defaults() -> &'static [Self] {
        &[Self::Registry]
    }

    /// Parses a toolset from its canonical name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "registry" => Some(Self::Registry),
            "registry-private" => Some(Self::RegistryPrivate),
            "terraform" => Some(Self::Terraform),
            _ => None,
        }
    }
}

impl fmt::Display for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Resolved set of enabled toolsets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolsetSelection {
    /// True when `all` was requested.
    all: bool,
    /// Explicitly enabled toolsets (after `default` expansion).
    enabled: BTreeSet<Toolset>,
}

impl ToolsetSelection {
    /// Selection enabling every toolset.
    #[must_use]
    pub fn everything() -> Self {
        Self {
            all: true,
            enabled: Toolset::all().iter().copied().collect(),
        }
    }

    /// Selection enabling only the default toolsets.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            all: false,
            enabled: Toolset::defaults().iter().copied().collect(),
        }
    }

    /// Builds a selection from raw names.
    ///
    /// Names are trimmed and de-duplicated; `default` expands to the default
    /// toolsets and `all` enables everything. Returns the selection together
    /// with the names that were not recognized, in input order.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::default();
        let mut invalid = Vec::new();
        let mut seen = BTreeSet::new();
        for raw in names {
            let name = raw.as_ref().trim();
            if name.is_empty() || !seen.insert(name.to_string()) {
                continue;
            }
            if name == ALL_TOOLSETS {
                selection.all = true;
                selection.enabled.extend(Toolset::all().iter().copied());
            } else if name == DEFAULT_TOOLSETS {
                selection.enabled.extend(Toolset::defaults().iter().copied());
            } else if let Some(toolset) = Toolset::parse(name) {
                selection.enabled.insert(toolset);
            } else {
                invalid.push(name.to_string());
            }
        }
        (selection, invalid)
    }

    /// Returns true when the toolset is enabled.
    #[must_use]
    pub fn is_enabled(&self, toolset: Toolset) -> bool {
        self.all || self.enabled.contains(&toolset)
    }

    /// Returns true when `all` was requested.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.all
    }

    /// Returns true when nothing is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.all && self.enabled.is_empty()
    }

    /// Returns the enabled toolsets in canonical order.
    #[must_use]
    pub fn toolsets(&self) -> Vec<Toolset> {
        Toolset::all().iter().copied().filter(|toolset| self.is_enabled(*toolset)).collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a comma-separated list, trimming entries and dropping empties.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
