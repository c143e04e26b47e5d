use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HierarchyError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether ambiguous subprocess matches are sent to an LLM for refinement
    pub enabled: bool,

    /// LLM provider (openai, ollama, openai-compatible)
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini")
    pub model: String,

    /// API key (for external providers)
    pub api_key: Option<String>,

    /// Base URL for self-hosted or compatible endpoints
    pub base_url: Option<String>,

    /// Maximum tokens for LLM responses
    pub max_tokens: Option<u32>,

    /// Temperature for LLM responses (0.0 to 1.0)
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where process metadata and the subprocess map come from
    pub input: InputConfig,

    /// Hierarchy construction settings
    pub hierarchy: HierarchyConfig,

    /// Output settings
    pub output: OutputConfig,

    /// LLM refinement settings
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding one metadata JSON document per BPMN file
    pub metadata_dir: PathBuf,

    /// Subprocess map document
    pub subprocess_map: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Process id, process name or file name to anchor the hierarchy at
    pub preferred_root: Option<String>,

    /// Tie-break between several equally uncalled root candidates
    pub root_tie_break: RootTieBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootTieBreak {
    /// Lowest file name wins
    #[default]
    FileName,
    /// First file in load order wins
    InputOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report path; stdout when unset
    pub path: Option<PathBuf>,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            preferred_root: None,
            root_tie_break: RootTieBreak::FileName,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig {
                metadata_dir: PathBuf::from("metadata"),
                subprocess_map: Some(PathBuf::from("bpmn-map.json")),
            },
            hierarchy: HierarchyConfig::default(),
            output: OutputConfig {
                path: None,
                pretty: true,
            },
            llm: LlmConfig {
                enabled: false,
                provider: "openai".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
                base_url: None,
                max_tokens: Some(500),
                temperature: Some(0.0),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| HierarchyError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HierarchyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "bpmn-hierarchy.toml",
                    "BpmnHierarchy.toml",
                    ".bpmn-hierarchy.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
