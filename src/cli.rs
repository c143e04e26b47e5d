use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::config::Config;
use crate::core::{write_default_config, Engine};

#[derive(Parser)]
#[command(name = "bpmn-hierarchy")]
#[command(about = "Reconstructs the process hierarchy behind a set of linked BPMN files")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory of process metadata documents
    #[arg(short, long, global = true)]
    pub metadata: Option<PathBuf>,

    /// Subprocess map document
    #[arg(long, global = true)]
    pub map: Option<PathBuf>,

    /// Process id, name or file name to use as the root
    #[arg(short, long, global = true)]
    pub root: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Target file
        #[arg(short, long, default_value = "bpmn-hierarchy.toml")]
        path: PathBuf,
    },

    /// Build the hierarchy and write the JSON report
    Build {
        /// Report path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Log a summary of the hierarchy
    Summary,

    /// Regenerate the subprocess map from the current resolutions
    Map {
        /// Ask the configured LLM about doubtful mappings
        #[arg(long)]
        refine: bool,

        /// Write the map here instead of the configured path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the hierarchy for problems
    Validate {
        /// Fail on warnings as well
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    /// Configuration file merged with command-line overrides
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config.as_deref())?;

        if let Some(metadata) = &self.metadata {
            config.input.metadata_dir = metadata.clone();
        }
        if let Some(map) = &self.map {
            config.input.subprocess_map = Some(map.clone());
        }
        if let Some(root) = &self.root {
            config.hierarchy.preferred_root = Some(root.clone());
        }

        Ok(config)
    }

    pub async fn execute(self) -> Result<()> {
        if let Commands::Init { path } = &self.command {
            return write_default_config(path);
        }

        let engine = Engine::new(self.resolve_config()?);

        match self.command {
            Commands::Init { .. } => Ok(()),
            Commands::Build { output } => engine.build(output).await,
            Commands::Summary => engine.summary().await,
            Commands::Map { refine, output } => engine.map(refine, output).await,
            Commands::Validate { strict } => engine.validate(strict).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("bpmn-hierarchy.toml");
        Config::default().save(&config_path).unwrap();

        let cli = Cli::parse_from([
            "bpmn-hierarchy",
            "--config",
            config_path.to_str().unwrap(),
            "validate",
            "--strict",
            "--root",
            "mortgage-se-application",
            "--metadata",
            "parsed",
        ]);

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.input.metadata_dir, PathBuf::from("parsed"));
        assert_eq!(config.hierarchy.preferred_root.as_deref(), Some("mortgage-se-application"));
        assert!(matches!(cli.command, Commands::Validate { strict: true }));
    }
}
