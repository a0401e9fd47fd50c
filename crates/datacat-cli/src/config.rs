//! CLI configuration and argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use datacat_core::query::DEFAULT_PAGE_SIZE;
use datacat_core::{
    CatalogRecordSpecification, LanguageRange, StorageConfig, DEFAULT_HIERARCHY_DEPTH,
    DEFAULT_PRIORITY_LIST,
};

use crate::error::CliError;
use crate::formatter::OutputFormat;

/// Default catalog directory.
pub const DEFAULT_DATA_PATH: &str = "./datacat_data";

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Path to the catalog storage directory.
    pub data_path: PathBuf,

    /// Language priority list for name and text resolution.
    pub priority: Vec<LanguageRange>,

    /// Page size for listing commands.
    pub page_size: usize,

    /// Expansion depth for `hierarchy`.
    pub hierarchy_depth: usize,

    /// Output format.
    pub format: OutputFormat,
}

impl CliConfig {
    /// Create a configuration with the given data path.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            priority: datacat_core::default_priority_list(),
            page_size: DEFAULT_PAGE_SIZE,
            hierarchy_depth: DEFAULT_HIERARCHY_DEPTH,
            format: OutputFormat::Table,
        }
    }

    /// Set the language priority list.
    pub fn with_priority(mut self, priority: Vec<LanguageRange>) -> Self {
        self.priority = priority;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the hierarchy depth.
    pub fn with_hierarchy_depth(mut self, depth: usize) -> Self {
        self.hierarchy_depth = depth;
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Storage configuration for the catalog directory.
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig::new(&self.data_path)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Record filters shared by listing commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Free-text query over id, labels and URI.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Only these record types (and their subtypes).
    #[arg(long = "type", value_name = "TYPE")]
    pub kinds: Vec<String>,

    /// Exclude these record types (and their subtypes).
    #[arg(long = "not-type", value_name = "TYPE")]
    pub not_kinds: Vec<String>,

    /// Only these ids.
    #[arg(long = "id")]
    pub ids: Vec<String>,

    /// Exclude these ids.
    #[arg(long = "not-id")]
    pub not_ids: Vec<String>,

    /// Require these tags.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Zero-based page number.
    #[arg(long, default_value_t = 0)]
    pub page: usize,
}

impl FilterArgs {
    /// Build a specification for one page.
    pub fn to_spec(&self, page_size: usize) -> Result<CatalogRecordSpecification, CliError> {
        let mut spec = CatalogRecordSpecification::new()
            .with_kind_in(CatalogRecordSpecification::parse_kinds(&self.kinds)?)
            .with_kind_not_in(CatalogRecordSpecification::parse_kinds(&self.not_kinds)?)
            .with_id_in(self.ids.iter().cloned())
            .with_id_not_in(self.not_ids.iter().cloned())
            .with_tagged(self.tags.iter().cloned())
            .with_pagination(self.page, page_size);
        if let Some(query) = &self.query {
            spec = spec.with_query(query.as_str());
        }
        Ok(spec)
    }
}

/// Catalog commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load a JSON seed document.
    Import {
        /// Path to the seed file.
        file: PathBuf,
    },

    /// Show a record with its relationships.
    Show {
        id: String,
    },

    /// Set the targets of a relationship slot.
    Relate {
        id: String,
        /// Relation, e.g. DEFINITION or Examples.
        relation: String,
        targets: Vec<String>,
    },

    /// Empty a relationship slot.
    Clear {
        id: String,
        relation: String,
    },

    /// List records matching filters.
    Search {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Count records matching filters.
    Count {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Expand matching records along composition relations.
    Hierarchy {
        #[command(flatten)]
        filter: FilterArgs,

        /// Relations to follow instead of the defaults.
        #[arg(long = "relation")]
        relations: Vec<String>,
    },

    /// Resolve a multi-language text for the configured languages.
    Translate {
        bundle_id: String,
    },

    /// List concepts without descriptions.
    MissingDescriptions {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// datacat command-line client.
#[derive(Parser, Debug)]
#[command(name = "datacat")]
#[command(version, about = "datacat catalog command-line client", long_about = None)]
pub struct Args {
    /// Path to the catalog storage directory.
    #[arg(short, long, default_value = DEFAULT_DATA_PATH, global = true)]
    pub data_path: PathBuf,

    /// Language priority list, e.g. "de,en;q=0.5".
    #[arg(short, long, default_value = DEFAULT_PRIORITY_LIST, global = true)]
    pub lang: String,

    /// Output format.
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    /// Page size for listing commands.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    pub page_size: usize,

    /// Expansion depth for `hierarchy`.
    #[arg(long, default_value_t = DEFAULT_HIERARCHY_DEPTH, global = true)]
    pub depth: usize,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Split into the configuration and the command to run.
    pub fn into_config(self) -> Result<(CliConfig, Command), CliError> {
        let priority = LanguageRange::parse_list(&self.lang)?;
        let config = CliConfig::new(self.data_path)
            .with_priority(priority)
            .with_page_size(self.page_size)
            .with_hierarchy_depth(self.depth)
            .with_format(self.format);
        Ok((config, self.command))
    }
}
