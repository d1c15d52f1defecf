use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{AppContext, InitArgs},
    core::{
        hierarchy::HierarchyOptions,
        workspace::{DEFAULT_CSCOPE_DB, DEFAULT_CTAGS_DB, IndexContext},
    },
    infra::{tools::ToolPaths, walk::DEFAULT_EXTENSIONS},
};

/// Config files tried in order; the first one found is used.
pub const CONFIG_FILES: [&str; 4] =
    ["callscope.toml", "callscope.yaml", "callscope.json", ".callscope.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Ignore patterns for source walking (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// External tool locations
    pub tools: ToolPaths,

    /// Store locations
    pub database: DatabaseConfig,

    /// Node display and navigation
    pub hierarchy: HierarchyOptions,

    /// Regex indexer settings
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig
{
    pub cscope_file: PathBuf,
    pub ctags_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig
{
    pub extensions: Vec<String>,

    /// Replaces the built-in function definition regex
    pub function_pattern: Option<String>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "build/**".to_string(),
                "out/**".to_string(),
                ".git/**".to_string(),
                "node_modules/**".to_string(),
            ],
            tools: ToolPaths::default(),
            database: DatabaseConfig::default(),
            hierarchy: HierarchyOptions::default(),
            fallback: FallbackConfig::default(),
        }
    }
}

impl Default for DatabaseConfig
{
    fn default() -> Self
    {
        Self {
            cscope_file: PathBuf::from(DEFAULT_CSCOPE_DB),
            ctags_file: PathBuf::from(DEFAULT_CTAGS_DB),
        }
    }
}

impl Default for FallbackConfig
{
    fn default() -> Self
    {
        Self {
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            function_pattern: None,
        }
    }
}

impl Config
{
    /// Index context for `root` with tool paths expanded.
    pub fn index_context(
        &self,
        root: &Path,
    ) -> IndexContext
    {
        IndexContext::new(root)
            .with_tools(
                self.tools
                    .expanded(),
            )
            .with_databases(
                self.database
                    .cscope_file
                    .clone(),
                self.database
                    .ctags_file
                    .clone(),
            )
    }
}

/// Load the first config file found in the working directory, then apply
/// `CALLSCOPE_*` environment overrides (`CALLSCOPE_TOOLS__CSCOPE=...`).
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    if let Some(path) = CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
    {
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CALLSCOPE")
            .prefix_separator("_")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
