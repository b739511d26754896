//! Command-line driver for unasync.
//!
//! Collects source files from the given paths, builds rules from a config
//! file and/or `--rule FROM=TO` flags, and hands both to the core tree driver.
//! Build scripts call the `unasync` binary as their packaging hook.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;
use unasync_core::{unasync_files, Loader, Rule, Summary, UnasyncConfig};
use walkdir::WalkDir;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG: &str = "unasync.toml";

/// Parsed command-line options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub inputs: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub rules: Vec<(PathBuf, PathBuf)>,
    pub replacements: Vec<(String, String)>,
    pub extensions: Vec<String>,
    pub json: bool,
    pub verbose: bool,
}

/// Command definition for the `unasync` binary
pub fn command() -> Command {
    Command::new("unasync")
        .version(unasync_core::VERSION)
        .about("Generate synchronous Python sources from asynchronous ones")
        .arg(
            Arg::new("paths")
                .value_name("PATH")
                .help("Source files or directories to rewrite")
                .num_args(1..)
                .required(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("TOML file with [[rules]] and extensions (default: ./unasync.toml if present)"),
        )
        .arg(
            Arg::new("rule")
                .long("rule")
                .short('r')
                .value_name("FROM=TO")
                .help("Map a source directory to a destination directory")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("replace")
                .long("replace")
                .value_name("OLD=NEW")
                .help("Extra token replacement for --rule rules")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("ext")
                .long("ext")
                .value_name("EXT")
                .help("File extension to collect from directories (default: py)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the run summary as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every file outcome")
                .action(ArgAction::SetTrue),
        )
}

/// Split `KEY=VALUE`
pub fn parse_pair(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let strings = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .map(|values| values.cloned().collect())
                .unwrap_or_default()
        };

        let rules = strings("rule")
            .iter()
            .map(|raw| parse_pair(raw).map(|(from, to)| (PathBuf::from(from), PathBuf::from(to))))
            .collect::<Result<Vec<_>>>()?;
        let replacements = strings("replace")
            .iter()
            .map(|raw| parse_pair(raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inputs: strings("paths").into_iter().map(PathBuf::from).collect(),
            config: matches.get_one::<String>("config").map(PathBuf::from),
            rules,
            replacements,
            extensions: strings("ext"),
            json: matches.get_flag("json"),
            verbose: matches.get_flag("verbose"),
        })
    }

    /// Layer the config file and flag overrides over the defaults.
    ///
    /// Without `--config`, an `unasync.toml` in the working directory is used
    /// when present.
    pub fn load_config(&self) -> Result<UnasyncConfig> {
        self.load_config_in(Path::new(""))
    }

    /// [`Options::load_config`] looking for the default file in `dir`.
    pub fn load_config_in(&self, dir: &Path) -> Result<UnasyncConfig> {
        let mut loader = match &self.config {
            Some(path) => Loader::new().with_file(path),
            None => Loader::new().with_optional_file(dir.join(DEFAULT_CONFIG)),
        };
        if !self.extensions.is_empty() {
            let extensions: Vec<String> = self
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect();
            loader = loader.set_override("extensions", extensions)?;
        }
        Ok(loader.build()?)
    }

    /// Config file rules first, then `--rule` flags.
    pub fn build_rules(&self, config: &UnasyncConfig) -> Result<Vec<Rule>> {
        let base = self
            .config
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""));
        let mut rules = config.rules(base)?;
        for (from, to) in &self.rules {
            rules.push(Rule::new(from, to, self.replacements.iter().cloned())?);
        }
        if rules.is_empty() {
            return Err(anyhow!("no rules given: pass --rule FROM=TO or a --config file"));
        }
        Ok(rules)
    }
}

/// Expand directories into the files they contain, in sorted order.
pub fn discover_files(inputs: &[PathBuf], config: &UnasyncConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", input.display()))?;
            if entry.file_type().is_file() && config.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    debug!(count = files.len(), "discovered source files");
    Ok(files)
}

/// Run one unasync pass for the given options.
pub fn run(options: &Options) -> Result<Summary> {
    let config = options.load_config()?;
    let rules = options.build_rules(&config)?;
    let files = discover_files(&options.inputs, &config)?;
    Ok(unasync_files(&files, &rules)?)
}

/// Human readable one-line summary
pub fn render_summary(summary: &Summary) -> String {
    format!(
        "unasync: {} written, {} unchanged, {} skipped",
        summary.written.len(),
        summary.unchanged.len(),
        summary.skipped.len()
    )
}
