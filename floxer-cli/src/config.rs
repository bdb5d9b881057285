//! Run configuration: CLI flags layered over an optional TOML file,
//! with CLI flags winning on conflict, mirroring the teacher's own
//! config precedence (`toml` + `serde`, flags override file values).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use floxer_core::pex::PexTreeBuildStrategy;
use floxer_core::pipeline::{PipelineConfig, QueryErrorBudget};

use crate::error::{CliError, CliResult};

fn default_seed_max_errors() -> usize {
    2
}

fn default_max_raw_anchors() -> usize {
    500
}

fn default_extra_verification_ratio() -> f64 {
    0.0
}

fn default_use_interval_optimization() -> bool {
    true
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

/// The on-disk shape of a `--config` TOML file. Every field is
/// optional: a file may set a subset, with the rest falling back to
/// built-in defaults (unless overridden by a CLI flag).
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub query_num_errors: Option<usize>,
    pub query_error_probability: Option<f64>,
    #[serde(default)]
    pub seed_max_errors: Option<usize>,
    #[serde(default)]
    pub max_raw_anchors: Option<usize>,
    #[serde(default)]
    pub extra_verification_ratio: Option<f64>,
    #[serde(default)]
    pub build_strategy: Option<BuildStrategyArg>,
    #[serde(default)]
    pub use_interval_optimization: Option<bool>,
    #[serde(default)]
    pub num_threads: Option<usize>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl FileConfig {
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| CliError::Io { source, path: Some(path.to_path_buf()) })?;
        toml::from_str(&text).map_err(|source| CliError::Toml { source, path: path.to_path_buf() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStrategyArg {
    Recursive,
    BottomUp,
}

impl From<BuildStrategyArg> for PexTreeBuildStrategy {
    fn from(value: BuildStrategyArg) -> Self {
        match value {
            BuildStrategyArg::Recursive => PexTreeBuildStrategy::Recursive,
            BuildStrategyArg::BottomUp => PexTreeBuildStrategy::BottomUp,
        }
    }
}

/// Fully resolved run configuration: every field required, defaults
/// applied, CLI overrides already merged over any config file.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub reference_path: PathBuf,
    pub queries_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub index_path: Option<PathBuf>,
    pub query_error_budget: QueryErrorBudget,
    pub seed_max_errors: usize,
    pub max_raw_anchors: usize,
    pub extra_verification_ratio: f64,
    pub build_strategy: PexTreeBuildStrategy,
    pub use_interval_optimization: bool,
    pub num_threads: usize,
    pub timeout_seconds: Option<u64>,
}

impl RunConfig {
    /// Merges CLI flags (`cli`) over an optional file config,
    /// defaulting unset fields, then validates the "at least one of
    /// `e`, `p`; if `e` set, `e >= s`" rule.
    pub fn resolve(cli: &crate::Cli, file: FileConfig) -> CliResult<Self> {
        let seed_max_errors = cli
            .seed_max_errors
            .or(file.seed_max_errors)
            .unwrap_or_else(default_seed_max_errors);

        let query_num_errors = cli.query_num_errors.or(file.query_num_errors);
        let query_error_probability = cli.query_error_probability.or(file.query_error_probability);

        let query_error_budget = match (query_num_errors, query_error_probability) {
            (Some(_), Some(_)) => {
                return Err(CliError::Config(
                    "query_num_errors and query_error_probability are mutually exclusive".into(),
                ))
            }
            (Some(e), None) => {
                if e < seed_max_errors {
                    return Err(CliError::Config(format!(
                        "query_num_errors ({e}) must be >= seed_max_errors ({seed_max_errors})"
                    )));
                }
                QueryErrorBudget::Absolute(e)
            }
            (None, Some(p)) => QueryErrorBudget::Rate(p),
            (None, None) => {
                return Err(CliError::Config(
                    "at least one of query_num_errors or query_error_probability must be set".into(),
                ))
            }
        };

        Ok(Self {
            reference_path: cli.reference.clone(),
            queries_path: cli.queries.clone(),
            output_path: cli.output.clone(),
            index_path: cli.index.clone(),
            query_error_budget,
            seed_max_errors,
            max_raw_anchors: cli
                .max_raw_anchors
                .or(file.max_raw_anchors)
                .unwrap_or_else(default_max_raw_anchors),
            extra_verification_ratio: cli
                .extra_verification_ratio
                .or(file.extra_verification_ratio)
                .unwrap_or_else(default_extra_verification_ratio),
            build_strategy: cli
                .build_strategy
                .or(file.build_strategy)
                .unwrap_or(BuildStrategyArg::BottomUp)
                .into(),
            use_interval_optimization: cli
                .use_interval_optimization
                .or(file.use_interval_optimization)
                .unwrap_or_else(default_use_interval_optimization),
            num_threads: cli
                .num_threads
                .or(file.num_threads)
                .unwrap_or_else(default_num_threads),
            timeout_seconds: cli.timeout_seconds.or(file.timeout_seconds),
        })
    }

    /// Builds the `floxer-core` pipeline config this run configuration
    /// describes.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            query_error_budget: self.query_error_budget,
            pex_leaf_max_num_errors: self.seed_max_errors,
            pex_build_strategy: self.build_strategy,
            search: floxer_core::fmindex::search::SearchConfig {
                max_num_errors: self.seed_max_errors,
                max_num_raw_anchors: self.max_raw_anchors,
            },
            verification: floxer_core::verify::VerificationConfig {
                kind: floxer_core::verify::VerificationKind::Hierarchical,
                extra_verification_ratio: self.extra_verification_ratio,
            },
            use_interval_optimization: self.use_interval_optimization,
            interval_overlap_rate_that_counts_as_contained: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> crate::Cli {
        crate::Cli {
            reference: PathBuf::from("ref.fa"),
            queries: PathBuf::from("q.fq"),
            output: None,
            index: None,
            config: None,
            query_num_errors: None,
            query_error_probability: None,
            seed_max_errors: None,
            max_raw_anchors: None,
            extra_verification_ratio: None,
            build_strategy: None,
            use_interval_optimization: None,
            num_threads: None,
            timeout_seconds: None,
            verbose: false,
        }
    }

    #[test]
    fn missing_error_budget_is_rejected() {
        let cli = base_cli();
        let result = RunConfig::resolve(&cli, FileConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn both_error_budgets_set_is_rejected() {
        let mut cli = base_cli();
        cli.query_num_errors = Some(3);
        cli.query_error_probability = Some(0.1);
        let result = RunConfig::resolve(&cli, FileConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn absolute_budget_below_seed_cap_is_rejected() {
        let mut cli = base_cli();
        cli.query_num_errors = Some(1);
        cli.seed_max_errors = Some(2);
        let result = RunConfig::resolve(&cli, FileConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn cli_flag_overrides_file_value() {
        let mut cli = base_cli();
        cli.query_num_errors = Some(4);
        let mut file = FileConfig::default();
        file.query_num_errors = Some(99);

        let resolved = RunConfig::resolve(&cli, file).unwrap();
        assert!(matches!(resolved.query_error_budget, QueryErrorBudget::Absolute(4)));
    }
}
