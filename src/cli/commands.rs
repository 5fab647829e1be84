use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// LLM-assisted best-practice auditing for source repositories
#[derive(Parser, Debug)]
#[command(
    name = "practice-audit",
    about = "Audit a repository against natural-language best practices",
    version,
    author,
    long_about = "practice-audit checks every source file of a local checkout against a list of \
                  best practices using an LLM. Verdicts are cached by file content and practice \
                  statement, so unchanged files are never re-evaluated. Supported backends: \
                  Ollama, OpenAI, Claude, Gemini, Grok, Groq."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze a repository against a practice document",
        long_about = "Scans the repository, checks each file against the applicable practices and \
                      reports every violation.\n\n\
                      Examples:\n  \
                      practice-audit analyze . --practices practices.txt\n  \
                      practice-audit analyze ~/src/app -p rules.toml --docs ./docs --format json\n  \
                      practice-audit analyze . -p rules.txt --framework Django --backend openai --model gpt-4o"
    )]
    Analyze(AnalyzeArgs),

    #[command(about = "Inspect or clear the verdict cache")]
    Cache(CacheArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "REPO", help = "Path to the repository checkout")]
    pub repository_path: PathBuf,

    #[arg(
        short = 'p',
        long,
        value_name = "FILE",
        help = "Practice document (plain text or .toml manifest)"
    )]
    pub practices: PathBuf,

    #[arg(long, value_name = "DIR", help = "Documentation directory used to ground escalations")]
    pub docs: Option<PathBuf>,

    #[arg(
        long = "framework",
        value_name = "NAME",
        help = "Framework used by the project (repeatable)"
    )]
    pub frameworks: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the report to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'b',
        long,
        value_parser = parse_adapter_kind,
        help = "LLM provider (defaults to PRACTICE_AUDIT_PROVIDER, then Ollama)"
    )]
    pub backend: Option<AdapterKind>,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model name (provider-specific)")]
    pub model: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "Request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "PATH", help = "Verdict cache location")]
    pub cache: Option<PathBuf>,

    #[arg(long, help = "Keep verdicts in memory only for this run")]
    pub no_cache: bool,

    #[arg(long, help = "Skip repository-level practices")]
    pub no_repo_level: bool,

    #[arg(
        long,
        value_name = "EXTS",
        help = "Comma-separated file extensions to analyze (e.g. py,pyi)"
    )]
    pub extensions: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,

    #[arg(long, global = true, value_name = "PATH", help = "Verdict cache location")]
    pub cache: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    #[command(about = "Show cache location and entry count")]
    Stats,
    #[command(about = "Delete every cached verdict list")]
    Clear,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults() {
        let args = CliArgs::parse_from([
            "practice-audit",
            "analyze",
            "/tmp/repo",
            "--practices",
            "rules.txt",
        ]);
        match args.command {
            Commands::Analyze(analyze) => {
                assert_eq!(analyze.repository_path, PathBuf::from("/tmp/repo"));
                assert_eq!(analyze.practices, PathBuf::from("rules.txt"));
                assert_eq!(analyze.format, OutputFormatArg::Human);
                assert!(analyze.backend.is_none());
                assert!(analyze.timeout.is_none());
                assert!(analyze.frameworks.is_empty());
                assert!(!analyze.no_cache);
                assert!(!analyze.no_repo_level);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_with_options() {
        let args = CliArgs::parse_from([
            "practice-audit",
            "analyze",
            ".",
            "-p",
            "rules.toml",
            "--framework",
            "Django",
            "--framework",
            "Celery",
            "--format",
            "json",
            "--backend",
            "claude",
            "--timeout",
            "120",
            "--no-repo-level",
        ]);
        match args.command {
            Commands::Analyze(analyze) => {
                assert_eq!(analyze.frameworks, vec!["Django", "Celery"]);
                assert_eq!(analyze.format, OutputFormatArg::Json);
                assert_eq!(analyze.backend, Some(AdapterKind::Anthropic));
                assert_eq!(analyze.timeout, Some(120));
                assert!(analyze.no_repo_level);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_requires_practices() {
        let result = CliArgs::try_parse_from(["practice-audit", "analyze", "."]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_backend() {
        let result = CliArgs::try_parse_from([
            "practice-audit",
            "analyze",
            ".",
            "-p",
            "r.txt",
            "--backend",
            "nope",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_subcommands() {
        let args = CliArgs::parse_from(["practice-audit", "cache", "stats", "--cache", "/tmp/c.db"]);
        match args.command {
            Commands::Cache(cache) => {
                assert_eq!(cache.action, CacheAction::Stats);
                assert_eq!(cache.cache, Some(PathBuf::from("/tmp/c.db")));
            }
            _ => panic!("Expected Cache command"),
        }

        let args = CliArgs::parse_from(["practice-audit", "cache", "clear"]);
        assert!(matches!(
            args.command,
            Commands::Cache(CacheArgs {
                action: CacheAction::Clear,
                ..
            })
        ));
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["practice-audit", "config", "-v"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let result = CliArgs::try_parse_from(["practice-audit", "-v", "-q", "config"]);
        assert!(result.is_err());
    }
}
