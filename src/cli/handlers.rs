//! Subcommand entry points. Each returns the process exit code.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::commands::{AnalyzeArgs, CacheAction, CacheArgs, ConfigArgs};
use super::output::{CacheStats, OutputFormatter};
use crate::analysis::{
    ContentCache, ContextSynthesizer, DocumentationIndex, EscalationResolver,
    FileAnalysisCoordinator, IndexContextProvider, LayeredContextProvider, LlmRepoLevelEvaluator,
    LlmVerdictEvaluator, LlmWindowEvaluator, MemoryContentCache, ProjectMetadata,
    ReferenceContextProvider, RepoAnalysisCoordinator, RepoLevelInput, SqliteContentCache,
};
use crate::config::{parse_extensions, AuditConfig};
use crate::llm::select_llm_client;
use crate::plan::assign_practices;
use crate::practice::PracticeLoader;
use crate::progress::LoggingHandler;
use crate::workspace::{ScanConfig, WorkspaceScanner};

pub async fn handle_analyze(args: &AnalyzeArgs) -> i32 {
    match run_analyze(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub async fn handle_cache(args: &CacheArgs) -> i32 {
    match run_cache(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = AuditConfig::default();
    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(output) => {
            println!("{}", output.trim_end());
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Environment defaults with command-line overrides applied, then validated
fn analyze_config(args: &AnalyzeArgs) -> Result<AuditConfig> {
    let mut config = AuditConfig::default();

    if let Some(provider) = args.backend {
        config.provider = provider;
    }
    if let Some(ref model) = args.model {
        config.model = model.clone();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    if let Some(ref cache) = args.cache {
        config.cache_path = cache.clone();
    }
    if let Some(ref extensions) = args.extensions {
        config.file_extensions = parse_extensions(extensions);
    }
    if let Some(ref docs) = args.docs {
        config.docs_dir = Some(docs.clone());
    }

    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}

async fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    let config = analyze_config(args)?;

    let catalog = PracticeLoader::new(&args.practices)
        .load()
        .with_context(|| format!("Failed to load practices from {}", args.practices.display()))?;

    let scanner = WorkspaceScanner::new(&args.repository_path)?.with_config(ScanConfig {
        extensions: config.file_extensions.clone(),
        max_file_size: config.max_file_size,
        ..Default::default()
    });
    let files = scanner.scan()?;
    let metadata =
        ProjectMetadata::new(scanner.project_name()).with_frameworks(args.frameworks.clone());
    info!(
        project = %metadata.name,
        frameworks = %metadata.frameworks_label(),
        files = files.len(),
        practices = catalog.len(),
        "Workspace scanned"
    );

    let work = assign_practices(files, &catalog, &metadata);

    let cache: Arc<dyn ContentCache> = if args.no_cache {
        Arc::new(MemoryContentCache::new())
    } else {
        let cache = SqliteContentCache::open(&config.cache_path).with_context(|| {
            format!("Failed to open verdict cache at {}", config.cache_path.display())
        })?;
        Arc::new(cache)
    };

    let selected = select_llm_client(&config).await?;
    info!("LLM backend: {}", selected.description);
    let client = selected.client;

    let synthesizer = ContextSynthesizer::new(client.clone());
    let reference = ReferenceContextProvider::new(
        synthesizer.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let index = match config.docs_dir {
        Some(ref dir) => Some(load_index(dir, synthesizer)?),
        None => None,
    };
    let context = LayeredContextProvider::new(Some(reference), index);

    let settings = config.analysis_settings();
    let resolver = EscalationResolver::new(
        Arc::new(context),
        Arc::new(LlmWindowEvaluator::new(client.clone())),
    )
    .with_window_lines(settings.escalation_chunk_lines)
    .with_workers(settings.chunk_workers);

    let files = FileAnalysisCoordinator::new(
        cache,
        Arc::new(LlmVerdictEvaluator::new(client.clone())),
        Arc::new(resolver),
        settings,
        metadata,
    );
    let mut coordinator =
        RepoAnalysisCoordinator::new(files).with_progress(Arc::new(LoggingHandler));

    let repo_key = scanner.root().display().to_string();
    let repo_level = if args.no_repo_level || catalog.repo_level().is_empty() {
        None
    } else {
        coordinator = coordinator.with_repo_level(Arc::new(LlmRepoLevelEvaluator::new(client)));
        Some(RepoLevelInput {
            key: repo_key.clone(),
            structure: scanner.project_structure(),
        })
    };

    let outcome = coordinator
        .run(&repo_key, work, &catalog, repo_level)
        .await
        .context("Analysis aborted")?;

    if outcome.stats.failed_tasks > 0 {
        warn!(
            "{} evaluation task(s) failed; their practices were not cached",
            outcome.stats.failed_tasks
        );
    }

    let rendered = OutputFormatter::new(args.format.into()).format_outcome(&outcome)?;
    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered.trim_end()),
    }

    Ok(())
}

fn load_index(dir: &Path, synthesizer: ContextSynthesizer) -> Result<IndexContextProvider> {
    let index = DocumentationIndex::build(dir)
        .with_context(|| format!("Failed to index documentation in {}", dir.display()))?;
    info!(passages = index.len(), dir = %dir.display(), "Documentation indexed");
    Ok(IndexContextProvider::new(Arc::new(index), synthesizer))
}

async fn run_cache(args: &CacheArgs) -> Result<()> {
    let path = match args.cache {
        Some(ref path) => path.clone(),
        None => AuditConfig::default().cache_path,
    };
    let cache = SqliteContentCache::open(&path)
        .with_context(|| format!("Failed to open verdict cache at {}", path.display()))?;

    match args.action {
        CacheAction::Stats => {
            let stats = CacheStats {
                path: path.display().to_string(),
                entries: cache.entry_count().await?,
            };
            let output = OutputFormatter::new(args.format.into()).format_cache_stats(&stats)?;
            println!("{}", output.trim_end());
        }
        CacheAction::Clear => {
            let removed = cache.clear().await?;
            println!("Removed {} cached verdict list(s) from {}", removed, path.display());
        }
    }
    Ok(())
}
