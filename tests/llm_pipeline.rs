//! Full pipeline over the sample repository with a scripted LLM backend

use practice_audit::analysis::{
    AnalysisSettings, ContextSynthesizer, DocumentationIndex, EscalationResolver,
    FileAnalysisCoordinator, IndexContextProvider, LlmRepoLevelEvaluator, LlmVerdictEvaluator,
    LlmWindowEvaluator, MemoryContentCache, ProjectMetadata, RepoAnalysisCoordinator,
    RepoLevelInput, VerdictStatus,
};
use practice_audit::llm::{MockLLMClient, MockResponse};
use practice_audit::plan::assign_practices;
use practice_audit::workspace::WorkspaceScanner;
use practice_audit::{LLMClient, PracticeLoader};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

fn coordinator(client: Arc<dyn LLMClient>) -> RepoAnalysisCoordinator {
    let index = DocumentationIndex::from_passages(Vec::new());
    let context = IndexContextProvider::new(Arc::new(index), ContextSynthesizer::new(client.clone()));
    let resolver = EscalationResolver::new(
        Arc::new(context),
        Arc::new(LlmWindowEvaluator::new(client.clone())),
    );

    // one file and one call at a time so the scripted answers line up
    let settings = AnalysisSettings::new()
        .with_file_workers(1)
        .with_chunk_workers(1);
    let files = FileAnalysisCoordinator::new(
        Arc::new(MemoryContentCache::new()),
        Arc::new(LlmVerdictEvaluator::new(client.clone())),
        Arc::new(resolver),
        settings,
        ProjectMetadata::new("sample_repo"),
    );
    RepoAnalysisCoordinator::new(files).with_repo_level(Arc::new(LlmRepoLevelEvaluator::new(client)))
}

#[tokio::test]
async fn test_sample_repo_against_manifest() {
    let catalog = PracticeLoader::new(fixture("practices/django.toml"))
        .load()
        .unwrap();
    let scanner = WorkspaceScanner::new(fixture("sample_repo")).unwrap();
    let files = scanner.scan().unwrap();
    let metadata = ProjectMetadata::new(scanner.project_name());
    let work = assign_practices(files, &catalog, &metadata);
    assert_eq!(work.len(), 2);

    let mock = Arc::new(MockLLMClient::new());
    mock.add_responses([
        // app/io.py: ctx + orm
        MockResponse::text(
            "```json\n{\"ctx\": [[\"Violated\", \"f = open(path)\", \"Use `with open(path) as f:`\"]], \"orm\": [[\"Not Relevant\"]]}\n```",
        ),
        // app/names.py: orm
        MockResponse::text(r#"{"orm": [["Not Relevant", null, null]]}"#),
        // repository level
        MockResponse::text(r#"{"readme": [["Not Violated", ""]]}"#),
    ]);

    let outcome = coordinator(mock.clone())
        .run(
            "sample_repo",
            work,
            &catalog,
            Some(RepoLevelInput {
                key: "sample_repo".to_string(),
                structure: scanner.project_structure(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(mock.remaining_responses(), 0);
    assert_eq!(outcome.stats.evaluator_calls, 2);
    assert_eq!(outcome.stats.escalations, 0);

    let report = outcome.report;
    assert_eq!(report.entries().len(), 1);
    let records = report
        .get("app/io.py", "Use context managers when opening files")
        .unwrap();
    assert_eq!(records[0].status, VerdictStatus::Violated);
    assert_eq!(records[0].code_snippet.as_deref(), Some("f = open(path)"));

    let requests = mock.received_requests();
    assert!(requests[0].user_text().contains("f = open(path)"));
    assert!(requests[2].user_text().contains("README.md"));
}

#[tokio::test]
async fn test_unknown_without_documentation_is_skipped() {
    let catalog = PracticeLoader::new(fixture("practices/django.toml"))
        .load()
        .unwrap();
    let files = WorkspaceScanner::new(fixture("sample_repo"))
        .unwrap()
        .scan()
        .unwrap();
    let metadata = ProjectMetadata::new("sample_repo").with_frameworks(vec!["Flask".to_string()]);
    let work = assign_practices(files, &catalog, &metadata);
    assert_eq!(work.len(), 1);

    let mock = Arc::new(MockLLMClient::new());
    mock.add_response(MockResponse::text(r#"{"ctx": ["Unknown"]}"#));

    let outcome = coordinator(mock.clone())
        .run("sample_repo", work, &catalog, None)
        .await
        .unwrap();

    // empty index: no synthesis call, no window calls
    assert_eq!(mock.received_requests().len(), 1);
    assert_eq!(outcome.stats.escalations, 1);
    assert!(outcome.report.is_empty());
}

/// Answers each kind of call from the prompt it receives
fn route(request: &practice_audit::llm::LLMRequest) -> MockResponse {
    let text = request.user_text();
    if text.contains("Passages:") {
        MockResponse::text("Files must be opened with a `with` block.")
    } else if text.contains("Documentation:") {
        if text.contains("open(") {
            MockResponse::text(r#"[["Violated", "open(", "Use a with-block"]]"#)
        } else {
            MockResponse::text(r#"[["Not Violated"]]"#)
        }
    } else {
        MockResponse::text(r#"{"ctx": [["Unknown"]], "orm": [["Not Relevant"]]}"#)
    }
}

#[tokio::test]
async fn test_concurrent_escalation_with_documentation_index() {
    let repo = tempfile::TempDir::new().unwrap();
    for idx in 0..6 {
        let body = if idx % 2 == 0 {
            format!("def load_{idx}(p):\n    f = open(p)\n    return f.read()\n")
        } else {
            format!("def add_{idx}(a, b):\n    return a + b\n")
        };
        std::fs::write(repo.path().join(format!("m{idx}.py")), body).unwrap();
    }

    let catalog = practice_audit::PracticeSet::new(vec![
        practice_audit::Practice::new("ctx", "Open files with a context manager"),
    ]);
    let scanner = WorkspaceScanner::new(repo.path()).unwrap();
    let work = assign_practices(
        scanner.scan().unwrap(),
        &catalog,
        &ProjectMetadata::new("generated"),
    );
    assert_eq!(work.len(), 6);

    let client: Arc<dyn LLMClient> = Arc::new(MockLLMClient::routed(route));
    let index = DocumentationIndex::build(&fixture("docs")).unwrap();
    let context = IndexContextProvider::new(Arc::new(index), ContextSynthesizer::new(client.clone()));
    let resolver = EscalationResolver::new(
        Arc::new(context),
        Arc::new(LlmWindowEvaluator::new(client.clone())),
    )
    .with_window_lines(1);
    let cache = Arc::new(MemoryContentCache::new());
    let build = |cache: Arc<MemoryContentCache>, resolver: Arc<EscalationResolver>| {
        RepoAnalysisCoordinator::new(FileAnalysisCoordinator::new(
            cache,
            Arc::new(LlmVerdictEvaluator::new(client.clone())),
            resolver,
            AnalysisSettings::new(),
            ProjectMetadata::new("generated"),
        ))
    };
    let resolver = Arc::new(resolver);

    let first = build(cache.clone(), resolver.clone())
        .run("generated", work.clone(), &catalog, None)
        .await
        .unwrap();

    assert_eq!(first.stats.escalations, 6);
    let flagged: Vec<&String> = first.report.entries().keys().collect();
    assert_eq!(flagged, vec!["m0.py", "m2.py", "m4.py"]);
    for path in flagged {
        let records = first
            .report
            .get(path, "Open files with a context manager")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code_snippet.as_deref(), Some("open("));
    }

    let second = build(cache, resolver)
        .run("generated", work, &catalog, None)
        .await
        .unwrap();
    assert_eq!(second.stats.evaluator_calls, 0);
    assert_eq!(second.stats.escalations, 0);
    assert_eq!(first.report, second.report);
}
