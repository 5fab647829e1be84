//! Report, configuration and cache-status rendering in JSON, YAML or text

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::{AnalysisOutcome, AnalysisReport};
use crate::config::AuditConfig;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// Verdict cache status for `cache stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub path: String,
    pub entries: u64,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// JSON and YAML carry only the report map; text adds a run summary
    pub fn format_outcome(&self, outcome: &AnalysisOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&outcome.report)
                .context("Failed to serialize report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&outcome.report).context("Failed to serialize report to YAML")
            }
            OutputFormat::Human => Ok(self.format_human(outcome)),
        }
    }

    fn format_human(&self, outcome: &AnalysisOutcome) -> String {
        let report = &outcome.report;
        let mut output = String::new();

        if report.is_empty() {
            output.push_str("\u{2713} No best-practice violations found\n");
        } else {
            output.push_str("\u{26A0} Best-practice violations\n");
        }
        output.push_str(RULE);
        output.push_str("\n\n");

        render_entries(report, &mut output);

        let stats = &outcome.stats;
        output.push_str(&format!(
            "Summary: {} violation(s) in {} location(s)\n",
            report.violation_count(),
            report.entries().len()
        ));
        output.push_str(&format!(
            "Files: {} analyzed, {} skipped | Cache hits: {} | Evaluator calls: {} | Escalations: {}\n",
            stats.files_analyzed,
            stats.files_failed,
            stats.cache_hits,
            stats.evaluator_calls,
            stats.escalations
        ));
        if stats.failed_tasks > 0 {
            output.push_str(&format!(
                "\u{26A0} {} evaluation task(s) failed; affected practices will be re-checked next run\n",
                stats.failed_tasks
            ));
        }
        output
    }

    pub fn format_config(&self, config: &AuditConfig) -> Result<String> {
        let map = config.to_display_map();
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&map).context("Failed to serialize config to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    pub fn format_cache_stats(&self, stats: &CacheStats) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(stats).context("Failed to serialize cache stats")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(stats).context("Failed to serialize cache stats")
            }
            OutputFormat::Human => Ok(format!(
                "Verdict cache\n  Path:    {}\n  Entries: {}\n",
                stats.path, stats.entries
            )),
        }
    }
}

fn render_entries(report: &AnalysisReport, output: &mut String) {
    for (location, practices) in report.entries() {
        output.push_str(&format!("{}\n", location));
        let count = practices.len();
        for (i, (statement, records)) in practices.iter().enumerate() {
            let is_last = i + 1 == count;
            let (branch, stem) = if is_last {
                ("\u{2514}\u{2500}", "   ")
            } else {
                ("\u{251C}\u{2500}", "\u{2502}  ")
            };
            output.push_str(&format!("{} {}\n", branch, statement));
            for record in records {
                if let Some(code) = &record.code_snippet {
                    output.push_str(&format!("{}  code: {}\n", stem, first_line(code)));
                }
                if let Some(suggestion) = &record.suggestion {
                    output.push_str(&format!("{}  fix:  {}\n", stem, suggestion));
                }
            }
        }
        output.push('\n');
    }
}

fn first_line(code: &str) -> String {
    let mut lines = code.lines();
    let first = lines.next().unwrap_or_default().trim();
    if lines.next().is_some() {
        format!("{} ...", first)
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::report::MergedVerdicts;
    use crate::analysis::{PracticeVerdicts, RunStats, VerdictRecord};
    use crate::practice::{Practice, PracticeSet};

    fn outcome() -> AnalysisOutcome {
        let catalog = PracticeSet::new(vec![Practice::new("ctx", "Use context managers")]);
        let mut merged = MergedVerdicts::new();
        merged.insert(
            "a.py".to_string(),
            PracticeVerdicts::from([(
                "ctx".to_string(),
                vec![VerdictRecord::violated("f = open(p)\nf.read()", "Use a with-block")],
            )]),
        );
        AnalysisOutcome {
            report: AnalysisReport::finalize(merged, &catalog),
            stats: RunStats {
                files_total: 1,
                files_analyzed: 1,
                evaluator_calls: 1,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_json_is_the_report_map() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_outcome(&outcome()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            value["a.py"]["Use context managers"][0]["status"],
            "Violated"
        );
    }

    #[test]
    fn test_yaml_output() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_outcome(&outcome()).unwrap();
        assert!(output.contains("a.py:"));
        assert!(output.contains("Use a with-block"));
    }

    #[test]
    fn test_human_output() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_outcome(&outcome()).unwrap();
        assert!(output.contains("Best-practice violations"));
        assert!(output.contains("\u{2514}\u{2500} Use context managers"));
        assert!(output.contains("code: f = open(p) ..."));
        assert!(output.contains("Summary: 1 violation(s) in 1 location(s)"));
    }

    #[test]
    fn test_human_output_clean_run() {
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let clean = AnalysisOutcome {
            report: AnalysisReport::default(),
            stats: RunStats::default(),
        };
        let output = formatter.format_outcome(&clean).unwrap();
        assert!(output.starts_with("\u{2713} No best-practice violations found"));
    }

    #[test]
    fn test_cache_stats_formats() {
        let stats = CacheStats {
            path: "/tmp/cache.sqlite3".to_string(),
            entries: 7,
        };
        let human = OutputFormatter::new(OutputFormat::Human)
            .format_cache_stats(&stats)
            .unwrap();
        assert!(human.contains("Entries: 7"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_cache_stats(&stats)
            .unwrap();
        assert!(json.contains("\"entries\": 7"));
    }
}
