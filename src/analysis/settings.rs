/// Sizes and concurrency bounds for one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Non-blank lines per primary evaluation window
    pub code_chunk_lines: usize,
    /// Non-blank lines per escalation window
    pub escalation_chunk_lines: usize,
    pub practice_batch_size: usize,
    /// Files analyzed concurrently
    pub file_workers: usize,
    /// Evaluator calls in flight per file, and windows in flight per escalation
    pub chunk_workers: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            code_chunk_lines: 500,
            escalation_chunk_lines: 50,
            practice_batch_size: 10,
            file_workers: 3,
            chunk_workers: 3,
        }
    }
}

impl AnalysisSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_chunk_lines(mut self, lines: usize) -> Self {
        self.code_chunk_lines = lines;
        self
    }

    pub fn with_escalation_chunk_lines(mut self, lines: usize) -> Self {
        self.escalation_chunk_lines = lines;
        self
    }

    pub fn with_practice_batch_size(mut self, size: usize) -> Self {
        self.practice_batch_size = size;
        self
    }

    pub fn with_file_workers(mut self, workers: usize) -> Self {
        self.file_workers = workers;
        self
    }

    pub fn with_chunk_workers(mut self, workers: usize) -> Self {
        self.chunk_workers = workers;
        self
    }

    /// Upper bound on evaluator calls in flight across the whole run
    pub fn peak_evaluator_calls(&self) -> usize {
        self.file_workers.max(1) * self.chunk_workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.code_chunk_lines, 500);
        assert_eq!(settings.escalation_chunk_lines, 50);
        assert_eq!(settings.practice_batch_size, 10);
        assert_eq!(settings.peak_evaluator_calls(), 9);
    }

    #[test]
    fn test_builder_pattern() {
        let settings = AnalysisSettings::new()
            .with_code_chunk_lines(20)
            .with_escalation_chunk_lines(5)
            .with_practice_batch_size(2)
            .with_file_workers(2)
            .with_chunk_workers(4);

        assert_eq!(settings.code_chunk_lines, 20);
        assert_eq!(settings.escalation_chunk_lines, 5);
        assert_eq!(settings.practice_batch_size, 2);
        assert_eq!(settings.peak_evaluator_calls(), 8);
    }
}
