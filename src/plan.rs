//! Decides which practices each file is checked against

use crate::analysis::{FileTarget, FileWork, ProjectMetadata};
use crate::practice::PracticeSet;
use tracing::debug;

/// Pairs every file with its candidate code-level practices.
///
/// A practice is a candidate when it applies to the project's frameworks and,
/// if it declares keywords, the file mentions at least one of them. Files
/// without any candidate are left out.
pub fn assign_practices(
    files: Vec<FileTarget>,
    practices: &PracticeSet,
    metadata: &ProjectMetadata,
) -> Vec<FileWork> {
    let applicable: Vec<_> = practices
        .code_level()
        .into_iter()
        .filter(|p| p.applies_to(&metadata.frameworks))
        .collect();

    files
        .into_iter()
        .filter_map(|file| {
            let ids: Vec<String> = applicable
                .iter()
                .filter(|p| p.mentioned_in(&file.content))
                .map(|p| p.id.clone())
                .collect();

            if ids.is_empty() {
                debug!(file = %file.path, "No candidate practices");
                None
            } else {
                Some(FileWork::new(file, ids))
            }
        })
        .collect()
}
