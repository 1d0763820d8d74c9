use std::path::Path;

use crate::extract::ConceptPrompt;

const MAX_FOLDER_CHARS: usize = 80;

/// Folder name for a concept; anything outside `[A-Za-z0-9 _-]` becomes `_`.
pub fn concept_folder_name(concept: &str, index: usize) -> String {
    let cleaned: String = concept
        .trim()
        .chars()
        .take(MAX_FOLDER_CHARS)
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('_').to_string();
    if cleaned.is_empty() {
        format!("concept-{:02}", index + 1)
    } else {
        cleaned
    }
}

pub fn prompts_text(prompt: &ConceptPrompt) -> String {
    format!(
        "Positive prompt: {}\nNegative prompt: {}",
        prompt.positive, prompt.negative
    )
}

pub fn write_prompts_file(path: &Path, prompt: &ConceptPrompt) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, prompts_text(prompt))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_names_are_path_safe() {
        assert_eq!(concept_folder_name("The Urban Oasis", 0), "The Urban Oasis");
        assert_eq!(concept_folder_name("../etc/passwd", 0), "etc_passwd");
        assert_eq!(concept_folder_name("Café: Nexus!", 0), "Caf__ Nexus");
        assert_eq!(concept_folder_name("  ///  ", 4), "concept-05");
    }

    #[test]
    fn prompts_file_matches_layout() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("A").join("prompts.txt");
        let prompt = ConceptPrompt {
            concept: "A".to_string(),
            positive: "green roof".to_string(),
            negative: "concrete".to_string(),
        };
        write_prompts_file(&path, &prompt)?;
        assert_eq!(
            std::fs::read_to_string(path)?,
            "Positive prompt: green roof\nNegative prompt: concrete"
        );
        Ok(())
    }
}
