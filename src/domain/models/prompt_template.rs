use crate::domain::DomainError;

use super::FragmentMatch;

pub const QUESTION_PLACEHOLDER: &str = "{question}";
pub const FRAGMENTS_PLACEHOLDER: &str = "{retrieved_fragments}";

const DEFAULT_TEMPLATE: &str = include_str!("../../../prompts/sql_generation.txt");

/// Prompt text with `{question}` and `{retrieved_fragments}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        for placeholder in [QUESTION_PLACEHOLDER, FRAGMENTS_PLACEHOLDER] {
            if !text.contains(placeholder) {
                return Err(DomainError::invalid_input(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitutes both placeholders in a single pass, so placeholder-looking
    /// text inside the question or the fragments is left alone.
    pub fn render(&self, question: &str, fragments: &[FragmentMatch]) -> String {
        let fragment_block = format_fragments(fragments);
        let mut output = String::with_capacity(self.text.len() + question.len() + fragment_block.len());
        let mut rest = self.text.as_str();

        while let Some(start) = rest.find('{') {
            output.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
                output.push_str(question);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(FRAGMENTS_PLACEHOLDER) {
                output.push_str(&fragment_block);
                rest = after;
            } else {
                output.push('{');
                rest = &tail[1..];
            }
        }
        output.push_str(rest);
        output
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Fragments in ranked order, each prefixed by its identifier.
pub fn format_fragments(fragments: &[FragmentMatch]) -> String {
    fragments
        .iter()
        .map(|m| format!("-- Fragment: {}\n{}", m.fragment_id(), m.content().trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
