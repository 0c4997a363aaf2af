use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Raw model output for one question, tagged with the fragments that were in
/// its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSql {
    schema_name: String,
    question: String,
    response: String,
    fragment_ids: Vec<String>,
    prompt: String,
}

impl GeneratedSql {
    pub fn new(
        schema_name: String,
        question: String,
        response: String,
        fragment_ids: Vec<String>,
        prompt: String,
    ) -> Self {
        Self {
            schema_name,
            question,
            response,
            fragment_ids,
            prompt,
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// The model's response, exactly as returned.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Fragment ids in ranked order.
    pub fn fragment_ids(&self) -> &[String] {
        &self.fragment_ids
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Body of the first fenced SQL block, or the trimmed response when the
    /// model did not fence its answer.
    pub fn extracted_sql(&self) -> &str {
        extract_sql(&self.response)
    }
}

fn sql_fence() -> &'static Regex {
    static SQL_FENCE: OnceLock<Regex> = OnceLock::new();
    SQL_FENCE.get_or_init(|| {
        Regex::new(r"(?is)```sql[ \t]*\r?\n(.*?)```").expect("Invalid SQL fence pattern")
    })
}

fn any_fence() -> &'static Regex {
    static ANY_FENCE: OnceLock<Regex> = OnceLock::new();
    ANY_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[a-zA-Z]*[ \t]*\r?\n(.*?)```").expect("Invalid code fence pattern")
    })
}

pub fn extract_sql(response: &str) -> &str {
    for pattern in [sql_fence(), any_fence()] {
        if let Some(body) = pattern.captures(response).and_then(|c| c.get(1)) {
            return body.as_str().trim();
        }
    }
    response.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_sql_fenced_block() {
        let response = "Here you go:\n```sql\nSELECT total FROM orders;\n```\nDone.";
        assert_eq!(extract_sql(response), "SELECT total FROM orders;");
    }

    #[test]
    fn extracts_unlabelled_fence() {
        let response = "```\nSELECT 1;\n```";
        assert_eq!(extract_sql(response), "SELECT 1;");
    }

    #[test]
    fn prefers_sql_fence_over_other_blocks() {
        let response = "```text\nnot this\n```\n```SQL\nSELECT 2;\n```";
        assert_eq!(extract_sql(response), "SELECT 2;");
    }

    #[test]
    fn falls_back_to_trimmed_response() {
        assert_eq!(extract_sql("  SELECT 3;\n"), "SELECT 3;");
    }

    #[test]
    fn response_is_kept_verbatim() {
        let generated = GeneratedSql::new(
            "shop".to_string(),
            "q".to_string(),
            "```sql\nSELECT 1;\n```\n".to_string(),
            vec!["shop:orders".to_string()],
            "prompt".to_string(),
        );

        assert_eq!(generated.response(), "```sql\nSELECT 1;\n```\n");
        assert_eq!(generated.extracted_sql(), "SELECT 1;");
    }
}
