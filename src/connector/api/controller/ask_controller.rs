use std::io::Write;

use anyhow::Result;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::{FragmentMatch, GeneratedSql};

use super::super::Container;

pub struct AskController<'a> {
    container: &'a Container,
}

impl<'a> AskController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn ask(
        &self,
        schema: String,
        question: String,
        k: usize,
        show_prompt: bool,
        stream: bool,
        format: OutputFormat,
    ) -> Result<String> {
        if stream && format == OutputFormat::Text {
            let mut stdout = std::io::stdout();
            return self
                .ask_streaming(schema, question, k, show_prompt, &mut stdout)
                .await;
        }

        let use_case = self.container.generate_use_case();
        let generated = if stream {
            use_case
                .execute_streaming(&schema, &question, k, |_| Ok(()))
                .await?
        } else {
            use_case.execute(&schema, &question, k).await?
        };

        Ok(match format {
            OutputFormat::Json => {
                let mut value = json!({
                    "schema": generated.schema_name(),
                    "question": generated.question(),
                    "fragment_ids": generated.fragment_ids(),
                    "sql": generated.extracted_sql(),
                    "response": generated.response(),
                });
                if show_prompt {
                    value["prompt"] = json!(generated.prompt());
                }
                serde_json::to_string_pretty(&value)?
            }
            OutputFormat::Text => self.format_generated(&generated, show_prompt),
        })
    }

    /// Writes the response to `out` as it is generated, then returns the
    /// context summary that follows it.
    pub async fn ask_streaming<W: Write>(
        &self,
        schema: String,
        question: String,
        k: usize,
        show_prompt: bool,
        out: &mut W,
    ) -> Result<String> {
        let generated = self
            .container
            .generate_use_case()
            .execute_streaming(&schema, &question, k, |chunk| {
                out.write_all(chunk.as_bytes())?;
                out.flush()?;
                Ok(())
            })
            .await?;
        writeln!(out)?;

        let mut output = format!(
            "\nContext fragments: {}",
            generated.fragment_ids().join(", ")
        );
        if show_prompt {
            output.push_str("\n\nPrompt:\n");
            output.push_str(generated.prompt());
        }
        Ok(output)
    }

    pub async fn search(
        &self,
        schema: String,
        question: String,
        k: usize,
        format: OutputFormat,
    ) -> Result<String> {
        let use_case = self.container.retrieve_use_case();
        let matches = use_case.execute(&schema, &question, k).await?;

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(
                &matches
                    .iter()
                    .map(|m| {
                        json!({
                            "fragment_id": m.fragment_id(),
                            "object_name": m.fragment().object_name(),
                            "kind": m.fragment().kind().as_str(),
                            "score": m.score(),
                            "metric": m.metric().as_str(),
                            "content": m.content(),
                        })
                    })
                    .collect::<Vec<_>>(),
            )?,
            OutputFormat::Text => self.format_matches(&matches),
        })
    }

    fn format_generated(&self, generated: &GeneratedSql, show_prompt: bool) -> String {
        let mut output = String::new();

        if show_prompt {
            output.push_str("Prompt:\n");
            output.push_str(generated.prompt());
            output.push_str("\n\n");
        }

        output.push_str(&format!(
            "Context fragments: {}\n\n",
            generated.fragment_ids().join(", ")
        ));
        output.push_str(generated.response().trim_end());

        output
    }

    fn format_matches(&self, matches: &[FragmentMatch]) -> String {
        if matches.is_empty() {
            return "No fragments found.".to_string();
        }

        let mut output = format!("Found {} fragments:\n\n", matches.len());

        for (i, m) in matches.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, m.display_line()));

            let preview: String = m
                .content()
                .lines()
                .take(10)
                .map(|l| format!("   | {}", l))
                .collect::<Vec<_>>()
                .join("\n");
            output.push_str(&preview);
            output.push_str("\n\n");
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContainerConfig, EmbeddingProvider, LlmProvider};

    #[tokio::test]
    async fn streamed_answer_is_written_before_the_summary() {
        let container = Container::new(ContainerConfig {
            memory_storage: true,
            embedding_provider: EmbeddingProvider::Mock,
            llm_provider: LlmProvider::Mock,
            ..Default::default()
        })
        .await
        .unwrap();
        container
            .ingest_use_case()
            .execute("shop", "CREATE TABLE orders (id INT, total FLOAT);", false)
            .await
            .unwrap();

        let mut out = Vec::new();
        let summary = AskController::new(&container)
            .ask_streaming("shop".to_string(), "order totals".to_string(), 1, false, &mut out)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "```sql\nSELECT 1;\n```\n");
        assert_eq!(summary, "\nContext fragments: shop:orders");
    }
}
