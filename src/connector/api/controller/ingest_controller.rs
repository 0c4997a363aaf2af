use anyhow::{Context, Result};

use crate::IngestOutcome;

use super::super::Container;

pub struct IngestController<'a> {
    container: &'a Container,
}

impl<'a> IngestController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn ingest(&self, path: String, name: Option<String>, force: bool) -> Result<String> {
        let definition = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read schema file {}", path))?;

        let use_case = self.container.ingest_use_case();
        let outcome = match name {
            Some(name) => use_case.execute(&name, &definition, force).await?,
            None => use_case.execute_auto(&definition, force).await?,
        };

        Ok(self.format_ingest_result(&outcome))
    }

    fn format_ingest_result(&self, outcome: &IngestOutcome) -> String {
        let record = outcome.record();
        let mut output = if outcome.rebuilt() {
            format!(
                "Ingested schema '{}' ({}, {} fragments, {})",
                record.name(),
                record.format(),
                record.fragment_count(),
                record.embedding_model().unwrap_or("unknown model")
            )
        } else {
            format!(
                "Schema '{}' is unchanged; index is up to date ({} fragments). Use --force to rebuild.",
                record.name(),
                record.fragment_count()
            )
        };

        for id in outcome.fragment_ids() {
            output.push_str(&format!("\n  {}", id));
        }

        output
    }
}
