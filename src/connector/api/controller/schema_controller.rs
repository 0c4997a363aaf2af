use anyhow::Result;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::{SchemaInfo, SchemaRecord};

use super::super::Container;

pub struct SchemaController<'a> {
    container: &'a Container,
}

impl<'a> SchemaController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn list(&self, format: OutputFormat) -> Result<String> {
        let records = self.container.list_use_case().execute().await?;

        Ok(match format {
            OutputFormat::Json => serde_json::to_string_pretty(
                &records
                    .iter()
                    .map(|r| {
                        json!({
                            "name": r.name(),
                            "format": r.format().as_str(),
                            "fresh": r.is_fresh(),
                            "fragment_count": r.fragment_count(),
                            "embedding_model": r.embedding_model(),
                            "dimensions": r.dimensions(),
                            "updated_at": r.updated_at(),
                        })
                    })
                    .collect::<Vec<_>>(),
            )?,
            OutputFormat::Text => self.format_schema_list(&records),
        })
    }

    pub async fn status(&self, schema: String) -> Result<String> {
        let info = self.container.list_use_case().info(&schema).await?;
        Ok(self.format_info(&info))
    }

    pub async fn show(&self, schema: String, ddl: bool, structured: bool) -> Result<String> {
        let use_case = self.container.list_use_case();
        if structured {
            let converted = use_case.definition_as_structured(&schema).await?;
            return Ok(serde_json::to_string_pretty(&converted)?);
        }
        if ddl {
            return Ok(use_case.definition_as_ddl(&schema).await?);
        }

        let record = use_case
            .get(&schema)
            .await?
            .ok_or_else(|| crate::DomainError::schema_not_found(&schema))?;
        Ok(record.definition().to_string())
    }

    pub async fn delete(&self, schema: String) -> Result<String> {
        let removed = self.container.delete_use_case().execute(&schema).await?;
        Ok(format!(
            "Schema '{}' deleted ({} index entries removed).",
            schema, removed
        ))
    }

    fn format_schema_list(&self, records: &[SchemaRecord]) -> String {
        if records.is_empty() {
            return "No schemas ingested.".to_string();
        }

        let mut output = "Ingested schemas:\n\n".to_string();
        for record in records {
            output.push_str(&format!("  {}\n", record.summary()));
            if let Some(model) = record.embedding_model() {
                output.push_str(&format!(
                    "    Model: {} ({} dimensions)\n",
                    model,
                    record.dimensions().unwrap_or(0)
                ));
            }
        }

        output
    }

    fn format_info(&self, info: &SchemaInfo) -> String {
        let mut output = format!(
            "Schema:     {}\nFormat:     {}\nStatus:     {}\nFragments:  {}\n",
            info.name,
            info.format,
            if info.fresh { "fresh" } else { "stale (re-ingest required)" },
            info.fragment_count
        );
        if let Some(model) = &info.embedding_model {
            output.push_str(&format!(
                "Model:      {} ({} dimensions)\n",
                model,
                info.dimensions.unwrap_or(0)
            ));
        }
        if let Some(language) = &info.sql_language {
            output.push_str(&format!("Language:   {}\n", language));
        }
        if let Some(description) = &info.description {
            output.push_str(&format!("About:      {}\n", description));
        }
        output.push_str(&format!("Objects:    {}\n", info.tables.join(", ")));
        output.push_str(&format!("Data Dir:   {}", self.storage_label()));

        output
    }

    fn storage_label(&self) -> String {
        if self.container.memory_storage() {
            "(in memory)".to_string()
        } else {
            self.container.data_dir().to_string()
        }
    }
}
