use anyhow::Result;

use crate::Commands;

use super::container::Container;
use super::controller::{AskController, IngestController, SchemaController};

pub struct Router<'a> {
    ingest_controller: IngestController<'a>,
    ask_controller: AskController<'a>,
    schema_controller: SchemaController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            ingest_controller: IngestController::new(container),
            ask_controller: AskController::new(container),
            schema_controller: SchemaController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Ingest { path, name, force } => {
                self.ingest_controller.ingest(path, name, force).await
            }
            Commands::Ask {
                schema,
                question,
                k,
                show_prompt,
                stream,
                format,
            } => {
                self.ask_controller
                    .ask(schema, question, k, show_prompt, stream, format)
                    .await
            }
            Commands::Search {
                schema,
                question,
                k,
                format,
            } => self.ask_controller.search(schema, question, k, format).await,
            Commands::List { format } => self.schema_controller.list(format).await,
            Commands::Status { schema } => self.schema_controller.status(schema).await,
            Commands::Show {
                schema,
                ddl,
                structured,
            } => self.schema_controller.show(schema, ddl, structured).await,
            Commands::Delete { schema } => self.schema_controller.delete(schema).await,
        }
    }
}
