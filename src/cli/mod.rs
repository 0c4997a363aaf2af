use clap::{Subcommand, ValueEnum};

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a schema file (SQL DDL or structured JSON) and build its index
    Ingest {
        path: String,

        /// Schema name; derived from the definition when omitted
        #[arg(short, long)]
        name: Option<String>,

        /// Rebuild the index even when the definition is unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// Generate SQL for a question against an ingested schema
    Ask {
        schema: String,

        question: String,

        /// Number of schema fragments to put in the prompt
        #[arg(short, long, default_value = "5")]
        k: usize,

        /// Also print the rendered prompt
        #[arg(long)]
        show_prompt: bool,

        /// Print the response as the model generates it
        #[arg(long)]
        stream: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the schema fragments closest to a question, without generating SQL
    Search {
        schema: String,

        question: String,

        #[arg(short, long, default_value = "5")]
        k: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List ingested schemas
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show whether a schema's index matches its definition
    Status { schema: String },

    /// Print a schema's stored definition
    Show {
        schema: String,

        /// Render structured schemas as DDL
        #[arg(long, conflicts_with = "structured")]
        ddl: bool,

        /// Convert DDL schemas to the structured JSON format
        #[arg(long)]
        structured: bool,
    },

    /// Delete a schema and its index
    Delete { schema: String },
}
