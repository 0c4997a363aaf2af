use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use sqlrag::{
    Commands, Container, ContainerConfig, DistanceMetric, EmbeddingProvider, LlmProvider, Router,
    StalePolicy,
};

#[derive(Parser)]
#[command(name = "sqlrag")]
#[command(author, version, about = "Retrieval-augmented SQL generation over ingested schemas", long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, default_value = "~/.sqlrag")]
    data_dir: String,

    /// Keep schemas and vectors in memory for this run only
    #[arg(long, global = true)]
    memory_storage: bool,

    /// local, openai or mock
    #[arg(long, global = true, default_value = "local")]
    embedding_provider: EmbeddingProvider,

    #[arg(long, global = true)]
    embedding_model: Option<String>,

    /// anthropic, openai, groq or mock
    #[arg(long, global = true, default_value = "anthropic")]
    llm_provider: LlmProvider,

    #[arg(long, global = true)]
    llm_model: Option<String>,

    /// Prompt template file with {question} and {retrieved_fragments} placeholders
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// What to do with a stale index: reject or reingest
    #[arg(long, global = true, default_value = "reject")]
    stale_policy: StalePolicy,

    /// cosine or l2
    #[arg(long, global = true, default_value = "cosine")]
    metric: DistanceMetric,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = expand_tilde(&cli.data_dir);
    if !cli.memory_storage {
        std::fs::create_dir_all(&data_dir)?;
    }

    let config = ContainerConfig {
        data_dir,
        memory_storage: cli.memory_storage,
        embedding_provider: cli.embedding_provider,
        embedding_model: cli.embedding_model,
        llm_provider: cli.llm_provider,
        llm_model: cli.llm_model,
        template: cli.template,
        stale_policy: cli.stale_policy,
        metric: cli.metric,
    };

    let container = Container::new(config).await?;
    let router = Router::new(&container);

    let output = router.route(cli.command).await?;
    println!("{}", output);

    Ok(())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn ask_takes_schema_question_and_k() {
        let cli = Cli::try_parse_from(["sqlrag", "ask", "shop", "total orders per customer", "-k", "3"])
            .unwrap();
        match cli.command {
            Commands::Ask { schema, question, k, .. } => {
                assert_eq!(schema, "shop");
                assert_eq!(question, "total orders per customer");
                assert_eq!(k, 3);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sqlrag",
            "list",
            "--memory-storage",
            "--embedding-provider",
            "mock",
            "--stale-policy",
            "reingest",
            "--metric",
            "l2",
        ])
        .unwrap();
        assert!(cli.memory_storage);
        assert_eq!(cli.embedding_provider, EmbeddingProvider::Mock);
        assert_eq!(cli.stale_policy, StalePolicy::Reingest);
        assert_eq!(cli.metric, DistanceMetric::L2);
    }

    #[test]
    fn ask_stream_and_show_structured_flags() {
        let cli = Cli::try_parse_from(["sqlrag", "ask", "shop", "totals", "--stream"]).unwrap();
        assert!(matches!(cli.command, Commands::Ask { stream: true, .. }));

        let cli = Cli::try_parse_from(["sqlrag", "show", "shop", "--structured"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Show {
                structured: true,
                ddl: false,
                ..
            }
        ));

        assert!(Cli::try_parse_from(["sqlrag", "show", "shop", "--structured", "--ddl"]).is_err());
    }

    #[test]
    fn template_help_names_the_prompt_placeholders() {
        use clap::CommandFactory;

        let command = Cli::command();
        let template = command
            .get_arguments()
            .find(|arg| arg.get_id() == "template")
            .unwrap();
        let help = template.get_help().unwrap().to_string();

        assert!(help.contains("{question}"));
        assert!(help.contains("{retrieved_fragments}"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let res = Cli::try_parse_from(["sqlrag", "--llm-provider", "cohere", "list"]);
        assert!(res.is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_tilde("~/.sqlrag"), "/home/tester/.sqlrag");
        assert_eq!(expand_tilde("/var/lib/sqlrag"), "/var/lib/sqlrag");
    }
}
