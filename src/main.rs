use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use codelore_core::Orchestrator;
use codelore_core::config::Config;
use codelore_core::outline::{repo_outline, summarize_readme};
use codelore_llm::openai::OpenAiProvider;
use codelore_llm::{LlmProvider, Message, Role};

/// Ask questions about a source code repository.
#[derive(Debug, Parser)]
#[command(name = "codelore", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "codelore.toml")]
    config: PathBuf,

    /// Repository root to answer questions about (overrides config).
    #[arg(long)]
    repo: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(repo) = args.repo {
        config.repo.root = repo;
    }

    let api_key = std::env::var("CODELORE_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .context("CODELORE_API_KEY or OPENAI_API_KEY must be set")?;

    let provider = Arc::new(OpenAiProvider::new(
        api_key,
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        config.llm.max_tokens,
        Some(config.llm.embedding_model.clone()),
    ));
    let orchestrator = Orchestrator::new(Arc::clone(&provider), config.retrieval.clone());

    let readme_summary = summarize_readme(provider.as_ref(), &config.repo.root).await;
    let outline = repo_outline(&config.repo.root, config.retrieval.outline_chars);
    let system_prompt = build_system_prompt(readme_summary.as_deref(), &outline);

    println!("codelore v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "answering questions about {} (ctrl-d to quit)",
        config.repo.root.display()
    );

    chat_loop(
        provider.as_ref(),
        &orchestrator,
        &config,
        &system_prompt,
    )
    .await
}

fn build_system_prompt(readme_summary: Option<&str>, outline: &str) -> String {
    let mut prompt = String::from(
        "You are an expert programmer and teacher of a code repository. \
         You will be asked to explain code in the repository to a computer \
         science student. You may be given related code snippets for the \
         question, such as call sites of the relevant functions. Think through \
         the explanation step by step and answer so the student can follow. \
         Answer from your knowledge and from the provided snippets.\n\n",
    );
    if let Some(summary) = readme_summary {
        prompt.push_str("The README.md file is summarized as follows:\n");
        prompt.push_str(summary);
        prompt.push_str("\n\n");
    }
    if !outline.is_empty() {
        prompt.push_str("The repository structure is as follows:\n");
        prompt.push_str(outline);
    }
    prompt
}

async fn chat_loop<P: LlmProvider>(
    provider: &P,
    orchestrator: &Orchestrator<P>,
    config: &Config,
    system_prompt: &str,
) -> anyhow::Result<()> {
    let mut history = vec![Message::new(Role::System, system_prompt)];
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = stdin.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal");
                break;
            }
        };
        let Some(question) = line else {
            break;
        };
        let question = question.trim();
        if question.is_empty() {
            continue;
        }

        let augmented = orchestrator
            .augment(question, &config.repo.root, &config.repo.cache_dir)
            .await;
        history.push(Message::new(Role::User, augmented));

        match provider.chat(&history).await {
            Ok(answer) => {
                println!("{answer}\n");
                history.push(Message::new(Role::Assistant, answer));
            }
            Err(e) => {
                // Drop the failed turn so the next one starts clean.
                history.pop();
                tracing::error!("chat request failed: {e}");
                eprintln!("error: {e}");
            }
        }
    }

    Ok(())
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
