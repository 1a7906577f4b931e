use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use concierge_core::ai;
use concierge_core::knowledge::GREETING;
use concierge_core::{
    ChatRole, ChatState, ConciergeError, Config, ConversationStore, GeminiClient, IgnoreReason,
    KnowledgeBase, OllamaClient, OpenAIClient, Provider, StreamingController, SubmitOutcome,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "concierge", version)]
#[command(about = "Kenmark ITan AI concierge - chat with streaming replies in your terminal")]
struct Cli {
    /// AI provider: gemini, openai or ollama
    #[arg(short, long, env = "CONCIERGE_PROVIDER")]
    provider: Option<String>,
    /// Model name (defaults to the provider's default)
    #[arg(short, long)]
    model: Option<String>,
    /// JSON knowledge base used as prompt context
    #[arg(long)]
    knowledge: Option<PathBuf>,
    /// Config file (defaults to <config dir>/kenmark-concierge/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log file (defaults to <cache dir>/kenmark-concierge/concierge.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Write the chosen provider and model back to the config file
    #[arg(long)]
    save: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and stream the reply to stdout
    Ask {
        /// Your question
        prompt: String,
    },
    /// List models for the selected provider
    Models,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_path = logging::init_tracing(cli.log_file.clone())?;
    tracing::info!(log = %log_path.display(), "concierge starting");

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(model) = &cli.model {
        config.default_model = Some(model.clone());
    }

    let provider = match &cli.provider {
        Some(name) => name.parse::<Provider>()?,
        None => config.provider()?,
    };

    if cli.save {
        config.provider = Some(provider.as_str().to_string());
        match &cli.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        tracing::info!(%provider, model = %config.model_for(provider), "saved config");
    }

    match &cli.command {
        Some(Commands::Models) => list_models(&config, provider).await,
        Some(Commands::Ask { prompt }) => {
            let knowledge = load_knowledge(&cli, &config)?;
            let controller = build_controller(&config, provider, &knowledge, ConversationStore::new());
            ask(&controller, prompt).await
        }
        None => {
            let knowledge = load_knowledge(&cli, &config)?;
            let store = ConversationStore::with_greeting(GREETING);
            let controller = build_controller(&config, provider, &knowledge, store);
            run_tui(controller, knowledge).await
        }
    }
}

fn load_knowledge(cli: &Cli, config: &Config) -> Result<KnowledgeBase> {
    match cli.knowledge.as_ref().or(config.knowledge_path.as_ref()) {
        Some(path) => KnowledgeBase::load(path)
            .map_err(|e| anyhow::anyhow!("Could not load knowledge base {}: {}", path.display(), e)),
        None => Ok(KnowledgeBase::kenmark()),
    }
}

/// A missing credential does not stop the app; the controller comes up
/// unconfigured and shows the configuration error instead.
fn build_controller(
    config: &Config,
    provider: Provider,
    knowledge: &KnowledgeBase,
    store: ConversationStore,
) -> StreamingController {
    match ai::connect(config, provider, Some(knowledge.system_instruction())) {
        Ok(completion) => StreamingController::new(store, completion),
        Err(ConciergeError::Config(reason)) => StreamingController::unconfigured(store, reason),
        Err(e) => StreamingController::unconfigured(store, e.to_string()),
    }
}

async fn run_tui(controller: StreamingController, knowledge: KnowledgeBase) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(Arc::new(controller), knowledge);
    let mut events = EventHandler::new(app.subscribe());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("concierge exiting");
    result
}

/// Headless mode: same controller, fragments printed as they arrive
async fn ask(controller: &StreamingController, prompt: &str) -> Result<()> {
    let mut rx = controller.store().subscribe();
    let baseline = controller.store().snapshot().messages.len();
    let mut printed = 0;

    let submit = controller.submit(prompt);
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Ok(()) = rx.changed() => {
                let state = rx.borrow_and_update().clone();
                print_new_text(&state, baseline, &mut printed)?;
            }
        }
    };
    print_new_text(&controller.store().snapshot(), baseline, &mut printed)?;

    match outcome {
        SubmitOutcome::Completed { .. } => {
            println!();
            Ok(())
        }
        SubmitOutcome::Failed { .. } | SubmitOutcome::Unconfigured => {
            if printed > 0 {
                println!();
            }
            let error = controller
                .store()
                .snapshot()
                .error
                .unwrap_or_else(|| "An unexpected error occurred.".to_string());
            bail!(error)
        }
        SubmitOutcome::Ignored(IgnoreReason::EmptyPrompt) => bail!("Prompt is empty"),
        SubmitOutcome::Ignored(IgnoreReason::Busy) => bail!("A request is already in flight"),
    }
}

/// Write the part of the assistant reply not printed yet
fn print_new_text(state: &ChatState, baseline: usize, printed: &mut usize) -> Result<()> {
    let Some(reply) = state
        .messages
        .get(baseline + 1)
        .filter(|m| m.role == ChatRole::Assistant)
    else {
        return Ok(());
    };

    if let Some(new_text) = reply.content.get(*printed..) {
        if !new_text.is_empty() {
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "{}", new_text)?;
            stdout.flush()?;
            *printed = reply.content.len();
        }
    }
    Ok(())
}

async fn list_models(config: &Config, provider: Provider) -> Result<()> {
    println!("{} models:", provider.display_name());

    let models = match provider {
        Provider::Gemini => GeminiClient::list_models(),
        Provider::OpenAI => OpenAIClient::list_models(),
        Provider::Ollama => match OllamaClient::new(config.ollama_url()).list_models().await {
            Ok(models) => models,
            Err(e) => {
                println!("Error connecting to Ollama: {}", e);
                println!("Make sure Ollama is running: ollama serve");
                return Ok(());
            }
        },
    };

    if models.is_empty() {
        println!("No models found. Pull a model with: ollama pull llama3.2");
    }
    if provider.requires_api_key() && config.api_key(provider).is_none() {
        println!(
            "No API key configured. Set {} before chatting.",
            provider.api_key_env().join(" or ")
        );
    }
    let selected = config.model_for(provider);
    for model in models {
        let marker = if model == selected { "*" } else { " " };
        println!(" {} {}", marker, model);
    }

    Ok(())
}
