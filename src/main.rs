use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use ln_translator::{
    FileSettingsStore, ProviderRegistry, SettingsStore, TranslationResult, TranslationService,
    settings,
};

#[derive(Parser, Debug)]
#[command(
    name = "ln-translator",
    version,
    about = "Translate a captured Japanese light novel page"
)]
struct Cli {
    /// Page capture to translate (png/jpeg)
    #[arg(short = 'i', long = "image")]
    image: Option<PathBuf>,

    /// Work context for the prompt (character names, terminology)
    #[arg(short = 'c', long = "context")]
    context: Option<String>,

    /// Provider id to use for this run (overrides the stored choice)
    #[arg(short = 'p', long = "provider")]
    provider: Option<String>,

    /// Persist a new active provider id and exit
    #[arg(long = "set-provider")]
    set_provider: Option<String>,

    /// Store the given comma-separated API keys and exit
    #[arg(long = "set-keys")]
    set_keys: Option<String>,

    /// List registered providers and exit
    #[arg(long = "list-providers")]
    list_providers: bool,

    /// Settings file (default: ~/.ln-translator/settings.toml)
    #[arg(short = 's', long = "settings")]
    settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = ln_translator::logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings_path = match cli.settings {
        Some(path) => path,
        None => settings::default_settings_path()
            .ok_or_else(|| anyhow!("HOME is not set; pass --settings"))?,
    };
    let store: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::open(&settings_path)?);

    if let Some(keys) = cli.set_keys {
        let keys: Vec<String> = keys
            .split(',')
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect();
        settings::set_api_keys(store.as_ref(), &keys);
        println!("stored {} API key(s)", keys.len());
        return Ok(());
    }

    if let Some(context) = cli.context {
        store.set(settings::KEY_CONTEXT_PROMPT, &context);
    }

    // The on-device recognizer is not available from the CLI, so only the
    // direct image provider is registered here.
    let registry = ProviderRegistry::with_defaults(store.clone(), None);
    let service = TranslationService::new(store.clone(), registry);

    if let Some(provider_id) = cli.set_provider {
        if !service.set_active_provider(&provider_id) {
            return Err(anyhow!("provider not registered: {}", provider_id));
        }
        println!("active provider set to {}", provider_id);
        return Ok(());
    }

    if cli.list_providers {
        let active = settings::active_provider(store.as_ref());
        for info in service.list_providers() {
            let marker = if info.id == active { "*" } else { " " };
            let configured = if info.configured { "configured" } else { "no key" };
            println!("{} {}\t{}\t[{}]", marker, info.id, info.display_name, configured);
        }
        return Ok(());
    }

    let image_path = cli
        .image
        .ok_or_else(|| anyhow!("--image is required (or use --list-providers)"))?;
    let image = image::open(&image_path)
        .with_context(|| format!("failed to open image: {}", image_path.display()))?;

    if let Some(provider_id) = cli.provider {
        if !service.set_active_provider(&provider_id) {
            return Err(anyhow!("provider not registered: {}", provider_id));
        }
    }

    match service.translate(&image).await {
        TranslationResult::Success { translated_text } => {
            println!("{}", translated_text);
            Ok(())
        }
        TranslationResult::Error(error) => Err(anyhow!("{} ({:?})", error.message, error.kind)),
    }
}
