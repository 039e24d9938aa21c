use clap::{command, Parser};
use sdui::{
    action::ActionDescriptor,
    config::{self, SduiConfig},
    host::{console::ConsoleHost, memory::MemoryStore},
    DynamicRenderer, Error, ExecutionContext, HostServices, RenderOutput, ScreenConfig,
    ScreenStatus,
};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Preview a backend-driven screen in the terminal.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Screen JSON: `{components, loadingState?, errorState?}`, a node, or an array of nodes
    #[arg(short, long)]
    screen: PathBuf,

    /// Context JSON the screen is rendered against
    #[arg(long)]
    context: Option<PathBuf>,

    /// Action JSON dispatched after rendering
    #[arg(short, long)]
    action: Option<PathBuf>,

    /// Key of a rendered element whose onPress handler is fired after rendering
    #[arg(short, long)]
    press: Option<String>,

    /// Path to config file
    #[arg(short, long, default_value = "sdui.json")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_screen(value: Value) -> Result<ScreenConfig, Error> {
    if value.get("components").is_some() {
        return Ok(serde_json::from_value(value)?);
    }
    Ok(ScreenConfig::new(sdui::ComponentNode::parse_tree(value)?))
}

async fn run(cli: &Cli) -> Result<(), Error> {
    let config = if cli.config.exists() {
        let config = SduiConfig::from_file(&cli.config)?;
        config.validate()?;
        config
    } else {
        SduiConfig::default()
    };
    debug!("config: {:?}", config);

    let screen = load_screen(config::from_file(&cli.screen)?)?;
    let context = match &cli.context {
        Some(path) => ExecutionContext::from_value(config::from_file(path)?),
        None => ExecutionContext::new(),
    };

    let console = Arc::new(ConsoleHost);
    let host = HostServices::new()
        .with_navigator(console.clone())
        .with_state(console.clone())
        .with_alerts(console.clone())
        .with_urls(console.clone())
        .with_share(console.clone())
        .with_vibrator(console.clone())
        .with_analytics(console)
        .with_storage(Arc::new(MemoryStore::new()));

    let renderer = DynamicRenderer::builder()
        .config(config)
        .context(context)
        .host(host)
        .on_performance_metric(|metric| {
            info!(
                "{} took {:.2}ms (success: {})",
                metric.action_type, metric.duration_ms, metric.success
            )
        })
        .build();

    let output = renderer.render_screen(&screen, &ScreenStatus::Ready);
    if let RenderOutput::Fallback(_) = &output {
        println!("Screen failed to render; showing fallback.");
    }
    for element in output.elements() {
        print!("{}", element.outline());
    }

    if let Some(key) = &cli.press {
        let target = output
            .elements()
            .iter()
            .find_map(|element| element.find_by_key(key))
            .ok_or_else(|| Error::internal(format!("No rendered element with key '{}'", key)))?;
        if !target.trigger("onPress", None).await? {
            println!("Element '{}' has no onPress handler.", key);
        }
    }

    if let Some(path) = &cli.action {
        let action: ActionDescriptor = config::from_file(path)?;
        renderer.execute_action(action, None).await?;
    }

    println!("{}", serde_json::to_string_pretty(&renderer.metrics())?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
