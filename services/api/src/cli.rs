use crate::demo::{run_demo, DemoArgs};
use crate::infra::load_schema;
use crate::server;
use clap::{Args, Parser, Subcommand};
use matchpoint::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Matchpoint",
    about = "Run the athlete onboarding questionnaire service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Validate and print a questionnaire schema
    Schema(SchemaArgs),
    /// Walk a scripted athlete through the questionnaire and print the profile
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SchemaArgs {
    /// JSON schema file to check instead of the built-in questionnaire
    #[arg(long)]
    pub(crate) path: Option<PathBuf>,
    /// Print the full definitions as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schema(args) => print_schema(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

fn print_schema(args: SchemaArgs) -> Result<(), AppError> {
    let schema = load_schema(args.path.as_deref())?;

    if args.json {
        let rendered = serde_json::to_string_pretty(schema.all_questions())
            .map_err(std::io::Error::from)?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Questionnaire schema ({} questions)", schema.len());
    for (step, question) in schema.all_questions().iter().enumerate() {
        let targets = if question.target_dimensions.is_empty() {
            "context only".to_string()
        } else {
            question
                .target_dimensions
                .iter()
                .map(|dimension| dimension.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {:>2}. [{}] {} ({}) -> {}",
            step + 1,
            question.category,
            question.id,
            question.kind.label(),
            targets
        );
    }

    let dimensions = schema
        .dimensions()
        .into_iter()
        .map(|dimension| dimension.0)
        .collect::<Vec<_>>();
    println!("Dimensions: {}", dimensions.join(", "));
    Ok(())
}
