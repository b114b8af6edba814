use anyhow::Context;
use clap::{Parser, Subcommand};
use gpupdate_core::{Composer, CoreConfig, EnvValues, UpdateRecordRequest};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gpupdate")]
#[command(about = "Compose ITK3 update-record messages offline")]
struct Cli {
    /// Sender MESH mailbox (overrides SENDER_MESH_MAILBOX_ID)
    #[arg(long, global = true)]
    mailbox: Option<String>,
    /// Fallback sender ODS code (overrides DEFAULT_SENDER_ODS)
    #[arg(long, global = true)]
    sender_ods: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a message bundle from a JSON request file
    Compose {
        /// Request file
        file: PathBuf,
        /// Write the XML here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a JSON request file without composing it
    Validate {
        /// Request file
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gpupdate=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None => {
            println!("Use 'gpupdate --help' for commands");
            return Ok(());
        }
    };

    let composer = Composer::new(config(cli.mailbox, cli.sender_ods)?);

    match command {
        Commands::Compose { file, out } => {
            let message = composer
                .compose_json(&read(&file)?)
                .with_context(|| format!("cannot compose {}", file.display()))?;
            let xml = message.to_xml()?;

            match out {
                Some(path) => {
                    std::fs::write(&path, &xml)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    println!(
                        "Wrote message {} to {}",
                        message.message_id(),
                        path.display()
                    );
                }
                None => {
                    use std::io::Write;
                    std::io::stdout().write_all(&xml)?;
                }
            }
        }
        Commands::Validate { file } => {
            let req = UpdateRecordRequest::from_json_slice(&read(&file)?)
                .with_context(|| format!("cannot parse {}", file.display()))?;
            let required = composer
                .validate(&req)
                .with_context(|| format!("{} is not a valid request", file.display()))?;
            println!(
                "OK: patient {}, author {}",
                required.nhs_number, required.author_name
            );
        }
    }

    Ok(())
}

fn config(mailbox: Option<String>, sender_ods: Option<String>) -> anyhow::Result<CoreConfig> {
    let env = |name: &str| std::env::var(name).ok();
    let config = CoreConfig::from_env_values(EnvValues {
        sender_mesh_mailbox: mailbox.or_else(|| env("SENDER_MESH_MAILBOX_ID")),
        default_sender_ods: sender_ods.or_else(|| env("DEFAULT_SENDER_ODS")),
        default_business_ack_requested: env("DEFAULT_BUSINESS_ACK_REQUESTED"),
        default_infrastructure_ack_requested: env("DEFAULT_INFRASTRUCTURE_ACK_REQUESTED"),
        default_recipient_type: env("DEFAULT_RECIPIENT_TYPE"),
    })?;
    Ok(config)
}

fn read(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))
}
