//! Execution of a single CLI command against one scope.

use scopestore::{ScopedStorage, StorageConfig, StoragePath};
use serde_json::json;

use crate::{
    backend::{backend_label, open_container},
    cli::{Cli, Commands},
    output::{OutputFormat, print_event, print_value},
};

/// Run the command given on the command line
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let format = OutputFormat::from(cli.format);
    let path: StoragePath = cli.path.parse()?;

    let opened = open_container(&cli).await?;
    let storage = opened.storage(StorageConfig {
        change_capacity: cli.change_capacity,
    });
    storage.attach().await?;

    let scope = storage.scope_path(path);
    let default = cli.default.clone();
    scope.initialize(move || default.clone()).await?;
    tracing::debug!(
        backend = backend_label(&cli),
        path = %scope.path(),
        "Scope initialized"
    );

    let mut changes = scope.changes();
    let result = execute(&scope, &cli.command, format).await;

    if cli.events {
        while let Some(change) = changes.try_recv() {
            print_event(&change)?;
        }
    }

    scope.destroy();
    storage.detach().await?;
    opened.persist().await?;
    result
}

async fn execute(
    scope: &ScopedStorage,
    command: &Commands,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Get { key } => match scope.get_item(key).await? {
            Some(value) => print_value(&value, format)?,
            None => match format {
                OutputFormat::Human => println!("(not set)"),
                OutputFormat::Json => println!("null"),
            },
        },
        Commands::Set { key, value } => {
            scope.set_item(key, value.clone()).await?;
            report(format, "set", key)?;
        }
        Commands::Remove { key } => {
            scope.remove_item(key).await?;
            report(format, "removed", key)?;
        }
        Commands::Clear => {
            scope.clear().await?;
            report(format, "cleared", &scope.path().to_string())?;
        }
        Commands::Has { key } => {
            let present = scope.has_item(key).await?;
            match format {
                OutputFormat::Human => println!("{present}"),
                OutputFormat::Json => println!("{}", json!({ "key": key, "present": present })),
            }
        }
        Commands::All => print_value(&scope.get_all().await?, format)?,
    }
    Ok(())
}

fn report(format: OutputFormat, action: &str, target: &str) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => println!("{action} {target}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(&json!({ action: target }))?),
    }
    Ok(())
}
