//! Container creation and persistence for the CLI.

use std::{path::PathBuf, sync::Arc};

use scopestore::{Storage, StorageConfig, container::InMemory};

use crate::cli::{Backend, Cli};

/// A container opened for one CLI run.
pub enum OpenedContainer {
    /// In-memory container that is written back to `path` after the command.
    InMemory {
        container: Arc<InMemory>,
        path: PathBuf,
    },
    #[cfg(feature = "sqlite")]
    Sqlite(Arc<scopestore::container::Sqlite>),
}

impl OpenedContainer {
    /// Create a storage handle over this container.
    pub fn storage(&self, config: StorageConfig) -> Storage {
        let storage = match self {
            OpenedContainer::InMemory { container, .. } => Storage::from_arc(container.clone()),
            #[cfg(feature = "sqlite")]
            OpenedContainer::Sqlite(container) => Storage::from_arc(container.clone()),
        };
        storage.with_config(config)
    }

    /// Persist the container state, if the backend needs an explicit save.
    pub async fn persist(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            OpenedContainer::InMemory { container, path } => {
                container.save_to_file(path).await?;
                tracing::info!("Saved data to {}", path.display());
            }
            #[cfg(feature = "sqlite")]
            OpenedContainer::Sqlite(_) => {}
        }
        Ok(())
    }
}

/// Human-readable label for the configured backend.
pub fn backend_label(cli: &Cli) -> &'static str {
    match cli.backend {
        Backend::Inmemory => "inmemory",
        Backend::Sqlite => "sqlite",
    }
}

/// Open the appropriate container based on configuration
pub async fn open_container(cli: &Cli) -> Result<OpenedContainer, Box<dyn std::error::Error>> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    match cli.backend {
        Backend::Inmemory => {
            let json_path = data_dir.join("scopestore.json");
            tracing::info!(
                "Using in-memory container with persistence at {}",
                json_path.display()
            );
            let container = InMemory::load_from_file(&json_path).await?;
            Ok(OpenedContainer::InMemory {
                container: Arc::new(container),
                path: json_path,
            })
        }
        Backend::Sqlite => {
            #[cfg(feature = "sqlite")]
            {
                let db_path = data_dir.join("scopestore.db");
                tracing::info!("Using SQLite container at {}", db_path.display());
                let container = scopestore::container::Sqlite::open(&db_path).await?;
                Ok(OpenedContainer::Sqlite(Arc::new(container)))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                Err("SQLite backend requires building with the `sqlite` feature".into())
            }
        }
    }
}
