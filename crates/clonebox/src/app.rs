//! Wiring of registries, byte store and services.

use crate::{CloneboxConfig, FileUploader, LinkShortener};
use clonebox_core::{IdentifierResolver, Sha256Resolver};
use clonebox_database::{FileRegistry, InMemoryRegistry, LinkRegistry};
use clonebox_error::CloneboxResult;
use clonebox_storage::{ContentStore, FileSystemStorage, InMemoryStorage};
use std::sync::Arc;

/// Link shortener and file uploader sharing one configuration.
#[derive(Clone)]
pub struct Clonebox {
    links: LinkShortener,
    files: FileUploader,
    config: CloneboxConfig,
}

impl Clonebox {
    /// Assemble from explicit backends.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn from_parts(
        config: CloneboxConfig,
        link_registry: Arc<dyn LinkRegistry>,
        file_registry: Arc<dyn FileRegistry>,
        store: Arc<dyn ContentStore>,
    ) -> CloneboxResult<Self> {
        config.validate()?;
        let resolver: Arc<dyn IdentifierResolver> =
            Arc::new(Sha256Resolver::new(config.links.identifier_bytes)?);

        let links = LinkShortener::new(link_registry, resolver)
            .with_max_attempts(config.links.max_attempts);
        let files = FileUploader::new(file_registry, store)
            .with_max_upload_bytes(config.files.max_upload_bytes);

        Ok(Self {
            links,
            files,
            config,
        })
    }

    /// In-memory registry and store, for tests and demos.
    pub fn in_memory(config: CloneboxConfig) -> CloneboxResult<Self> {
        let registry = Arc::new(InMemoryRegistry::new());
        Self::from_parts(
            config,
            registry.clone(),
            registry,
            Arc::new(InMemoryStorage::new()),
        )
    }

    /// In-memory registry over filesystem storage at `files.storage_root`.
    pub fn with_filesystem(config: CloneboxConfig) -> CloneboxResult<Self> {
        let registry = Arc::new(InMemoryRegistry::new());
        let store = Arc::new(FileSystemStorage::new(config.files.storage_root.clone())?);
        Self::from_parts(config, registry.clone(), registry, store)
    }

    /// PostgreSQL registry over filesystem storage.
    ///
    /// Migrations are not applied here; run [`crate::migrate`] first.
    #[cfg(feature = "database")]
    pub fn connect(config: CloneboxConfig) -> CloneboxResult<Self> {
        let pool = clonebox_database::establish_pool(
            &config.database.resolved_url()?,
            config.database.max_connections,
        )?;
        let registry = Arc::new(clonebox_database::PostgresRegistry::new(pool));
        let store = Arc::new(FileSystemStorage::new(config.files.storage_root.clone())?);
        Self::from_parts(config, registry.clone(), registry, store)
    }

    /// Link service.
    pub fn links(&self) -> &LinkShortener {
        &self.links
    }

    /// Upload service.
    pub fn files(&self) -> &FileUploader {
        &self.files
    }

    /// Effective configuration.
    pub fn config(&self) -> &CloneboxConfig {
        &self.config
    }
}

/// Apply pending registry migrations.
#[cfg(feature = "database")]
pub fn migrate(config: &CloneboxConfig) -> CloneboxResult<()> {
    let pool = clonebox_database::establish_pool(&config.database.resolved_url()?, 1)?;
    clonebox_database::run_migrations(&pool)?;
    Ok(())
}
