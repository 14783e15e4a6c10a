//! CLI Tooling
//!
//! Command-line interface for the catalog: serve the HTTP API, or list and
//! show products straight from the snapshot file.

use crate::asset::asset_locator;
use crate::catalog::CatalogService;
use crate::config::{CatalogConfig, ConfigLoader};
use crate::error::ApiError;
use crate::store::{ListQuery, Product, ProductRecordStore};
use crate::types::ProductId;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Catalog CLI - product catalog service
#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Product catalog service with image asset management")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base directory for relative storage paths and catalog.toml
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// List products from the snapshot
    List {
        #[arg(long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "5")]
        limit: usize,
        /// Case-insensitive title filter
        #[arg(long)]
        title: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show a single product
    Show {
        id: ProductId,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Resolved configuration plus the base directory for a CLI invocation
pub struct CliContext {
    root: PathBuf,
    config: CatalogConfig,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&root)?,
        };
        Ok(Self { root, config })
    }

    /// Build a context from an already loaded configuration.
    pub fn with_config(root: PathBuf, config: CatalogConfig) -> Self {
        Self { root, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Apply `--log-*` flags on top of the loaded logging config.
    pub fn apply_log_overrides(&mut self, cli: &Cli) {
        let logging = &mut self.config.logging;
        if let Some(level) = &cli.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            logging.file = Some(file.clone());
        }
    }

    /// Execute a command, returning its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Serve { bind } => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(self.serve(bind.clone()))?;
                Ok("Server stopped".to_string())
            }
            Commands::List {
                page,
                limit,
                title,
                format,
            } => {
                let mut query = ListQuery::new(*page, *limit);
                if let Some(title) = title {
                    query = query.with_title(title.clone());
                }
                self.list(&query, format)
            }
            Commands::Show { id, format } => self.show(*id, format),
        }
    }

    /// Serve the HTTP API until Ctrl-C, then drain pending image cleanup.
    pub async fn serve(&self, bind: Option<String>) -> Result<(), ApiError> {
        let addr = bind.unwrap_or_else(|| self.config.server.bind.clone());
        let service = Arc::new(CatalogService::from_config(&self.config, &self.root)?);

        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
        };
        crate::http::serve(Arc::clone(&service), &addr, shutdown).await?;

        service.shutdown().await;
        Ok(())
    }

    fn open_store(&self) -> Result<ProductRecordStore, ApiError> {
        let (snapshot_path, _) = self.config.storage.resolve_paths(&self.root);
        ProductRecordStore::load(snapshot_path)
    }

    fn locators(&self, product: &Product) -> Vec<String> {
        product
            .images
            .iter()
            .map(|f| asset_locator(&self.config.server.base_url, f))
            .collect()
    }

    fn product_json(&self, product: &Product) -> serde_json::Value {
        json!({
            "id": product.id,
            "title": product.title,
            "description": product.description,
            "status": product.status,
            "price": product.price,
            "images": self.locators(product),
        })
    }

    fn list(&self, query: &ListQuery, format: &str) -> Result<String, ApiError> {
        let page = self.open_store()?.list(query);

        if format == "json" {
            let products: Vec<serde_json::Value> =
                page.products.iter().map(|p| self.product_json(p)).collect();
            let body = json!({
                "page": page.page,
                "limit": page.limit,
                "total": page.total,
                "totalPages": page.total_pages,
                "products": products,
            });
            return serde_json::to_string_pretty(&body)
                .map_err(|e| ApiError::Storage(e.into()));
        }

        use comfy_table::Table;
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["ID", "Title", "Status", "Price", "Images"]);
        for p in &page.products {
            table.add_row(vec![
                p.id.to_string(),
                p.title.clone(),
                p.status.clone(),
                format!("{:.2}", p.price),
                p.images.len().to_string(),
            ]);
        }
        Ok(format!(
            "{}\nPage {} of {} ({} products)",
            table, page.page, page.total_pages, page.total
        ))
    }

    fn show(&self, id: ProductId, format: &str) -> Result<String, ApiError> {
        let product = self
            .open_store()?
            .get_by_id(id)
            .ok_or(ApiError::NotFound(id))?;

        if format == "json" {
            return serde_json::to_string_pretty(&self.product_json(&product))
                .map_err(|e| ApiError::Storage(e.into()));
        }

        let mut output = format!(
            "Product {}\n  Title:       {}\n  Description: {}\n  Status:      {}\n  Price:       {:.2}\n",
            product.id, product.title, product.description, product.status, product.price
        );
        if product.images.is_empty() {
            output.push_str("  Images:      (none)\n");
        } else {
            output.push_str("  Images:\n");
            for url in self.locators(&product) {
                output.push_str(&format!("    - {}\n", url));
            }
        }
        Ok(output)
    }
}
