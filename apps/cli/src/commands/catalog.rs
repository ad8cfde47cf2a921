//! Consumer and product commands.

use chrono::Utc;
use clap::Subcommand;
use tracing::info;
use uuid::Uuid;

use niaga_core::{Consumer, Product};

use super::{parse_rupiah, print_json, Context};

#[derive(Subcommand)]
pub enum ConsumerCommand {
    /// Register a consumer
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: Option<String>,
        /// Tax id, 15 or 16 digits (dots and dashes allowed)
        #[arg(long)]
        npwp: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// List consumers by name
    List {
        /// Only names containing this text
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Subcommand)]
pub enum ProductCommand {
    /// Add a product to the catalog
    Add {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        unit: Option<String>,
        /// Unit price in whole Rupiah
        #[arg(long, value_parser = price_arg)]
        price: i64,
    },
    /// List active products
    List {
        /// Code prefix or name fragment
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

fn price_arg(raw: &str) -> Result<i64, String> {
    parse_rupiah(raw).ok_or_else(|| format!("'{}' is not a whole Rupiah amount", raw))
}

pub async fn consumer(ctx: &Context<'_>, command: ConsumerCommand) -> anyhow::Result<()> {
    let repo = ctx.db.consumers();
    match command {
        ConsumerCommand::Add {
            name,
            address,
            npwp,
            phone,
            email,
        } => {
            let now = Utc::now();
            let consumer = repo
                .insert(&Consumer {
                    id: Uuid::new_v4().to_string(),
                    name,
                    address,
                    npwp,
                    phone,
                    email,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            info!(id = %consumer.id, "Consumer added");
            print_json(&consumer)
        }
        ConsumerCommand::List { search, limit } => {
            let consumers = match search {
                Some(query) => repo.search(&query, limit).await?,
                None => repo.list().await?.into_iter().take(limit as usize).collect(),
            };
            print_json(&consumers)
        }
    }
}

pub async fn product(ctx: &Context<'_>, command: ProductCommand) -> anyhow::Result<()> {
    let repo = ctx.db.products();
    match command {
        ProductCommand::Add {
            code,
            name,
            unit,
            price,
        } => {
            let now = Utc::now();
            let product = repo
                .insert(&Product {
                    id: Uuid::new_v4().to_string(),
                    code,
                    name,
                    unit,
                    price_rupiah: price,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            info!(code = %product.code, "Product added");
            print_json(&product)
        }
        ProductCommand::List { search, limit } => {
            let products = match search {
                Some(query) => repo.search(&query, limit).await?,
                None => repo.list_active(limit).await?,
            };
            print_json(&products)
        }
    }
}
