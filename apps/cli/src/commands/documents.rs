//! Sales order, invoice, tax invoice and SPD commands.

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use niaga_core::{
    InvoiceDraft, InvoiceKind, LineDraft, SalesOrder, SalesOrderItem, SalesOrderStatus,
    SchemeKind, SpdDraft, SpdEntryDraft, TaxInvoice,
};

use super::{parse_line, print_json, today, AmountArgs, Context};

// =============================================================================
// Command Definitions
// =============================================================================

#[derive(Subcommand)]
pub enum OrderCommand {
    /// Record a sales order
    Add {
        /// SO number as agreed with the customer
        #[arg(long)]
        number: String,
        #[arg(long)]
        consumer: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
        /// Line as QTY:PRICE:DESCRIPTION, repeatable
        #[arg(long = "item", value_parser = parse_line, required = true)]
        items: Vec<LineDraft>,
    },
    /// List sales orders
    List {
        /// open, invoiced or cancelled
        #[arg(long)]
        status: Option<SalesOrderStatus>,
    },
}

#[derive(Subcommand)]
pub enum InvoiceCommand {
    /// Create an invoice with the next SAR or KW number
    Create {
        /// sar or kw
        #[arg(long)]
        kind: InvoiceKind,
        #[arg(long)]
        consumer: String,
        /// Sales order being billed; open orders become invoiced
        #[arg(long)]
        so: Option<String>,
        /// Invoice date, also picks the numbering year. Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
        #[command(flatten)]
        amounts: AmountArgs,
    },
    /// Import invoices that already carry a number from a JSON file
    Import {
        /// JSON array of invoice drafts, each with a `number`
        file: PathBuf,
    },
    /// List invoices
    List {
        /// sar or kw
        #[arg(long)]
        kind: Option<InvoiceKind>,
    },
    /// Show one invoice by id or number
    Show { key: String },
}

#[derive(Subcommand)]
pub enum TaxInvoiceCommand {
    /// Register a faktur pajak against an invoice number
    Add {
        /// Serial issued by the tax office
        #[arg(long)]
        tax_number: String,
        #[arg(long)]
        invoice: String,
        /// Defaults to the invoice date, else today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Defaults to the invoice's DPP
        #[arg(long)]
        dpp: Option<i64>,
        /// Defaults to the invoice's VAT
        #[arg(long)]
        vat: Option<i64>,
    },
    /// List tax invoices
    List {
        /// Only those covering this invoice number
        #[arg(long)]
        invoice: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SpdCommand {
    /// Create an SPD listing invoices sent to a consumer
    Create {
        #[arg(long)]
        consumer: String,
        /// Sent date, also picks the numbering year. Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        notes: Option<String>,
        /// Invoice number to include, repeatable
        #[arg(long = "invoice", required = true)]
        invoices: Vec<String>,
    },
    /// List SPD documents
    List,
}

/// One entry of an `invoice import` file.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    number: String,
    #[serde(flatten)]
    draft: InvoiceDraft,
}

// =============================================================================
// Handlers
// =============================================================================

pub async fn order(ctx: &Context<'_>, command: OrderCommand) -> anyhow::Result<()> {
    let repo = ctx.db.sales_orders();
    match command {
        OrderCommand::Add {
            number,
            consumer,
            date,
            notes,
            items,
        } => {
            let now = Utc::now();
            let id = Uuid::new_v4().to_string();
            let items = items
                .into_iter()
                .map(|line| SalesOrderItem {
                    id: Uuid::new_v4().to_string(),
                    sales_order_id: id.clone(),
                    product_id: line.product_id,
                    description: line.description,
                    quantity: line.quantity,
                    price_rupiah: line.price_rupiah,
                })
                .collect();

            let order = repo
                .insert(&SalesOrder {
                    id,
                    so_number: number,
                    consumer_id: consumer,
                    order_date: date.unwrap_or_else(today),
                    status: SalesOrderStatus::Open,
                    notes,
                    items,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            info!(so_number = %order.so_number, "Sales order recorded");
            print_json(&order)
        }
        OrderCommand::List { status } => {
            let orders: Vec<SalesOrder> = repo
                .list()
                .await?
                .into_iter()
                .filter(|o| status.map_or(true, |s| o.status == s))
                .collect();
            print_json(&orders)
        }
    }
}

pub async fn invoice(ctx: &Context<'_>, command: InvoiceCommand) -> anyhow::Result<()> {
    let repo = ctx.db.invoices();
    match command {
        InvoiceCommand::Create {
            kind,
            consumer,
            so,
            date,
            due,
            notes,
            amounts,
        } => {
            let draft = InvoiceDraft {
                kind,
                consumer_id: consumer,
                so_number: so,
                invoice_date: date.unwrap_or_else(today),
                due_date: due,
                negotiation_rupiah: amounts.negotiation,
                dp_rupiah: amounts.dp,
                pelunasan_rupiah: amounts.pelunasan,
                notes,
                items: amounts.items,
            };
            let scheme = ctx.config.scheme(SchemeKind::from(kind));
            let invoice = repo.create(&draft, scheme).await?;
            info!(number = %invoice.number, total = invoice.total_rupiah, "Invoice created");
            print_json(&invoice)
        }
        InvoiceCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records: Vec<ImportRecord> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of invoices", file.display()))?;

            let batch: Vec<(String, InvoiceDraft)> = records
                .into_iter()
                .map(|record| (record.number, record.draft))
                .collect();
            let imported = repo
                .import_batch(&batch)
                .await
                .with_context(|| format!("Import of {} aborted, nothing was stored", file.display()))?;
            info!(count = imported.len(), "Invoices imported");
            print_json(&imported)
        }
        InvoiceCommand::List { kind } => {
            let invoices = match kind {
                Some(kind) => repo.list_by_kind(kind).await?,
                None => repo.list_all().await?,
            };
            print_json(&invoices)
        }
        InvoiceCommand::Show { key } => {
            let found = match repo.get_by_id(&key).await? {
                Some(invoice) => Some(invoice),
                None => repo.get_by_number(&key).await?,
            };
            match found {
                Some(invoice) => print_json(&invoice),
                None => bail!("No invoice with id or number '{}'", key),
            }
        }
    }
}

pub async fn tax_invoice(ctx: &Context<'_>, command: TaxInvoiceCommand) -> anyhow::Result<()> {
    let repo = ctx.db.tax_invoices();
    match command {
        TaxInvoiceCommand::Add {
            tax_number,
            invoice,
            date,
            dpp,
            vat,
        } => {
            let covered = ctx.db.invoices().get_by_number(&invoice).await?;
            if covered.is_none() {
                warn!(invoice = %invoice, "Tax invoice references an unknown invoice number");
            }

            let tax = repo
                .insert(&TaxInvoice {
                    id: Uuid::new_v4().to_string(),
                    tax_number,
                    invoice_number: invoice,
                    consumer_id: covered.as_ref().map(|i| i.consumer_id.clone()),
                    tax_date: date
                        .or_else(|| covered.as_ref().map(|i| i.invoice_date))
                        .unwrap_or_else(today),
                    dpp_rupiah: dpp
                        .or_else(|| covered.as_ref().map(|i| i.dpp_vat_rupiah))
                        .unwrap_or(0),
                    vat_rupiah: vat
                        .or_else(|| covered.as_ref().map(|i| i.vat_rupiah))
                        .unwrap_or(0),
                    created_at: Utc::now(),
                })
                .await?;
            print_json(&tax)
        }
        TaxInvoiceCommand::List { invoice } => {
            let taxes = match invoice {
                Some(number) => repo.list_for_invoice(&number).await?,
                None => repo.list().await?,
            };
            print_json(&taxes)
        }
    }
}

pub async fn spd(ctx: &Context<'_>, command: SpdCommand) -> anyhow::Result<()> {
    let repo = ctx.db.spd();
    match command {
        SpdCommand::Create {
            consumer,
            date,
            notes,
            invoices,
        } => {
            let mut entries = Vec::with_capacity(invoices.len());
            for number in &invoices {
                let Some(invoice) = ctx.db.invoices().get_by_number(number).await? else {
                    bail!("No invoice numbered '{}'", number);
                };
                let tax_number = ctx
                    .db
                    .tax_invoices()
                    .list_for_invoice(&invoice.number)
                    .await?
                    .into_iter()
                    .next()
                    .map(|t| t.tax_number);
                entries.push(SpdEntryDraft {
                    invoice_number: invoice.number,
                    so_number: invoice.so_number,
                    tax_number,
                    amount_rupiah: invoice.total_rupiah,
                });
            }

            let draft = SpdDraft {
                consumer_id: consumer,
                sent_date: date.unwrap_or_else(today),
                notes,
                entries,
            };
            let doc = repo
                .create_with_scheme(&draft, ctx.config.scheme(SchemeKind::Spd))
                .await?;
            info!(number = %doc.spd_number, entries = doc.entries.len(), "SPD created");
            print_json(&doc)
        }
        SpdCommand::List => print_json(&repo.list().await?),
    }
}
