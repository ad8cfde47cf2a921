//! Whole-ledger commands: totals preview, numbering preview, duplicate
//! report, summary and demo seed.

use serde_json::json;
use tracing::{info, warn};

use niaga_core::{InvoiceTotals, LineDraft, Money, SchemeKind};
use niaga_db::seed::seed_demo;

use super::{current_year, print_json, Context, TotalsArgs};
use crate::config::AppConfig;

/// `niaga totals`: runs the pipeline on the given lines, nothing is stored.
pub fn totals(config: &AppConfig, args: &TotalsArgs) -> anyhow::Result<()> {
    let amounts = &args.amounts;
    let lines: Vec<_> = amounts.items.iter().map(LineDraft::line_input).collect();
    let policy = config.tax.policy()?;

    let totals = InvoiceTotals::compute(
        &lines,
        Money::from_rupiah(amounts.negotiation),
        Money::from_rupiah(amounts.dp),
        Money::from_rupiah(amounts.pelunasan),
        policy,
    )?;

    print_json(&json!({
        "regime": config.tax.regime,
        "dpp_ratio": policy.dpp_ratio.to_string(),
        "vat_ratio": policy.vat_ratio.to_string(),
        "subtotal_rupiah": totals.subtotal.rupiah(),
        "goods_rupiah": totals.goods.rupiah(),
        "dpp_vat_rupiah": totals.dpp_vat.rupiah(),
        "vat_rupiah": totals.vat.rupiah(),
        "total_rupiah": totals.total.rupiah(),
        "total": totals.total.to_string(),
    }))
}

pub async fn next_number(
    ctx: &Context<'_>,
    kind: SchemeKind,
    year: Option<i32>,
) -> anyhow::Result<()> {
    let year = year.unwrap_or_else(current_year);
    let scheme = ctx.config.scheme(kind);
    let number = ctx.db.snapshot().await?.next_number(scheme, year)?;
    print_json(&json!({ "scheme": kind, "year": year, "next": number }))
}

pub async fn duplicates(ctx: &Context<'_>) -> anyhow::Result<()> {
    let report = ctx.db.snapshot().await?.duplicate_report();
    if report.is_empty() {
        info!("No duplicate numbers found");
    } else {
        warn!(groups = report.group_count(), "Duplicate numbers found");
    }
    print_json(&report)
}

pub async fn report(ctx: &Context<'_>, details: bool) -> anyhow::Result<()> {
    let snapshot = ctx.db.snapshot().await?;
    let summary = snapshot.summary();
    if !details {
        return print_json(&summary);
    }

    print_json(&json!({
        "summary": summary,
        "outstanding_sales_orders": snapshot.outstanding_sales_orders(),
        "invoices_without_tax_invoice": snapshot.invoices_without_tax_invoice(),
    }))
}

pub async fn seed(ctx: &Context<'_>, year: Option<i32>) -> anyhow::Result<()> {
    let summary = seed_demo(ctx.db, year.unwrap_or_else(current_year)).await?;
    if summary.skipped {
        warn!("Ledger already has consumers, nothing seeded");
    }
    print_json(&summary)
}
