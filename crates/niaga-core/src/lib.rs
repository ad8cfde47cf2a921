//! # niaga-core: Pure Business Logic for Niaga
//!
//! Everything in this crate is a pure function over in-memory records.
//! Persistence lives in `niaga-db`, the command line in `apps/cli`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Niaga Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    niaga CLI (apps/cli)                         │   │
//! │  │    invoice create, spd create, duplicates, next-number ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ niaga-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐     │   │
//! │  │   │  types   │ │  totals  │ │ numbering │ │  duplicates  │     │   │
//! │  │   │ Invoice  │ │ DPP, PPN │ │ SAR / KW  │ │ natural keys │     │   │
//! │  │   │ SPD, SO  │ │  total   │ │   SPD     │ │  count > 1   │     │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    niaga-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Invoice, SalesOrder, Consumer, Product, ...)
//! - [`money`] - Whole-Rupiah money type and exact ratio rounding
//! - [`totals`] - Invoice totals pipeline (negotiation → deductions → DPP → VAT)
//! - [`numbering`] - SAR / KW / SPD number formats and the sequence allocator
//! - [`duplicates`] - Natural-key duplicate grouping
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use niaga_core::money::Money;
//! use niaga_core::totals::{InvoiceTotals, LineInput, TaxPolicy};
//!
//! let items = [LineInput::new(2, Money::from_rupiah(100_000))];
//! let totals = InvoiceTotals::compute(
//!     &items,
//!     Money::zero(),
//!     Money::zero(),
//!     Money::zero(),
//!     TaxPolicy::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(totals.dpp_vat.rupiah(), 183_333);
//! assert_eq!(totals.vat.rupiah(), 22_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod duplicates;
pub mod error;
pub mod money;
pub mod numbering;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use duplicates::{find_duplicates, DuplicateGroup};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Ratio};
pub use numbering::{NumberScheme, SchemeKind, SequenceNumber};
pub use totals::{InvoiceTotals, LineInput, TaxPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items on a single invoice or sales order.
pub const MAX_LINE_ITEMS: usize = 200;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typing mistakes (an extra zero) before they reach an invoice.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;
