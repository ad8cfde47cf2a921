//! # Invoice Totals
//!
//! The tax computation pipeline every invoice goes through.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Totals Pipeline                           │
//! │                                                                         │
//! │  items ──► subtotal = Σ qty × price                                    │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  + negotiation (signed adjustment agreed with the customer)            │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  − dp − pelunasan (amounts already billed) ──► goods                   │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  dppVat = round(goods × 11/12)      (DPP nilai lain)                   │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  vat    = round(dppVat × 12/100)    (PPN 12%)                          │
//! │                │                                                        │
//! │                ▼                                                        │
//! │  total  = goods + vat                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `round` is half-up toward positive infinity on the exact rational value,
//! see [`Money::mul_ratio_round`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Ratio};
use crate::types::Invoice;
use crate::validation::{validate_deduction, validate_line_count, validate_price, validate_quantity};

// =============================================================================
// Tax Policy
// =============================================================================

/// The two ratios the pipeline applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxPolicy {
    /// Multiplier from goods value to the VAT base (DPP).
    pub dpp_ratio: Ratio,
    /// VAT rate applied to the DPP.
    pub vat_ratio: Ratio,
}

impl TaxPolicy {
    /// DPP 11/12, VAT 12%.
    pub const fn standard() -> Self {
        TaxPolicy {
            dpp_ratio: Ratio::new(11, 12),
            vat_ratio: Ratio::percent(12),
        }
    }

    /// DPP equal to goods value, VAT 11%.
    pub const fn legacy() -> Self {
        TaxPolicy {
            dpp_ratio: Ratio::one(),
            vat_ratio: Ratio::percent(11),
        }
    }

    /// Builds a policy from raw ratio parts.
    pub fn try_new(dpp: (i64, i64), vat: (i64, i64)) -> CoreResult<Self> {
        Ok(TaxPolicy {
            dpp_ratio: Ratio::try_new(dpp.0, dpp.1)?,
            vat_ratio: Ratio::try_new(vat.0, vat.1)?,
        })
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy::standard()
    }
}

// =============================================================================
// Line Input
// =============================================================================

/// Quantity and unit price of one billed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineInput {
    pub quantity: i64,
    pub price: Money,
}

impl LineInput {
    pub const fn new(quantity: i64, price: Money) -> Self {
        LineInput { quantity, price }
    }
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Every derived amount of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub goods: Money,
    pub dpp_vat: Money,
    pub vat: Money,
    pub total: Money,
}

impl InvoiceTotals {
    /// Runs the pipeline.
    ///
    /// ## Errors
    /// - `EmptyDocument` / `TooManyLines` for the line count
    /// - `Validation` for non-positive quantities, negative prices or deductions
    /// - `NegativeGoodsValue` when DP and pelunasan exceed the negotiated value
    /// - `Overflow` when an amount leaves the i64 range
    ///
    /// ## Example
    /// ```rust
    /// use niaga_core::money::Money;
    /// use niaga_core::totals::{InvoiceTotals, LineInput, TaxPolicy};
    ///
    /// let items = [LineInput::new(2, Money::from_rupiah(100_000))];
    /// let t = InvoiceTotals::compute(
    ///     &items,
    ///     Money::zero(),
    ///     Money::zero(),
    ///     Money::zero(),
    ///     TaxPolicy::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(t.subtotal.rupiah(), 200_000);
    /// assert_eq!(t.goods.rupiah(), 200_000);
    /// assert_eq!(t.dpp_vat.rupiah(), 183_333);
    /// assert_eq!(t.vat.rupiah(), 22_000);
    /// assert_eq!(t.total.rupiah(), 222_000);
    /// ```
    pub fn compute(
        items: &[LineInput],
        negotiation: Money,
        dp: Money,
        pelunasan: Money,
        policy: TaxPolicy,
    ) -> CoreResult<Self> {
        validate_line_count(items.len())?;
        for line in items {
            validate_quantity(line.quantity)?;
            validate_price(line.price.rupiah())?;
        }
        validate_deduction("dp", dp.rupiah())?;
        validate_deduction("pelunasan", pelunasan.rupiah())?;
        if !policy.dpp_ratio.is_valid() || !policy.vat_ratio.is_valid() {
            let bad = if policy.dpp_ratio.is_valid() {
                policy.vat_ratio
            } else {
                policy.dpp_ratio
            };
            return Err(CoreError::InvalidRatio {
                num: bad.num(),
                den: bad.den(),
            });
        }

        let subtotal = subtotal(items)?;

        let goods = subtotal
            .checked_add(negotiation)
            .and_then(|m| m.checked_sub(dp))
            .and_then(|m| m.checked_sub(pelunasan))
            .ok_or_else(|| overflow("goods"))?;
        if goods.is_negative() {
            return Err(CoreError::NegativeGoodsValue {
                goods: goods.rupiah(),
            });
        }

        let dpp_vat = goods.checked_mul_ratio_round(policy.dpp_ratio, "dpp")?;
        let vat = dpp_vat.checked_mul_ratio_round(policy.vat_ratio, "vat")?;
        let total = goods.checked_add(vat).ok_or_else(|| overflow("total"))?;

        Ok(InvoiceTotals {
            subtotal,
            goods,
            dpp_vat,
            vat,
            total,
        })
    }

    /// Writes the derived amounts onto an invoice record.
    pub fn apply_to(&self, invoice: &mut Invoice) {
        invoice.subtotal_rupiah = self.subtotal.rupiah();
        invoice.goods_rupiah = self.goods.rupiah();
        invoice.dpp_vat_rupiah = self.dpp_vat.rupiah();
        invoice.vat_rupiah = self.vat.rupiah();
        invoice.total_rupiah = self.total.rupiah();
    }

    /// Re-runs the pipeline over a stored invoice and reports whether its
    /// frozen totals still agree.
    pub fn verify(invoice: &Invoice, policy: TaxPolicy) -> CoreResult<bool> {
        let fresh = InvoiceTotals::compute(
            &invoice.line_inputs(),
            invoice.negotiation(),
            invoice.dp(),
            invoice.pelunasan(),
            policy,
        )?;
        Ok(fresh == invoice.totals())
    }
}

/// Σ quantity × price with overflow detection.
pub fn subtotal(items: &[LineInput]) -> CoreResult<Money> {
    items.iter().try_fold(Money::zero(), |acc, line| {
        line.price
            .rupiah()
            .checked_mul(line.quantity)
            .and_then(|l| acc.checked_add(Money::from_rupiah(l)))
            .ok_or_else(|| overflow("subtotal"))
    })
}

fn overflow(context: &str) -> CoreError {
    CoreError::Overflow {
        context: context.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rp(v: i64) -> Money {
        Money::from_rupiah(v)
    }

    fn compute(items: &[LineInput], neg: i64, dp: i64, pel: i64) -> CoreResult<InvoiceTotals> {
        InvoiceTotals::compute(items, rp(neg), rp(dp), rp(pel), TaxPolicy::default())
    }

    #[test]
    fn test_worked_example() {
        let t = compute(&[LineInput::new(2, rp(100_000))], 0, 0, 0).unwrap();
        assert_eq!(t.subtotal.rupiah(), 200_000);
        assert_eq!(t.goods.rupiah(), 200_000);
        assert_eq!(t.dpp_vat.rupiah(), 183_333);
        assert_eq!(t.vat.rupiah(), 22_000);
        assert_eq!(t.total.rupiah(), 222_000);
    }

    #[test]
    fn test_zero_deductions_keep_goods_equal_to_subtotal() {
        let items = [
            LineInput::new(3, rp(12_500)),
            LineInput::new(1, rp(7_750)),
            LineInput::new(10, rp(1_000)),
        ];
        let t = compute(&items, 0, 0, 0).unwrap();
        assert_eq!(t.subtotal.rupiah(), 55_250);
        assert_eq!(t.goods, t.subtotal);
        assert_eq!(t.total, t.goods + t.vat);
    }

    #[test]
    fn test_negotiation_and_deductions() {
        // (1_000_000 − 50_000) − 300_000 − 100_000 = 550_000
        let t = compute(&[LineInput::new(1, rp(1_000_000))], -50_000, 300_000, 100_000).unwrap();
        assert_eq!(t.goods.rupiah(), 550_000);
        // 550_000 × 11/12 = 504_166.67 → 504_167
        assert_eq!(t.dpp_vat.rupiah(), 504_167);
        // 504_167 × 0.12 = 60_500.04 → 60_500
        assert_eq!(t.vat.rupiah(), 60_500);
        assert_eq!(t.total.rupiah(), 610_500);
    }

    #[test]
    fn test_positive_negotiation_is_a_surcharge() {
        let t = compute(&[LineInput::new(1, rp(120_000))], 12_000, 0, 0).unwrap();
        assert_eq!(t.goods.rupiah(), 132_000);
        assert_eq!(t.dpp_vat.rupiah(), 121_000);
        assert_eq!(t.vat.rupiah(), 14_520);
    }

    #[test]
    fn test_legacy_policy() {
        let t = InvoiceTotals::compute(
            &[LineInput::new(2, rp(100_000))],
            Money::zero(),
            Money::zero(),
            Money::zero(),
            TaxPolicy::legacy(),
        )
        .unwrap();
        assert_eq!(t.dpp_vat.rupiah(), 200_000);
        assert_eq!(t.vat.rupiah(), 22_000);
        assert_eq!(t.total.rupiah(), 222_000);
    }

    #[test]
    fn test_deductions_exceeding_value_are_rejected() {
        let err = compute(&[LineInput::new(1, rp(100_000))], 0, 80_000, 30_000).unwrap_err();
        assert!(matches!(err, CoreError::NegativeGoodsValue { goods: -10_000 }));
    }

    #[test]
    fn test_fully_paid_invoice_has_zero_vat() {
        let t = compute(&[LineInput::new(1, rp(100_000))], 0, 60_000, 40_000).unwrap();
        assert!(t.goods.is_zero());
        assert!(t.vat.is_zero());
        assert!(t.total.is_zero());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(compute(&[], 0, 0, 0), Err(CoreError::EmptyDocument)));
        assert!(matches!(
            compute(&[LineInput::new(0, rp(1))], 0, 0, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            compute(&[LineInput::new(1, rp(-1))], 0, 0, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            compute(&[LineInput::new(1, rp(10))], 0, -1, 0),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = compute(&[LineInput::new(2, rp(i64::MAX / 2 + 1))], 0, 0, 0).unwrap_err();
        assert!(matches!(err, CoreError::Overflow { .. }));
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let policy = TaxPolicy {
            dpp_ratio: Ratio::new(11, 0),
            vat_ratio: Ratio::percent(12),
        };
        let err = InvoiceTotals::compute(
            &[LineInput::new(1, rp(10))],
            Money::zero(),
            Money::zero(),
            Money::zero(),
            policy,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRatio { num: 11, den: 0 }));
    }
}
