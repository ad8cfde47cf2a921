//! # Duplicate Detection
//!
//! Groups records by a natural key and reports the keys used more than once.
//!
//! ```text
//! records ──► key_fn ──► normalize (trim, drop blank)
//!                              │
//!                              ▼
//!                  group in first-seen order
//!                              │
//!                              ▼
//!                  keep groups with count > 1
//! ```
//!
//! Detection only reports. Nothing is merged or deleted; the caller
//! decides what to do with each group.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{Invoice, SalesOrder, TaxInvoice};

/// Records sharing one key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup<K, T> {
    pub key: K,
    pub members: Vec<T>,
}

impl<K, T> DuplicateGroup<K, T> {
    /// Number of records carrying the key.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Converts every member, keeping the key.
    pub fn map_members<U>(self, f: impl FnMut(T) -> U) -> DuplicateGroup<K, U> {
        DuplicateGroup {
            key: self.key,
            members: self.members.into_iter().map(f).collect(),
        }
    }
}

/// Trims a raw key. Blank keys yield `None` and are never grouped.
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Finds keys shared by more than one record.
///
/// `key_fn` returns `None` for records without a usable key; those are
/// skipped. Groups come back in order of their first member, and members
/// keep their input order.
///
/// ```rust
/// use niaga_core::duplicates::{find_duplicates, normalize_key};
///
/// let numbers = ["0001/SAR/2026", "0002/SAR/2026", " 0001/SAR/2026", ""];
/// let groups = find_duplicates(&numbers, |n| normalize_key(n));
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].key, "0001/SAR/2026");
/// assert_eq!(groups[0].count(), 2);
/// ```
pub fn find_duplicates<'a, T, K, F>(records: &'a [T], mut key_fn: F) -> Vec<DuplicateGroup<K, &'a T>>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<DuplicateGroup<K, &'a T>> = Vec::new();

    for record in records {
        let Some(key) = key_fn(record) else {
            continue;
        };
        match index.get(&key) {
            Some(&slot) => groups[slot].members.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(DuplicateGroup {
                    key,
                    members: vec![record],
                });
            }
        }
    }

    groups.retain(|g| g.members.len() > 1);
    groups
}

// =============================================================================
// Domain Wrappers
// =============================================================================

/// Invoice numbers used more than once. Pass SAR and KW invoices together;
/// the schemes cannot collide with each other, so any hit is a real clash.
pub fn duplicate_invoice_numbers(invoices: &[Invoice]) -> Vec<DuplicateGroup<String, &Invoice>> {
    find_duplicates(invoices, |inv| normalize_key(&inv.number))
}

/// Tax invoices repeating the same (tax number, invoice number) pair.
pub fn duplicate_tax_invoices(
    tax_invoices: &[TaxInvoice],
) -> Vec<DuplicateGroup<(String, String), &TaxInvoice>> {
    find_duplicates(tax_invoices, |t| {
        Some((normalize_key(&t.tax_number)?, normalize_key(&t.invoice_number)?))
    })
}

/// Sales order numbers used more than once.
pub fn duplicate_so_numbers(orders: &[SalesOrder]) -> Vec<DuplicateGroup<String, &SalesOrder>> {
    find_duplicates(orders, |so| normalize_key(&so.so_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvoiceKind, SalesOrderStatus};
    use chrono::{NaiveDate, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn invoice(id: &str, kind: InvoiceKind, number: &str) -> Invoice {
        Invoice {
            id: id.to_string(),
            kind,
            number: number.to_string(),
            consumer_id: "c1".to_string(),
            so_number: None,
            invoice_date: date(),
            due_date: None,
            negotiation_rupiah: 0,
            dp_rupiah: 0,
            pelunasan_rupiah: 0,
            subtotal_rupiah: 0,
            goods_rupiah: 0,
            dpp_vat_rupiah: 0,
            vat_rupiah: 0,
            total_rupiah: 0,
            notes: None,
            items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tax(id: &str, tax_number: &str, invoice_number: &str) -> TaxInvoice {
        TaxInvoice {
            id: id.to_string(),
            tax_number: tax_number.to_string(),
            invoice_number: invoice_number.to_string(),
            consumer_id: None,
            tax_date: date(),
            dpp_rupiah: 0,
            vat_rupiah: 0,
            created_at: Utc::now(),
        }
    }

    fn order(id: &str, so_number: &str) -> SalesOrder {
        SalesOrder {
            id: id.to_string(),
            so_number: so_number.to_string(),
            consumer_id: "c1".to_string(),
            order_date: date(),
            status: SalesOrderStatus::Open,
            notes: None,
            items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ids<T, K>(group: &DuplicateGroup<K, &T>, id: impl Fn(&T) -> &str) -> Vec<String> {
        group.members.iter().map(|m| id(m).to_string()).collect()
    }

    #[test]
    fn test_unique_keys_yield_nothing() {
        let invoices = vec![
            invoice("a", InvoiceKind::Sar, "0001/SAR/2026"),
            invoice("b", InvoiceKind::Sar, "0002/SAR/2026"),
            invoice("c", InvoiceKind::Kw, "KW/2026/0001"),
        ];
        assert!(duplicate_invoice_numbers(&invoices).is_empty());
        assert!(duplicate_invoice_numbers(&[]).is_empty());
    }

    #[test]
    fn test_exact_membership_and_order() {
        let invoices = vec![
            invoice("a", InvoiceKind::Kw, "KW/2026/0003"),
            invoice("b", InvoiceKind::Sar, "0001/SAR/2026"),
            invoice("c", InvoiceKind::Sar, "0002/SAR/2026"),
            invoice("d", InvoiceKind::Sar, "0001/SAR/2026 "),
            invoice("e", InvoiceKind::Kw, "KW/2026/0003"),
            invoice("f", InvoiceKind::Sar, "0001/SAR/2026"),
        ];
        let groups = duplicate_invoice_numbers(&invoices);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "KW/2026/0003");
        assert_eq!(ids(&groups[0], |i: &Invoice| &i.id), vec!["a", "e"]);
        assert_eq!(groups[1].key, "0001/SAR/2026");
        assert_eq!(ids(&groups[1], |i: &Invoice| &i.id), vec!["b", "d", "f"]);
        assert_eq!(groups[1].count(), 3);
    }

    #[test]
    fn test_blank_keys_are_skipped() {
        let orders = vec![order("a", ""), order("b", "  "), order("c", "SO-1")];
        assert!(duplicate_so_numbers(&orders).is_empty());
    }

    #[test]
    fn test_so_numbers() {
        let orders = vec![order("a", "SO-1"), order("b", "SO-2"), order("c", "SO-1")];
        let groups = duplicate_so_numbers(&orders);
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0], |o: &SalesOrder| &o.id), vec!["a", "c"]);
    }

    #[test]
    fn test_tax_invoices_use_the_pair() {
        let taxes = vec![
            tax("a", "010.000-26.00000001", "0001/SAR/2026"),
            tax("b", "010.000-26.00000001", "0002/SAR/2026"),
            tax("c", "010.000-26.00000002", "0001/SAR/2026"),
            tax("d", "010.000-26.00000001", "0001/SAR/2026"),
            tax("e", "", "0001/SAR/2026"),
        ];
        let groups = duplicate_tax_invoices(&taxes);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].key,
            ("010.000-26.00000001".to_string(), "0001/SAR/2026".to_string())
        );
        assert_eq!(ids(&groups[0], |t: &TaxInvoice| &t.id), vec!["a", "d"]);
    }

    #[test]
    fn test_map_members() {
        let invoices = vec![
            invoice("a", InvoiceKind::Sar, "X"),
            invoice("b", InvoiceKind::Sar, "X"),
        ];
        let group = duplicate_invoice_numbers(&invoices)
            .into_iter()
            .next()
            .unwrap()
            .map_members(|i| i.id.clone());
        assert_eq!(group.members, vec!["a".to_string(), "b".to_string()]);
    }
}
