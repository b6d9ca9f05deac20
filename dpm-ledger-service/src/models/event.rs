//! Normalised ledger events and their totals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::PartitionKind;

/// Kind of financial line extracted from a legacy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Invoice,
    Return,
    CashReceipt,
    ChequeReceipt,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Invoice,
        EventType::Return,
        EventType::CashReceipt,
        EventType::ChequeReceipt,
    ];

    /// Wire name; also the tie-breaker when two events share a date.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Return => "return",
            Self::CashReceipt => "cash_receipt",
            Self::ChequeReceipt => "cheque_receipt",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub table: String,
    pub db_kind: PartitionKind,
}

/// One financial line for an account, normalised from a raw row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_type: EventType,
    pub date: Option<NaiveDate>,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub meta: EventMeta,
    /// Every column of the source row, for display only.
    pub raw: serde_json::Map<String, serde_json::Value>,
}

/// Sort events by date (undated first), then by event type name.
pub fn sort_events(events: &mut [LedgerEvent]) {
    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.event_type.as_str().cmp(b.event_type.as_str()))
    });
}

/// Per-type sums and the resulting balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub invoices: Decimal,
    pub returns: Decimal,
    pub cash_receipts: Decimal,
    pub cheque_receipts: Decimal,
    pub balance: Decimal,
}

impl LedgerTotals {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a LedgerEvent>) -> Self {
        let mut totals = Self::default();
        for event in events {
            totals.record(event.event_type, event.amount);
        }
        totals.refresh_balance();
        totals
    }

    /// Add `amount` to the bucket for `event_type`. Call `refresh_balance` afterwards.
    pub fn record(&mut self, event_type: EventType, amount: Decimal) {
        match event_type {
            EventType::Invoice => self.invoices += amount,
            EventType::Return => self.returns += amount,
            EventType::CashReceipt => self.cash_receipts += amount,
            EventType::ChequeReceipt => self.cheque_receipts += amount,
        }
    }

    /// Componentwise sum of many totals; balance is recomputed once from the sums.
    pub fn sum<'a>(items: impl IntoIterator<Item = &'a LedgerTotals>) -> Self {
        let mut totals = Self::default();
        for item in items {
            totals.invoices += item.invoices;
            totals.returns += item.returns;
            totals.cash_receipts += item.cash_receipts;
            totals.cheque_receipts += item.cheque_receipts;
        }
        totals.refresh_balance();
        totals
    }

    pub fn refresh_balance(&mut self) {
        self.balance = self.invoices - self.returns - self.cash_receipts - self.cheque_receipts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn event(event_type: EventType, amount: &str, date: Option<&str>) -> LedgerEvent {
        LedgerEvent {
            event_type,
            date: date.map(|d| NaiveDate::from_str(d).unwrap()),
            amount: Decimal::from_str(amount).unwrap(),
            reference: None,
            meta: EventMeta {
                table: "t".to_string(),
                db_kind: PartitionKind::Acc,
            },
            raw: Default::default(),
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn balance_is_invoices_minus_everything_else() {
        let events = vec![
            event(EventType::Invoice, "100.00", None),
            event(EventType::Return, "10.00", None),
            event(EventType::CashReceipt, "30.00", None),
        ];

        let totals = LedgerTotals::from_events(&events);

        assert_eq!(totals.invoices, dec("100.00"));
        assert_eq!(totals.returns, dec("10.00"));
        assert_eq!(totals.cash_receipts, dec("30.00"));
        assert_eq!(totals.cheque_receipts, Decimal::ZERO);
        assert_eq!(totals.balance, dec("60.00"));
    }

    #[test]
    fn negative_and_zero_amounts_are_summed_exactly() {
        let events = vec![
            event(EventType::Invoice, "0.10", None),
            event(EventType::Invoice, "0.20", None),
            event(EventType::Return, "-5.5", None),
            event(EventType::ChequeReceipt, "0", None),
        ];

        let totals = LedgerTotals::from_events(&events);

        assert_eq!(totals.invoices, dec("0.30"));
        assert_eq!(totals.balance, dec("5.80"));
        assert_eq!(
            totals.balance,
            totals.invoices - totals.returns - totals.cash_receipts - totals.cheque_receipts
        );
    }

    #[test]
    fn empty_event_list_has_zero_totals() {
        assert_eq!(LedgerTotals::from_events(&[]), LedgerTotals::default());
    }

    #[test]
    fn sum_recomputes_balance_from_components() {
        let a = LedgerTotals::from_events(&[event(EventType::Invoice, "50", None)]);
        let mut b = LedgerTotals::from_events(&[event(EventType::CashReceipt, "20", None)]);
        // A stale balance on an input must not leak into the sum.
        b.balance = dec("999");

        let total = LedgerTotals::sum([&a, &b]);

        assert_eq!(total.invoices, dec("50"));
        assert_eq!(total.cash_receipts, dec("20"));
        assert_eq!(total.balance, dec("30"));
    }

    #[test]
    fn undated_events_sort_first_then_by_type_name() {
        let mut events = vec![
            event(EventType::Return, "1", Some("2024-02-01")),
            event(EventType::Invoice, "1", Some("2024-02-01")),
            event(EventType::Invoice, "1", None),
            event(EventType::CashReceipt, "1", Some("2024-01-15")),
        ];

        sort_events(&mut events);

        let order: Vec<_> = events
            .iter()
            .map(|e| (e.date.map(|d| d.to_string()), e.event_type))
            .collect();
        assert_eq!(
            order,
            vec![
                (None, EventType::Invoice),
                (Some("2024-01-15".to_string()), EventType::CashReceipt),
                (Some("2024-02-01".to_string()), EventType::Invoice),
                (Some("2024-02-01".to_string()), EventType::Return),
            ]
        );
    }

    #[test]
    fn amounts_serialize_as_strings() {
        let totals = LedgerTotals::from_events(&[event(EventType::Invoice, "12.50", None)]);
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["invoices"], "12.50");
        assert_eq!(json["balance"], "12.50");
    }
}
