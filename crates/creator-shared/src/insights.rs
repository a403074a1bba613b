//! Views derived from collection snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{BrandDeal, CreatorProfile, DealStatus, Deliverable, InvoiceItem, PortfolioItem};

/// Totals shown above the deal board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub counts: BTreeMap<DealStatus, usize>,
    /// Sum of budgets of every deal not yet paid.
    pub open_value: f64,
    /// Sum of budgets of paid deals.
    pub earned_value: f64,
}

impl PipelineSummary {
    pub fn from_deals(deals: &[BrandDeal]) -> Self {
        let mut counts: BTreeMap<DealStatus, usize> =
            DealStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let mut open_value = 0.0;
        let mut earned_value = 0.0;

        for deal in deals {
            *counts.entry(deal.status).or_default() += 1;
            let budget = deal.budget.unwrap_or(0.0);
            if deal.status == DealStatus::Paid {
                earned_value += budget;
            } else {
                open_value += budget;
            }
        }

        Self {
            counts,
            open_value,
            earned_value,
        }
    }

    pub fn count(&self, status: DealStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    pub label: &'static str,
    pub done: bool,
}

/// Public-page readiness checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileCompletion {
    pub items: Vec<ChecklistItem>,
}

impl ProfileCompletion {
    pub fn evaluate(
        profile: &CreatorProfile,
        portfolio: &[PortfolioItem],
        deliverables: &[Deliverable],
    ) -> Self {
        let items = vec![
            ChecklistItem { label: "Add your name", done: !profile.name.is_empty() },
            ChecklistItem { label: "Set a username", done: !profile.username.is_empty() },
            ChecklistItem { label: "Write a bio", done: !profile.bio.is_empty() },
            ChecklistItem { label: "Upload a headshot", done: !profile.avatar_url.is_empty() },
            ChecklistItem { label: "Select niches", done: !profile.niches.is_empty() },
            ChecklistItem { label: "Add portfolio work", done: !portfolio.is_empty() },
            ChecklistItem {
                label: "Set your rates",
                done: deliverables.iter().any(|d| d.is_active),
            },
        ];
        Self { items }
    }

    pub fn done(&self) -> usize {
        self.items.iter().filter(|i| i.done).count()
    }

    /// Rounded to the nearest whole percent.
    pub fn percent(&self) -> u8 {
        if self.items.is_empty() {
            return 100;
        }
        ((self.done() as f64 / self.items.len() as f64) * 100.0).round() as u8
    }

    /// The next few things the creator should do.
    pub fn next_steps(&self) -> Vec<&'static str> {
        self.items
            .iter()
            .filter(|i| !i.done)
            .take(3)
            .map(|i| i.label)
            .collect()
    }
}

/// Pre-filled invoice lines, one per active rate-card item.
pub fn invoice_items_from_deliverables(deliverables: &[Deliverable]) -> Vec<InvoiceItem> {
    deliverables
        .iter()
        .filter(|d| d.is_active)
        .map(InvoiceItem::from_deliverable)
        .collect()
}
