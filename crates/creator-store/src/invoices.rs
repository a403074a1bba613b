//! Invoices. Convenience writes recompute the total from the line items;
//! whole-list replacements must already carry consistent totals.

use tokio::sync::watch;

use creator_shared::insights::invoice_items_from_deliverables;
use creator_shared::models::{Invoice, InvoicePatch, InvoiceStatus};
use creator_shared::ValidationError;

use crate::collection::{Change, Collection};
use crate::error::{Result, StoreError};
use crate::store::CreatorStore;

fn with_total(mut invoice: Invoice) -> Invoice {
    invoice.total = Invoice::compute_total(&invoice.items);
    invoice
}

impl CreatorStore {
    /// Newest first.
    pub async fn invoices(&self) -> Vec<Invoice> {
        self.invoices.get(self.kv()).await
    }

    pub async fn subscribe_invoices(&self) -> watch::Receiver<Option<Vec<Invoice>>> {
        self.invoices().await;
        self.invoices.subscribe()
    }

    pub async fn set_invoices(&self, invoices: Vec<Invoice>) -> Result<()> {
        invoices.iter().try_for_each(Invoice::validate)?;
        self.invoices.mutate(self.kv(), invoices).await
    }

    pub async fn add_invoice(&self, invoice: Invoice) -> Result<Invoice> {
        let invoice = with_total(invoice);
        invoice.validate()?;
        self.invoices
            .update(self.kv(), |current| {
                if current.iter().any(|i| i.id == invoice.id) {
                    return Err(ValidationError::DuplicateId {
                        collection: Collection::Invoices.name(),
                        id: invoice.id.clone(),
                    }
                    .into());
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.push(invoice.clone());
                next.extend_from_slice(current);
                Ok(Change::Commit(next, invoice))
            })
            .await
    }

    pub async fn update_invoice(&self, id: &str, patch: InvoicePatch) -> Result<Invoice> {
        self.invoices
            .update(self.kv(), |current| {
                let pos = current
                    .iter()
                    .position(|i| i.id == id)
                    .ok_or_else(|| StoreError::NotFound {
                        collection: Collection::Invoices,
                        id: id.to_string(),
                    })?;
                let updated = current[pos].merged(patch);
                updated.validate()?;

                let mut next = current.clone();
                next[pos] = updated.clone();
                Ok(Change::Commit(next, updated))
            })
            .await
    }

    pub async fn set_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<Invoice> {
        self.update_invoice(
            id,
            InvoicePatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn remove_invoice(&self, id: &str) -> Result<bool> {
        self.invoices
            .update(self.kv(), |current| {
                if !current.iter().any(|i| i.id == id) {
                    return Ok(Change::Keep(false));
                }
                let next = current.iter().filter(|i| i.id != id).cloned().collect();
                Ok(Change::Commit(next, true))
            })
            .await
    }

    /// A draft invoice addressed to a deal's brand, pre-filled with one line
    /// per active rate-card item. Not persisted until passed to
    /// [`add_invoice`](Self::add_invoice).
    pub async fn draft_invoice_from_deal(&self, deal_id: &str) -> Result<Invoice> {
        let deal = self
            .deals()
            .await
            .into_iter()
            .find(|d| d.id == deal_id)
            .ok_or_else(|| StoreError::NotFound {
                collection: Collection::Deals,
                id: deal_id.to_string(),
            })?;
        let items = invoice_items_from_deliverables(&self.deliverables().await);

        let mut invoice = Invoice::new(deal.brand_name, items, self.now());
        invoice.deal_id = Some(deal.id);
        invoice.brand_email = Some(deal.contact_email).filter(|e| !e.trim().is_empty());
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use creator_shared::models::{BrandDeal, InvoiceItem};

    use crate::backend::MemoryBackend;

    use super::*;

    fn item(price: f64, quantity: u32) -> InvoiceItem {
        InvoiceItem {
            title: "Reel".into(),
            description: None,
            price,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_totals_follow_items() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        let mut invoice = Invoice::new("Nike", vec![item(100.0, 2)], Utc::now());
        invoice.total = 1.0;

        let stored = store.add_invoice(invoice).await.unwrap();
        assert_eq!(stored.total, 200.0);

        let updated = store
            .update_invoice(
                &stored.id,
                InvoicePatch {
                    items: Some(vec![item(100.0, 2), item(50.0, 1)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.total, 250.0);

        let sent = store
            .set_invoice_status(&stored.id, InvoiceStatus::Sent)
            .await
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
        assert_eq!(store.invoices().await, vec![sent]);
    }

    #[tokio::test]
    async fn test_bad_lines_are_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CreatorStore::new(backend.clone());

        let err = store
            .add_invoice(Invoice::new("Nike", vec![item(10.0, 0)], Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::InvalidQuantity(0))
        ));
        assert_eq!(backend.write_count(), 0);
        assert!(matches!(
            store.set_invoice_status("missing", InvoiceStatus::Paid).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_draft_from_deal_uses_active_rates() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        let deal = BrandDeal::new("Glossier", "hi@glossier.com", Utc::now());
        store.add_deal(deal.clone()).await.unwrap();

        let draft = store.draft_invoice_from_deal(&deal.id).await.unwrap();
        assert_eq!(draft.deal_id.as_deref(), Some(deal.id.as_str()));
        assert_eq!(draft.brand_email.as_deref(), Some("hi@glossier.com"));
        assert_eq!(draft.items.len(), 3);
        assert_eq!(draft.total, 250.0 + 650.0 + 300.0);
        assert_eq!(draft.status, InvoiceStatus::Draft);
        // Drafts are not stored.
        assert!(store.invoices().await.is_empty());

        assert!(store.draft_invoice_from_deal("nope").await.is_err());
    }
}
