//! Template Resolver: picks the commission template in force for a product
//! at a point in time.
//!
//! Active time-window overrides beat the product's default template. Among
//! overlapping overrides the highest priority wins; equal priority is broken
//! by most recent creation, then highest row id, so resolution never depends
//! on data-store ordering.

use crate::domain::{CommissionTemplate, Product, TemplateId, TemplateStatus, TimeMs, TimeWindowOverride};
use crate::provider::{CatalogProvider, ProviderError};
use std::sync::Arc;
use tracing::warn;

/// Select the winning override among windows already known to cover the
/// resolution instant. Returns None for an empty slice.
pub fn select_override(windows: &[TimeWindowOverride]) -> Option<&TimeWindowOverride> {
    windows
        .iter()
        .max_by_key(|w| (w.priority, w.created_ms, w.id))
}

/// Resolves the active template for a product at an instant.
pub struct TemplateResolver {
    catalog: Arc<dyn CatalogProvider>,
}

impl TemplateResolver {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    /// Resolve the template in force for `product` at `at`.
    ///
    /// Returns None when neither an active override nor an active default
    /// template exists; the caller skips that line item rather than failing
    /// the order. An override pointing at a missing or inactive template is
    /// logged and treated as absent, falling back to the default.
    ///
    /// # Errors
    /// Returns an error only on provider failure, never on a resolution gap.
    pub async fn resolve(
        &self,
        product: &Product,
        at: TimeMs,
    ) -> Result<Option<CommissionTemplate>, ProviderError> {
        let windows = self.catalog.fetch_active_overrides(&product.id, at).await?;

        if let Some(window) = select_override(&windows) {
            match self.load_active(window.template_id).await? {
                Some(template) => return Ok(Some(template)),
                None => warn!(
                    product_id = %product.id,
                    override_id = window.id,
                    template_id = %window.template_id,
                    "override points at missing or inactive template, falling back to default"
                ),
            }
        }

        match product.default_template_id {
            Some(id) => self.load_active(id).await,
            None => Ok(None),
        }
    }

    async fn load_active(
        &self,
        id: TemplateId,
    ) -> Result<Option<CommissionTemplate>, ProviderError> {
        Ok(self
            .catalog
            .fetch_template(id)
            .await?
            .filter(|t| t.status == TemplateStatus::Active))
    }
}
