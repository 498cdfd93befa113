//! In-memory provider for unit tests.

use crate::domain::{
    CommissionTemplate, Product, ProductId, TemplateId, TimeMs, TimeWindowOverride, User, UserId,
};
use crate::provider::{CatalogProvider, ProviderError, ReferralProvider};
use async_trait::async_trait;
use std::collections::HashMap;

/// In-memory implementation of both provider ports.
///
/// Built up front with the fixture data a test needs, then shared read-only.
#[derive(Debug, Default)]
pub struct MockProvider {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    templates: HashMap<TemplateId, CommissionTemplate>,
    overrides: Vec<TimeWindowOverride>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn add_product(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn add_template(&mut self, template: CommissionTemplate) {
        self.templates.insert(template.id, template);
    }

    pub fn add_override(&mut self, window: TimeWindowOverride) {
        self.overrides.push(window);
    }
}

#[async_trait]
impl CatalogProvider for MockProvider {
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, ProviderError> {
        Ok(self.products.get(id).cloned())
    }

    async fn fetch_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<CommissionTemplate>, ProviderError> {
        Ok(self.templates.get(&id).cloned())
    }

    async fn fetch_active_overrides(
        &self,
        product_id: &ProductId,
        at: TimeMs,
    ) -> Result<Vec<TimeWindowOverride>, ProviderError> {
        Ok(self
            .overrides
            .iter()
            .filter(|w| &w.product_id == product_id && w.covers(at))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReferralProvider for MockProvider {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, ProviderError> {
        Ok(self.users.get(id).cloned())
    }
}
