//! Data-access ports for the engine.
//!
//! The engine never touches a global data layer; everything it reads comes
//! through these traits, injected at construction. The SQLite `Repository`
//! implements both in production; `MockProvider` backs the unit tests.

use crate::domain::{
    CommissionTemplate, Product, ProductId, TemplateId, TimeMs, TimeWindowOverride, User, UserId,
};
use async_trait::async_trait;
use thiserror::Error;

pub mod mock;

pub use mock::MockProvider;

/// Error type for provider lookups.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("store error: {0}")]
    Store(String),
    #[error("corrupt record: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        ProviderError::Store(err.to_string())
    }
}

/// Product catalog and commission template lookups.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch a product, or None if unknown.
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, ProviderError>;

    /// Fetch a template with its rules in template order, or None if unknown.
    async fn fetch_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<CommissionTemplate>, ProviderError>;

    /// Fetch the active overrides for a product that cover `at`.
    ///
    /// No ordering is guaranteed; precedence is the resolver's job.
    async fn fetch_active_overrides(
        &self,
        product_id: &ProductId,
        at: TimeMs,
    ) -> Result<Vec<TimeWindowOverride>, ProviderError>;
}

/// Referral graph lookups.
#[async_trait]
pub trait ReferralProvider: Send + Sync {
    /// Fetch a user, or None if the id does not resolve.
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, ProviderError>;
}
