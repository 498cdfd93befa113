pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod provider;

pub use config::Config;
pub use db::{init_db, Repository, SummaryFilter, UserCommissionSummary};
pub use domain::{
    Beneficiary, CommissionDraft, CommissionKind, CommissionLevel, CommissionRecord,
    CommissionRule, CommissionStatus, CommissionTemplate, CustomerType, Decimal, LineItem, Order,
    OrderId, Product, ProductId, TemplateId, TemplateStatus, TimeMs, User, UserId,
};
pub use engine::{BeneficiaryTracer, CommissionCalculator, TemplateResolver};
pub use error::AppError;
pub use orchestration::CommissionGenerator;
pub use provider::{CatalogProvider, MockProvider, ProviderError, ReferralProvider};
