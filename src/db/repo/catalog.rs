//! Catalog operations: users, products, templates, and override windows.
//!
//! Also implements the engine's provider ports, making `Repository` the
//! production adapter behind `CatalogProvider` and `ReferralProvider`.

use crate::domain::{
    CommissionKind, CommissionLevel, CommissionRule, CommissionTemplate, CompanyId, CustomerType,
    Decimal, Product, ProductId, TemplateId, TemplateStatus, TimeMs, TimeWindowOverride, User,
    UserId,
};
use crate::provider::{CatalogProvider, ProviderError, ReferralProvider};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

use super::Repository;

impl Repository {
    // =========================================================================
    // Reference data writes (seeding, admin sync)
    // =========================================================================

    /// Insert or replace a user and their upline link.
    pub async fn upsert_user(&self, user: &User) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (id, customer_type, upline_id)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                customer_type = excluded.customer_type,
                upline_id = excluded.upline_id
            "#,
        )
        .bind(user.id.as_str())
        .bind(user.customer_type.encode())
        .bind(user.upline_id.as_ref().map(|u| u.as_str()))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Insert or replace a product.
    pub async fn upsert_product(&self, product: &Product) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO products (id, default_template_id, partner_company_id)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                default_template_id = excluded.default_template_id,
                partner_company_id = excluded.partner_company_id
            "#,
        )
        .bind(product.id.as_str())
        .bind(product.default_template_id.map(|t| t.as_i64()))
        .bind(product.partner_company_id.as_ref().map(|c| c.as_str()))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Insert a template with its rules, in template order, in one transaction.
    pub async fn insert_template(
        &self,
        template_code: &str,
        template_name: &str,
        status: TemplateStatus,
        rules: &[CommissionRule],
    ) -> Result<TemplateId, sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "INSERT INTO commission_templates (template_code, template_name, status) VALUES (?, ?, ?)",
        )
        .bind(template_code)
        .bind(template_name)
        .bind(status.encode())
        .execute(&mut *tx)
        .await?;

        let template_id = result.last_insert_rowid();

        for (position, rule) in rules.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO commission_template_rules
                (template_id, position, level_type, customer_type, commission_kind, commission_value)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(template_id)
            .bind(position as i64)
            .bind(rule.level.encode())
            .bind(rule.customer_type.encode())
            .bind(rule.kind.encode())
            .bind(rule.value.to_canonical_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(TemplateId::new(template_id))
    }

    /// Insert a time-window override binding for a product.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_override(
        &self,
        product_id: &ProductId,
        template_id: TemplateId,
        start_ms: TimeMs,
        end_ms: TimeMs,
        priority: i32,
        status: TemplateStatus,
        created_ms: TimeMs,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO time_window_overrides
            (product_id, template_id, start_ms, end_ms, priority, status, created_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product_id.as_str())
        .bind(template_id.as_i64())
        .bind(start_ms.as_i64())
        .bind(end_ms.as_i64())
        .bind(priority)
        .bind(status.encode())
        .bind(created_ms.as_i64())
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    // =========================================================================
    // Catalog reads
    // =========================================================================

    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query("SELECT id, customer_type, upline_id FROM users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await?;

        Ok(row.and_then(|r| {
            let customer_type_str: String = r.get("customer_type");
            let Some(customer_type) = CustomerType::decode(&customer_type_str) else {
                warn!(user_id = %id, customer_type = %customer_type_str, "unknown customer type, treating user as missing");
                return None;
            };
            Some(User {
                id: UserId::new(r.get::<String, _>("id")),
                customer_type,
                upline_id: r.get::<Option<String>, _>("upline_id").map(UserId::new),
            })
        }))
    }

    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, default_template_id, partner_company_id FROM products WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| Product {
            id: ProductId::new(r.get::<String, _>("id")),
            default_template_id: r
                .get::<Option<i64>, _>("default_template_id")
                .map(TemplateId::new),
            partner_company_id: r
                .get::<Option<String>, _>("partner_company_id")
                .map(CompanyId::new),
        }))
    }

    /// Load a template with its rules in template order.
    ///
    /// Corrupt rule rows (unknown level type, kind, or customer type) are
    /// logged and skipped rather than failing the load.
    pub async fn get_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<CommissionTemplate>, sqlx::Error> {
        let header = sqlx::query(
            "SELECT id, template_code, template_name, status FROM commission_templates WHERE id = ?",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool())
        .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let status_str: String = header.get("status");
        let status = TemplateStatus::decode(&status_str).unwrap_or_else(|| {
            warn!(template_id = %id, status = %status_str, "unknown template status, treating as inactive");
            TemplateStatus::Inactive
        });

        let rule_rows = sqlx::query(
            r#"
            SELECT level_type, customer_type, commission_kind, commission_value
            FROM commission_template_rules
            WHERE template_id = ?
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(id.as_i64())
        .fetch_all(self.pool())
        .await?;

        let rules = rule_rows
            .iter()
            .filter_map(|r| decode_rule(id, r))
            .collect();

        Ok(Some(CommissionTemplate {
            id,
            template_code: header.get("template_code"),
            template_name: header.get("template_name"),
            status,
            rules,
        }))
    }

    /// Active override windows for a product that cover `at`.
    pub async fn get_active_overrides(
        &self,
        product_id: &ProductId,
        at: TimeMs,
    ) -> Result<Vec<TimeWindowOverride>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, template_id, start_ms, end_ms, priority, status, created_ms
            FROM time_window_overrides
            WHERE product_id = ? AND status = 'active' AND start_ms <= ? AND end_ms >= ?
            ORDER BY id ASC
            "#,
        )
        .bind(product_id.as_str())
        .bind(at.as_i64())
        .bind(at.as_i64())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|r| TimeWindowOverride {
                id: r.get("id"),
                product_id: ProductId::new(r.get::<String, _>("product_id")),
                template_id: TemplateId::new(r.get("template_id")),
                start_ms: TimeMs::new(r.get("start_ms")),
                end_ms: TimeMs::new(r.get("end_ms")),
                priority: r.get("priority"),
                status: TemplateStatus::Active,
                created_ms: TimeMs::new(r.get("created_ms")),
            })
            .collect())
    }
}

fn decode_rule(template_id: TemplateId, row: &sqlx::sqlite::SqliteRow) -> Option<CommissionRule> {
    let level_str: String = row.get("level_type");
    let customer_str: String = row.get("customer_type");
    let kind_str: String = row.get("commission_kind");
    let value_str: String = row.get("commission_value");

    let Some(level) = CommissionLevel::decode(&level_str) else {
        warn!(template_id = %template_id, level_type = %level_str, "unknown level type, skipping rule");
        return None;
    };
    let Some(customer_type) = CustomerType::decode(&customer_str) else {
        warn!(template_id = %template_id, customer_type = %customer_str, "unknown customer type, skipping rule");
        return None;
    };
    let Some(kind) = CommissionKind::decode(&kind_str) else {
        warn!(template_id = %template_id, commission_kind = %kind_str, "unknown commission kind, skipping rule");
        return None;
    };
    let value = match Decimal::from_str(&value_str) {
        Ok(v) => v,
        Err(e) => {
            warn!(template_id = %template_id, commission_value = %value_str, error = %e, "unparseable commission value, skipping rule");
            return None;
        }
    };

    Some(CommissionRule {
        level,
        customer_type,
        kind,
        value,
    })
}

#[async_trait]
impl CatalogProvider for Repository {
    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, ProviderError> {
        Ok(self.get_product(id).await?)
    }

    async fn fetch_template(
        &self,
        id: TemplateId,
    ) -> Result<Option<CommissionTemplate>, ProviderError> {
        Ok(self.get_template(id).await?)
    }

    async fn fetch_active_overrides(
        &self,
        product_id: &ProductId,
        at: TimeMs,
    ) -> Result<Vec<TimeWindowOverride>, ProviderError> {
        Ok(self.get_active_overrides(product_id, at).await?)
    }
}

#[async_trait]
impl ReferralProvider for Repository {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, ProviderError> {
        Ok(self.get_user(id).await?)
    }
}
