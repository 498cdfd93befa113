//! Commission Calculator: turns a completed order into unsaved commission
//! drafts.
//!
//! Per line item: resolve the template in force, then match each rule against
//! the beneficiaries traced once for the whole order. Resolution gaps and
//! unmatched rules skip silently; only provider failures and an unresolvable
//! buyer are errors.

use crate::domain::{
    Beneficiary, BeneficiaryType, CommissionDraft, CommissionKind, CommissionLevel, Order,
    Product, UserId,
};
use crate::engine::{BeneficiaryTracer, TemplateResolver};
use crate::provider::{CatalogProvider, ProviderError, ReferralProvider};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CalculationError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// The order references a buyer the referral graph does not know.
    #[error("unknown buyer: {0}")]
    UnknownBuyer(UserId),
}

/// Computes commission drafts for completed orders.
pub struct CommissionCalculator {
    catalog: Arc<dyn CatalogProvider>,
    resolver: TemplateResolver,
    tracer: BeneficiaryTracer,
    referrals: Arc<dyn ReferralProvider>,
}

impl CommissionCalculator {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        referrals: Arc<dyn ReferralProvider>,
        max_upline_depth: u8,
    ) -> Self {
        Self {
            resolver: TemplateResolver::new(catalog.clone()),
            tracer: BeneficiaryTracer::new(referrals.clone(), max_upline_depth),
            catalog,
            referrals,
        }
    }

    /// Compute the full set of commission drafts for `order`.
    ///
    /// Deterministic: the same order, template set, and upline graph always
    /// yield the same drafts in the same sequence. Amounts are rounded to
    /// currency precision here, at the draft boundary.
    ///
    /// # Errors
    /// Fails on provider errors or an unknown buyer; never on a resolution
    /// gap or an unmatched rule.
    pub async fn calculate(&self, order: &Order) -> Result<Vec<CommissionDraft>, CalculationError> {
        let buyer = self
            .referrals
            .fetch_user(&order.buyer_id)
            .await?
            .ok_or_else(|| CalculationError::UnknownBuyer(order.buyer_id.clone()))?;

        // Traced once per order, shared read-only across line items.
        let beneficiaries = self.tracer.trace(&buyer).await?;

        let mut drafts = Vec::new();

        for (index, item) in order.line_items.iter().enumerate() {
            let Some(product) = self.catalog.fetch_product(&item.product_id).await? else {
                warn!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    "order references unknown product, skipping line item"
                );
                continue;
            };

            let Some(template) = self.resolver.resolve(&product, order.placed_ms).await? else {
                debug!(
                    order_id = %order.id,
                    product_id = %item.product_id,
                    "no commission template resolves, line item contributes nothing"
                );
                continue;
            };

            for rule in template.effective_rules(buyer.customer_type) {
                let Some((beneficiary_id, beneficiary_type)) =
                    match_beneficiary(rule.level, &beneficiaries, &product)
                else {
                    continue;
                };

                let amount = match rule.kind {
                    CommissionKind::Percentage => item.total().percent(rule.value),
                    // Flat payout: independent of quantity and item total.
                    CommissionKind::Fixed => rule.value,
                };

                drafts.push(CommissionDraft {
                    order_id: order.id.clone(),
                    line_index: index as u32,
                    product_id: item.product_id.clone(),
                    beneficiary_id,
                    beneficiary_type,
                    level: rule.level,
                    kind: rule.kind,
                    rate: rule.value,
                    amount: amount.round_money(),
                    applied_template_id: template.id,
                });
            }
        }

        Ok(drafts)
    }
}

/// Pick the beneficiary a rule pays, or None when nobody is positioned for it
/// (chain shorter than the rule's depth, or no partner company on the product).
fn match_beneficiary(
    level: CommissionLevel,
    beneficiaries: &[Beneficiary],
    product: &Product,
) -> Option<(String, BeneficiaryType)> {
    match level {
        CommissionLevel::Direct | CommissionLevel::Upline(_) => {
            let depth = level.chain_depth().expect("chain level has a depth");
            beneficiaries
                .iter()
                .find(|b| b.level == depth)
                .map(|b| (b.user_id.as_str().to_string(), BeneficiaryType::User))
        }
        CommissionLevel::PartnerCompany => product
            .partner_company_id
            .as_ref()
            .map(|c| (c.as_str().to_string(), BeneficiaryType::Company)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CommissionRule, CommissionTemplate, CustomerType, Decimal, LineItem, OrderId, ProductId,
        TemplateId, TemplateStatus, TimeMs, User,
    };
    use crate::engine::DEFAULT_MAX_UPLINE_DEPTH;
    use crate::provider::MockProvider;

    fn pct_rule(level: CommissionLevel, value: &str) -> CommissionRule {
        CommissionRule {
            level,
            customer_type: CustomerType::All,
            kind: CommissionKind::Percentage,
            value: Decimal::from_str_canonical(value).unwrap(),
        }
    }

    fn fixed_rule(level: CommissionLevel, value: &str) -> CommissionRule {
        CommissionRule {
            level,
            customer_type: CustomerType::All,
            kind: CommissionKind::Fixed,
            value: Decimal::from_str_canonical(value).unwrap(),
        }
    }

    fn standard_fixture() -> MockProvider {
        let mut mock = MockProvider::new();
        mock.add_user(User {
            id: UserId::new("buyer"),
            customer_type: CustomerType::Regular,
            upline_id: Some(UserId::new("u1")),
        });
        mock.add_user(User {
            id: UserId::new("u1"),
            customer_type: CustomerType::Regular,
            upline_id: Some(UserId::new("u2")),
        });
        mock.add_user(User {
            id: UserId::new("u2"),
            customer_type: CustomerType::Regular,
            upline_id: None,
        });
        mock.add_template(CommissionTemplate {
            id: TemplateId::new(1),
            template_code: "STD".to_string(),
            template_name: "Standard".to_string(),
            status: TemplateStatus::Active,
            rules: vec![
                pct_rule(CommissionLevel::Direct, "30"),
                pct_rule(CommissionLevel::Upline(1), "10"),
                pct_rule(CommissionLevel::Upline(2), "5"),
            ],
        });
        mock.add_product(Product {
            id: ProductId::new("p-1"),
            default_template_id: Some(TemplateId::new(1)),
            partner_company_id: None,
        });
        mock
    }

    fn calculator(mock: MockProvider) -> CommissionCalculator {
        let shared = Arc::new(mock);
        CommissionCalculator::new(shared.clone(), shared, DEFAULT_MAX_UPLINE_DEPTH)
    }

    fn order(items: Vec<LineItem>) -> Order {
        Order {
            id: OrderId::new("ord-1"),
            buyer_id: UserId::new("buyer"),
            placed_ms: TimeMs::new(5000),
            line_items: items,
        }
    }

    fn line(product: &str, price: &str, qty: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(product),
            unit_price: Decimal::from_str_canonical(price).unwrap(),
            quantity: qty,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario_three_levels() {
        let calc = calculator(standard_fixture());
        let drafts = calc
            .calculate(&order(vec![line("p-1", "1000", 1)]))
            .await
            .unwrap();

        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].beneficiary_id, "buyer");
        assert_eq!(drafts[0].amount.to_canonical_string(), "300");
        assert_eq!(drafts[1].beneficiary_id, "u1");
        assert_eq!(drafts[1].amount.to_canonical_string(), "100");
        assert_eq!(drafts[2].beneficiary_id, "u2");
        assert_eq!(drafts[2].amount.to_canonical_string(), "50");
    }

    #[tokio::test]
    async fn test_percentage_uses_unit_price_times_quantity() {
        let calc = calculator(standard_fixture());
        let drafts = calc
            .calculate(&order(vec![line("p-1", "100", 2)]))
            .await
            .unwrap();

        // 30% of 200
        assert_eq!(drafts[0].amount.to_canonical_string(), "60");
    }

    #[tokio::test]
    async fn test_fixed_amount_ignores_quantity() {
        let mut mock = standard_fixture();
        mock.add_template(CommissionTemplate {
            id: TemplateId::new(2),
            template_code: "FLAT".to_string(),
            template_name: "Flat".to_string(),
            status: TemplateStatus::Active,
            rules: vec![fixed_rule(CommissionLevel::Direct, "50")],
        });
        mock.add_product(Product {
            id: ProductId::new("p-flat"),
            default_template_id: Some(TemplateId::new(2)),
            partner_company_id: None,
        });
        let calc = calculator(mock);

        let one = calc
            .calculate(&order(vec![line("p-flat", "10", 1)]))
            .await
            .unwrap();
        let hundred = calc
            .calculate(&order(vec![line("p-flat", "10", 100)]))
            .await
            .unwrap();

        assert_eq!(one[0].amount.to_canonical_string(), "50");
        assert_eq!(hundred[0].amount.to_canonical_string(), "50");
    }

    #[tokio::test]
    async fn test_rules_beyond_chain_depth_skip_silently() {
        let mut mock = standard_fixture();
        // u2 has no upline, so upline_3 and upline_4 have nobody to pay.
        mock.add_template(CommissionTemplate {
            id: TemplateId::new(3),
            template_code: "DEEP".to_string(),
            template_name: "Deep".to_string(),
            status: TemplateStatus::Active,
            rules: vec![
                pct_rule(CommissionLevel::Direct, "30"),
                pct_rule(CommissionLevel::Upline(3), "5"),
                pct_rule(CommissionLevel::Upline(4), "5"),
            ],
        });
        mock.add_product(Product {
            id: ProductId::new("p-deep"),
            default_template_id: Some(TemplateId::new(3)),
            partner_company_id: None,
        });
        let calc = calculator(mock);

        let drafts = calc
            .calculate(&order(vec![line("p-deep", "100", 1)]))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].level, CommissionLevel::Direct);
    }

    #[tokio::test]
    async fn test_missing_template_skips_item_but_not_siblings() {
        let mut mock = standard_fixture();
        mock.add_product(Product {
            id: ProductId::new("p-bare"),
            default_template_id: None,
            partner_company_id: None,
        });
        let calc = calculator(mock);

        let drafts = calc
            .calculate(&order(vec![line("p-bare", "500", 1), line("p-1", "1000", 1)]))
            .await
            .unwrap();

        // p-bare contributes nothing; p-1 still pays all three levels.
        assert_eq!(drafts.len(), 3);
        assert!(drafts.iter().all(|d| d.product_id.as_str() == "p-1"));
        assert!(drafts.iter().all(|d| d.line_index == 1));
    }

    #[tokio::test]
    async fn test_partner_company_rule_pays_product_company() {
        let mut mock = standard_fixture();
        mock.add_template(CommissionTemplate {
            id: TemplateId::new(4),
            template_code: "PARTNER".to_string(),
            template_name: "Partner".to_string(),
            status: TemplateStatus::Active,
            rules: vec![
                pct_rule(CommissionLevel::Direct, "20"),
                pct_rule(CommissionLevel::PartnerCompany, "15"),
            ],
        });
        mock.add_product(Product {
            id: ProductId::new("p-partner"),
            default_template_id: Some(TemplateId::new(4)),
            partner_company_id: Some(crate::domain::CompanyId::new("acme")),
        });
        let calc = calculator(mock);

        let drafts = calc
            .calculate(&order(vec![line("p-partner", "100", 1)]))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[1].beneficiary_id, "acme");
        assert_eq!(drafts[1].beneficiary_type, BeneficiaryType::Company);
        assert_eq!(drafts[1].amount.to_canonical_string(), "15");
    }

    #[tokio::test]
    async fn test_partner_company_rule_without_company_skips() {
        let mut mock = standard_fixture();
        mock.add_template(CommissionTemplate {
            id: TemplateId::new(4),
            template_code: "PARTNER".to_string(),
            template_name: "Partner".to_string(),
            status: TemplateStatus::Active,
            rules: vec![pct_rule(CommissionLevel::PartnerCompany, "15")],
        });
        mock.add_product(Product {
            id: ProductId::new("p-nocompany"),
            default_template_id: Some(TemplateId::new(4)),
            partner_company_id: None,
        });
        let calc = calculator(mock);

        let drafts = calc
            .calculate(&order(vec![line("p-nocompany", "100", 1)]))
            .await
            .unwrap();
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_calculation_is_identical() {
        let calc = calculator(standard_fixture());
        let ord = order(vec![line("p-1", "1000", 1), line("p-1", "33.33", 3)]);

        let first = calc.calculate(&ord).await.unwrap();
        let second = calc.calculate(&ord).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_buyer_is_an_error() {
        let calc = calculator(standard_fixture());
        let mut ord = order(vec![line("p-1", "100", 1)]);
        ord.buyer_id = UserId::new("ghost");

        let err = calc.calculate(&ord).await.unwrap_err();
        assert!(matches!(err, CalculationError::UnknownBuyer(_)));
    }

    #[tokio::test]
    async fn test_amount_rounded_at_draft_boundary() {
        let calc = calculator(standard_fixture());
        // 30% of 33.33 * 1 = 9.999 -> 10.00
        let drafts = calc
            .calculate(&order(vec![line("p-1", "33.33", 1)]))
            .await
            .unwrap();
        assert_eq!(drafts[0].amount.to_canonical_string(), "10");
    }
}
