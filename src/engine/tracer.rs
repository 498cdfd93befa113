//! Beneficiary Tracer: walks the buyer's upline referral chain.
//!
//! The walk is an explicit bounded loop. The depth bound exists to tolerate a
//! corrupted or cyclic upline graph without looping forever; the business rule
//! says the graph is acyclic, the tracer does not trust it.

use crate::domain::{Beneficiary, User};
use crate::provider::{ProviderError, ReferralProvider};
use std::sync::Arc;
use tracing::warn;

/// Deepest upline level paid out. Level 0 is the buyer, so a trace yields at
/// most `DEFAULT_MAX_UPLINE_DEPTH + 1` beneficiaries.
pub const DEFAULT_MAX_UPLINE_DEPTH: u8 = 5;

/// Walks upline links, producing beneficiaries ordered by level.
pub struct BeneficiaryTracer {
    referrals: Arc<dyn ReferralProvider>,
    max_upline_depth: u8,
}

impl BeneficiaryTracer {
    pub fn new(referrals: Arc<dyn ReferralProvider>, max_upline_depth: u8) -> Self {
        Self {
            referrals,
            max_upline_depth,
        }
    }

    /// Trace the referral chain starting at `buyer`.
    ///
    /// The buyer is always the first entry at level 0. The walk stops when an
    /// upline link is absent, when a link points at a user that does not
    /// resolve (logged, trace truncated, never an error), or when
    /// `max_upline_depth` is reached.
    ///
    /// # Errors
    /// Returns an error only on provider failure.
    pub async fn trace(&self, buyer: &User) -> Result<Vec<Beneficiary>, ProviderError> {
        let mut beneficiaries = vec![Beneficiary {
            user_id: buyer.id.clone(),
            level: 0,
        }];

        let mut next_upline = buyer.upline_id.clone();
        let mut level: u8 = 0;

        while let Some(upline_id) = next_upline {
            if level >= self.max_upline_depth {
                break;
            }
            level += 1;

            match self.referrals.fetch_user(&upline_id).await? {
                Some(upline) => {
                    next_upline = upline.upline_id.clone();
                    beneficiaries.push(Beneficiary {
                        user_id: upline.id,
                        level,
                    });
                }
                None => {
                    warn!(
                        buyer_id = %buyer.id,
                        upline_id = %upline_id,
                        level,
                        "upline reference points at missing user, truncating trace"
                    );
                    break;
                }
            }
        }

        Ok(beneficiaries)
    }
}
