//! Payment collaborator. Invoked synchronously from the accept path; a
//! failure here must surface to the caller of accept.

use rand::Rng;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PaymentError(pub String);

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub transaction_id: String,
}

pub trait PaymentProvider: Send + Sync {
    fn charge(&self, amount_cents: i64, booking_ref: Uuid) -> Result<PaymentReceipt, PaymentError>;
    fn refund(&self, transaction_id: &str, amount_cents: i64) -> Result<(), PaymentError>;
}

/// Always-succeeding processor for environments without a real PSP.
pub struct MockPaymentProvider;

impl PaymentProvider for MockPaymentProvider {
    fn charge(&self, amount_cents: i64, booking_ref: Uuid) -> Result<PaymentReceipt, PaymentError> {
        let mut rng = rand::rng();
        let raw: [u8; 12] = rng.random();
        let transaction_id = format!("txn_{}", hex::encode(raw));
        info!(
            "💳 charged {} cents for booking {} ({})",
            amount_cents, booking_ref, transaction_id
        );
        Ok(PaymentReceipt { transaction_id })
    }

    fn refund(&self, transaction_id: &str, amount_cents: i64) -> Result<(), PaymentError> {
        info!("💳 refunded {} cents on {}", amount_cents, transaction_id);
        Ok(())
    }
}
