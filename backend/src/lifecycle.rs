//! Proposal lifecycle: ACTIVE → ACCEPTED | REJECTED | EXPIRED. All terminal,
//! no further transitions.

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{Booking, ProposalStatus, RequestStatus};
use crate::services::notifier::Notifier;
use crate::services::payments::PaymentProvider;
use crate::store::Store;

/// Accepts an ACTIVE, unexpired proposal.
///
/// The charge happens before the commit: a payment failure leaves the
/// proposal ACTIVE so the customer can retry. The commit itself (proposal →
/// ACCEPTED, booking insert, request → CONFIRMED) is one atomic store
/// operation that re-validates status and expiry; losing that race triggers
/// a compensating refund.
pub async fn accept_proposal<S: Store>(
    store: &S,
    payments: &dyn PaymentProvider,
    notifier: &dyn Notifier,
    proposal_id: Uuid,
) -> Result<Booking, EngineError> {
    let now = Utc::now();
    let proposal = store
        .get_proposal(proposal_id)
        .await?
        .ok_or(EngineError::NotFound("proposal"))?;

    if proposal.status != ProposalStatus::Active {
        return Err(EngineError::invalid_state(format!(
            "proposal {} is {:?}, only ACTIVE proposals can be accepted",
            proposal_id, proposal.status
        )));
    }
    if proposal.is_expired(now) {
        return Err(EngineError::invalid_state(format!(
            "proposal {} expired at {}",
            proposal_id, proposal.expires_at
        )));
    }

    let booking_id = Uuid::new_v4();
    let receipt = payments
        .charge(proposal.price_cents, booking_id)
        .map_err(|e| EngineError::Payment(e.to_string()))?;

    let booking = Booking {
        id: booking_id,
        proposal_id,
        request_id: proposal.request_id,
        outbound_trip_id: proposal.outbound_trip_id,
        return_trip_id: proposal.return_trip_id,
        price_cents: proposal.price_cents,
        payment_txn_id: receipt.transaction_id.clone(),
        created_at: now,
    };

    let committed = store.finalize_acceptance(proposal_id, now, &booking).await?;
    if !committed {
        if let Err(e) = payments.refund(&receipt.transaction_id, proposal.price_cents) {
            error!(
                "❌ refund of {} failed after lost accept race on proposal {}: {}",
                receipt.transaction_id, proposal_id, e
            );
        }
        return Err(EngineError::invalid_state(format!(
            "proposal {proposal_id} is no longer active"
        )));
    }

    info!(
        "✅ proposal {} accepted, booking {} for request {}",
        proposal_id, booking.id, proposal.request_id
    );
    notifier.booking_confirmed(proposal.request_id, booking.id);
    Ok(booking)
}

/// Rejects an ACTIVE proposal; the request returns to REQUESTED and re-enters
/// the next matching run.
pub async fn reject_proposal<S: Store>(store: &S, proposal_id: Uuid) -> Result<(), EngineError> {
    let proposal = store
        .get_proposal(proposal_id)
        .await?
        .ok_or(EngineError::NotFound("proposal"))?;

    if proposal.status != ProposalStatus::Active {
        return Err(EngineError::invalid_state(format!(
            "proposal {} is {:?}, only ACTIVE proposals can be rejected",
            proposal_id, proposal.status
        )));
    }

    if !store.reject_proposal(proposal_id).await? {
        return Err(EngineError::invalid_state(format!(
            "proposal {proposal_id} is no longer active"
        )));
    }

    info!(
        "proposal {} rejected, request {} back to REQUESTED",
        proposal_id, proposal.request_id
    );
    Ok(())
}

/// Expiry sweep: bulk-transitions every ACTIVE proposal past `now` to
/// EXPIRED and requeues each owning request (PROPOSED → REQUESTED) so it is
/// matchable again. Safe to call repeatedly.
pub async fn cleanup_expired_proposals<S: Store>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<usize, EngineError> {
    let expired = store.expire_proposals_before(now).await?;

    for proposal in &expired {
        match store
            .transition_request(
                proposal.request_id,
                RequestStatus::Proposed,
                RequestStatus::Requested,
            )
            .await
        {
            // Request had already moved on (confirmed or cancelled); leave it.
            Ok(_) => {}
            Err(e) => {
                error!(
                    "failed to requeue request {} after proposal {} expired: {}",
                    proposal.request_id, proposal.id, e
                );
            }
        }
    }

    if !expired.is_empty() {
        info!("🧹 expired {} stale proposals", expired.len());
    }
    Ok(expired.len())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::services::notifier::LogNotifier;
    use crate::services::payments::MockPaymentProvider;
    use crate::store::InMemoryStore;
    use crate::test_helpers::{
        FailingPayments, FaultyStore, RecordingPayments, proposal_for, request_at, ts,
    };

    async fn seed_proposed<S: Store>(
        store: &S,
        expires_at: DateTime<Utc>,
    ) -> crate::models::Proposal {
        let mut request = request_at(ts(9, 0), 52.500, 13.400);
        request.status = RequestStatus::Proposed;
        store.insert_request(&request).await.unwrap();
        let proposal = proposal_for(request.id, expires_at);
        store.insert_proposal(&proposal).await.unwrap();
        proposal
    }

    #[tokio::test]
    async fn test_accept_creates_booking_and_confirms_request() {
        let store = InMemoryStore::new();
        let proposal = seed_proposed(&store, Utc::now() + Duration::minutes(30)).await;

        let booking = accept_proposal(&store, &MockPaymentProvider, &LogNotifier, proposal.id)
            .await
            .unwrap();
        assert_eq!(booking.proposal_id, proposal.id);
        assert_eq!(booking.price_cents, proposal.price_cents);
        assert!(
            store.get_booking(booking.id).await.unwrap().is_some(),
            "booking must be persisted"
        );

        let stored = store.get_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Accepted);
        let request = store
            .get_request(proposal.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_accept_is_only_valid_once() {
        let store = InMemoryStore::new();
        let proposal = seed_proposed(&store, Utc::now() + Duration::minutes(30)).await;

        accept_proposal(&store, &MockPaymentProvider, &LogNotifier, proposal.id)
            .await
            .unwrap();
        let second = accept_proposal(&store, &MockPaymentProvider, &LogNotifier, proposal.id).await;
        assert!(matches!(second, Err(EngineError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_expired_proposal_cannot_be_accepted() {
        let store = InMemoryStore::new();
        // Expired one second ago
        let proposal = seed_proposed(&store, Utc::now() - Duration::seconds(1)).await;

        let result = accept_proposal(&store, &MockPaymentProvider, &LogNotifier, proposal.id).await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));

        let request = store
            .get_request(proposal.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Proposed, "status unchanged");
    }

    #[tokio::test]
    async fn test_payment_failure_leaves_proposal_active() {
        let store = InMemoryStore::new();
        let proposal = seed_proposed(&store, Utc::now() + Duration::minutes(30)).await;

        let result = accept_proposal(&store, &FailingPayments, &LogNotifier, proposal.id).await;
        assert!(matches!(result, Err(EngineError::Payment(_))));

        let stored = store.get_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Active, "retry stays possible");
        let request = store
            .get_request(proposal.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Proposed);
    }

    #[tokio::test]
    async fn test_lost_accept_race_refunds_the_charge() {
        let mut store = FaultyStore::new();
        store.deny_finalize = true;
        let proposal = seed_proposed(&store, Utc::now() + Duration::minutes(30)).await;

        let payments = RecordingPayments::new();
        let result = accept_proposal(&store, &payments, &LogNotifier, proposal.id).await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
        assert_eq!(payments.charge_count(), 1, "charge happens before commit");
        assert_eq!(payments.refund_count(), 1, "lost commit refunds the charge");

        let stored = store.get_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Active);
    }

    #[tokio::test]
    async fn test_reject_requeues_request() {
        let store = InMemoryStore::new();
        let proposal = seed_proposed(&store, Utc::now() + Duration::minutes(30)).await;

        reject_proposal(&store, proposal.id).await.unwrap();

        let stored = store.get_proposal(proposal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProposalStatus::Rejected);
        let request = store
            .get_request(proposal.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Requested);
    }

    #[tokio::test]
    async fn test_missing_proposal_is_not_found() {
        let store = InMemoryStore::new();
        let result = accept_proposal(
            &store,
            &MockPaymentProvider,
            &LogNotifier,
            Uuid::new_v4(),
        )
        .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert!(matches!(
            reject_proposal(&store, Uuid::new_v4()).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_expires_only_stale_proposals() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let stale = seed_proposed(&store, now - Duration::minutes(5)).await;
        let fresh_a = seed_proposed(&store, now + Duration::minutes(30)).await;
        let fresh_b = seed_proposed(&store, now + Duration::minutes(45)).await;

        let count = cleanup_expired_proposals(&store, now).await.unwrap();
        assert_eq!(count, 1);

        assert_eq!(
            store.get_proposal(stale.id).await.unwrap().unwrap().status,
            ProposalStatus::Expired
        );
        for fresh in [&fresh_a, &fresh_b] {
            assert_eq!(
                store.get_proposal(fresh.id).await.unwrap().unwrap().status,
                ProposalStatus::Active
            );
        }

        // The starved request re-enters matching
        assert_eq!(
            store.get_request(stale.request_id).await.unwrap().unwrap().status,
            RequestStatus::Requested
        );
        assert_eq!(
            store
                .get_request(fresh_a.request_id)
                .await
                .unwrap()
                .unwrap()
                .status,
            RequestStatus::Proposed
        );

        // Second sweep finds nothing
        assert_eq!(cleanup_expired_proposals(&store, now).await.unwrap(), 0);
    }
}
