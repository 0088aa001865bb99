//! Transfer batch execution
//!
//! One external transfer per planned contribution, run in fixed-size
//! sub-batches to bound concurrent calls against the payment service. Every
//! outcome is captured independently; one declined or timed-out transfer
//! never stops the rest of the batch.

use std::sync::Arc;

use fundlock_core::{Amount, Currency, ReleaseType};
use fundlock_store::{TransferGateway, TransferMetadata, TransferRequest};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::calculator::PlannedRelease;

/// Release-wide inputs shared by every transfer in the batch
#[derive(Debug, Clone)]
pub struct TransferContext {
    pub destination: String,
    pub currency: Currency,
    pub project_id: String,
    pub release_type: ReleaseType,
    pub milestone_id: Option<String>,
}

/// Outcome of one transfer attempt
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub contribution_id: String,
    pub amount: Amount,
    /// Transfer id on success, error message on failure
    pub result: Result<String, String>,
}

/// Executes transfers in bounded sub-batches
pub struct TransferBatchExecutor {
    gateway: Arc<dyn TransferGateway>,
    batch_size: usize,
}

impl TransferBatchExecutor {
    pub fn new(gateway: Arc<dyn TransferGateway>, batch_size: usize) -> Self {
        Self {
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    /// Execute the plan, returning one outcome per planned contribution in
    /// input order.
    pub async fn execute(
        &self,
        plan: &[PlannedRelease],
        context: &TransferContext,
    ) -> Vec<TransferOutcome> {
        let mut outcomes: Vec<(usize, TransferOutcome)> = Vec::with_capacity(plan.len());

        for chunk in plan.chunks(self.batch_size) {
            let mut tasks = JoinSet::new();
            for (offset, planned) in chunk.iter().enumerate() {
                let gateway = Arc::clone(&self.gateway);
                let request = TransferRequest {
                    destination: context.destination.clone(),
                    amount: planned.amount,
                    currency: context.currency.clone(),
                    metadata: TransferMetadata {
                        contribution_id: planned.contribution_id.clone(),
                        project_id: context.project_id.clone(),
                        release_type: context.release_type.to_string(),
                        milestone_id: context.milestone_id.clone(),
                    },
                };
                let contribution_id = planned.contribution_id.clone();
                let amount = planned.amount;
                tasks.spawn(async move {
                    let result = gateway
                        .create_transfer(request)
                        .await
                        .map(|receipt| receipt.transfer_id)
                        .map_err(|e| e.to_string());
                    (
                        offset,
                        TransferOutcome {
                            contribution_id,
                            amount,
                            result,
                        },
                    )
                });
            }

            let base = outcomes.len();
            let mut completed = vec![false; chunk.len()];
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((offset, outcome)) => {
                        if let Err(error) = &outcome.result {
                            warn!(
                                contribution_id = %outcome.contribution_id,
                                error = %error,
                                "transfer failed"
                            );
                        } else {
                            debug!(
                                contribution_id = %outcome.contribution_id,
                                amount = %outcome.amount,
                                "transfer created"
                            );
                        }
                        completed[offset] = true;
                        outcomes.push((base + offset, outcome));
                    }
                    Err(join_error) => {
                        warn!(error = %join_error, "transfer task aborted");
                    }
                }
            }

            // A panicked or cancelled task never reports back through the
            // join handle; its contribution still gets a failed outcome so
            // the result set stays one-to-one with the plan.
            for (offset, planned) in chunk.iter().enumerate() {
                if !completed[offset] {
                    outcomes.push((
                        base + offset,
                        TransferOutcome {
                            contribution_id: planned.contribution_id.clone(),
                            amount: planned.amount,
                            result: Err("transfer task aborted before completion".to_string()),
                        },
                    ));
                }
            }
        }

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
