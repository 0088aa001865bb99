//! Release engine - Main orchestrator
//!
//! Drives a release request through the full pipeline:
//!
//! ```text
//! ReleaseRequest
//!        │
//!        ▼
//! ┌─────────────────┐
//! │ Validation +    │──► InvalidArgument / PermissionDenied
//! │ permission gate │    (no side effects yet)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Condition       │──► FailedPrecondition (no transfers attempted)
//! │ evaluation      │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Per-contribution│──► zero-amount contributions drop out
//! │ calculation     │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Transfer batch  │──► per-item failures captured, never raised
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ Ledger + state  │──► successes only, one contribution per atomic unit
//! └────────┬────────┘
//!          ▼
//!   notifications / metrics (fire-and-forget)
//! ```

use std::sync::Arc;

use chrono::Utc;
use fundlock_core::{require_caller, Amount, Caller, EngineError, EngineResult, Project};
use fundlock_ledger::{LedgerStore, LedgerUpdater, ReleaseApplied, ReleaseRecord};
use fundlock_store::{
    AuditStore, ContributionStore, MetricEvent, MetricsSink, Notification, NotificationSink,
    ProjectStore, StoreError, TransferGateway,
};
use tracing::{info, warn};

use crate::access::authorize_release;
use crate::calculator::{plan_releases, PlannedRelease};
use crate::conditions::evaluate_conditions;
use crate::config::ReleaseConfig;
use crate::request::{ContributionReleaseResult, ReleaseRequest, ReleaseResponse};
use crate::transfer::{TransferBatchExecutor, TransferContext};

/// Orchestrates escrow releases end to end
pub struct ReleaseEngine {
    projects: Arc<dyn ProjectStore>,
    contributions: Arc<dyn ContributionStore>,
    audits: Arc<dyn AuditStore>,
    executor: TransferBatchExecutor,
    updater: LedgerUpdater,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<dyn MetricsSink>,
    config: ReleaseConfig,
}

impl ReleaseEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        contributions: Arc<dyn ContributionStore>,
        audits: Arc<dyn AuditStore>,
        gateway: Arc<dyn TransferGateway>,
        ledger: Arc<dyn LedgerStore>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<dyn MetricsSink>,
        config: ReleaseConfig,
    ) -> Self {
        let executor = TransferBatchExecutor::new(gateway, config.transfer_batch_size);
        let updater = LedgerUpdater::new(Arc::clone(&contributions), ledger);
        Self {
            projects,
            contributions,
            audits,
            executor,
            updater,
            notifier,
            metrics,
            config,
        }
    }

    /// Execute a release request.
    ///
    /// Validation, permission, and gating failures abort before any side
    /// effect. Once transfer execution begins, per-contribution failures are
    /// reported in the response and the operation still completes.
    pub async fn execute(
        &self,
        caller: Option<&Caller>,
        request: ReleaseRequest,
    ) -> EngineResult<ReleaseResponse> {
        request.validate()?;
        let caller = require_caller(caller)?;

        let project = self
            .projects
            .project(&request.project_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(id) => EngineError::not_found("project", id),
                other => other.into(),
            })?;

        authorize_release(
            self.audits.as_ref(),
            Some(caller),
            &project,
            request.release_type,
        )
        .await?;

        // Bypass is honored only for admin callers.
        let bypass = request.bypass_safety_checks && caller.is_admin();
        let approved = evaluate_conditions(
            &project,
            request.release_type,
            request.milestone_id.as_deref(),
            bypass,
        )?;

        let held = self
            .contributions
            .held_contributions(&project.id)
            .await
            .map_err(EngineError::from)?;
        let plan = plan_releases(&held, &approved, request.release_percentage);

        info!(
            project_id = %project.id,
            release_type = %request.release_type,
            milestone_id = ?approved.milestone_id,
            contributions = plan.len(),
            bypass,
            "release approved, executing transfers"
        );

        let context = TransferContext {
            destination: project
                .payout_account
                .clone()
                .unwrap_or_else(|| self.config.fallback_payout_account.clone()),
            currency: project.funding.currency.clone(),
            project_id: project.id.clone(),
            release_type: approved.release_type,
            milestone_id: approved.milestone_id.clone(),
        };
        let outcomes = self.executor.execute(&plan, &context).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut total_released = Amount::ZERO;
        for outcome in outcomes {
            match outcome.result {
                Ok(transfer_id) => {
                    let record = ReleaseRecord {
                        contribution_id: outcome.contribution_id.clone(),
                        project_id: project.id.clone(),
                        release_type: approved.release_type,
                        milestone_id: approved.milestone_id.clone(),
                        amount: outcome.amount,
                        transfer_id: transfer_id.clone(),
                        released_by: caller.user_id.clone(),
                    };
                    match self.updater.record_release(&record).await {
                        Ok(ReleaseApplied::Applied { .. }) => {
                            total_released = total_released
                                .checked_add(&outcome.amount)
                                .unwrap_or(total_released);
                            results.push(ContributionReleaseResult::released(
                                outcome.contribution_id,
                                transfer_id,
                                outcome.amount,
                            ));
                        }
                        Ok(ReleaseApplied::AlreadyReleased) => {
                            results.push(ContributionReleaseResult::skipped(
                                outcome.contribution_id,
                                transfer_id,
                                outcome.amount,
                            ));
                        }
                        Err(e) => {
                            warn!(
                                contribution_id = %outcome.contribution_id,
                                error = %e,
                                "transfer completed but ledger update failed"
                            );
                            results.push(ContributionReleaseResult::failed(
                                outcome.contribution_id,
                                outcome.amount,
                                format!("ledger update failed: {e}"),
                            ));
                        }
                    }
                }
                Err(error) => {
                    results.push(ContributionReleaseResult::failed(
                        outcome.contribution_id,
                        outcome.amount,
                        error,
                    ));
                }
            }
        }

        let successful = results.iter().filter(|r| r.success).count() as u32;
        let failed = results.len() as u32 - successful;
        let response = ReleaseResponse {
            release_type: request.release_type,
            project_id: project.id.clone(),
            milestone_id: approved.milestone_id.clone(),
            total_released,
            contributions_processed: plan.len() as u32,
            successful,
            failed,
            results,
            processed_at: Utc::now(),
            success: true,
        };

        info!(
            project_id = %project.id,
            total_released = %response.total_released,
            successful = response.successful,
            failed = response.failed,
            "release completed"
        );
        self.emit_side_effects(&request, &project, &plan, &response);

        Ok(response)
    }

    /// Notifications and statistics run after state mutation; their failure
    /// is logged and swallowed, never surfaced or retried.
    fn emit_side_effects(
        &self,
        request: &ReleaseRequest,
        project: &Project,
        plan: &[PlannedRelease],
        response: &ReleaseResponse,
    ) {
        let notifier = Arc::clone(&self.notifier);
        let metrics = Arc::clone(&self.metrics);

        let mut notifications = Vec::new();
        if request.notify_creator && response.successful > 0 {
            notifications.push(Notification {
                recipient_id: project.creator_id.clone(),
                topic: "escrow_released".to_string(),
                message: format!(
                    "{} released for project {} ({} release)",
                    response.total_released, project.id, response.release_type
                ),
            });
        }
        if request.notify_contributors {
            for result in response.results.iter().filter(|r| r.success) {
                if let Some(planned) = plan
                    .iter()
                    .find(|p| p.contribution_id == result.contribution_id)
                {
                    notifications.push(Notification {
                        recipient_id: planned.contributor_id.clone(),
                        topic: "contribution_released".to_string(),
                        message: format!(
                            "{} of your contribution to project {} was released from escrow",
                            result.release_amount, project.id
                        ),
                    });
                }
            }
        }

        let release_type = response.release_type;
        let released = i64::try_from(response.successful).unwrap_or(i64::MAX);
        let failed = i64::try_from(response.failed).unwrap_or(i64::MAX);
        tokio::spawn(async move {
            for notification in notifications {
                if let Err(e) = notifier.notify(notification).await {
                    warn!(error = %e, "release notification failed");
                }
            }
            let events = [
                MetricEvent::count("escrow_releases_succeeded", released)
                    .with_label("release_type", release_type.to_string()),
                MetricEvent::count("escrow_releases_failed", failed)
                    .with_label("release_type", release_type.to_string()),
            ];
            for event in events {
                if let Err(e) = metrics.record(event).await {
                    warn!(error = %e, "release metric failed");
                }
            }
        });
    }
}
