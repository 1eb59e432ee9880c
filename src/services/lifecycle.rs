//! Worker-driven and escalation-driven instance transitions.

use chrono::Datelike;
use uuid::Uuid;

use crate::error::{JobError, JobResult};
use crate::models::definition::JobDefinition;
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::location::LocationReport;
use crate::models::worker::Worker;
use crate::services::engine::JobService;
use crate::services::geo::{
    check_location_report, require_on_site, ACCEPT_RADIUS_MILES, ON_SITE_RADIUS_METERS,
};
use crate::services::penalty::{
    reason, surge_multiplier, surged_pay, unassign_penalty, PenaltyTier,
};
use crate::services::release::{is_released, ReleaseViewer};

fn require_status(inst: &JobInstance, wanted: InstanceStatus, action: &'static str) -> JobResult<()> {
    if inst.status != wanted {
        return Err(JobError::WrongState {
            action,
            actual: inst.status,
        });
    }
    Ok(())
}

fn require_assignee(inst: &JobInstance, worker_id: Uuid) -> JobResult<()> {
    if !inst.is_assigned_to(worker_id) {
        return Err(JobError::NotAssignedWorker);
    }
    Ok(())
}

impl JobService {
    pub(crate) async fn load_worker(&self, worker_id: Uuid) -> JobResult<Worker> {
        self.deps
            .workers
            .get_worker(worker_id)
            .await?
            .ok_or_else(|| JobError::not_found("worker", worker_id))
    }

    /// Score and tenant link the release gate judges a worker by.
    pub(crate) async fn release_viewer(&self, worker: &Worker) -> JobResult<ReleaseViewer> {
        let tenant_property_id = match worker.tenant_token.as_deref() {
            Some(token) if !token.trim().is_empty() => self
                .deps
                .units
                .find_unit_by_tenant_token(token)
                .await?
                .map(|unit| unit.property_id),
            _ => None,
        };
        Ok(ReleaseViewer {
            reliability_score: worker.clamped_score(),
            tenant_property_id,
        })
    }

    /// OPEN → ASSIGNED.
    pub async fn accept_job(
        &self,
        worker_id: Uuid,
        instance_id: Uuid,
        location: &LocationReport,
    ) -> JobResult<JobInstance> {
        let now = self.now();
        let instance = self.load_instance(instance_id).await?;
        require_status(&instance, InstanceStatus::Open, "accept")?;
        if instance.is_excluded(worker_id) {
            return Err(JobError::ExcludedWorker);
        }

        let worker = self.load_worker(worker_id).await?;
        if !worker.is_active() {
            return Err(JobError::WorkerNotActive);
        }

        let ctx = self.load_context(instance).await?;
        let viewer = self.release_viewer(&worker).await?;
        if !is_released(ctx.instance.service_date, ctx.property.id, ctx.tz, now, &viewer) {
            return Err(JobError::NotReleasedYet);
        }
        if now > ctx.window.acceptance_cutoff {
            return Err(JobError::OutsideTimeWindow("acceptance cutoff has passed"));
        }

        check_location_report(location, now)?;
        let miles = location.coordinates().distance_miles(&ctx.property.coordinates());
        if miles > ACCEPT_RADIUS_MILES {
            return Err(JobError::LocationOutOfBounds(format!(
                "{miles:.1} miles from the property, limit is {ACCEPT_RADIUS_MILES:.0}"
            )));
        }

        let expected = ctx.instance.row_version;
        let mut next = ctx.instance;
        next.status = InstanceStatus::Assigned;
        next.assigned_worker_id = Some(worker_id);
        next.bump_assignment_churn();
        self.commit_instance(&next, expected, "accept").await
    }

    /// ASSIGNED → IN_PROGRESS, stamping check-in.
    pub async fn start_job(
        &self,
        worker_id: Uuid,
        instance_id: Uuid,
        location: &LocationReport,
    ) -> JobResult<JobInstance> {
        let now = self.now();
        let instance = self.load_instance(instance_id).await?;
        require_status(&instance, InstanceStatus::Assigned, "start")?;
        require_assignee(&instance, worker_id)?;

        let ctx = self.load_context(instance).await?;
        if !ctx.window.can_start_at(now) {
            return Err(JobError::OutsideTimeWindow(if now < ctx.window.earliest_start {
                "too early to start"
            } else {
                "latest start has passed"
            }));
        }
        require_on_site(location, &ctx.property.coordinates(), ON_SITE_RADIUS_METERS, now)?;

        let expected = ctx.instance.row_version;
        let mut next = ctx.instance;
        next.status = InstanceStatus::InProgress;
        next.check_in_at = Some(now);
        self.commit_instance(&next, expected, "start").await
    }

    /// ASSIGNED → OPEN with a tiered penalty, or → CANCELED past the
    /// acceptance cutoff.
    pub async fn unaccept_job(&self, worker_id: Uuid, instance_id: Uuid) -> JobResult<JobInstance> {
        let now = self.now();
        let instance = self.load_instance(instance_id).await?;
        require_status(&instance, InstanceStatus::Assigned, "unaccept")?;
        require_assignee(&instance, worker_id)?;

        let ctx = self.load_context(instance).await?;
        let expected = ctx.instance.row_version;

        if now > ctx.window.acceptance_cutoff {
            let mut next = ctx.instance.clone();
            next.cancel(now);
            let canceled = self.commit_instance(&next, expected, "unaccept_cancel").await?;

            self.penalize(worker_id, PenaltyTier::NoShow, reason::UNACCEPT_LATE_CANCEL)
                .await;
            self.alert_on_call(ctx.notice(
                "[Escalation] Worker Unassigned Late",
                "Worker un-assigned from job after acceptance cutoff. It has been canceled and may need coverage."
                    .to_string(),
            ))
            .await;
            return Ok(canceled);
        }

        let tier = unassign_penalty(
            now,
            Some(ctx.window.earliest_start),
            Some(ctx.window.no_show),
        );
        let mut next = ctx.instance;
        next.reopen();
        if tier.excludes() {
            next.exclude(worker_id);
        }
        let reopened = self.commit_instance(&next, expected, "unaccept").await?;
        self.penalize(worker_id, tier, reason::UNACCEPT).await;
        Ok(reopened)
    }

    /// IN_PROGRESS → OPEN before latest start, → CANCELED after it.
    pub async fn cancel_job(&self, worker_id: Uuid, instance_id: Uuid) -> JobResult<JobInstance> {
        let now = self.now();
        let instance = self.load_instance(instance_id).await?;
        require_status(&instance, InstanceStatus::InProgress, "cancel")?;
        require_assignee(&instance, worker_id)?;

        let ctx = self.load_context(instance).await?;
        let expected = ctx.instance.row_version;

        if now < ctx.window.latest_start {
            let tier = unassign_penalty(
                now,
                Some(ctx.window.earliest_start),
                Some(ctx.window.no_show),
            );
            let mut next = ctx.instance.clone();
            next.reopen();
            if tier.excludes() {
                next.exclude(worker_id);
            }
            let reopened = self.commit_instance(&next, expected, "cancel_reopen").await?;

            self.penalize(worker_id, tier, reason::CANCEL_IN_PROGRESS_REVERT).await;
            self.alert_on_call(ctx.notice(
                "[Escalation] In-Progress Job Reopened",
                "Worker canceled an in-progress job before latest start. It is open again and may need coverage."
                    .to_string(),
            ))
            .await;
            return Ok(reopened);
        }

        let mut next = ctx.instance.clone();
        next.cancel(now);
        let canceled = self.commit_instance(&next, expected, "cancel").await?;

        self.penalize(worker_id, PenaltyTier::NoShow, reason::CANCEL_IN_PROGRESS_LATE)
            .await;
        let notice = ctx.notice(
            "[Info] In-Progress Job Canceled",
            "Worker canceled an in-progress job after latest start. The job is canceled; no action needed."
                .to_string(),
        );
        self.alert_on_call(notice.clone()).await;
        self.alert_team(notice).await;
        Ok(canceled)
    }

    /// ASSIGNED and never started past the no-show time: penalize, exclude, reopen.
    ///
    /// Returns `None` when the instance no longer qualifies.
    pub async fn force_reopen_no_show(&self, snapshot: &JobInstance) -> JobResult<Option<JobInstance>> {
        if snapshot.status != InstanceStatus::Assigned || snapshot.is_started() {
            return Ok(None);
        }
        let Some(worker_id) = snapshot.assigned_worker_id else {
            return Ok(None);
        };

        let now = self.now();
        let ctx = self.load_context(snapshot.clone()).await?;
        if now <= ctx.window.no_show {
            return Ok(None);
        }

        let mut next = ctx.instance;
        next.reopen();
        next.exclude(worker_id);
        let reopened = self
            .commit_instance(&next, snapshot.row_version, "no_show_reopen")
            .await?;
        self.penalize(worker_id, PenaltyTier::NoShow, reason::NO_SHOW).await;
        Ok(Some(reopened))
    }

    /// OPEN inside the dispatch-cancel window: nobody is coming, cancel it.
    pub async fn force_cancel_unclaimed(
        &self,
        snapshot: &JobInstance,
    ) -> JobResult<Option<JobInstance>> {
        if snapshot.status != InstanceStatus::Open {
            return Ok(None);
        }
        let now = self.now();
        let ctx = self.load_context(snapshot.clone()).await?;
        if !ctx.window.in_dispatch_cancel_window(now) {
            return Ok(None);
        }

        let mut next = ctx.instance.clone();
        next.cancel(now);
        let canceled = self
            .commit_instance(&next, snapshot.row_version, "dispatch_cancel")
            .await?;
        self.alert_on_call(ctx.notice(
            "[Escalation] Open job auto-canceled at T-20",
            "Job was never claimed before T-20. It has been automatically canceled. No coverage found."
                .to_string(),
        ))
        .await;
        Ok(Some(canceled))
    }

    /// Raise pay on an unclaimed job as its no-show time nears.
    pub async fn apply_surge(
        &self,
        snapshot: &JobInstance,
        definition: &JobDefinition,
    ) -> JobResult<Option<JobInstance>> {
        if snapshot.status != InstanceStatus::Open {
            return Ok(None);
        }
        let now = self.now();
        let property = self.load_property(definition.property_id).await?;
        let ctx = Self::context_from(snapshot.clone(), definition.clone(), property);

        let Some(multiplier) = surge_multiplier(now, ctx.window.no_show) else {
            return Ok(None);
        };
        let weekday = ctx.instance.service_date.weekday();
        let Some(estimate) = definition.estimate_for(weekday) else {
            return Ok(None);
        };
        let Some(pay) = surged_pay(estimate.base_pay, multiplier, ctx.instance.effective_pay) else {
            return Ok(None);
        };

        let mut next = ctx.instance;
        next.effective_pay = pay;
        let surged = self
            .commit_instance(&next, snapshot.row_version, "surge")
            .await?;
        tracing::info!(
            instance_id = %surged.id,
            multiplier,
            effective_pay = surged.effective_pay,
            "Surge applied"
        );
        Ok(Some(surged))
    }
}
