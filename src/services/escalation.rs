//! Periodic sweep that acts on jobs workers left hanging.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Duration;
use serde::Serialize;
use uuid::Uuid;

use crate::db::store::InstanceFilter;
use crate::error::{JobError, JobResult};
use crate::models::definition::JobDefinition;
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::services::engine::JobService;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EscalationReport {
    pub scanned: usize,
    pub surged: usize,
    pub reopened: usize,
    pub canceled: usize,
    pub errors: usize,
}

fn count_action(action: &'static str) {
    metrics::counter!("escalation_actions_total", "action" => action).increment(1);
}

impl JobService {
    /// Surge, no-show reopen, and dispatch cancel over OPEN and ASSIGNED
    /// instances dated within a day of now.
    pub async fn run_escalation_sweep(&self) -> JobResult<EscalationReport> {
        let started = Instant::now();
        let now = self.now();
        let filter = InstanceFilter::between(
            (now - Duration::days(1)).date_naive(),
            (now + Duration::days(1)).date_naive(),
        )
        .with_statuses(&[InstanceStatus::Open, InstanceStatus::Assigned]);
        let instances = self.store.list_instances(&filter).await?;

        let mut report = EscalationReport {
            scanned: instances.len(),
            ..EscalationReport::default()
        };
        let mut definitions: HashMap<Uuid, JobDefinition> = HashMap::new();

        for snapshot in instances {
            let instance_id = snapshot.id;
            if let Err(e) = self
                .escalate_one(snapshot, &mut definitions, &mut report)
                .await
            {
                report.errors += 1;
                match e {
                    JobError::RowVersionConflict { .. } | JobError::WrongState { .. } => {
                        tracing::info!(instance_id = %instance_id, error = %e, "Instance changed during escalation, skipping")
                    }
                    _ => tracing::error!(instance_id = %instance_id, error = %e, "Escalation failed for instance"),
                }
            }
        }

        metrics::histogram!("escalation_sweep_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            scanned = report.scanned,
            surged = report.surged,
            reopened = report.reopened,
            canceled = report.canceled,
            errors = report.errors,
            "Escalation sweep finished"
        );
        Ok(report)
    }

    async fn escalate_one(
        &self,
        snapshot: JobInstance,
        definitions: &mut HashMap<Uuid, JobDefinition>,
        report: &mut EscalationReport,
    ) -> JobResult<()> {
        let definition = match definitions.get(&snapshot.definition_id) {
            Some(def) => def.clone(),
            None => {
                let def = self.load_definition(snapshot.definition_id).await?;
                definitions.insert(def.id, def.clone());
                def
            }
        };

        let mut current = snapshot;
        if let Some(surged) = self.apply_surge(&current, &definition).await? {
            report.surged += 1;
            count_action("surge");
            current = surged;
        }

        if current.status == InstanceStatus::Assigned {
            if let Some(reopened) = self.force_reopen_no_show(&current).await? {
                report.reopened += 1;
                count_action("no_show_reopen");
                tracing::info!(instance_id = %reopened.id, "No-show reopened");
                current = reopened;
            }
        }

        if current.status == InstanceStatus::Open {
            if let Some(canceled) = self.force_cancel_unclaimed(&current).await? {
                report.canceled += 1;
                count_action("dispatch_cancel");
                tracing::info!(instance_id = %canceled.id, "Unclaimed job canceled at dispatch time");
            }
        }
        Ok(())
    }
}
