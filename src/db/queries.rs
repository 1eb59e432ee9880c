use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::db::store::{InstanceFilter, JobStore};
use crate::error::StoreError;
use crate::models::definition::{
    weekday_from_number, weekday_number, BuildingAssignment, DailyPayEstimate, DefinitionStatus,
    Frequency, JobDefinition,
};
use crate::models::instance::{InstanceStatus, JobInstance};
use crate::models::property::{Building, Dumpster, Property, Unit};
use crate::models::verification::{FailureReason, UnitVerification, UnitVerificationStatus};
use crate::models::worker::{AccountStatus, Worker};
use crate::services::providers::{
    BuildingProvider, DumpsterProvider, PropertyProvider, UnitProvider, WorkerProvider,
};

const DEFINITION_COLUMNS: &str = r#"
    id, manager_id, property_id, title, description, assigned_units_by_building,
    dumpster_ids, floors, total_units, frequency, weekdays, interval_weeks,
    start_date, end_date, skip_holidays, holiday_exceptions, earliest_start,
    latest_start, start_time_hint, daily_pay_estimates, status, row_version,
    created_at, updated_at
"#;

const INSTANCE_COLUMNS: &str = r#"
    id, definition_id, service_date, status, assigned_worker_id, effective_pay,
    check_in_at, check_out_at, excluded_worker_ids, assign_unassign_count,
    flagged_for_review, row_version, created_at, updated_at
"#;

const VERIFICATION_COLUMNS: &str = r#"
    id, job_instance_id, unit_id, status, attempt_count, failure_reasons,
    failure_reason_history, permanent_failure, missing_trash_can, row_version,
    created_at, updated_at
"#;

/// Postgres-backed store for the job engine and its directory lookups.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn parse_column<T: std::str::FromStr>(
    table: &'static str,
    column: &str,
    value: &str,
) -> Result<T, StoreError> {
    value.parse::<T>().map_err(|_| StoreError::Corrupt {
        table,
        detail: format!("unexpected {column} value '{value}'"),
    })
}

fn definition_from_row(row: &PgRow) -> Result<JobDefinition, StoreError> {
    let frequency: String = row.try_get("frequency")?;
    let status: String = row.try_get("status")?;
    let weekday_numbers: Vec<i16> = row.try_get("weekdays")?;
    let weekdays = weekday_numbers
        .into_iter()
        .map(|n| {
            weekday_from_number(n).ok_or_else(|| StoreError::Corrupt {
                table: "job_definitions",
                detail: format!("weekday {n} out of range"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let groups: Json<Vec<BuildingAssignment>> = row.try_get("assigned_units_by_building")?;
    let estimates: Json<Vec<DailyPayEstimate>> = row.try_get("daily_pay_estimates")?;

    Ok(JobDefinition {
        id: row.try_get("id")?,
        manager_id: row.try_get("manager_id")?,
        property_id: row.try_get("property_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        assigned_units_by_building: groups.0,
        dumpster_ids: row.try_get("dumpster_ids")?,
        floors: row.try_get("floors")?,
        total_units: row.try_get("total_units")?,
        frequency: parse_column::<Frequency>("job_definitions", "frequency", &frequency)?,
        weekdays,
        interval_weeks: row.try_get("interval_weeks")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        skip_holidays: row.try_get("skip_holidays")?,
        holiday_exceptions: row.try_get("holiday_exceptions")?,
        earliest_start: row.try_get("earliest_start")?,
        latest_start: row.try_get("latest_start")?,
        start_time_hint: row.try_get("start_time_hint")?,
        daily_pay_estimates: estimates.0,
        status: parse_column::<DefinitionStatus>("job_definitions", "status", &status)?,
        row_version: row.try_get("row_version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn instance_from_row(row: &PgRow) -> Result<JobInstance, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(JobInstance {
        id: row.try_get("id")?,
        definition_id: row.try_get("definition_id")?,
        service_date: row.try_get("service_date")?,
        status: parse_column::<InstanceStatus>("job_instances", "status", &status)?,
        assigned_worker_id: row.try_get("assigned_worker_id")?,
        effective_pay: row.try_get("effective_pay")?,
        check_in_at: row.try_get("check_in_at")?,
        check_out_at: row.try_get("check_out_at")?,
        excluded_worker_ids: row.try_get("excluded_worker_ids")?,
        assign_unassign_count: row.try_get("assign_unassign_count")?,
        flagged_for_review: row.try_get("flagged_for_review")?,
        row_version: row.try_get("row_version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn reasons_from_column(values: Vec<String>) -> Result<Vec<FailureReason>, StoreError> {
    values
        .iter()
        .map(|v| parse_column::<FailureReason>("unit_verifications", "failure reason", v))
        .collect()
}

fn reasons_to_column(reasons: &[FailureReason]) -> Vec<String> {
    reasons.iter().map(|r| r.to_string()).collect()
}

fn verification_from_row(row: &PgRow) -> Result<UnitVerification, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(UnitVerification {
        id: row.try_get("id")?,
        job_instance_id: row.try_get("job_instance_id")?,
        unit_id: row.try_get("unit_id")?,
        status: parse_column::<UnitVerificationStatus>("unit_verifications", "status", &status)?,
        attempt_count: row.try_get("attempt_count")?,
        failure_reasons: reasons_from_column(row.try_get("failure_reasons")?)?,
        failure_reason_history: reasons_from_column(row.try_get("failure_reason_history")?)?,
        permanent_failure: row.try_get("permanent_failure")?,
        missing_trash_can: row.try_get("missing_trash_can")?,
        row_version: row.try_get("row_version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn status_strings(statuses: &[InstanceStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl JobStore for PgStore {
    async fn get_definition(&self, id: Uuid) -> Result<Option<JobDefinition>, StoreError> {
        let sql = format!("SELECT {DEFINITION_COLUMNS} FROM job_definitions WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(definition_from_row).transpose()
    }

    async fn insert_definition(&self, def: &JobDefinition) -> Result<(), StoreError> {
        let weekdays: Vec<i16> = def.weekdays.iter().map(|d| weekday_number(*d)).collect();
        sqlx::query(
            r#"
            INSERT INTO job_definitions (
                id, manager_id, property_id, title, description, assigned_units_by_building,
                dumpster_ids, floors, total_units, frequency, weekdays, interval_weeks,
                start_date, end_date, skip_holidays, holiday_exceptions, earliest_start,
                latest_start, start_time_hint, daily_pay_estimates, status, row_version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(def.id)
        .bind(def.manager_id)
        .bind(def.property_id)
        .bind(&def.title)
        .bind(&def.description)
        .bind(Json(&def.assigned_units_by_building))
        .bind(&def.dumpster_ids)
        .bind(&def.floors)
        .bind(def.total_units)
        .bind(def.frequency.to_string())
        .bind(&weekdays)
        .bind(def.interval_weeks)
        .bind(def.start_date)
        .bind(def.end_date)
        .bind(def.skip_holidays)
        .bind(&def.holiday_exceptions)
        .bind(def.earliest_start)
        .bind(def.latest_start)
        .bind(def.start_time_hint)
        .bind(Json(&def.daily_pay_estimates))
        .bind(def.status.to_string())
        .bind(def.row_version)
        .bind(def.created_at)
        .bind(def.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_definition_if_version(
        &self,
        def: &JobDefinition,
        expected_version: i64,
    ) -> Result<Option<JobDefinition>, StoreError> {
        let weekdays: Vec<i16> = def.weekdays.iter().map(|d| weekday_number(*d)).collect();
        let sql = format!(
            r#"
            UPDATE job_definitions
            SET title = $1,
                description = $2,
                assigned_units_by_building = $3,
                dumpster_ids = $4,
                floors = $5,
                total_units = $6,
                frequency = $7,
                weekdays = $8,
                interval_weeks = $9,
                start_date = $10,
                end_date = $11,
                skip_holidays = $12,
                holiday_exceptions = $13,
                earliest_start = $14,
                latest_start = $15,
                start_time_hint = $16,
                daily_pay_estimates = $17,
                status = $18,
                row_version = row_version + 1,
                updated_at = NOW()
            WHERE id = $19 AND row_version = $20
            RETURNING {DEFINITION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(&def.title)
            .bind(&def.description)
            .bind(Json(&def.assigned_units_by_building))
            .bind(&def.dumpster_ids)
            .bind(&def.floors)
            .bind(def.total_units)
            .bind(def.frequency.to_string())
            .bind(&weekdays)
            .bind(def.interval_weeks)
            .bind(def.start_date)
            .bind(def.end_date)
            .bind(def.skip_holidays)
            .bind(&def.holiday_exceptions)
            .bind(def.earliest_start)
            .bind(def.latest_start)
            .bind(def.start_time_hint)
            .bind(Json(&def.daily_pay_estimates))
            .bind(def.status.to_string())
            .bind(def.id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(definition_from_row).transpose()
    }

    async fn list_definitions(
        &self,
        status: DefinitionStatus,
        property_id: Option<Uuid>,
    ) -> Result<Vec<JobDefinition>, StoreError> {
        let sql = format!(
            r#"
            SELECT {DEFINITION_COLUMNS}
            FROM job_definitions
            WHERE status = $1 AND ($2::uuid IS NULL OR property_id = $2)
            ORDER BY created_at
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(status.to_string())
            .bind(property_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(definition_from_row).collect()
    }

    async fn get_instance(&self, id: Uuid) -> Result<Option<JobInstance>, StoreError> {
        let sql = format!("SELECT {INSTANCE_COLUMNS} FROM job_instances WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(instance_from_row).transpose()
    }

    async fn insert_instance_if_absent(&self, inst: &JobInstance) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_instances (
                id, definition_id, service_date, status, assigned_worker_id, effective_pay,
                check_in_at, check_out_at, excluded_worker_ids, assign_unassign_count,
                flagged_for_review, row_version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (definition_id, service_date) DO NOTHING
            "#,
        )
        .bind(inst.id)
        .bind(inst.definition_id)
        .bind(inst.service_date)
        .bind(inst.status.to_string())
        .bind(inst.assigned_worker_id)
        .bind(inst.effective_pay)
        .bind(inst.check_in_at)
        .bind(inst.check_out_at)
        .bind(&inst.excluded_worker_ids)
        .bind(inst.assign_unassign_count)
        .bind(inst.flagged_for_review)
        .bind(inst.row_version)
        .bind(inst.created_at)
        .bind(inst.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_instance_if_version(
        &self,
        next: &JobInstance,
        expected_version: i64,
    ) -> Result<Option<JobInstance>, StoreError> {
        let sql = format!(
            r#"
            UPDATE job_instances
            SET status = $1,
                assigned_worker_id = $2,
                effective_pay = $3,
                check_in_at = $4,
                check_out_at = $5,
                excluded_worker_ids = $6,
                assign_unassign_count = $7,
                flagged_for_review = $8,
                row_version = row_version + 1,
                updated_at = NOW()
            WHERE id = $9 AND row_version = $10
            RETURNING {INSTANCE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(next.status.to_string())
            .bind(next.assigned_worker_id)
            .bind(next.effective_pay)
            .bind(next.check_in_at)
            .bind(next.check_out_at)
            .bind(&next.excluded_worker_ids)
            .bind(next.assign_unassign_count)
            .bind(next.flagged_for_review)
            .bind(next.id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(instance_from_row).transpose()
    }

    async fn list_instances(&self, filter: &InstanceFilter) -> Result<Vec<JobInstance>, StoreError> {
        let sql = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM job_instances
            WHERE ($1::date IS NULL OR service_date >= $1)
              AND ($2::date IS NULL OR service_date <= $2)
              AND (cardinality($3::text[]) = 0 OR status = ANY($3))
              AND ($4::uuid IS NULL OR assigned_worker_id = $4)
              AND (cardinality($5::uuid[]) = 0 OR definition_id = ANY($5))
            ORDER BY service_date, id
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.from_date)
            .bind(filter.to_date)
            .bind(status_strings(&filter.statuses))
            .bind(filter.assigned_worker_id)
            .bind(&filter.definition_ids)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(instance_from_row).collect()
    }

    async fn retire_instances(
        &self,
        definition_ids: &[Uuid],
        date: NaiveDate,
        statuses: &[InstanceStatus],
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE job_instances
            SET status = 'RETIRED',
                row_version = row_version + 1,
                updated_at = NOW()
            WHERE definition_id = ANY($1)
              AND service_date = $2
              AND status = ANY($3)
            "#,
        )
        .bind(definition_ids)
        .bind(date)
        .bind(status_strings(statuses))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_future_open_instances(
        &self,
        definition_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM job_instances
            WHERE definition_id = $1
              AND service_date >= $2
              AND status = 'OPEN'
            "#,
        )
        .bind(definition_id)
        .bind(from_date)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn get_verification(
        &self,
        instance_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Option<UnitVerification>, StoreError> {
        let sql = format!(
            "SELECT {VERIFICATION_COLUMNS} FROM unit_verifications WHERE job_instance_id = $1 AND unit_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(instance_id)
            .bind(unit_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(verification_from_row).transpose()
    }

    async fn list_verifications(
        &self,
        instance_ids: &[Uuid],
    ) -> Result<Vec<UnitVerification>, StoreError> {
        let sql = format!(
            "SELECT {VERIFICATION_COLUMNS} FROM unit_verifications WHERE job_instance_id = ANY($1) ORDER BY created_at"
        );
        let rows = sqlx::query(&sql)
            .bind(instance_ids)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(verification_from_row).collect()
    }

    async fn insert_verification(&self, v: &UnitVerification) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO unit_verifications (
                id, job_instance_id, unit_id, status, attempt_count, failure_reasons,
                failure_reason_history, permanent_failure, missing_trash_can, row_version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (job_instance_id, unit_id) DO NOTHING
            "#,
        )
        .bind(v.id)
        .bind(v.job_instance_id)
        .bind(v.unit_id)
        .bind(v.status.to_string())
        .bind(v.attempt_count)
        .bind(reasons_to_column(&v.failure_reasons))
        .bind(reasons_to_column(&v.failure_reason_history))
        .bind(v.permanent_failure)
        .bind(v.missing_trash_can)
        .bind(v.row_version)
        .bind(v.created_at)
        .bind(v.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_verification_if_version(
        &self,
        v: &UnitVerification,
        expected_version: i64,
    ) -> Result<Option<UnitVerification>, StoreError> {
        let sql = format!(
            r#"
            UPDATE unit_verifications
            SET status = $1,
                attempt_count = $2,
                failure_reasons = $3,
                failure_reason_history = $4,
                permanent_failure = $5,
                missing_trash_can = $6,
                row_version = row_version + 1,
                updated_at = NOW()
            WHERE id = $7 AND row_version = $8
            RETURNING {VERIFICATION_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(v.status.to_string())
            .bind(v.attempt_count)
            .bind(reasons_to_column(&v.failure_reasons))
            .bind(reasons_to_column(&v.failure_reason_history))
            .bind(v.permanent_failure)
            .bind(v.missing_trash_can)
            .bind(v.id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(verification_from_row).transpose()
    }
}

fn property_from_row(row: &PgRow) -> Result<Property, StoreError> {
    Ok(Property {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        timezone: row.try_get("timezone")?,
    })
}

fn unit_from_row(row: &PgRow) -> Result<Unit, StoreError> {
    Ok(Unit {
        id: row.try_get("id")?,
        property_id: row.try_get("property_id")?,
        building_id: row.try_get("building_id")?,
        unit_number: row.try_get("unit_number")?,
        floor: row.try_get("floor")?,
        tenant_token: row.try_get("tenant_token")?,
    })
}

#[async_trait]
impl PropertyProvider for PgStore {
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, address, latitude, longitude, timezone FROM properties WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(property_from_row).transpose()
    }

    async fn list_properties(&self) -> Result<Vec<Property>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, address, latitude, longitude, timezone FROM properties ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(property_from_row).collect()
    }
}

#[async_trait]
impl BuildingProvider for PgStore {
    async fn list_buildings(&self, property_id: Uuid) -> Result<Vec<Building>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, property_id, name FROM buildings WHERE property_id = $1 ORDER BY name",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<Building, StoreError> {
                Ok(Building {
                    id: row.try_get("id")?,
                    property_id: row.try_get("property_id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UnitProvider for PgStore {
    async fn get_unit(&self, id: Uuid) -> Result<Option<Unit>, StoreError> {
        let row = sqlx::query(
            "SELECT id, property_id, building_id, unit_number, floor, tenant_token FROM units WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(unit_from_row).transpose()
    }

    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, property_id, building_id, unit_number, floor, tenant_token
            FROM units
            WHERE property_id = $1
            ORDER BY unit_number
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(unit_from_row).collect()
    }

    async fn find_unit_by_tenant_token(&self, token: &str) -> Result<Option<Unit>, StoreError> {
        let row = sqlx::query(
            "SELECT id, property_id, building_id, unit_number, floor, tenant_token FROM units WHERE tenant_token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(unit_from_row).transpose()
    }
}

#[async_trait]
impl DumpsterProvider for PgStore {
    async fn list_dumpsters(&self, property_id: Uuid) -> Result<Vec<Dumpster>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, property_id, dumpster_number, latitude, longitude
            FROM dumpsters
            WHERE property_id = $1
            ORDER BY dumpster_number
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<Dumpster, StoreError> {
                Ok(Dumpster {
                    id: row.try_get("id")?,
                    property_id: row.try_get("property_id")?,
                    dumpster_number: row.try_get("dumpster_number")?,
                    latitude: row.try_get("latitude")?,
                    longitude: row.try_get("longitude")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl WorkerProvider for PgStore {
    async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>, StoreError> {
        let row = sqlx::query(
            "SELECT id, account_status, reliability_score, tenant_token FROM workers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let status: String = r.try_get("account_status")?;
                Ok(Some(Worker {
                    id: r.try_get("id")?,
                    account_status: parse_column::<AccountStatus>(
                        "workers",
                        "account_status",
                        &status,
                    )?,
                    reliability_score: r.try_get("reliability_score")?,
                    tenant_token: r.try_get("tenant_token")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn adjust_reliability_score(
        &self,
        worker_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE workers
            SET reliability_score = LEAST(100, GREATEST(0, reliability_score + $2))
            WHERE id = $1
            "#,
        )
        .bind(worker_id)
        .bind(delta)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO worker_score_events (worker_id, delta, reason) VALUES ($1, $2, $3)")
            .bind(worker_id)
            .bind(delta)
            .bind(reason)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
