//! Read access to properties and workers owned by other services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::property::{Building, Dumpster, Property, Unit};
use crate::models::worker::Worker;

#[async_trait]
pub trait PropertyProvider: Send + Sync {
    async fn get_property(&self, id: Uuid) -> Result<Option<Property>, StoreError>;

    async fn list_properties(&self) -> Result<Vec<Property>, StoreError>;
}

#[async_trait]
pub trait BuildingProvider: Send + Sync {
    async fn list_buildings(&self, property_id: Uuid) -> Result<Vec<Building>, StoreError>;
}

#[async_trait]
pub trait UnitProvider: Send + Sync {
    async fn get_unit(&self, id: Uuid) -> Result<Option<Unit>, StoreError>;

    async fn list_units(&self, property_id: Uuid) -> Result<Vec<Unit>, StoreError>;

    async fn find_unit_by_tenant_token(&self, token: &str) -> Result<Option<Unit>, StoreError>;
}

#[async_trait]
pub trait DumpsterProvider: Send + Sync {
    async fn list_dumpsters(&self, property_id: Uuid) -> Result<Vec<Dumpster>, StoreError>;
}

#[async_trait]
pub trait WorkerProvider: Send + Sync {
    async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>, StoreError>;

    /// Add `delta` to the reliability score, clamped to 0..=100, in one write.
    async fn adjust_reliability_score(
        &self,
        worker_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<(), StoreError>;
}
