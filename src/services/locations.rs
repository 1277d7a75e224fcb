use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    access::{AccessScope, AuthenticatedActor},
    db::DbPool,
    entities::{
        business_location::{self, Entity as BusinessLocation},
        user_location::{self, Entity as UserLocation},
    },
    errors::ServiceError,
};

/// Resolves which locations an actor may act from or see.
///
/// Assignments (`user_locations`) are owned by business configuration; this
/// service only reads them. The all-locations capability is a permission bit
/// on the actor, not a row here.
#[derive(Clone)]
pub struct LocationAccessService {
    db: Arc<DbPool>,
}

impl LocationAccessService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// The explicit assignment set, restricted to the actor's business.
    /// Used by reads that must not honor the all-locations capability.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn assigned_location_ids(
        &self,
        actor: &AuthenticatedActor,
    ) -> Result<HashSet<Uuid>, ServiceError> {
        let db = &*self.db;

        let assignments = UserLocation::find()
            .filter(user_location::Column::UserId.eq(actor.id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if assignments.is_empty() {
            return Ok(HashSet::new());
        }

        // Assignments can outlive a location or point across tenants after a
        // reorganization; resolve them against live business locations.
        let assigned_ids: Vec<Uuid> = assignments.iter().map(|a| a.location_id).collect();
        let locations = BusinessLocation::find()
            .filter(business_location::Column::BusinessId.eq(actor.business_id))
            .filter(business_location::Column::Id.is_in(assigned_ids))
            .filter(business_location::Column::IsActive.eq(true))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(locations.into_iter().map(|l| l.id).collect())
    }

    /// Where the actor may act from: everything for holders of the
    /// all-locations capability, the assignment set otherwise.
    pub async fn accessible_location_ids(
        &self,
        actor: &AuthenticatedActor,
    ) -> Result<AccessScope, ServiceError> {
        if actor.has_all_locations() {
            return Ok(AccessScope::All);
        }
        Ok(AccessScope::Locations(
            self.assigned_location_ids(actor).await?,
        ))
    }

    /// Resolves a location inside the actor's business; absent or foreign
    /// locations are indistinguishable to the caller.
    pub async fn resolve(
        &self,
        business_id: Uuid,
        location_id: Uuid,
    ) -> Result<business_location::Model, ServiceError> {
        let db = &*self.db;

        BusinessLocation::find_by_id(location_id)
            .filter(business_location::Column::BusinessId.eq(business_id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", location_id)))
    }

    /// Batch name lookup for display assembly.
    pub async fn names_by_id(
        &self,
        business_id: Uuid,
        ids: &[Uuid],
    ) -> Result<std::collections::HashMap<Uuid, String>, ServiceError> {
        if ids.is_empty() {
            return Ok(Default::default());
        }
        let db = &*self.db;
        let locations = BusinessLocation::find()
            .filter(business_location::Column::BusinessId.eq(business_id))
            .filter(business_location::Column::Id.is_in(ids.to_vec()))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(locations.into_iter().map(|l| (l.id, l.name)).collect())
    }

    /// Gate for acting from a source location: assignment or the
    /// all-locations capability.
    pub async fn require_source_access(
        &self,
        actor: &AuthenticatedActor,
        location_id: Uuid,
    ) -> Result<(), ServiceError> {
        let scope = self.accessible_location_ids(actor).await?;
        if scope.contains(location_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "user {} is not assigned to location {}",
                actor.username, location_id
            )))
        }
    }
}
