use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, Location, ResultEngine, locations,
    util::{name_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    pub(crate) async fn find_location_by_name(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
        name: &str,
    ) -> ResultEngine<Option<locations::Model>> {
        locations::Entity::find()
            .filter(locations::Column::OrganizerId.eq(organizer_id))
            .filter(locations::Column::NameNorm.eq(name_key(name)))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Adds a venue to the organizer's picklist.
    pub async fn new_location(
        &self,
        organizer_id: &str,
        name: &str,
        address: Option<&str>,
        notes: Option<&str>,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "location")?;
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            if self
                .find_location_by_name(&db_tx, organizer_id, &name)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(name));
            }
            let mut location = Location::new(organizer_id, name);
            location.address = normalize_optional_text(address);
            location.notes = normalize_optional_text(notes);
            locations::ActiveModel::from(&location)
                .insert(&db_tx)
                .await?;
            Ok(location.id)
        })
    }

    /// Lists venues by name.
    pub async fn locations(&self, organizer_id: &str) -> ResultEngine<Vec<Location>> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let models = locations::Entity::find()
                .filter(locations::Column::OrganizerId.eq(organizer_id))
                .order_by_asc(locations::Column::NameNorm)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Location::try_from).collect()
        })
    }

    /// Removes a venue. Sessions keep their location label.
    pub async fn delete_location(&self, organizer_id: &str, location_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_organizer(&db_tx, organizer_id).await?;
            let model = self
                .require_location(&db_tx, organizer_id, location_id)
                .await?;
            locations::Entity::delete_by_id(model.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
