use chrono::Utc;
use sea_orm::{ActiveModelTrait, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Organizer, ResultEngine, organizers, util::normalize_required_name};

use super::{Engine, with_tx};

impl Engine {
    /// Creates a new organizer scope and returns its id.
    pub async fn new_organizer(&self, name: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "organizer")?;
        let organizer = Organizer {
            id: Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
        };
        with_tx!(self, |db_tx| {
            organizers::ActiveModel::from(&organizer)
                .insert(&db_tx)
                .await?;
            tracing::info!(organizer_id = %organizer.id, "organizer created");
            Ok(organizer.id.clone())
        })
    }

    /// Returns an organizer, or `Forbidden` if it does not exist.
    pub async fn organizer(&self, organizer_id: &str) -> ResultEngine<Organizer> {
        with_tx!(self, |db_tx| {
            let model = self.require_organizer(&db_tx, organizer_id).await?;
            Ok(Organizer::from(model))
        })
    }

    /// Lists all organizers, oldest first.
    pub async fn organizers(&self) -> ResultEngine<Vec<Organizer>> {
        let models = organizers::Entity::find()
            .order_by_asc(organizers::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Organizer::from).collect())
    }
}
