use sea_orm::{DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, locations, organizers, payments, players, sessions,
};

use super::Engine;

/// Generates a `require_*` method that loads a row by id and checks it
/// belongs to the organizer.
///
/// Missing rows are `KeyNotFound`; rows of another organizer are `Forbidden`.
macro_rules! impl_require_in_organizer {
    ($require_fn:ident, $module:ident, $label:literal) => {
        pub(crate) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            organizer_id: &str,
            id: Uuid,
        ) -> ResultEngine<$module::Model> {
            let model = $module::Entity::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))?;
            if model.organizer_id != organizer_id {
                return Err(EngineError::Forbidden(format!(
                    concat!($label, " {} belongs to another organizer"),
                    id
                )));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_in_organizer!(require_player, players, "player");
    impl_require_in_organizer!(require_session, sessions, "session");
    impl_require_in_organizer!(require_location, locations, "location");
    impl_require_in_organizer!(require_payment, payments, "payment");

    /// Every operation starts here: an unknown organizer is an authorization
    /// failure, not a missing key, and aborts before any write.
    pub(crate) async fn require_organizer(
        &self,
        db: &DatabaseTransaction,
        organizer_id: &str,
    ) -> ResultEngine<organizers::Model> {
        organizers::Entity::find_by_id(organizer_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::Forbidden(format!("organizer {organizer_id} is not accessible"))
            })
    }
}
