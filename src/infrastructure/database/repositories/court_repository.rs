//! SeaORM implementation of CourtRepository

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::db_err;
use crate::domain::{Court, CourtImage, CourtRepository, DomainResult, NewCourt};
use crate::infrastructure::database::entities::{court, court_image};

pub struct SeaOrmCourtRepository {
    db: DatabaseConnection,
}

impl SeaOrmCourtRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn images_by_court(&self, court_ids: Vec<i32>) -> DomainResult<HashMap<i32, Vec<CourtImage>>> {
        let images = court_image::Entity::find()
            .filter(court_image::Column::CourtId.is_in(court_ids))
            .order_by_asc(court_image::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut grouped: HashMap<i32, Vec<CourtImage>> = HashMap::new();
        for image in images {
            grouped.entry(image.court_id).or_default().push(CourtImage {
                id: image.id,
                url: image.url,
            });
        }
        Ok(grouped)
    }
}

fn model_to_domain(m: court::Model, images: Vec<CourtImage>) -> Court {
    Court {
        id: m.id,
        name: m.name,
        sport: m.sport,
        indoor: m.indoor,
        surface: m.surface,
        images,
        created_at: m.created_at,
    }
}

#[async_trait]
impl CourtRepository for SeaOrmCourtRepository {
    async fn find_all(&self) -> DomainResult<Vec<Court>> {
        let courts = court::Entity::find()
            .order_by_asc(court::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut images = self
            .images_by_court(courts.iter().map(|c| c.id).collect())
            .await?;

        Ok(courts
            .into_iter()
            .map(|c| {
                let imgs = images.remove(&c.id).unwrap_or_default();
                model_to_domain(c, imgs)
            })
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Court>> {
        let Some(found) = court::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let mut images = self.images_by_court(vec![id]).await?;
        Ok(Some(model_to_domain(
            found,
            images.remove(&id).unwrap_or_default(),
        )))
    }

    async fn create(&self, new: NewCourt) -> DomainResult<Court> {
        debug!("Creating court: {}", new.name);
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(db_err)?;

        let created = court::ActiveModel {
            id: NotSet,
            name: Set(new.name),
            sport: Set(new.sport),
            indoor: Set(new.indoor),
            surface: Set(new.surface),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        let mut images = Vec::with_capacity(new.image_urls.len());
        for url in new.image_urls {
            let image = court_image::ActiveModel {
                id: NotSet,
                court_id: Set(created.id),
                url: Set(url),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
            images.push(CourtImage {
                id: image.id,
                url: image.url,
            });
        }

        txn.commit().await.map_err(db_err)?;
        info!("Court {} created: {}", created.id, created.name);
        Ok(model_to_domain(created, images))
    }

    async fn count(&self) -> DomainResult<u64> {
        court::Entity::find().count(&self.db).await.map_err(db_err)
    }
}
