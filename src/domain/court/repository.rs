//! Court repository interface

use async_trait::async_trait;

use super::model::{Court, NewCourt};
use crate::shared::errors::DomainResult;

#[async_trait]
pub trait CourtRepository: Send + Sync {
    /// All courts with their images, ordered by id
    async fn find_all(&self) -> DomainResult<Vec<Court>>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Court>>;

    /// Create a court and its images, returning the stored court
    async fn create(&self, court: NewCourt) -> DomainResult<Court>;

    async fn count(&self) -> DomainResult<u64>;
}
