use async_trait::async_trait;

use super::model::{Session, UserBasic};
use crate::shared::DomainResult;

#[async_trait]
pub trait SessionLookup: Send + Sync {
    async fn find_session(&self, session_id: i32) -> DomainResult<Option<Session>>;
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_user(&self, user_id: i32) -> DomainResult<Option<UserBasic>>;
}

#[async_trait]
pub trait OwnerLookup: Send + Sync {
    /// The user who owns (manages) the given cinema
    async fn find_cinema_owner(&self, cinema_id: i32) -> DomainResult<Option<UserBasic>>;
}
