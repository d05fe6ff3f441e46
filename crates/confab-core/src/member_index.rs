use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use confab_db::{DbError, DbPool};

use crate::error::CoreError;

const MEMBER_CACHE_TTL: Duration = Duration::from_secs(60);
const MEMBER_CACHE_CAPACITY: u64 = 10_000;

/// Read-through cache of group -> member set, used to compute fan-out
/// audiences without a per-message query.
///
/// Misses load from the store through `try_get_with`, which coalesces
/// concurrent loads for the same group into a single query. Group
/// management calls `invalidate` on every membership change; the TTL is a
/// backstop, not the invalidation contract. Authorization decisions never
/// read this cache — they go to the store directly.
#[derive(Clone)]
pub struct MembershipIndex {
    db: DbPool,
    cache: moka::future::Cache<i64, Arc<HashSet<i64>>>,
}

impl MembershipIndex {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            cache: moka::future::Cache::builder()
                .max_capacity(MEMBER_CACHE_CAPACITY)
                .time_to_live(MEMBER_CACHE_TTL)
                .build(),
        }
    }

    /// Cached member set, reloaded from the store on miss before
    /// returning. A group with no rows resolves to an empty set.
    pub async fn resolve(&self, group_id: i64) -> Result<Arc<HashSet<i64>>, CoreError> {
        let db = self.db.clone();
        self.cache
            .try_get_with(group_id, async move {
                let members = confab_db::groups::get_member_ids(&db, group_id).await?;
                Ok::<_, DbError>(Arc::new(members.into_iter().collect()))
            })
            .await
            .map_err(|err: Arc<DbError>| CoreError::Internal(err.to_string()))
    }

    pub async fn invalidate(&self, group_id: i64) {
        self.cache.invalidate(&group_id).await;
    }
}
