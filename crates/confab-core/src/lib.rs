pub mod auth;
pub mod error;
pub mod group;
pub mod member_index;
pub mod message;
pub mod mux;
pub mod presence;
pub mod router;

use std::sync::Arc;

use confab_db::DbPool;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub mux: Arc<mux::ConnectionMux>,
    pub presence: Arc<presence::PresenceRegistry>,
    pub members: member_index::MembershipIndex,
    pub router: Arc<router::MessageRouter>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let mux = Arc::new(mux::ConnectionMux::new());
        let members = member_index::MembershipIndex::new(db.clone());
        let router = Arc::new(router::MessageRouter::new(mux.clone(), members.clone()));
        Self {
            db,
            mux,
            presence: Arc::new(presence::PresenceRegistry::new()),
            members,
            router,
            config,
        }
    }
}
