pub struct Session {
    pub user_id: i64,
    pub session_id: String,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
