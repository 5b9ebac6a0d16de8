use serde::{Deserialize, Serialize};

/// Permission ids as issued by the identity service.
pub mod permission {
    pub const CREATOR: i32 = 1;
    pub const MODERATOR: i32 = 2;
    pub const ADMIN: i32 = 3;
}

/// The authenticated principal behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: i64,
    #[serde(default)]
    pub permissions: Vec<i32>,
}

impl Caller {
    pub fn new(id: i64, permissions: Vec<i32>) -> Self {
        Self { id, permissions }
    }

    pub fn highest_permission(&self) -> i32 {
        self.permissions.iter().copied().max().unwrap_or(0)
    }
}
