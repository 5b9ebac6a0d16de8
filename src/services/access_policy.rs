use crate::models::user::Caller;

/// Decides whether a caller may mutate a test or see its answer keys.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    privileged_permission: i32,
}

impl AccessPolicy {
    pub fn new(privileged_permission: i32) -> Self {
        Self {
            privileged_permission,
        }
    }

    pub fn is_privileged(&self, caller: &Caller) -> bool {
        caller.highest_permission() >= self.privileged_permission
    }

    /// Owner of the resource, or anyone holding a privileged role.
    pub fn can_manage(&self, caller: &Caller, owner_id: i64) -> bool {
        caller.id == owner_id || self.is_privileged(caller)
    }
}
