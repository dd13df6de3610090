use crate::model::ids::LearnerId;

/// Role reported by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Student,
}

/// The signed-in viewer of a course. The player only reads `id` and whether the
/// role is `Admin`; it performs no authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Learner {
    pub id: LearnerId,
    pub role: Role,
}

impl Learner {
    #[must_use]
    pub fn student(id: LearnerId) -> Self {
        Self {
            id,
            role: Role::Student,
        }
    }

    #[must_use]
    pub fn admin(id: LearnerId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
