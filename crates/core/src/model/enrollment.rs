use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, LearnerId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("invalid enrollment status: {0}")]
    InvalidStatus(String),

    #[error("invalid access type: {0}")]
    InvalidAccessType(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrollmentStatus {
    None,
    Pending,
    Approved,
    Suspended,
    Rejected,
}

impl EnrollmentStatus {
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidStatus` for unknown values.
    pub fn parse(value: &str) -> Result<Self, EnrollmentError> {
        match value {
            "none" => Ok(Self::None),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "suspended" => Ok(Self::Suspended),
            "rejected" => Ok(Self::Rejected),
            other => Err(EnrollmentError::InvalidStatus(other.to_owned())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    Limited,
    Lifetime,
}

impl AccessType {
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidAccessType` for unknown values.
    pub fn parse(value: &str) -> Result<Self, EnrollmentError> {
        match value {
            "limited" => Ok(Self::Limited),
            "lifetime" => Ok(Self::Lifetime),
            other => Err(EnrollmentError::InvalidAccessType(other.to_owned())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Limited => "limited",
            Self::Lifetime => "lifetime",
        }
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// A learner's relationship to a course, owned by billing and read-only here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    pub access_type: AccessType,
    pub expiry: Option<DateTime<Utc>>,
}

impl Enrollment {
    #[must_use]
    pub fn new(
        learner_id: LearnerId,
        course_id: CourseId,
        status: EnrollmentStatus,
        access_type: AccessType,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            learner_id,
            course_id,
            status,
            access_type,
            expiry,
        }
    }

    /// Approved lifetime enrollment with no expiry.
    #[must_use]
    pub fn approved_lifetime(learner_id: LearnerId, course_id: CourseId) -> Self {
        Self::new(
            learner_id,
            course_id,
            EnrollmentStatus::Approved,
            AccessType::Lifetime,
            None,
        )
    }

    /// True when a limited enrollment's expiry lies strictly before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.access_type, self.expiry) {
            (AccessType::Lifetime, _) | (_, None) => false,
            (AccessType::Limited, Some(expiry)) => now > expiry,
        }
    }
}
