//! Lesson gating.
//!
//! Precedence: headers are always navigable, then the admin override, then free
//! previews, then the viewer's enrollment.

use chrono::{DateTime, Utc};

use crate::model::{AccessType, Enrollment, EnrollmentStatus, Learner, Lesson};

/// Why a lesson is locked. Drives the lock screen (enroll vs renew).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockReason {
    SignInRequired,
    NotEnrolled,
    PendingApproval,
    Suspended,
    Rejected,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessDecision {
    Unlocked,
    Locked(LockReason),
}

impl AccessDecision {
    #[must_use]
    pub fn is_unlocked(self) -> bool {
        matches!(self, Self::Unlocked)
    }

    #[must_use]
    pub fn lock_reason(self) -> Option<LockReason> {
        match self {
            Self::Unlocked => None,
            Self::Locked(reason) => Some(reason),
        }
    }
}

/// Everything the policy needs to know about the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub enrollment: Option<Enrollment>,
    pub is_admin: bool,
    pub signed_in: bool,
    pub now: DateTime<Utc>,
}

impl AccessContext {
    #[must_use]
    pub fn for_viewer(
        viewer: Option<&Learner>,
        enrollment: Option<Enrollment>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            enrollment,
            is_admin: viewer.is_some_and(Learner::is_admin),
            signed_in: viewer.is_some(),
            now,
        }
    }
}

pub struct AccessPolicy;

impl AccessPolicy {
    #[must_use]
    pub fn decide(lesson: &Lesson, ctx: &AccessContext) -> AccessDecision {
        if lesson.is_header() || ctx.is_admin || lesson.is_free() {
            return AccessDecision::Unlocked;
        }

        let Some(enrollment) = ctx.enrollment.as_ref() else {
            return AccessDecision::Locked(if ctx.signed_in {
                LockReason::NotEnrolled
            } else {
                LockReason::SignInRequired
            });
        };

        match enrollment.status {
            EnrollmentStatus::None => AccessDecision::Locked(LockReason::NotEnrolled),
            EnrollmentStatus::Pending => AccessDecision::Locked(LockReason::PendingApproval),
            EnrollmentStatus::Suspended => AccessDecision::Locked(LockReason::Suspended),
            EnrollmentStatus::Rejected => AccessDecision::Locked(LockReason::Rejected),
            EnrollmentStatus::Approved => {
                let current = match enrollment.expiry {
                    None => true,
                    Some(_) if enrollment.access_type == AccessType::Lifetime => true,
                    Some(expiry) => ctx.now <= expiry,
                };
                if current {
                    AccessDecision::Unlocked
                } else {
                    AccessDecision::Locked(LockReason::Expired)
                }
            }
        }
    }

    #[must_use]
    pub fn is_unlocked(lesson: &Lesson, ctx: &AccessContext) -> bool {
        Self::decide(lesson, ctx).is_unlocked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, LearnerId, LessonId, LessonKind};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn lesson(kind: LessonKind) -> Lesson {
        Lesson::new(LessonId::new(1), CourseId::new(1), "L", kind, Some(1), fixed_now())
    }

    fn enrollment(status: EnrollmentStatus, access: AccessType, expiry_days: Option<i64>) -> Enrollment {
        Enrollment::new(
            LearnerId::new(1),
            CourseId::new(1),
            status,
            access,
            expiry_days.map(|days| fixed_now() + Duration::days(days)),
        )
    }

    fn ctx(enrollment: Option<Enrollment>, is_admin: bool) -> AccessContext {
        AccessContext {
            enrollment,
            is_admin,
            signed_in: true,
            now: fixed_now(),
        }
    }

    #[test]
    fn expired_limited_enrollment_is_locked_unless_admin() {
        let lesson = lesson(LessonKind::Video);
        let expired = enrollment(EnrollmentStatus::Approved, AccessType::Limited, Some(-1));

        let learner = ctx(Some(expired.clone()), false);
        assert!(!AccessPolicy::is_unlocked(&lesson, &learner));
        assert_eq!(
            AccessPolicy::decide(&lesson, &learner),
            AccessDecision::Locked(LockReason::Expired)
        );

        assert!(AccessPolicy::is_unlocked(&lesson, &ctx(Some(expired), true)));
    }

    #[test]
    fn admin_and_free_short_circuit_every_enrollment() {
        let statuses = [
            EnrollmentStatus::None,
            EnrollmentStatus::Pending,
            EnrollmentStatus::Approved,
            EnrollmentStatus::Suspended,
            EnrollmentStatus::Rejected,
        ];
        let free = lesson(LessonKind::Quiz).with_free(true);
        let paid = lesson(LessonKind::Quiz);
        for status in statuses {
            for expiry in [None, Some(-10), Some(10)] {
                let e = enrollment(status, AccessType::Limited, expiry);
                assert!(AccessPolicy::is_unlocked(&paid, &ctx(Some(e.clone()), true)));
                assert!(AccessPolicy::is_unlocked(&free, &ctx(Some(e), false)));
            }
        }
        assert!(AccessPolicy::is_unlocked(&free, &ctx(None, false)));
    }

    #[test]
    fn approved_enrollment_unlocks_within_expiry() {
        let paid = lesson(LessonKind::Text);
        let open_ended = enrollment(EnrollmentStatus::Approved, AccessType::Limited, None);
        let future = enrollment(EnrollmentStatus::Approved, AccessType::Limited, Some(3));
        let today = enrollment(EnrollmentStatus::Approved, AccessType::Limited, Some(0));
        let lifetime_past = enrollment(EnrollmentStatus::Approved, AccessType::Lifetime, Some(-3));
        for e in [open_ended, future, today, lifetime_past] {
            assert!(AccessPolicy::is_unlocked(&paid, &ctx(Some(e), false)));
        }
    }

    #[test]
    fn non_approved_statuses_report_reasons() {
        let paid = lesson(LessonKind::Video);
        let cases = [
            (EnrollmentStatus::None, LockReason::NotEnrolled),
            (EnrollmentStatus::Pending, LockReason::PendingApproval),
            (EnrollmentStatus::Suspended, LockReason::Suspended),
            (EnrollmentStatus::Rejected, LockReason::Rejected),
        ];
        for (status, reason) in cases {
            let e = enrollment(status, AccessType::Lifetime, None);
            assert_eq!(
                AccessPolicy::decide(&paid, &ctx(Some(e), false)),
                AccessDecision::Locked(reason)
            );
        }
    }

    #[test]
    fn anonymous_viewer_must_sign_in() {
        let ctx = AccessContext::for_viewer(None, None, fixed_now());
        assert_eq!(
            AccessPolicy::decide(&lesson(LessonKind::Video), &ctx),
            AccessDecision::Locked(LockReason::SignInRequired)
        );
    }

    #[test]
    fn headers_are_always_navigable() {
        let ctx = AccessContext::for_viewer(None, None, fixed_now());
        assert!(AccessPolicy::is_unlocked(&lesson(LessonKind::Header), &ctx));
    }
}
