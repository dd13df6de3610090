use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, Enrollment, EnrollmentStatus, Learner, LearnerId, Lesson, LessonId,
    LessonKind,
};
use course_core::runner::{
    ExamRunner, FlashcardRunner, FlashcardStep, QuizRunner, SubmitOutcome, Verdict,
};
use course_core::{AccessContext, AccessDecision, AccessPolicy, Clock, LessonCatalog, LockReason};
use storage::feed::ProgressSubscription;
use storage::repository::{CourseRepository, EnrollmentRepository};
use tracing::{debug, info, warn};

use crate::config::{FlashcardCompletion, PlayerConfig};
use crate::content::GatedContent;
use crate::error::{ProgressError, SessionError};
use crate::progress_tracker::ProgressTracker;
use crate::sessions::sidebar::{self, Sidebar};
use crate::sessions::view::{LessonView, ViewMode};

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of asking to open a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonChange {
    /// The lesson was already active.
    Unchanged,
    Activated(LessonId),
    /// Access was refused; the previously active lesson stays active.
    Denied(LockReason),
}

/// Result of moving past the active lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Moved(LessonId),
    /// The active lesson is the last learnable one.
    CourseFinished,
    Denied { lesson_id: LessonId, reason: LockReason },
}

/// Result of submitting an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamCompletion {
    /// Scored and the completion was stored.
    Recorded { score: u32 },
    /// Scored, but the completion could not be stored. The learner can retry.
    RetryNeeded { score: u32 },
    /// Scored; anonymous viewers have nothing to store.
    Unrecorded { score: u32 },
    AlreadySubmitted { score: u32 },
}

impl ExamCompletion {
    #[must_use]
    pub fn score(self) -> u32 {
        match self {
            Self::Recorded { score }
            | Self::RetryNeeded { score }
            | Self::Unrecorded { score }
            | Self::AlreadySubmitted { score } => score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAdvance {
    from: LessonId,
    due: DateTime<Utc>,
}

//
// ─── DEPENDENCIES ──────────────────────────────────────────────────────────────
//

/// Everything a session needs from the outside, shared by all sessions of one
/// `PlayerServices`.
#[derive(Clone)]
pub struct SessionDeps {
    clock: Clock,
    config: PlayerConfig,
    courses: Arc<dyn CourseRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    tracker: Arc<ProgressTracker>,
    content: GatedContent,
}

impl SessionDeps {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: PlayerConfig,
        courses: Arc<dyn CourseRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        tracker: Arc<ProgressTracker>,
    ) -> Self {
        let content = GatedContent::new(courses.clone());
        Self {
            clock,
            config,
            courses,
            enrollments,
            tracker,
            content,
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// One viewer playing one course.
///
/// Owns the active lesson and its ephemeral state. Navigating to another lesson
/// drops the previous lesson's runner, so quiz picks and exam answers never
/// survive a lesson change.
pub struct SessionController {
    deps: SessionDeps,
    viewer: Option<Learner>,
    course: Course,
    catalog: LessonCatalog,
    access: AccessContext,
    completed: BTreeSet<LessonId>,
    active: Option<LessonId>,
    view: LessonView,
    pending_advance: Option<PendingAdvance>,
    subscription: Option<ProgressSubscription>,
    exam_retry: Option<LessonId>,
}

impl SessionController {
    /// Opens `course_id` for `viewer` and activates `start` when it is visible,
    /// otherwise the first learnable lesson.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the course cannot be loaded. Enrollment
    /// and progress read failures are logged and treated as "not enrolled" and
    /// "nothing completed".
    pub async fn open(
        deps: SessionDeps,
        viewer: Option<Learner>,
        course_id: CourseId,
        start: Option<LessonId>,
    ) -> Result<Self, SessionError> {
        let course = deps.courses.get_course(course_id).await?;
        let is_admin = viewer.as_ref().is_some_and(Learner::is_admin);
        let catalog = LessonCatalog::for_viewer(&course, is_admin);
        let now = deps.clock.now();

        let enrollment = match &viewer {
            Some(learner) => Self::load_enrollment(&deps, learner.id, course_id, now).await,
            None => None,
        };
        let access = AccessContext::for_viewer(viewer.as_ref(), enrollment, now);

        let (completed, subscription) = match &viewer {
            Some(learner) => {
                // Subscribe before reading so no write lands between the two.
                let subscription = deps.tracker.attach(learner.id, course_id);
                let completed = match deps.tracker.load(learner.id, course_id).await {
                    Ok(completed) => completed,
                    Err(e) => {
                        warn!(learner = %learner.id, course = %course_id, error = %e, "could not load progress");
                        deps.tracker.completed(learner.id, course_id)
                    }
                };
                (completed, Some(subscription))
            }
            None => (BTreeSet::new(), None),
        };

        info!(
            course = %course_id,
            learner = ?viewer.map(|learner| learner.id),
            lessons = catalog.lessons().len(),
            "session opened"
        );

        let mut session = Self {
            deps,
            viewer,
            course,
            catalog,
            access,
            completed,
            active: None,
            view: LessonView::Empty,
            pending_advance: None,
            subscription,
            exam_retry: None,
        };
        session.activate_initial(start).await;
        Ok(session)
    }

    async fn load_enrollment(
        deps: &SessionDeps,
        learner: LearnerId,
        course: CourseId,
        now: DateTime<Utc>,
    ) -> Option<Enrollment> {
        let enrollment = match deps.enrollments.get_enrollment(learner, course).await {
            Ok(enrollment) => enrollment,
            Err(e) => {
                warn!(learner = %learner, course = %course, error = %e, "could not load enrollment");
                return None;
            }
        };
        if enrollment
            .as_ref()
            .is_some_and(|e| e.status == EnrollmentStatus::Approved)
        {
            if let Err(e) = deps.enrollments.touch_last_accessed(learner, course, now).await {
                warn!(learner = %learner, course = %course, error = %e, "could not stamp last access");
            }
        }
        enrollment
    }

    async fn activate_initial(&mut self, start: Option<LessonId>) {
        let target = start
            .and_then(|id| self.catalog.get(id))
            .or_else(|| self.catalog.first_learnable())
            .cloned();
        let Some(lesson) = target else {
            debug!(course = %self.course.id(), "course has no learnable lessons");
            return;
        };
        self.refresh_access_time();
        match AccessPolicy::decide(&lesson, &self.access) {
            AccessDecision::Locked(reason) => {
                self.active = Some(lesson.id());
                self.view = LessonView::Locked {
                    lesson_id: lesson.id(),
                    reason,
                };
            }
            AccessDecision::Unlocked => self.activate(&lesson).await,
        }
    }

    /// Switches course, keeping the viewer. The old live subscription is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the new course cannot be loaded; the
    /// current course stays open.
    pub async fn change_course(
        &mut self,
        course_id: CourseId,
        start: Option<LessonId>,
    ) -> Result<(), SessionError> {
        let next = Self::open(self.deps.clone(), self.viewer, course_id, start).await?;
        debug!(from = %self.course.id(), to = %course_id, "course changed");
        *self = next;
        Ok(())
    }

    // ─── Navigation ──────────────────────────────────────────────────────────

    /// Makes `id` the active lesson if the viewer may open it.
    ///
    /// A denied change leaves the active lesson and its state untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownLesson` if `id` is not visible in this course.
    pub async fn change_lesson(&mut self, id: LessonId) -> Result<LessonChange, SessionError> {
        let lesson = self
            .catalog
            .get(id)
            .cloned()
            .ok_or(SessionError::UnknownLesson(id))?;

        self.refresh_access_time();
        if let AccessDecision::Locked(reason) = AccessPolicy::decide(&lesson, &self.access) {
            info!(lesson = %id, ?reason, "lesson change denied");
            return Ok(LessonChange::Denied(reason));
        }
        if self.active == Some(id) && self.view.mode() != ViewMode::Locked {
            return Ok(LessonChange::Unchanged);
        }

        self.activate(&lesson).await;
        Ok(LessonChange::Activated(id))
    }

    async fn activate(&mut self, lesson: &Lesson) {
        self.pending_advance = None;
        if self.exam_retry.take().is_some() {
            debug!(lesson = %lesson.id(), "left exam with an unsaved completion");
        }
        self.active = Some(lesson.id());
        self.view = match lesson.kind() {
            LessonKind::Header => LessonView::Header {
                title: lesson.title().to_owned(),
            },
            LessonKind::Unsupported(kind) => LessonView::Unsupported {
                lesson_id: lesson.id(),
                kind: kind.clone(),
            },
            _ => match self.deps.content.load(lesson, &self.access).await {
                Ok(payload) => LessonView::from_payload(lesson, payload),
                Err(e) => LessonView::from_content_error(lesson, e),
            },
        };
        debug!(lesson = %lesson.id(), mode = ?self.view.mode(), "lesson activated");
    }

    /// Moves to the next learnable lesson, crossing section boundaries.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveLesson` when nothing is active.
    pub async fn auto_advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        self.pending_advance = None;
        let current = self.active.ok_or(SessionError::NoActiveLesson)?;
        let Some(next) = self.catalog.next_learnable_after(current)?.map(Lesson::id) else {
            info!(course = %self.course.id(), lesson = %current, "course finished");
            return Ok(AdvanceOutcome::CourseFinished);
        };
        Ok(match self.change_lesson(next).await? {
            LessonChange::Activated(id) => AdvanceOutcome::Moved(id),
            LessonChange::Unchanged => AdvanceOutcome::Moved(next),
            LessonChange::Denied(reason) => AdvanceOutcome::Denied {
                lesson_id: next,
                reason,
            },
        })
    }

    /// Marks the active lesson complete and moves on. Headers are skipped
    /// without being marked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Locked` when the active lesson is locked.
    pub async fn complete_and_continue(&mut self) -> Result<AdvanceOutcome, SessionError> {
        let lesson = self.active.ok_or(SessionError::NoActiveLesson)?;
        if let LessonView::Locked { reason, .. } = self.view {
            return Err(SessionError::Locked(reason));
        }
        if !matches!(self.view, LessonView::Header { .. }) {
            self.record_completion_logged(lesson).await;
        }
        self.auto_advance().await
    }

    /// Time at which the scheduled auto-advance fires, if any.
    #[must_use]
    pub fn pending_advance(&self) -> Option<DateTime<Utc>> {
        self.pending_advance.map(|pending| pending.due)
    }

    pub fn cancel_auto_advance(&mut self) {
        self.pending_advance = None;
    }

    /// Fires the scheduled auto-advance once its delay has passed.
    ///
    /// Returns `Ok(None)` when nothing is due. A schedule left behind by a lesson
    /// that is no longer active is discarded.
    ///
    /// # Errors
    ///
    /// Propagates errors from `auto_advance`.
    pub async fn poll_auto_advance(&mut self) -> Result<Option<AdvanceOutcome>, SessionError> {
        let Some(pending) = self.pending_advance else {
            return Ok(None);
        };
        if self.active != Some(pending.from) {
            self.pending_advance = None;
            return Ok(None);
        }
        if self.deps.clock.now() < pending.due {
            return Ok(None);
        }
        self.auto_advance().await.map(Some)
    }

    fn schedule_advance(&mut self) {
        let Some(from) = self.active else {
            return;
        };
        let due = self.deps.clock.now() + self.deps.config.auto_advance_delay;
        debug!(lesson = %from, %due, "auto-advance scheduled");
        self.pending_advance = Some(PendingAdvance { from, due });
    }

    // ─── Quiz ────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless a quiz is active, or the runner's
    /// error for an invalid pick.
    pub fn quiz_select(&mut self, option: usize) -> Result<(), SessionError> {
        self.quiz_mut()?.select_option(option)?;
        Ok(())
    }

    /// Checks the selected option. A correct answer completes the lesson and
    /// schedules the auto-advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless a quiz is active, or the runner's
    /// error when nothing is selected.
    pub async fn quiz_check(&mut self) -> Result<Verdict, SessionError> {
        let verdict = self.quiz_mut()?.check()?;
        if verdict == Verdict::Correct {
            let lesson = self.active.ok_or(SessionError::NoActiveLesson)?;
            self.record_completion_logged(lesson).await;
            self.schedule_advance();
        }
        Ok(verdict)
    }

    /// # Errors
    ///
    /// Returns the runner's error unless the last check was incorrect.
    pub fn quiz_retry(&mut self) -> Result<(), SessionError> {
        self.quiz_mut()?.retry()?;
        Ok(())
    }

    // ─── Exam ────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless an exam is active, or the runner's
    /// error for a locked question or an invalid pick.
    pub fn exam_select(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
        self.exam_mut()?.select_option(question, option)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless an exam is active.
    pub fn exam_reveal(&mut self, question: usize) -> Result<(), SessionError> {
        self.exam_mut()?.reveal(question)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless an exam is active.
    pub fn exam_jump(&mut self, question: usize) -> Result<(), SessionError> {
        self.exam_mut()?.jump_to(question)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless an exam is active.
    pub fn exam_next(&mut self) -> Result<usize, SessionError> {
        let exam = self.exam_mut()?;
        exam.next();
        Ok(exam.session().current_index())
    }

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless an exam is active.
    pub fn exam_prev(&mut self) -> Result<usize, SessionError> {
        let exam = self.exam_mut()?;
        exam.prev();
        Ok(exam.session().current_index())
    }

    /// Scores the exam and records the lesson as complete.
    ///
    /// The score is final once computed. Auto-advance is scheduled when the
    /// completion is stored (`Recorded`) or there is nothing to store
    /// (`Unrecorded`). If the completion cannot be stored the result is
    /// `RetryNeeded`, no advance is scheduled, and `retry_exam_completion` tries
    /// again.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::ConfirmationRequired` (wrapped) when `confirmed` is
    /// false on a first submit.
    pub async fn exam_submit(&mut self, confirmed: bool) -> Result<ExamCompletion, SessionError> {
        let score = match self.exam_mut()?.submit(confirmed)? {
            SubmitOutcome::AlreadySubmitted { score } => {
                return Ok(ExamCompletion::AlreadySubmitted { score });
            }
            SubmitOutcome::Submitted { score } => score,
        };
        let lesson = self.active.ok_or(SessionError::NoActiveLesson)?;
        info!(lesson = %lesson, score, "exam submitted");

        match self.record_completion(lesson).await {
            Ok(true) => {
                self.schedule_advance();
                Ok(ExamCompletion::Recorded { score })
            }
            Ok(false) => {
                self.schedule_advance();
                Ok(ExamCompletion::Unrecorded { score })
            }
            Err(e) => {
                warn!(lesson = %lesson, error = %e, "exam completion not saved");
                self.exam_retry = Some(lesson);
                Ok(ExamCompletion::RetryNeeded { score })
            }
        }
    }

    /// Writes a completion that `exam_submit` could not store.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToRetry` when no completion is pending.
    pub async fn retry_exam_completion(&mut self) -> Result<ExamCompletion, SessionError> {
        let lesson = self.exam_retry.ok_or(SessionError::NothingToRetry)?;
        let learner = self.learner_id().ok_or(ProgressError::Anonymous)?;
        let score = self.exam()?.session().score().unwrap_or(0);

        if let Err(e) = self.deps.tracker.persist(learner, self.course.id()).await {
            warn!(lesson = %lesson, error = %e, "exam completion retry failed");
            return Ok(ExamCompletion::RetryNeeded { score });
        }
        self.exam_retry = None;
        self.completed = self.deps.tracker.completed(learner, self.course.id());
        self.schedule_advance();
        Ok(ExamCompletion::Recorded { score })
    }

    #[must_use]
    pub fn exam_retry_pending(&self) -> bool {
        self.exam_retry.is_some()
    }

    // ─── Flashcards ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless a flashcard deck is active.
    pub fn flashcard_flip(&mut self) -> Result<bool, SessionError> {
        let deck = self.flashcards_mut()?;
        deck.flip();
        Ok(deck.is_flipped())
    }

    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless a flashcard deck is active.
    pub fn flashcard_prev(&mut self) -> Result<bool, SessionError> {
        Ok(self.flashcards_mut()?.prev())
    }

    /// Moves to the next card. Reaching the end of the deck completes the lesson
    /// only when configured with `FlashcardCompletion::DeckEnd`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::WrongView` unless a flashcard deck is active.
    pub async fn flashcard_next(&mut self) -> Result<FlashcardStep, SessionError> {
        let step = self.flashcards_mut()?.next();
        if step == FlashcardStep::DeckEnd
            && self.deps.config.flashcard_completion == FlashcardCompletion::DeckEnd
        {
            let lesson = self.active.ok_or(SessionError::NoActiveLesson)?;
            self.record_completion_logged(lesson).await;
            self.schedule_advance();
        }
        Ok(step)
    }

    // ─── Progress ────────────────────────────────────────────────────────────

    /// Manually flips a lesson's completion. Returns whether it is now complete.
    ///
    /// A failed write is logged; the local state keeps the change.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Progress(ProgressError::Anonymous)` for anonymous
    /// viewers, and `SessionError::Locked` or `SessionError::NotLearnable` when the
    /// lesson cannot be completed.
    pub async fn toggle_complete(&mut self, id: LessonId) -> Result<bool, SessionError> {
        self.refresh_access_time();
        let lesson = self.catalog.get(id).ok_or(SessionError::UnknownLesson(id))?;
        if lesson.is_header() {
            return Err(SessionError::NotLearnable(id));
        }
        if let AccessDecision::Locked(reason) = AccessPolicy::decide(lesson, &self.access) {
            return Err(SessionError::Locked(reason));
        }
        let learner = self.learner_id().ok_or(ProgressError::Anonymous)?;

        if let Err(e) = self
            .deps
            .tracker
            .toggle_complete(learner, self.course.id(), id)
            .await
        {
            warn!(lesson = %id, error = %e, "completion toggle not saved");
        }
        self.completed = self.deps.tracker.completed(learner, self.course.id());
        Ok(self.completed.contains(&id))
    }

    /// Applies the newest progress published by other sessions, without waiting.
    /// Returns whether the completed set changed. A snapshot is ignored while
    /// this learner has completions that are not stored yet.
    pub fn sync_progress(&mut self) -> bool {
        let Some(progress) = self
            .subscription
            .as_mut()
            .and_then(ProgressSubscription::try_latest)
        else {
            return false;
        };
        if !self.deps.tracker.apply_remote(&progress) {
            return false;
        }
        let changed = progress.completed() != &self.completed;
        self.completed = progress.completed().clone();
        changed
    }

    /// Waits for the next progress change that can be applied. Snapshots that
    /// would drop unsaved local completions are skipped. Returns `None` for
    /// anonymous viewers or once the feed is gone.
    pub async fn next_progress_update(&mut self) -> Option<BTreeSet<LessonId>> {
        loop {
            let progress = self.subscription.as_mut()?.changed().await?;
            if self.deps.tracker.apply_remote(&progress) {
                self.completed = progress.completed().clone();
                return Some(self.completed.clone());
            }
        }
    }

    /// Returns `Ok(false)` when there is no progress record to write to.
    async fn record_completion(&mut self, lesson: LessonId) -> Result<bool, ProgressError> {
        let Some(learner) = self.learner_id() else {
            debug!(lesson = %lesson, "anonymous completion not recorded");
            return Ok(false);
        };
        let result = self
            .deps
            .tracker
            .mark_complete(learner, self.course.id(), lesson)
            .await;
        self.completed = self.deps.tracker.completed(learner, self.course.id());
        result.map(|_| true)
    }

    async fn record_completion_logged(&mut self, lesson: LessonId) {
        if let Err(e) = self.record_completion(lesson).await {
            warn!(lesson = %lesson, error = %e, "completion not saved");
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn catalog(&self) -> &LessonCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn viewer(&self) -> Option<&Learner> {
        self.viewer.as_ref()
    }

    #[must_use]
    pub fn active_lesson_id(&self) -> Option<LessonId> {
        self.active
    }

    #[must_use]
    pub fn active_lesson(&self) -> Option<&Lesson> {
        self.active.and_then(|id| self.catalog.get(id))
    }

    #[must_use]
    pub fn view(&self) -> &LessonView {
        &self.view
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view.mode()
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<LessonId> {
        &self.completed
    }

    #[must_use]
    pub fn is_complete(&self, lesson: LessonId) -> bool {
        self.completed.contains(&lesson)
    }

    #[must_use]
    pub fn percent(&self) -> u32 {
        self.catalog.percent_complete(&self.completed)
    }

    /// True once every learnable lesson is complete.
    #[must_use]
    pub fn certificate_ready(&self) -> bool {
        self.catalog.learnable_count() > 0 && self.percent() >= 100
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    #[must_use]
    pub fn lock_reason(&self, lesson: &Lesson) -> Option<LockReason> {
        AccessPolicy::decide(lesson, &self.access).lock_reason()
    }

    #[must_use]
    pub fn sidebar(&self) -> Sidebar {
        sidebar::build(&self.catalog, &self.access, &self.completed, self.active)
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn learner_id(&self) -> Option<LearnerId> {
        self.viewer.map(|learner| learner.id)
    }

    /// Expiry is judged against the current time, not the time the session opened.
    fn refresh_access_time(&mut self) {
        self.access.now = self.deps.clock.now();
    }

    fn quiz_mut(&mut self) -> Result<&mut QuizRunner, SessionError> {
        match &mut self.view {
            LessonView::Quiz(runner) => Ok(runner),
            _ => Err(SessionError::WrongView { expected: "quiz" }),
        }
    }

    fn exam(&self) -> Result<&ExamRunner, SessionError> {
        match &self.view {
            LessonView::Exam(runner) => Ok(runner),
            _ => Err(SessionError::WrongView { expected: "exam" }),
        }
    }

    fn exam_mut(&mut self) -> Result<&mut ExamRunner, SessionError> {
        match &mut self.view {
            LessonView::Exam(runner) => Ok(runner),
            _ => Err(SessionError::WrongView { expected: "exam" }),
        }
    }

    fn flashcards_mut(&mut self) -> Result<&mut FlashcardRunner, SessionError> {
        match &mut self.view {
            LessonView::Flashcards(runner) => Ok(runner),
            _ => Err(SessionError::WrongView {
                expected: "flashcard deck",
            }),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.subscription = None;
        if let Some(learner) = self.learner_id() {
            self.deps.tracker.detach(learner, self.course.id());
        }
    }
}
