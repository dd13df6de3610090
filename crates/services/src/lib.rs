#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod content;
pub mod error;
pub mod progress_tracker;
pub mod sessions;
pub mod telemetry;

pub use course_core::Clock;

pub use app_services::PlayerServices;
pub use config::{FlashcardCompletion, PlayerConfig};
pub use content::GatedContent;
pub use error::{ConfigError, ContentError, ProgressError, ServicesError, SessionError};
pub use progress_tracker::{ProgressTracker, ProgressUpdate};
pub use sessions::{
    AdvanceOutcome, ExamCompletion, LessonChange, LessonView, SessionController, SessionDeps,
    Sidebar, SidebarRow, SidebarSection, ViewMode,
};
pub use telemetry::init_tracing;
