mod controller;
mod sidebar;
mod view;

// Public API of the player session subsystem.
pub use crate::error::SessionError;
pub use controller::{AdvanceOutcome, ExamCompletion, LessonChange, SessionController, SessionDeps};
pub use sidebar::{Sidebar, SidebarRow, SidebarSection};
pub use view::{LessonView, ViewMode};
