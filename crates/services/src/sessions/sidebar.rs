use std::collections::BTreeSet;

use course_core::model::{Lesson, LessonId, LessonKind};
use course_core::{AccessContext, AccessPolicy, LessonCatalog};

/// One lesson line in the course outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarRow {
    pub lesson_id: LessonId,
    pub title: String,
    pub kind: LessonKind,
    pub locked: bool,
    pub completed: bool,
    pub active: bool,
    /// Only admins see hidden lessons; the flag lets them tell which ones.
    pub hidden: bool,
    pub free: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarSection {
    pub header: SidebarRow,
    pub items: Vec<SidebarRow>,
}

/// Course outline as the player renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidebar {
    /// Lessons listed before the first header.
    pub orphans: Vec<SidebarRow>,
    pub sections: Vec<SidebarSection>,
    /// Exams, in course order, for the assessments panel.
    pub assessments: Vec<SidebarRow>,
    pub percent: u32,
}

pub(crate) fn build(
    catalog: &LessonCatalog,
    ctx: &AccessContext,
    completed: &BTreeSet<LessonId>,
    active: Option<LessonId>,
) -> Sidebar {
    let row = |lesson: &Lesson| SidebarRow {
        lesson_id: lesson.id(),
        title: lesson.title().to_owned(),
        kind: lesson.kind().clone(),
        locked: !AccessPolicy::is_unlocked(lesson, ctx),
        completed: completed.contains(&lesson.id()),
        active: active == Some(lesson.id()),
        hidden: lesson.is_hidden(),
        free: lesson.is_free(),
    };

    Sidebar {
        orphans: catalog.orphans().iter().map(row).collect(),
        sections: catalog
            .sections()
            .iter()
            .map(|section| SidebarSection {
                header: row(section.header()),
                items: section.items().iter().map(row).collect(),
            })
            .collect(),
        assessments: catalog.assessments().iter().map(row).collect(),
        percent: catalog.percent_complete(completed),
    }
}
