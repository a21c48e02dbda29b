use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Every entity type the client reads or writes. Doubles as the cache tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Student,
    Faculty,
    Admin,
    User,
    AcademicSemester,
    AcademicYear,
    AcademicFaculty,
    AcademicDepartment,
    Course,
    OfferedCourse,
    SemesterRegistration,
    EnrolledCourse,
    Mark,
    Job,
    Blog,
    Announcement,
    Certificate,
    Exam,
    Question,
}

impl EntityKind {
    pub const ALL: [EntityKind; 19] = [
        EntityKind::Student,
        EntityKind::Faculty,
        EntityKind::Admin,
        EntityKind::User,
        EntityKind::AcademicSemester,
        EntityKind::AcademicYear,
        EntityKind::AcademicFaculty,
        EntityKind::AcademicDepartment,
        EntityKind::Course,
        EntityKind::OfferedCourse,
        EntityKind::SemesterRegistration,
        EntityKind::EnrolledCourse,
        EntityKind::Mark,
        EntityKind::Job,
        EntityKind::Blog,
        EntityKind::Announcement,
        EntityKind::Certificate,
        EntityKind::Exam,
        EntityKind::Question,
    ];

    /// Get the display title for this entity type (plural).
    pub fn title(&self) -> &'static str {
        match self {
            EntityKind::Student => "Students",
            EntityKind::Faculty => "Faculty",
            EntityKind::Admin => "Admins",
            EntityKind::User => "Users",
            EntityKind::AcademicSemester => "Semesters",
            EntityKind::AcademicYear => "Academic Years",
            EntityKind::AcademicFaculty => "Academic Faculties",
            EntityKind::AcademicDepartment => "Departments",
            EntityKind::Course => "Courses",
            EntityKind::OfferedCourse => "Offered Courses",
            EntityKind::SemesterRegistration => "Registrations",
            EntityKind::EnrolledCourse => "Enrollments",
            EntityKind::Mark => "Marks",
            EntityKind::Job => "Jobs",
            EntityKind::Blog => "Blogs",
            EntityKind::Announcement => "Announcements",
            EntityKind::Certificate => "Certificates",
            EntityKind::Exam => "Exams",
            EntityKind::Question => "Questions",
        }
    }

    /// Singular noun used in notifications ("Blog created").
    pub fn singular(&self) -> &'static str {
        match self {
            EntityKind::Student => "Student",
            EntityKind::Faculty => "Faculty member",
            EntityKind::Admin => "Admin",
            EntityKind::User => "User",
            EntityKind::AcademicSemester => "Semester",
            EntityKind::AcademicYear => "Academic year",
            EntityKind::AcademicFaculty => "Academic faculty",
            EntityKind::AcademicDepartment => "Department",
            EntityKind::Course => "Course",
            EntityKind::OfferedCourse => "Offered course",
            EntityKind::SemesterRegistration => "Registration",
            EntityKind::EnrolledCourse => "Enrollment",
            EntityKind::Mark => "Mark",
            EntityKind::Job => "Job",
            EntityKind::Blog => "Blog",
            EntityKind::Announcement => "Announcement",
            EntityKind::Certificate => "Certificate",
            EntityKind::Exam => "Exam",
            EntityKind::Question => "Question",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A record mirrored from the backend.
pub trait Entity: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Cache key for `get`: `_id` when the backend sent one, otherwise `id`.
    fn key(&self) -> Option<&str>;
}

/// Implement [`Entity`] for a struct with `id` and `object_id` fields.
macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl $crate::models::kind::Entity for $ty {
            const KIND: $crate::models::kind::EntityKind = $kind;

            fn key(&self) -> Option<&str> {
                self.object_id.as_deref().or(self.id.as_deref())
            }
        }
    };
}

pub(crate) use impl_entity;
