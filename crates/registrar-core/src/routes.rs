//! Pages, role guards and the per-role menu.
//!
//! Every page names the access it needs. [`guard`] checks the session
//! against that before a page is shown and says where to go instead.

use std::fmt;

use tracing::{debug, warn};

use crate::auth::{decode_token, Role, SessionStore};
use crate::models::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    ForgetPassword,
    ResetPassword,
    ChangePassword,
    Profile,
    Dashboard(Role),
    /// Management table for one entity type, under a role's section.
    Entities { role: Role, kind: EntityKind },
    /// One record of an entity type.
    Detail {
        role: Role,
        kind: EntityKind,
        id: String,
    },
    /// Offered courses open to the signed-in student.
    MyOfferedCourses,
    /// Courses the signed-in student is enrolled in.
    MyEnrolledCourses,
}

/// What a page requires of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    SignedIn,
    Role(Role),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    Redirect(Route),
}

impl Route {
    pub fn requirement(&self) -> Requirement {
        match self {
            Route::Login | Route::ForgetPassword | Route::ResetPassword => Requirement::Public,
            Route::ChangePassword | Route::Profile => Requirement::SignedIn,
            Route::Dashboard(role) => Requirement::Role(*role),
            Route::Entities { role, .. } | Route::Detail { role, .. } => Requirement::Role(*role),
            Route::MyOfferedCourses | Route::MyEnrolledCourses => Requirement::Role(Role::Student),
        }
    }

    /// Path in the role-prefixed scheme, e.g. `/admin/academic-semesters`.
    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::ForgetPassword => "/forget-password".to_string(),
            Route::ResetPassword => "/reset-password".to_string(),
            Route::ChangePassword => "/change-password".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Dashboard(role) => format!("/{}/dashboard", role),
            Route::Entities { role, kind } => format!("/{}/{}", role, slug(*kind)),
            Route::Detail { role, kind, id } => format!("/{}/{}/{}", role, slug(*kind), id),
            Route::MyOfferedCourses => "/student/offered-courses".to_string(),
            Route::MyEnrolledCourses => "/student/enrolled-courses".to_string(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Route::Login => "Login".to_string(),
            Route::ForgetPassword => "Forgot password".to_string(),
            Route::ResetPassword => "Reset password".to_string(),
            Route::ChangePassword => "Change password".to_string(),
            Route::Profile => "Profile".to_string(),
            Route::Dashboard(_) => "Dashboard".to_string(),
            Route::Entities { kind, .. } => kind.title().to_string(),
            Route::Detail { kind, .. } => kind.singular().to_string(),
            Route::MyOfferedCourses => "Offered Courses".to_string(),
            Route::MyEnrolledCourses => "My Courses".to_string(),
        }
    }

    /// The entity type a page lists, if it is a table page.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Route::Entities { kind, .. } | Route::Detail { kind, .. } => Some(*kind),
            Route::MyOfferedCourses => Some(EntityKind::OfferedCourse),
            Route::MyEnrolledCourses => Some(EntityKind::EnrolledCourse),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// URL segment for an entity type's table.
pub fn slug(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Student => "students",
        EntityKind::Faculty => "faculties",
        EntityKind::Admin => "admins",
        EntityKind::User => "users",
        EntityKind::AcademicSemester => "academic-semesters",
        EntityKind::AcademicYear => "academic-years",
        EntityKind::AcademicFaculty => "academic-faculties",
        EntityKind::AcademicDepartment => "academic-departments",
        EntityKind::Course => "courses",
        EntityKind::OfferedCourse => "offered-courses",
        EntityKind::SemesterRegistration => "semester-registrations",
        EntityKind::EnrolledCourse => "enrolled-courses",
        EntityKind::Mark => "marks",
        EntityKind::Job => "jobs",
        EntityKind::Blog => "blogs",
        EntityKind::Announcement => "announcements",
        EntityKind::Certificate => "certificates",
        EntityKind::Exam => "exams",
        EntityKind::Question => "questions",
    }
}

/// Landing page after login.
pub fn home_for(role: Role) -> Route {
    // SuperAdmin works in the admin section.
    match role {
        Role::SuperAdmin => Route::Dashboard(Role::Admin),
        other => Route::Dashboard(other),
    }
}

/// Decide whether the current session may open `route`.
///
/// An unreadable or expired token clears the session. A pending password
/// change pins every signed-in page to the change-password screen.
pub fn guard(session: &SessionStore, route: &Route) -> Access {
    let required = route.requirement();
    if required == Requirement::Public {
        return Access::Granted;
    }

    let Some(token) = session.current_token() else {
        return Access::Redirect(Route::Login);
    };
    let user = match decode_token(&token) {
        Ok(user) if !user.is_expired() => user,
        Ok(_) => {
            debug!("Session token expired");
            session.logout();
            return Access::Redirect(Route::Login);
        }
        Err(e) => {
            warn!(error = %e, "Session token failed verification, signing out");
            session.logout();
            return Access::Redirect(Route::Login);
        }
    };

    if session.needs_password_change() && *route != Route::ChangePassword {
        return Access::Redirect(Route::ChangePassword);
    }

    match required {
        Requirement::Role(role) if !user.role.satisfies(role) => {
            debug!(route = %route, role = %user.role, "Wrong role for route");
            Access::Redirect(Route::Login)
        }
        _ => Access::Granted,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub route: Route,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSection {
    pub title: &'static str,
    pub items: Vec<MenuItem>,
}

impl MenuSection {
    fn new(title: &'static str, items: Vec<Route>) -> Self {
        Self {
            title,
            items: items
                .into_iter()
                .map(|route| MenuItem {
                    label: route.title(),
                    route,
                })
                .collect(),
        }
    }
}

fn entities(role: Role, kinds: &[EntityKind]) -> Vec<Route> {
    kinds
        .iter()
        .map(|kind| Route::Entities { role, kind: *kind })
        .collect()
}

/// The navigation tree for `role`.
pub fn menu_for(role: Role) -> Vec<MenuSection> {
    use EntityKind::*;

    match role {
        Role::SuperAdmin | Role::Admin => {
            let mut people = entities(Role::Admin, &[Student, Faculty]);
            if role == Role::SuperAdmin {
                people.push(Route::Entities {
                    role: Role::SuperAdmin,
                    kind: Admin,
                });
            }
            vec![
                MenuSection::new("Overview", vec![Route::Dashboard(Role::Admin), Route::Profile]),
                MenuSection::new("User Management", people),
                MenuSection::new(
                    "Academic Management",
                    entities(
                        Role::Admin,
                        &[AcademicSemester, AcademicYear, AcademicFaculty, AcademicDepartment],
                    ),
                ),
                MenuSection::new(
                    "Course Management",
                    entities(Role::Admin, &[Course, SemesterRegistration, OfferedCourse]),
                ),
                MenuSection::new(
                    "Content",
                    entities(Role::Admin, &[Exam, Question, Mark, Certificate, Job, Blog, Announcement]),
                ),
            ]
        }
        Role::Faculty => vec![
            MenuSection::new("Overview", vec![Route::Dashboard(Role::Faculty), Route::Profile]),
            MenuSection::new(
                "Teaching",
                entities(Role::Faculty, &[OfferedCourse, EnrolledCourse, Exam, Question, Mark]),
            ),
            MenuSection::new("Content", entities(Role::Faculty, &[Blog, Announcement])),
        ],
        Role::Student => vec![
            MenuSection::new("Overview", vec![Route::Dashboard(Role::Student), Route::Profile]),
            MenuSection::new(
                "Courses",
                vec![
                    Route::MyOfferedCourses,
                    Route::MyEnrolledCourses,
                    Route::Entities {
                        role: Role::Student,
                        kind: Mark,
                    },
                ],
            ),
            MenuSection::new(
                "Content",
                entities(Role::Student, &[Certificate, Job, Blog, Announcement]),
            ),
        ],
    }
}

/// Every page in `role`'s menu, in menu order.
pub fn menu_routes(role: Role) -> Vec<Route> {
    menu_for(role)
        .into_iter()
        .flat_map(|section| section.items.into_iter().map(|item| item.route))
        .collect()
}
