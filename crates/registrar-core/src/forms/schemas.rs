//! Built-in form definitions for every screen that writes to the backend.
//!
//! Field names are payload paths, so `student.name.firstName` produces the
//! nested body the create-student endpoint expects.

use crate::models::academic::{month_index, semester_code, MONTHS, SEMESTER_NAMES};
use crate::models::EntityKind;

use super::form::{FieldError, FieldSpec, Form, FormValues};
use super::rules::Rule;

const MIN_PASSWORD_LEN: usize = 6;

const GENDERS: [&str; 3] = ["male", "female", "other"];
const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
const WEEK_DAYS: &str = "Sat, Sun, Mon, Tue, Wed, Thu, Fri";
const REGISTRATION_STATUSES: [&str; 3] = ["UPCOMING", "ONGOING", "ENDED"];
const AUDIENCES: [&str; 4] = ["all", "student", "faculty", "admin"];
const CERTIFICATE_STATUSES: [&str; 3] = ["pending", "issued", "revoked"];

fn password_field(name: &str, label: &str) -> FieldSpec {
    FieldSpec::password(name, label)
        .required()
        .rule(Rule::MinLength(MIN_PASSWORD_LEN))
}

fn confirm_matches(values: &FormValues) -> Option<FieldError> {
    (values.get("newPassword") != values.get("confirmPassword"))
        .then(|| FieldError::new("confirmPassword", "Passwords do not match"))
}

pub fn login() -> Form {
    Form::new(
        "Login",
        vec![
            FieldSpec::text("id", "User ID").required(),
            FieldSpec::password("password", "Password").required(),
        ],
    )
}

pub fn change_password() -> Form {
    Form::new(
        "Password",
        vec![
            FieldSpec::password("oldPassword", "Current password").required(),
            password_field("newPassword", "New password"),
            password_field("confirmPassword", "Confirm password"),
        ],
    )
    .check(confirm_matches)
}

pub fn forget_password() -> Form {
    Form::new("Password reset", vec![FieldSpec::text("id", "User ID").required()])
}

pub fn reset_password() -> Form {
    Form::new(
        "Password",
        vec![
            FieldSpec::text("id", "User ID").required(),
            password_field("newPassword", "New password"),
            password_field("confirmPassword", "Confirm password"),
        ],
    )
    .check(confirm_matches)
}

pub fn blog() -> Form {
    Form::new(
        "Blog",
        vec![
            FieldSpec::text("title", "Title").required().rule(Rule::MaxLength(200)),
            FieldSpec::text("category", "Category").required(),
            FieldSpec::text("description", "Description").required(),
        ],
    )
}

pub fn job() -> Form {
    Form::new(
        "Job",
        vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::text("company", "Company").required(),
            FieldSpec::text("location", "Location"),
            FieldSpec::number("salary", "Salary").rule(Rule::Min(0.0)),
            FieldSpec::date("deadline", "Deadline"),
            FieldSpec::text("description", "Description").required(),
        ],
    )
}

pub fn announcement() -> Form {
    Form::new(
        "Announcement",
        vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::text("description", "Description").required(),
            FieldSpec::select("audience", "Audience", AUDIENCES),
        ],
    )
}

fn months_in_order(values: &FormValues) -> Option<FieldError> {
    let start = month_index(values.get("startMonth"))?;
    let end = month_index(values.get("endMonth"))?;
    (end < start).then(|| FieldError::new("endMonth", "End month must not be before start month"))
}

pub fn academic_semester() -> Form {
    let names: Vec<&str> = SEMESTER_NAMES.iter().map(|(name, _)| *name).collect();
    Form::new(
        "Semester",
        vec![
            FieldSpec::select("name", "Name", names).required(),
            FieldSpec::text("code", "Code").required(),
            FieldSpec::text("year", "Year")
                .required()
                .rule(Rule::Numeric)
                .rule(Rule::MinLength(4))
                .rule(Rule::MaxLength(4)),
            FieldSpec::select("startMonth", "Start month", MONTHS).required(),
            FieldSpec::select("endMonth", "End month", MONTHS).required(),
        ],
    )
    .derive("name", "code", |name| semester_code(name).map(str::to_string))
    .check(months_in_order)
}

pub fn academic_year() -> Form {
    Form::new(
        "Academic year",
        vec![
            FieldSpec::text("year", "Year").required().rule(Rule::Numeric),
            FieldSpec::text("title", "Title"),
        ],
    )
}

pub fn academic_faculty() -> Form {
    Form::new(
        "Academic faculty",
        vec![FieldSpec::text("name", "Name").required()],
    )
}

pub fn academic_department() -> Form {
    Form::new(
        "Department",
        vec![
            FieldSpec::text("name", "Name").required(),
            FieldSpec::select("academicFaculty", "Academic faculty", Vec::<String>::new())
                .required(),
        ],
    )
}

pub fn course() -> Form {
    Form::new(
        "Course",
        vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::text("prefix", "Prefix").required().rule(Rule::MaxLength(6)),
            FieldSpec::number("code", "Code").required().rule(Rule::Min(1.0)),
            FieldSpec::number("credits", "Credits")
                .required()
                .rule(Rule::Min(1.0))
                .rule(Rule::Max(6.0)),
        ],
    )
}

/// Fields shared by the three person forms, under `root`.
fn person_fields(root: &str) -> Vec<FieldSpec> {
    let at = |field: &str| format!("{}.{}", root, field);
    vec![
        FieldSpec::text(at("name.firstName"), "First name").required(),
        FieldSpec::text(at("name.middleName"), "Middle name"),
        FieldSpec::text(at("name.lastName"), "Last name").required(),
        FieldSpec::select(at("gender"), "Gender", GENDERS).required(),
        FieldSpec::date(at("dateOfBirth"), "Date of birth"),
        FieldSpec::text(at("email"), "Email").required().rule(Rule::Email),
        FieldSpec::text(at("contactNo"), "Contact no.").required(),
        FieldSpec::text(at("emergencyContactNo"), "Emergency contact"),
        FieldSpec::select(at("bloodGroup"), "Blood group", BLOOD_GROUPS),
        FieldSpec::text(at("presentAddress"), "Present address").required(),
        FieldSpec::text(at("permanentAddress"), "Permanent address"),
    ]
}

pub fn student() -> Form {
    let mut fields = vec![FieldSpec::password("password", "Password").rule(Rule::MinLength(MIN_PASSWORD_LEN))];
    fields.extend(person_fields("student"));
    fields.extend([
        FieldSpec::text("student.guardian.fatherName", "Father's name"),
        FieldSpec::text("student.guardian.motherName", "Mother's name"),
        FieldSpec::text("student.guardian.fatherContactNo", "Father's contact"),
        FieldSpec::select("student.admissionSemester", "Admission semester", Vec::<String>::new())
            .required(),
        FieldSpec::select("student.academicDepartment", "Department", Vec::<String>::new())
            .required(),
    ]);
    Form::new("Student", fields)
}

pub fn faculty() -> Form {
    let mut fields = vec![FieldSpec::password("password", "Password").rule(Rule::MinLength(MIN_PASSWORD_LEN))];
    fields.extend(person_fields("faculty"));
    fields.extend([
        FieldSpec::text("faculty.designation", "Designation").required(),
        FieldSpec::select("faculty.academicDepartment", "Department", Vec::<String>::new())
            .required(),
    ]);
    Form::new("Faculty member", fields)
}

pub fn admin() -> Form {
    let mut fields = vec![FieldSpec::password("password", "Password").rule(Rule::MinLength(MIN_PASSWORD_LEN))];
    fields.extend(person_fields("admin"));
    fields.push(FieldSpec::text("admin.designation", "Designation").required());
    Form::new("Admin", fields)
}

fn credits_in_order(values: &FormValues) -> Option<FieldError> {
    let min: f64 = values.get("minCredit").parse().ok()?;
    let max: f64 = values.get("maxCredit").parse().ok()?;
    (max < min).then(|| FieldError::new("maxCredit", "Max credit must not be below min credit"))
}

fn dates_in_order(values: &FormValues) -> Option<FieldError> {
    let start = values.get("startDate");
    let end = values.get("endDate");
    // ISO dates compare correctly as strings.
    (!start.is_empty() && !end.is_empty() && end < start)
        .then(|| FieldError::new("endDate", "End date must not be before start date"))
}

pub fn semester_registration() -> Form {
    Form::new(
        "Registration",
        vec![
            FieldSpec::select("academicSemester", "Semester", Vec::<String>::new()).required(),
            FieldSpec::select("status", "Status", REGISTRATION_STATUSES).required(),
            FieldSpec::date("startDate", "Start date").required(),
            FieldSpec::date("endDate", "End date").required(),
            FieldSpec::number("minCredit", "Min credit").required().rule(Rule::Min(0.0)),
            FieldSpec::number("maxCredit", "Max credit").required().rule(Rule::Min(1.0)),
        ],
    )
    .check(credits_in_order)
    .check(dates_in_order)
}

fn times_in_order(values: &FormValues) -> Option<FieldError> {
    let start = values.get("startTime");
    let end = values.get("endTime");
    (!start.is_empty() && !end.is_empty() && end <= start)
        .then(|| FieldError::new("endTime", "End time must be after start time"))
}

fn days_are_known(values: &FormValues) -> Option<FieldError> {
    values
        .get("days")
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .find(|d| !WEEK_DAYS.split(", ").any(|known| known == *d))
        .map(|d| FieldError::new("days", format!("Unknown day {:?}, use {}", d, WEEK_DAYS)))
}

pub fn offered_course() -> Form {
    Form::new(
        "Offered course",
        vec![
            FieldSpec::select("semesterRegistration", "Registration", Vec::<String>::new())
                .required(),
            FieldSpec::select("academicFaculty", "Academic faculty", Vec::<String>::new())
                .required(),
            FieldSpec::select("academicDepartment", "Department", Vec::<String>::new()).required(),
            FieldSpec::select("course", "Course", Vec::<String>::new()).required(),
            FieldSpec::select("faculty", "Faculty", Vec::<String>::new()).required(),
            FieldSpec::number("maxCapacity", "Max capacity").required().rule(Rule::Min(1.0)),
            FieldSpec::number("section", "Section").required().rule(Rule::Min(1.0)),
            FieldSpec::list("days", "Days").required(),
            FieldSpec::text("startTime", "Start time (HH:MM)")
                .required()
                .rule(Rule::MinLength(5))
                .rule(Rule::MaxLength(5)),
            FieldSpec::text("endTime", "End time (HH:MM)")
                .required()
                .rule(Rule::MinLength(5))
                .rule(Rule::MaxLength(5)),
        ],
    )
    .check(days_are_known)
    .check(times_in_order)
}

pub fn exam() -> Form {
    Form::new(
        "Exam",
        vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::select("course", "Course", Vec::<String>::new()).required(),
            FieldSpec::date("date", "Date").required(),
            FieldSpec::number("durationMinutes", "Duration (minutes)")
                .required()
                .rule(Rule::Min(1.0)),
            FieldSpec::number("totalMarks", "Total marks").required().rule(Rule::Min(1.0)),
        ],
    )
}

fn answer_is_an_option(values: &FormValues) -> Option<FieldError> {
    let answer = values.get("answer");
    if answer.is_empty() {
        return None;
    }
    let listed = values
        .get("options")
        .split(',')
        .map(str::trim)
        .any(|o| o == answer);
    (!listed).then(|| FieldError::new("answer", "Answer must be one of the options"))
}

pub fn question() -> Form {
    Form::new(
        "Question",
        vec![
            FieldSpec::select("exam", "Exam", Vec::<String>::new()).required(),
            FieldSpec::text("question", "Question").required(),
            FieldSpec::list("options", "Options (comma separated)").required(),
            FieldSpec::text("answer", "Answer").required(),
            FieldSpec::number("marks", "Marks").required().rule(Rule::Min(0.0)),
        ],
    )
    .check(answer_is_an_option)
}

pub fn certificate() -> Form {
    Form::new(
        "Certificate",
        vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::select("student", "Student", Vec::<String>::new()).required(),
            FieldSpec::date("issueDate", "Issue date"),
            FieldSpec::select("status", "Status", CERTIFICATE_STATUSES),
        ],
    )
}

pub fn mark() -> Form {
    Form::new(
        "Mark",
        vec![
            FieldSpec::select("student", "Student", Vec::<String>::new()).required(),
            FieldSpec::select("exam", "Exam", Vec::<String>::new()).required(),
            FieldSpec::number("marks", "Marks")
                .required()
                .rule(Rule::Min(0.0))
                .rule(Rule::Max(100.0)),
        ],
    )
}

/// Faculty grading of one enrollment; each component is capped at its weight.
pub fn course_marks() -> Form {
    Form::new(
        "Marks",
        vec![
            FieldSpec::text("semesterRegistration", "Registration").required(),
            FieldSpec::text("offeredCourse", "Offered course").required(),
            FieldSpec::text("student", "Student").required(),
            FieldSpec::number("courseMarks.classTest1", "Class test 1")
                .rule(Rule::Min(0.0))
                .rule(Rule::Max(10.0)),
            FieldSpec::number("courseMarks.midTerm", "Mid term")
                .rule(Rule::Min(0.0))
                .rule(Rule::Max(30.0)),
            FieldSpec::number("courseMarks.classTest2", "Class test 2")
                .rule(Rule::Min(0.0))
                .rule(Rule::Max(10.0)),
            FieldSpec::number("courseMarks.finalTerm", "Final term")
                .rule(Rule::Min(0.0))
                .rule(Rule::Max(50.0)),
        ],
    )
}

/// The create/edit form for an entity list, if it has one.
pub fn form_for(kind: EntityKind) -> Option<Form> {
    let form = match kind {
        EntityKind::Student => student(),
        EntityKind::Faculty => faculty(),
        EntityKind::Admin => admin(),
        EntityKind::AcademicSemester => academic_semester(),
        EntityKind::AcademicYear => academic_year(),
        EntityKind::AcademicFaculty => academic_faculty(),
        EntityKind::AcademicDepartment => academic_department(),
        EntityKind::Course => course(),
        EntityKind::OfferedCourse => offered_course(),
        EntityKind::SemesterRegistration => semester_registration(),
        EntityKind::EnrolledCourse => course_marks(),
        EntityKind::Mark => mark(),
        EntityKind::Job => job(),
        EntityKind::Blog => blog(),
        EntityKind::Announcement => announcement(),
        EntityKind::Certificate => certificate(),
        EntityKind::Exam => exam(),
        EntityKind::Question => question(),
        EntityKind::User => return None,
    };
    Some(form)
}

/// Which select fields draw their options from which entity list.
pub fn option_sources(kind: EntityKind) -> &'static [(&'static str, EntityKind)] {
    match kind {
        EntityKind::Student => &[
            ("student.admissionSemester", EntityKind::AcademicSemester),
            ("student.academicDepartment", EntityKind::AcademicDepartment),
        ],
        EntityKind::Faculty => &[("faculty.academicDepartment", EntityKind::AcademicDepartment)],
        EntityKind::AcademicDepartment => &[("academicFaculty", EntityKind::AcademicFaculty)],
        EntityKind::SemesterRegistration => &[("academicSemester", EntityKind::AcademicSemester)],
        EntityKind::OfferedCourse => &[
            ("semesterRegistration", EntityKind::SemesterRegistration),
            ("academicFaculty", EntityKind::AcademicFaculty),
            ("academicDepartment", EntityKind::AcademicDepartment),
            ("course", EntityKind::Course),
            ("faculty", EntityKind::Faculty),
        ],
        EntityKind::Exam => &[("course", EntityKind::Course)],
        EntityKind::Question => &[("exam", EntityKind::Exam)],
        EntityKind::Certificate => &[("student", EntityKind::Student)],
        EntityKind::Mark => &[("student", EntityKind::Student), ("exam", EntityKind::Exam)],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_writable_kind_has_a_form() {
        for kind in EntityKind::ALL {
            assert_eq!(form_for(kind).is_some(), kind != EntityKind::User, "{:?}", kind);
        }
    }

    #[test]
    fn test_option_sources_name_real_fields() {
        for kind in EntityKind::ALL {
            let Some(form) = form_for(kind) else { continue };
            for (field, _) in option_sources(kind) {
                assert!(form.field(field).is_some(), "{:?} has no field {}", kind, field);
            }
        }
    }

    #[test]
    fn test_blog_payload() {
        let mut form = blog();
        form.set("title", "T");
        form.set("category", "C");
        form.set("description", "D");
        assert!(form.validate().is_ok());
        assert_eq!(
            form.payload(),
            json!({ "title": "T", "category": "C", "description": "D" })
        );
    }

    #[test]
    fn test_semester_code_is_derived() {
        let mut form = academic_semester();
        form.set("name", "Fall");
        form.set("year", "2025");
        form.set("startMonth", "September");
        form.set("endMonth", "December");
        assert_eq!(form.value("code"), "03");
        assert!(form.validate().is_ok());

        form.set("endMonth", "January");
        assert!(form.validate().is_err());
        assert!(form.error("endMonth").is_some());
    }

    #[test]
    fn test_change_password_confirmation() {
        let mut form = change_password();
        form.set("oldPassword", "old-secret");
        form.set("newPassword", "new-secret");
        form.set("confirmPassword", "new-secrex");
        assert!(form.validate().is_err());
        assert_eq!(form.error("confirmPassword"), Some("Passwords do not match"));

        form.set("confirmPassword", "new-secret");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_student_payload_nests_under_student() {
        let mut form = student();
        form.set("student.name.firstName", "Mezba");
        form.set("student.name.lastName", "Abedin");
        form.set("student.gender", "male");
        form.set("student.email", "mezba@example.edu");
        form.set("student.contactNo", "0123");
        form.set("student.presentAddress", "Dhaka");
        form.set("student.admissionSemester", "sem1");
        form.set("student.academicDepartment", "dep1");
        assert!(form.validate().is_ok(), "{:?}", form);

        let payload = form.payload();
        assert!(payload.get("password").is_none());
        assert_eq!(payload["student"]["name"]["lastName"], "Abedin");
        assert_eq!(payload["student"]["academicDepartment"], "dep1");
    }

    #[test]
    fn test_offered_course_checks() {
        let mut form = offered_course();
        form.set("days", "Sun, Funday");
        form.set("startTime", "10:00");
        form.set("endTime", "09:30");
        assert!(form.validate().is_err());
        assert!(form.error("days").is_some());
        assert!(form.error("endTime").is_some());
    }

    #[test]
    fn test_question_answer_must_be_listed() {
        let mut form = question();
        form.set("exam", "e1");
        form.set("question", "2 + 2?");
        form.set("options", "3, 4, 5");
        form.set("answer", "22");
        form.set("marks", "1");
        assert!(form.validate().is_err());
        form.set("answer", "4");
        assert!(form.validate().is_ok());
        assert_eq!(form.payload()["options"], json!(["3", "4", "5"]));
    }

    #[test]
    fn test_course_marks_caps() {
        let mut form = course_marks();
        form.set("semesterRegistration", "r1");
        form.set("offeredCourse", "o1");
        form.set("student", "s1");
        form.set("courseMarks.finalTerm", "55");
        assert!(form.validate().is_err());
        form.set("courseMarks.finalTerm", "45");
        assert!(form.validate().is_ok());
        assert_eq!(form.payload()["courseMarks"]["finalTerm"], json!(45));
    }
}
