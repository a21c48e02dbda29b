use serde_json::Value;

use crate::models::EntityKind;
use crate::utils::cell_text;

/// One table column: header and the dotted path of the value it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub header: &'static str,
    pub path: &'static str,
    /// Relative width.
    pub width: u16,
}

const fn col(header: &'static str, path: &'static str, width: u16) -> Column {
    Column {
        header,
        path,
        width,
    }
}

const STUDENT_COLUMNS: &[Column] = &[
    col("ID", "id", 12),
    col("Name", "name", 24),
    col("Email", "email", 26),
    col("Contact", "contactNo", 14),
    col("Department", "academicDepartment", 20),
];

const FACULTY_COLUMNS: &[Column] = &[
    col("ID", "id", 12),
    col("Name", "name", 24),
    col("Designation", "designation", 18),
    col("Email", "email", 26),
    col("Department", "academicDepartment", 20),
];

const ADMIN_COLUMNS: &[Column] = &[
    col("ID", "id", 12),
    col("Name", "name", 24),
    col("Designation", "designation", 18),
    col("Email", "email", 26),
];

const USER_COLUMNS: &[Column] = &[
    col("ID", "id", 12),
    col("Email", "email", 26),
    col("Role", "role", 12),
    col("Status", "status", 12),
];

const ACADEMIC_SEMESTER_COLUMNS: &[Column] = &[
    col("Name", "name", 12),
    col("Code", "code", 6),
    col("Year", "year", 6),
    col("Start", "startMonth", 12),
    col("End", "endMonth", 12),
];

const ACADEMIC_YEAR_COLUMNS: &[Column] = &[col("Year", "year", 8), col("Title", "title", 30)];

const ACADEMIC_FACULTY_COLUMNS: &[Column] = &[col("Name", "name", 40), col("Created", "createdAt", 14)];

const ACADEMIC_DEPARTMENT_COLUMNS: &[Column] = &[
    col("Name", "name", 30),
    col("Academic faculty", "academicFaculty", 30),
];

const COURSE_COLUMNS: &[Column] = &[
    col("Prefix", "prefix", 8),
    col("Code", "code", 6),
    col("Title", "title", 30),
    col("Credits", "credits", 8),
];

const OFFERED_COURSE_COLUMNS: &[Column] = &[
    col("Course", "course", 26),
    col("Section", "section", 8),
    col("Faculty", "faculty", 20),
    col("Days", "days", 14),
    col("Start", "startTime", 7),
    col("End", "endTime", 7),
];

const SEMESTER_REGISTRATION_COLUMNS: &[Column] = &[
    col("Semester", "academicSemester", 18),
    col("Status", "status", 10),
    col("Start", "startDate", 14),
    col("End", "endDate", 14),
    col("Credits", "maxCredit", 8),
];

const ENROLLED_COURSE_COLUMNS: &[Column] = &[
    col("Course", "course", 24),
    col("Student", "student", 22),
    col("Mid", "courseMarks.midTerm", 6),
    col("Final", "courseMarks.finalTerm", 6),
    col("Grade", "grade", 6),
];

const MARK_COLUMNS: &[Column] = &[
    col("Student", "student", 22),
    col("Exam", "exam", 22),
    col("Marks", "marks", 8),
    col("Grade", "grade", 6),
];

const JOB_COLUMNS: &[Column] = &[
    col("Title", "title", 26),
    col("Company", "company", 20),
    col("Location", "location", 16),
    col("Deadline", "deadline", 14),
];

const BLOG_COLUMNS: &[Column] = &[
    col("Title", "title", 30),
    col("Category", "category", 16),
    col("Author", "author", 18),
    col("Posted", "createdAt", 14),
];

const ANNOUNCEMENT_COLUMNS: &[Column] = &[
    col("Title", "title", 34),
    col("Audience", "audience", 12),
    col("Posted", "createdAt", 14),
];

const CERTIFICATE_COLUMNS: &[Column] = &[
    col("Title", "title", 28),
    col("Student", "student", 22),
    col("Issued", "issueDate", 14),
    col("Status", "status", 10),
];

const EXAM_COLUMNS: &[Column] = &[
    col("Title", "title", 26),
    col("Course", "course", 22),
    col("Date", "date", 14),
    col("Minutes", "durationMinutes", 8),
    col("Marks", "totalMarks", 8),
];

const QUESTION_COLUMNS: &[Column] = &[
    col("Question", "question", 40),
    col("Exam", "exam", 20),
    col("Marks", "marks", 8),
];

pub fn columns_for(kind: EntityKind) -> &'static [Column] {
    use EntityKind::*;

    match kind {
        Student => STUDENT_COLUMNS,
        Faculty => FACULTY_COLUMNS,
        Admin => ADMIN_COLUMNS,
        User => USER_COLUMNS,
        AcademicSemester => ACADEMIC_SEMESTER_COLUMNS,
        AcademicYear => ACADEMIC_YEAR_COLUMNS,
        AcademicFaculty => ACADEMIC_FACULTY_COLUMNS,
        AcademicDepartment => ACADEMIC_DEPARTMENT_COLUMNS,
        Course => COURSE_COLUMNS,
        OfferedCourse => OFFERED_COURSE_COLUMNS,
        SemesterRegistration => SEMESTER_REGISTRATION_COLUMNS,
        EnrolledCourse => ENROLLED_COURSE_COLUMNS,
        Mark => MARK_COLUMNS,
        Job => JOB_COLUMNS,
        Blog => BLOG_COLUMNS,
        Announcement => ANNOUNCEMENT_COLUMNS,
        Certificate => CERTIFICATE_COLUMNS,
        Exam => EXAM_COLUMNS,
        Question => QUESTION_COLUMNS,
    }
}

/// Cell text for `column` in `record`.
pub fn cell(record: &Value, column: &Column) -> String {
    column
        .path
        .split('.')
        .try_fold(record, |node, part| node.get(part))
        .map(cell_text)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_kind_has_columns() {
        for kind in EntityKind::ALL {
            assert!(!columns_for(kind).is_empty(), "{:?}", kind);
        }
    }

    #[test]
    fn test_cell_follows_paths() {
        let record = json!({
            "course": { "_id": "c1", "title": "Algorithms" },
            "courseMarks": { "midTerm": 25 },
        });
        let columns = columns_for(EntityKind::EnrolledCourse);
        assert_eq!(cell(&record, &columns[0]), "Algorithms");
        assert_eq!(cell(&record, &columns[2]), "25");
        assert_eq!(cell(&record, &columns[4]), "");
    }
}
