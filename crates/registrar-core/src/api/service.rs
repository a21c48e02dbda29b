//! One handle bundling the adapter, cache and auth endpoints.
//!
//! Views and forms hold a `Registrar` and reach every entity through it.
//! Besides the standard per-entity operations it carries the few endpoints
//! that do not fit the list/get/create/update/delete shape.

use reqwest::Method;
use serde_json::{json, Value};

use crate::auth::SessionStore;
use crate::cache::{EntityCache, QueryKey, Subscription};
use crate::config::Config;
use crate::models::{
    AcademicDepartment, AcademicFaculty, AcademicSemester, AcademicYear, Admin, Announcement, Blog,
    Certificate, Collection, Course, EnrolledCourse, EntityKind, Envelope, Exam, Faculty, Job,
    Mark, OfferedCourse, Question, SemesterRegistration, Student, User, UserStatus,
};

use super::auth::AuthApi;
use super::client::HttpClient;
use super::endpoints::{EntityApi, Resource};
use super::error::ApiResult;

const PROFILE_PATH: &str = "/users/me";
pub const MY_OFFERED_COURSES_PATH: &str = "/offered-courses/my-offered-courses";
pub const MY_ENROLLED_COURSES_PATH: &str = "/enrolled-courses/my-enrolled-courses";
const UPDATE_MARKS_PATH: &str = "/enrolled-courses/update-enrolled-course-marks";

#[derive(Clone)]
pub struct Registrar {
    http: HttpClient,
    cache: EntityCache,
    auth: AuthApi,
}

impl Registrar {
    pub fn new(config: &Config, session: SessionStore) -> ApiResult<Self> {
        let http = HttpClient::new(config, session)?;
        let cache = EntityCache::with_keep_unused(http.clone(), config.cache_keep_unused());
        Ok(Self::with_cache(http, cache))
    }

    pub fn from_client(http: HttpClient) -> Self {
        let cache = EntityCache::new(http.clone());
        Self::with_cache(http, cache)
    }

    fn with_cache(http: HttpClient, cache: EntityCache) -> Self {
        Self {
            cache,
            auth: AuthApi::new(http.clone()),
            http,
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    pub fn session(&self) -> &SessionStore {
        self.http.session()
    }

    /// Sign out and forget every cached read.
    pub fn logout(&self) {
        self.auth.logout();
        self.cache.clear();
    }

    /// Untyped operations for `kind`.
    pub fn resource(&self, kind: EntityKind) -> Resource {
        Resource::new(self.cache.clone(), kind)
    }

    pub fn students(&self) -> EntityApi<Student> {
        EntityApi::new(self.cache.clone())
    }

    pub fn faculties(&self) -> EntityApi<Faculty> {
        EntityApi::new(self.cache.clone())
    }

    pub fn admins(&self) -> EntityApi<Admin> {
        EntityApi::new(self.cache.clone())
    }

    pub fn users(&self) -> EntityApi<User> {
        EntityApi::new(self.cache.clone())
    }

    pub fn academic_semesters(&self) -> EntityApi<AcademicSemester> {
        EntityApi::new(self.cache.clone())
    }

    pub fn academic_years(&self) -> EntityApi<AcademicYear> {
        EntityApi::new(self.cache.clone())
    }

    pub fn academic_faculties(&self) -> EntityApi<AcademicFaculty> {
        EntityApi::new(self.cache.clone())
    }

    pub fn academic_departments(&self) -> EntityApi<AcademicDepartment> {
        EntityApi::new(self.cache.clone())
    }

    pub fn courses(&self) -> EntityApi<Course> {
        EntityApi::new(self.cache.clone())
    }

    pub fn offered_courses(&self) -> EntityApi<OfferedCourse> {
        EntityApi::new(self.cache.clone())
    }

    pub fn semester_registrations(&self) -> EntityApi<SemesterRegistration> {
        EntityApi::new(self.cache.clone())
    }

    pub fn enrolled_courses(&self) -> EntityApi<EnrolledCourse> {
        EntityApi::new(self.cache.clone())
    }

    pub fn marks(&self) -> EntityApi<Mark> {
        EntityApi::new(self.cache.clone())
    }

    pub fn jobs(&self) -> EntityApi<Job> {
        EntityApi::new(self.cache.clone())
    }

    pub fn blogs(&self) -> EntityApi<Blog> {
        EntityApi::new(self.cache.clone())
    }

    pub fn announcements(&self) -> EntityApi<Announcement> {
        EntityApi::new(self.cache.clone())
    }

    pub fn certificates(&self) -> EntityApi<Certificate> {
        EntityApi::new(self.cache.clone())
    }

    pub fn exams(&self) -> EntityApi<Exam> {
        EntityApi::new(self.cache.clone())
    }

    pub fn questions(&self) -> EntityApi<Question> {
        EntityApi::new(self.cache.clone())
    }

    // ===== Endpoints outside the standard shape =====

    /// Profile of the signed-in user.
    pub async fn my_profile(&self) -> ApiResult<Value> {
        let cached = self
            .cache
            .fetch(QueryKey::new(PROFILE_PATH, &[]), &[EntityKind::User])
            .await?;
        cached.entity()
    }

    pub fn subscribe_profile(&self) -> Subscription {
        self.cache
            .subscribe(QueryKey::new(PROFILE_PATH, &[]), &[EntityKind::User])
    }

    /// Block or unblock a user account.
    pub async fn change_status(&self, user_id: &str, status: UserStatus) -> ApiResult<User> {
        let body = json!({ "status": status });
        let response = self
            .cache
            .mutate(
                Method::POST,
                &format!("/users/change-status/{}", user_id),
                Some(&body),
                &[
                    EntityKind::Student,
                    EntityKind::Faculty,
                    EntityKind::Admin,
                    EntityKind::User,
                ],
            )
            .await?;
        Envelope::from_value(response)?.into_data()
    }

    pub async fn assign_faculties(&self, course_id: &str, faculty_ids: &[String]) -> ApiResult<Value> {
        let body = json!({ "faculties": faculty_ids });
        let response = self
            .cache
            .mutate(
                Method::PUT,
                &format!("/courses/{}/assign-faculties", course_id),
                Some(&body),
                &[EntityKind::Course],
            )
            .await?;
        Envelope::from_value(response)?.into_data()
    }

    pub async fn course_faculties(&self, course_id: &str) -> ApiResult<Value> {
        let key = QueryKey::new(format!("/courses/{}/get-faculties", course_id), &[]);
        self.cache.fetch(key, &[EntityKind::Course]).await?.entity()
    }

    /// Offered courses the signed-in student may enroll in.
    pub async fn my_offered_courses(&self, params: &[(String, String)]) -> ApiResult<Collection<OfferedCourse>> {
        let key = QueryKey::new(MY_OFFERED_COURSES_PATH, params);
        self.cache
            .fetch(key, &[EntityKind::OfferedCourse])
            .await?
            .collection()
    }

    pub async fn my_enrolled_courses(&self, params: &[(String, String)]) -> ApiResult<Collection<EnrolledCourse>> {
        let key = QueryKey::new(MY_ENROLLED_COURSES_PATH, params);
        self.cache
            .fetch(key, &[EntityKind::EnrolledCourse])
            .await?
            .collection()
    }

    /// Faculty grading: update the marks of one enrollment.
    pub async fn update_marks(&self, payload: &Value) -> ApiResult<Value> {
        let response = self
            .cache
            .mutate(
                Method::PATCH,
                UPDATE_MARKS_PATH,
                Some(payload),
                &[EntityKind::EnrolledCourse, EntityKind::Mark],
            )
            .await?;
        Envelope::from_value(response)?.into_data()
    }
}
