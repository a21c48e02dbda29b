//! Endpoint table and per-entity read/write operations.
//!
//! Each [`EntityKind`] maps to a base path, an optional dedicated create
//! path, and the extra tags its writes invalidate. [`Resource`] exposes the
//! five standard operations over raw JSON; [`EntityApi`] layers typed
//! records on top.

use std::marker::PhantomData;

use reqwest::Method;
use serde_json::Value;

use crate::cache::{EntityCache, QueryKey, Subscription};
use crate::models::{Collection, Entity, EntityKind, Envelope};

use super::error::{ApiError, ApiResult};

/// Static description of one entity's endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDef {
    pub kind: EntityKind,
    pub base: &'static str,
    /// `None` when the entity cannot be created from this client.
    pub create: Option<&'static str>,
    /// Tags invalidated by writes in addition to `kind` itself.
    pub also_invalidates: &'static [EntityKind],
}

impl EndpointDef {
    pub fn list_key(&self, params: &[(String, String)]) -> QueryKey {
        QueryKey::new(self.base, params)
    }

    pub fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.base, id)
    }

    pub fn get_key(&self, id: &str) -> QueryKey {
        QueryKey::new(self.item_path(id), &[])
    }

    /// Tags a successful write must invalidate.
    pub fn write_tags(&self) -> Vec<EntityKind> {
        let mut tags = vec![self.kind];
        tags.extend_from_slice(self.also_invalidates);
        tags
    }
}

const PEOPLE_ALSO: &[EntityKind] = &[EntityKind::User];

type EndpointRow = (&'static str, Option<&'static str>, &'static [EntityKind]);

/// Endpoint definition for an entity kind.
pub fn endpoint(kind: EntityKind) -> EndpointDef {
    use EntityKind::*;

    let (base, create, also_invalidates): EndpointRow = match kind {
        Student => ("/students", Some("/users/create-student"), PEOPLE_ALSO),
        Faculty => ("/faculties", Some("/users/create-faculty"), PEOPLE_ALSO),
        Admin => ("/admins", Some("/users/create-admin"), PEOPLE_ALSO),
        User => ("/users", None, &[]),
        AcademicSemester => (
            "/academic-semesters",
            Some("/academic-semesters/create-academic-semester"),
            &[],
        ),
        AcademicYear => ("/academic-years", Some("/academic-years"), &[]),
        AcademicFaculty => (
            "/academic-faculties",
            Some("/academic-faculties/create-academic-faculty"),
            &[],
        ),
        AcademicDepartment => (
            "/academic-departments",
            Some("/academic-departments/create-academic-department"),
            &[],
        ),
        Course => ("/courses", Some("/courses/create-course"), &[]),
        OfferedCourse => (
            "/offered-courses",
            Some("/offered-courses/create-offered-course"),
            &[],
        ),
        SemesterRegistration => (
            "/semester-registrations",
            Some("/semester-registrations/create-semester-registration"),
            &[OfferedCourse],
        ),
        EnrolledCourse => (
            "/enrolled-courses",
            Some("/enrolled-courses/create-enrolled-course"),
            &[OfferedCourse],
        ),
        Mark => ("/marks", Some("/marks"), &[EnrolledCourse]),
        Job => ("/jobs", Some("/jobs"), &[]),
        Blog => ("/blogs", Some("/blogs"), &[]),
        Announcement => ("/announcements", Some("/announcements"), &[]),
        Certificate => ("/certificates", Some("/certificates"), &[]),
        Exam => ("/exams", Some("/exams"), &[]),
        Question => ("/questions", Some("/questions"), &[]),
    };

    EndpointDef {
        kind,
        base,
        create,
        also_invalidates,
    }
}

/// Standard operations for one entity kind, over raw JSON.
#[derive(Clone)]
pub struct Resource {
    cache: EntityCache,
    def: EndpointDef,
}

impl Resource {
    pub fn new(cache: EntityCache, kind: EntityKind) -> Self {
        Self {
            cache,
            def: endpoint(kind),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.def.kind
    }

    pub fn def(&self) -> &EndpointDef {
        &self.def
    }

    /// Live list read, tagged with this kind.
    pub fn subscribe_list(&self, params: &[(String, String)]) -> Subscription {
        self.cache.subscribe(self.def.list_key(params), &[self.def.kind])
    }

    /// Live single-record read, tagged with this kind.
    pub fn subscribe_get(&self, id: &str) -> Subscription {
        self.cache.subscribe(self.def.get_key(id), &[self.def.kind])
    }

    pub async fn list(&self, params: &[(String, String)]) -> ApiResult<Collection<Value>> {
        let cached = self
            .cache
            .fetch(self.def.list_key(params), &[self.def.kind])
            .await?;
        cached.collection()
    }

    pub async fn get(&self, id: &str) -> ApiResult<Value> {
        let cached = self.cache.fetch(self.def.get_key(id), &[self.def.kind]).await?;
        cached.entity()
    }

    pub async fn create(&self, payload: &Value) -> ApiResult<Value> {
        let path = self.def.create.ok_or_else(|| {
            ApiError::Unsupported(format!("{} records cannot be created here", self.def.kind))
        })?;
        let body = self
            .cache
            .mutate(Method::POST, path, Some(payload), &self.def.write_tags())
            .await?;
        Envelope::from_value(body)?.into_data()
    }

    pub async fn update(&self, id: &str, payload: &Value) -> ApiResult<Value> {
        let body = self
            .cache
            .mutate(
                Method::PATCH,
                &self.def.item_path(id),
                Some(payload),
                &self.def.write_tags(),
            )
            .await?;
        Envelope::from_value(body)?.into_data()
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.cache
            .mutate(
                Method::DELETE,
                &self.def.item_path(id),
                None,
                &self.def.write_tags(),
            )
            .await?;
        Ok(())
    }
}

/// Typed operations for an [`Entity`].
pub struct EntityApi<E: Entity> {
    resource: Resource,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityApi<E> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> EntityApi<E> {
    pub fn new(cache: EntityCache) -> Self {
        Self {
            resource: Resource::new(cache, E::KIND),
            _marker: PhantomData,
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn subscribe_list(&self, params: &[(String, String)]) -> Subscription {
        self.resource.subscribe_list(params)
    }

    pub fn subscribe_get(&self, id: &str) -> Subscription {
        self.resource.subscribe_get(id)
    }

    pub async fn list(&self, params: &[(String, String)]) -> ApiResult<Collection<E>> {
        let cached = self
            .resource
            .cache
            .fetch(self.resource.def.list_key(params), &[E::KIND])
            .await?;
        cached.collection()
    }

    pub async fn get(&self, id: &str) -> ApiResult<E> {
        decode(self.resource.get(id).await?)
    }

    pub async fn create(&self, payload: &Value) -> ApiResult<E> {
        decode(self.resource.create(payload).await?)
    }

    pub async fn update(&self, id: &str, payload: &Value) -> ApiResult<E> {
        decode(self.resource.update(id, payload).await?)
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.resource.delete(id).await
    }
}

fn decode<E: Entity>(value: Value) -> ApiResult<E> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("unexpected {} payload: {}", E::KIND, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_an_endpoint() {
        for kind in EntityKind::ALL {
            let def = endpoint(kind);
            assert!(def.base.starts_with('/'), "{:?}", kind);
            assert_eq!(def.write_tags()[0], kind);
        }
    }

    #[test]
    fn test_people_are_created_through_users() {
        assert_eq!(endpoint(EntityKind::Student).create, Some("/users/create-student"));
        assert_eq!(endpoint(EntityKind::Faculty).create, Some("/users/create-faculty"));
        assert_eq!(endpoint(EntityKind::Admin).create, Some("/users/create-admin"));
        assert_eq!(endpoint(EntityKind::User).create, None);
        assert!(endpoint(EntityKind::Student)
            .write_tags()
            .contains(&EntityKind::User));
    }

    #[test]
    fn test_item_paths() {
        let def = endpoint(EntityKind::Mark);
        assert_eq!(def.item_path("m1"), "/marks/m1");
        assert_eq!(def.get_key("m1").path(), "/marks/m1");
        assert_eq!(def.write_tags(), vec![EntityKind::Mark, EntityKind::EnrolledCourse]);
    }
}
