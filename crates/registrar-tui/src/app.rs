//! Application state for the terminal client.
//!
//! `App` owns the `Registrar` handle and whichever page is on screen. Pages
//! are the headless view models from `registrar_core::views`; every loop
//! iteration `tick` pulls cache updates into them and notices a lost session.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use registrar_core::api::service::{MY_ENROLLED_COURSES_PATH, MY_OFFERED_COURSES_PATH};
use registrar_core::auth::{AuthUser, Role};
use registrar_core::cache::params;
use registrar_core::forms::{schemas, Form, FormError, SelectOption};
use registrar_core::models::EntityKind;
use registrar_core::routes::{guard, home_for, menu_for, Access, MenuItem, MenuSection, Requirement, Route};
use registrar_core::views::{
    counters_for, record_key, record_label, Dashboard, DetailView, ListView, RowAction, RowIntent,
};
use registrar_core::{ApiError, Config, Notifier, Registrar};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for user ID input.
const MAX_USER_ID_LENGTH: usize = 50;

/// Maximum length for password input.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Upper bound on the records offered by a select field.
const OPTION_LIMIT: &str = "100";

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    Editing,
    ConfirmingDelete,
    ShowingHelp,
    LoggingIn,
    ConfirmingQuit,
    Quitting,
}

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    Content,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    UserId,
    Password,
    Button,
    Forgot,
}

impl LoginFocus {
    pub fn next(self) -> Self {
        match self {
            LoginFocus::UserId => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Forgot,
            LoginFocus::Forgot => LoginFocus::UserId,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            LoginFocus::UserId => LoginFocus::Forgot,
            LoginFocus::Password => LoginFocus::UserId,
            LoginFocus::Button => LoginFocus::Password,
            LoginFocus::Forgot => LoginFocus::Button,
        }
    }
}

/// The page body on screen.
pub enum Page {
    Blank,
    Dashboard(Dashboard),
    List(ListView),
    Detail(DetailView),
    Profile(Value),
    /// Change, forgotten or reset password, depending on the route.
    Account(Form),
}

/// Create/edit overlay over a list.
pub struct Editor {
    pub kind: EntityKind,
    /// `None` when creating.
    pub id: Option<String>,
    pub form: Form,
}

impl Editor {
    pub fn title(&self) -> String {
        match self.id {
            Some(_) => format!("Edit {}", self.kind.singular()),
            None => format!("New {}", self.kind.singular()),
        }
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub config: Config,
    pub registrar: Registrar,
    pub notifier: Notifier,

    pub state: AppState,
    pub focus: Focus,
    pub route: Route,
    /// Page to return to from a record detail.
    pub previous: Option<Route>,
    pub page: Page,
    pub menu: Vec<MenuSection>,
    pub menu_selection: usize,
    pub editor: Option<Editor>,
    pub delete_label: Option<String>,
    /// Token from a password reset link, if one was passed on the command line.
    pub reset_token: Option<String>,

    pub login_user_id: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,
}

impl App {
    pub fn new(config: Config, registrar: Registrar, reset_token: Option<String>) -> Self {
        let login_user_id = std::env::var("REGISTRAR_USER_ID")
            .ok()
            .or_else(|| config.last_user_id.clone())
            .unwrap_or_default();
        let login_password = std::env::var("REGISTRAR_PASSWORD").unwrap_or_default();

        Self {
            config,
            registrar,
            notifier: Notifier::new(),

            state: AppState::Normal,
            focus: Focus::Menu,
            route: Route::Login,
            previous: None,
            page: Page::Blank,
            menu: Vec::new(),
            menu_selection: 0,
            editor: None,
            delete_label: None,
            reset_token,

            login_user_id,
            login_password,
            login_focus: LoginFocus::UserId,
            login_error: None,
        }
    }

    /// Open the first page: a pending reset, the role's home, or the login overlay.
    pub async fn start(&mut self) {
        if self.reset_token.is_some() {
            self.open(Route::ResetPassword).await;
        } else if let Some(user) = self.current_user() {
            self.menu = menu_for(user.role);
            self.navigate(home_for(user.role)).await;
        } else {
            self.start_login();
        }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.registrar.session().current_user()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Open `route` if the session allows it, otherwise follow the redirect.
    pub async fn navigate(&mut self, route: Route) {
        match guard(self.registrar.session(), &route) {
            Access::Granted => self.open(route).await,
            Access::Redirect(Route::Login) => self.signed_out(),
            Access::Redirect(target) => {
                debug!(from = %route, to = %target, "Redirected");
                self.open(target).await;
            }
        }
    }

    async fn open(&mut self, route: Route) {
        debug!(route = %route, "Opening page");
        self.editor = None;
        self.page = match &route {
            Route::Login => {
                self.start_login();
                return;
            }
            Route::ChangePassword => Page::Account(schemas::change_password()),
            Route::ForgetPassword => Page::Account(schemas::forget_password()),
            Route::ResetPassword => Page::Account(schemas::reset_password()),
            Route::Profile => match self.registrar.my_profile().await {
                Ok(profile) => Page::Profile(profile),
                Err(e) => {
                    self.report(&e);
                    return;
                }
            },
            Route::Dashboard(role) => Page::Dashboard(Dashboard::load(&self.registrar, *role).await),
            Route::Entities { kind, .. } => {
                Page::List(mounted(ListView::new(&self.registrar, *kind, &self.config)))
            }
            Route::MyOfferedCourses => Page::List(mounted(ListView::with_path(
                &self.registrar,
                EntityKind::OfferedCourse,
                MY_OFFERED_COURSES_PATH,
                &self.config,
            ))),
            Route::MyEnrolledCourses => Page::List(mounted(ListView::with_path(
                &self.registrar,
                EntityKind::EnrolledCourse,
                MY_ENROLLED_COURSES_PATH,
                &self.config,
            ))),
            Route::Detail { kind, id, .. } => {
                Page::Detail(DetailView::new(&self.registrar, *kind, id.clone()))
            }
        };
        self.route = route;
        self.focus = Focus::Content;
    }

    pub fn menu_items(&self) -> impl Iterator<Item = &MenuItem> {
        self.menu.iter().flat_map(|section| section.items.iter())
    }

    pub fn menu_len(&self) -> usize {
        self.menu_items().count()
    }

    pub fn select_menu_next(&mut self) {
        let len = self.menu_len();
        if len > 0 {
            self.menu_selection = (self.menu_selection + 1) % len;
        }
    }

    pub fn select_menu_prev(&mut self) {
        let len = self.menu_len();
        if len > 0 {
            self.menu_selection = (self.menu_selection + len - 1) % len;
        }
    }

    pub async fn open_menu_selection(&mut self) {
        let Some(route) = self.menu_items().nth(self.menu_selection).map(|item| item.route.clone())
        else {
            return;
        };
        self.navigate(route).await;
    }

    /// Drill into the selected row.
    pub async fn open_selected(&mut self) {
        let Page::List(list) = &self.page else {
            return;
        };
        let Some(id) = list.selected_id() else {
            return;
        };
        let detail = Route::Detail {
            role: self.section_role(),
            kind: list.kind(),
            id,
        };
        self.previous = Some(self.route.clone());
        self.navigate(detail).await;
    }

    /// Leave a detail or account page.
    pub async fn go_back(&mut self) {
        match self.route {
            Route::Detail { .. } => {
                if let Some(previous) = self.previous.take() {
                    self.navigate(previous).await;
                }
            }
            Route::ForgetPassword | Route::ResetPassword if self.current_user().is_none() => {
                self.start_login();
            }
            _ => self.focus = Focus::Menu,
        }
    }

    /// Role whose section the current page belongs to.
    fn section_role(&self) -> Role {
        match self.route {
            Route::Entities { role, .. } | Route::Detail { role, .. } | Route::Dashboard(role) => role,
            Route::MyOfferedCourses | Route::MyEnrolledCourses => Role::Student,
            _ => self.current_user().map(|u| u.role).unwrap_or(Role::Student),
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Show the login overlay.
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_user_id.is_empty() {
            LoginFocus::UserId
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login overlay.
    pub async fn attempt_login(&mut self) {
        let mut form = schemas::login();
        form.set("id", self.login_user_id.as_str());
        form.set("password", self.login_password.as_str());
        if let Err(FormError::Invalid(errors)) = form.validate() {
            self.login_error = errors.first().map(|e| e.message.clone());
            return;
        }
        self.login_error = None;

        let user_id = form.values().get("id").to_string();
        match self.registrar.auth().login(&user_id, &self.login_password).await {
            Ok(outcome) => {
                info!(user = %outcome.user.user_id, role = %outcome.user.role, "Login successful");
                self.config.last_user_id = Some(user_id);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.login_password.clear();
                self.state = AppState::Normal;
                self.menu = menu_for(outcome.user.role);
                self.menu_selection = 0;
                self.navigate(home_for(outcome.user.role)).await;
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.login_error = Some(if e.is_unauthenticated() {
                    "Invalid user ID or password".to_string()
                } else {
                    e.user_message()
                });
            }
        }
    }

    pub async fn forgot_password(&mut self) {
        self.state = AppState::Normal;
        self.open(Route::ForgetPassword).await;
        if let Page::Account(form) = &mut self.page {
            form.set("id", self.login_user_id.as_str());
        }
    }

    pub fn logout(&mut self) {
        self.registrar.logout();
        self.menu.clear();
        self.menu_selection = 0;
        self.page = Page::Blank;
        self.route = Route::Login;
        self.editor = None;
        self.notifier.info("Signed out");
        self.start_login();
    }

    /// The session went away underneath the current page.
    fn signed_out(&mut self) {
        info!("Session ended, returning to login");
        // An expired token is still stored; clear it and every cached read.
        self.registrar.logout();
        self.page = Page::Blank;
        self.editor = None;
        self.menu.clear();
        self.route = Route::Login;
        self.start_login();
    }

    /// Push a failed request to the status bar; an auth failure ends the session.
    fn report(&mut self, error: &ApiError) {
        self.notifier.error(error.user_message());
        if error.is_unauthenticated() {
            self.signed_out();
        }
    }

    // =========================================================================
    // Per-frame updates
    // =========================================================================

    /// Pull cache updates into the page and notice a lost session.
    pub fn tick(&mut self, now: Instant) {
        let failed = match &mut self.page {
            Page::List(list) => {
                list.tick(now);
                list.error().is_some_and(ApiError::is_unauthenticated)
            }
            Page::Detail(detail) => {
                detail.tick();
                detail.error().is_some_and(ApiError::is_unauthenticated)
            }
            _ => false,
        };

        let needs_session = self.route.requirement() != Requirement::Public;
        if self.state != AppState::LoggingIn
            && needs_session
            && (failed || !self.registrar.session().is_authenticated())
        {
            self.notifier.error(ApiError::Unauthenticated.user_message());
            self.signed_out();
        }
    }

    /// Invalidate what the current page shows so it is read again.
    pub async fn refresh(&mut self) {
        let tags: Vec<EntityKind> = match &self.page {
            Page::List(list) => vec![list.kind()],
            Page::Detail(detail) => vec![detail.kind()],
            Page::Dashboard(dashboard) => counters_for(dashboard.role()).iter().map(|c| c.kind).collect(),
            Page::Profile(_) => vec![EntityKind::User],
            _ => return,
        };
        self.registrar.cache().invalidate(&tags);
        if matches!(self.page, Page::Dashboard(_) | Page::Profile(_)) {
            self.open(self.route.clone()).await;
        }
        self.notifier.info("Refreshing");
    }

    // =========================================================================
    // List actions
    // =========================================================================

    pub fn list_mut(&mut self) -> Option<&mut ListView> {
        match &mut self.page {
            Page::List(list) => Some(list),
            _ => None,
        }
    }

    /// Whether the current list accepts create/edit/delete.
    pub fn can_manage(&self) -> bool {
        matches!(self.route, Route::Entities { .. })
            && self
                .route
                .entity_kind()
                .and_then(schemas::form_for)
                .is_some()
    }

    pub async fn new_record(&mut self) {
        if let Some(kind) = self.route.entity_kind().filter(|_| self.can_manage()) {
            self.open_editor(kind, None, None).await;
        }
    }

    pub async fn edit_selected(&mut self) {
        if !self.can_manage() {
            return;
        }
        let intent = self.list_mut().and_then(|list| {
            let kind = list.kind();
            list.row_action(RowAction::Edit).map(|intent| (kind, intent))
        });
        if let Some((kind, RowIntent::Edit { id, record })) = intent {
            self.open_editor(kind, Some(id), Some(record)).await;
        }
    }

    pub fn request_delete(&mut self) {
        if !self.can_manage() {
            return;
        }
        let intent = self.list_mut().and_then(|list| list.row_action(RowAction::Delete));
        if let Some(RowIntent::ConfirmDelete { label, .. }) = intent {
            self.delete_label = Some(label);
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub async fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        self.delete_label = None;
        let result = match &mut self.page {
            Page::List(list) => list.confirm_delete(&self.notifier).await,
            _ => Ok(()),
        };
        if let Err(e) = result {
            if e.is_unauthenticated() {
                self.signed_out();
            }
        }
    }

    pub fn cancel_delete(&mut self) {
        self.state = AppState::Normal;
        self.delete_label = None;
        if let Some(list) = self.list_mut() {
            list.cancel_delete();
        }
    }

    /// Student enrollment in the selected offered course.
    pub async fn enroll_selected(&mut self) {
        if self.route != Route::MyOfferedCourses {
            return;
        }
        let Some(id) = self.list_mut().and_then(|list| list.selected_id()) else {
            return;
        };
        let result = self
            .registrar
            .resource(EntityKind::EnrolledCourse)
            .create(&json!({ "offeredCourse": id }))
            .await;
        match result {
            Ok(_) => self.notifier.success("Enrolled"),
            Err(e) => self.report(&e),
        }
    }

    // =========================================================================
    // Forms
    // =========================================================================

    async fn open_editor(&mut self, kind: EntityKind, id: Option<String>, record: Option<Value>) {
        let Some(mut form) = schemas::form_for(kind) else {
            return;
        };

        for (field, source) in schemas::option_sources(kind) {
            let query = params([("limit", OPTION_LIMIT)]);
            match self.registrar.resource(*source).list(&query).await {
                Ok(collection) => {
                    form.set_options(field, collection.items.iter().filter_map(select_option).collect());
                }
                Err(e) => {
                    warn!(field, source = %source, error = %e, "Failed to load select options");
                    self.report(&e);
                    if e.is_unauthenticated() {
                        return;
                    }
                }
            }
        }

        if let Some(record) = &record {
            form.fill_from(record);
        }
        self.editor = Some(Editor { kind, id, form });
        self.state = AppState::Editing;
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
        self.state = AppState::Normal;
    }

    /// Validate and send the editor form. Closes the overlay on success.
    pub async fn submit_editor(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let kind = editor.kind;
        let id = editor.id.clone();
        let registrar = self.registrar.clone();
        let mut close = false;

        let result = editor
            .form
            .submit(
                &self.notifier,
                |payload| async move {
                    match (kind, id) {
                        (EntityKind::EnrolledCourse, _) => registrar.update_marks(&payload).await,
                        (_, Some(id)) => registrar.resource(kind).update(&id, &payload).await,
                        (_, None) => registrar.resource(kind).create(&payload).await,
                    }
                },
                |_| close = true,
            )
            .await;

        if close {
            self.close_editor();
        }
        if let Err(FormError::Rejected(e)) = result {
            if e.is_unauthenticated() {
                self.signed_out();
            }
        }
    }

    /// Send the change/forgotten/reset password form of an account page.
    pub async fn submit_account_form(&mut self) {
        let route = self.route.clone();
        let auth = self.registrar.auth().clone();
        let reset_token = self.reset_token.clone().unwrap_or_default();
        let Page::Account(form) = &mut self.page else {
            return;
        };

        let result = form
            .submit(
                &self.notifier,
                |payload| async move {
                    let field = |name: &str| {
                        payload
                            .get(name)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    };
                    match route {
                        Route::ChangePassword => {
                            auth.change_password(&field("oldPassword"), &field("newPassword")).await
                        }
                        Route::ForgetPassword => auth.forget_password(&field("id")).await,
                        _ => {
                            auth.reset_password(&field("id"), &field("newPassword"), &reset_token)
                                .await
                        }
                    }
                },
                |_| {},
            )
            .await;

        match result {
            Ok(()) => match self.route {
                Route::ChangePassword => {
                    if let Some(user) = self.current_user() {
                        self.menu = menu_for(user.role);
                        self.navigate(home_for(user.role)).await;
                    }
                }
                Route::ForgetPassword => {
                    self.notifier.info("Check your email for a reset link");
                    self.start_login();
                }
                _ => {
                    self.reset_token = None;
                    self.start_login();
                }
            },
            Err(FormError::Rejected(e)) if e.is_unauthenticated() && self.route == Route::ChangePassword => {
                self.signed_out();
            }
            Err(_) => {}
        }
    }

    /// The form that receives typed characters, if any.
    pub fn active_form(&mut self) -> Option<&mut Form> {
        if let Some(editor) = self.editor.as_mut() {
            return Some(&mut editor.form);
        }
        match &mut self.page {
            Page::Account(form) => Some(form),
            _ => None,
        }
    }
}

fn mounted(mut list: ListView) -> ListView {
    list.mount();
    list
}

fn select_option(record: &Value) -> Option<SelectOption> {
    let value = record_key(record)?;
    let label = record_label(record).unwrap_or_else(|| value.clone());
    Some(SelectOption::new(value, label))
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a user ID character should be accepted
pub fn can_add_user_id_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USER_ID_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
