//! In-memory doubles for the store, the mailer and the clock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::Value;
use time::{macros::datetime, Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{
        jwt::{Clock, JwtKeys},
        password::hash_password,
        repo::{SessionRepository, UserRepository},
        repo_types::{NewUser, ProfilePatch, User},
    },
    config::{AppConfig, JwtConfig},
    contact::repo::{ContactMessage, ContactRepository, NewContactMessage},
    db::{RepoError, RepoResult},
    notifications::{Mailer, NotificationError, OutgoingEmail},
    progress::repo::{CourseSummary, LessonProgress, ProgressRepository},
    state::AppState,
    verification::repo::VerificationCodeRepository,
};

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_days: 7,
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        jwt: test_jwt_config(),
        admin_email: "admin@example.com".into(),
        mail: None,
    }
}

pub struct FixedClock {
    now: Mutex<OffsetDateTime>,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(datetime!(2026-01-01 12:00 UTC)),
        }
    }
}

impl FixedClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent().iter().map(|m| m.kind).collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotificationError> {
        if self.fail {
            let err = "not an address".parse::<lettre::Address>().unwrap_err();
            return Err(err.into());
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProgressRow {
    pub user_id: Uuid,
    pub course_name: String,
    pub lesson_number: i32,
    pub completed: bool,
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CodeRow {
    pub email: String,
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub used: bool,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<SessionRow>,
    progress: Vec<ProgressRow>,
    contacts: Vec<ContactMessage>,
    codes: Vec<CodeRow>,
}

/// Single-lock store, so every multi-table write is atomic.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    clock: Arc<FixedClock>,
    fail_writes: AtomicBool,
    blind_email_lookup: AtomicBool,
}

impl MemoryStore {
    pub fn new(clock: Arc<FixedClock>) -> Self {
        Self {
            tables: Mutex::default(),
            clock,
            fail_writes: AtomicBool::new(false),
            blind_email_lookup: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `find_by_email` report nothing, as if a concurrent insert had
    /// not landed yet. Inserts still hit the unique check.
    pub fn blind_email_lookup(&self, blind: bool) {
        self.blind_email_lookup.store(blind, Ordering::SeqCst);
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Other(anyhow::anyhow!("store unavailable")));
        }
        Ok(())
    }

    pub fn users_with_email(&self, email: &str) -> usize {
        let t = self.tables.lock().unwrap();
        t.users.iter().filter(|u| u.email == email).count()
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        let t = self.tables.lock().unwrap();
        t.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn sessions_for(&self, user_id: Uuid) -> Vec<SessionRow> {
        let t = self.tables.lock().unwrap();
        t.sessions.iter().filter(|s| s.user_id == user_id).cloned().collect()
    }

    pub fn progress_for(&self, user_id: Uuid) -> Vec<ProgressRow> {
        let t = self.tables.lock().unwrap();
        t.progress.iter().filter(|p| p.user_id == user_id).cloned().collect()
    }

    /// Seeds a row directly, including incomplete ones the API never writes.
    pub fn insert_progress(&self, row: ProgressRow) {
        self.tables.lock().unwrap().progress.push(row);
    }

    pub fn contacts(&self) -> Vec<ContactMessage> {
        self.tables.lock().unwrap().contacts.clone()
    }

    pub fn codes_for(&self, email: &str) -> Vec<CodeRow> {
        let t = self.tables.lock().unwrap();
        t.codes.iter().filter(|c| c.email == email).cloned().collect()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> RepoResult<User> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict);
        }
        let now = self.clock.now();
        let row = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            country: user.country,
            experience: user.experience,
            password_hash: user.password_hash,
            newsletter: user.newsletter,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        if self.blind_email_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.user(id))
    }

    async fn update_profile(&self, id: Uuid, patch: &ProfilePatch) -> RepoResult<()> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        if let Some(email) = &patch.email {
            if t.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Conflict);
            }
        }
        let now = self.clock.now();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            let p = patch.clone();
            u.first_name = p.first_name.unwrap_or(std::mem::take(&mut u.first_name));
            u.last_name = p.last_name.unwrap_or(std::mem::take(&mut u.last_name));
            u.email = p.email.unwrap_or(std::mem::take(&mut u.email));
            u.phone = p.phone.unwrap_or(std::mem::take(&mut u.phone));
            u.country = p.country.unwrap_or(std::mem::take(&mut u.country));
            u.experience = p.experience.unwrap_or(std::mem::take(&mut u.experience));
            u.newsletter = p.newsletter.unwrap_or(u.newsletter);
            u.updated_at = now;
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> RepoResult<()> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            u.password_hash = password_hash.to_string();
            u.updated_at = now;
        }
        Ok(())
    }

    async fn mark_email_verified(&self, id: Uuid) -> RepoResult<()> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut t = self.tables.lock().unwrap();
        if let Some(u) = t.users.iter_mut().find(|u| u.id == id) {
            u.email_verified = true;
            u.updated_at = now;
        }
        Ok(())
    }

    async fn delete_cascade(&self, id: Uuid) -> RepoResult<()> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        let email = t.users.iter().find(|u| u.id == id).map(|u| u.email.clone());
        t.sessions.retain(|s| s.user_id != id);
        t.progress.retain(|p| p.user_id != id);
        if let Some(email) = email {
            t.codes.retain(|c| c.email != email);
        }
        t.users.retain(|u| u.id != id);
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn record(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<()> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        if t.sessions.iter().any(|s| s.token == token) {
            return Err(RepoError::Conflict);
        }
        t.sessions.push(SessionRow {
            user_id,
            token: token.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn invalidate_all(&self, user_id: Uuid) -> RepoResult<u64> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.sessions.len();
        t.sessions.retain(|s| s.user_id != user_id);
        Ok((before - t.sessions.len()) as u64)
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn summarize(&self, user_id: Uuid) -> RepoResult<Vec<CourseSummary>> {
        let t = self.tables.lock().unwrap();
        let mut by_course: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
        for row in t.progress.iter().filter(|p| p.user_id == user_id) {
            let entry = by_course.entry(row.course_name.as_str()).or_default();
            entry.0 += 1;
            if row.completed {
                entry.1 += 1;
            }
        }
        Ok(by_course
            .into_iter()
            .map(|(name, (total, completed))| CourseSummary {
                course_name: name.to_string(),
                total_lessons: total,
                completed_lessons: completed,
            })
            .collect())
    }

    async fn lessons_for_course(
        &self,
        user_id: Uuid,
        course_name: &str,
    ) -> RepoResult<Vec<LessonProgress>> {
        let t = self.tables.lock().unwrap();
        let mut lessons: Vec<LessonProgress> = t
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && p.course_name == course_name)
            .map(|p| LessonProgress {
                lesson_number: p.lesson_number,
                completed: p.completed,
                completed_at: p.completed_at,
            })
            .collect();
        lessons.sort_by_key(|l| l.lesson_number);
        Ok(lessons)
    }

    async fn mark_completed(
        &self,
        user_id: Uuid,
        course_name: &str,
        lesson_number: i32,
    ) -> RepoResult<()> {
        self.check_writable()?;
        let now = self.clock.now();
        let mut t = self.tables.lock().unwrap();
        match t.progress.iter_mut().find(|p| {
            p.user_id == user_id && p.course_name == course_name && p.lesson_number == lesson_number
        }) {
            Some(row) => {
                row.completed = true;
                row.completed_at = Some(now);
            }
            None => t.progress.push(ProgressRow {
                user_id,
                course_name: course_name.to_string(),
                lesson_number,
                completed: true,
                completed_at: Some(now),
            }),
        }
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn insert(&self, msg: NewContactMessage) -> RepoResult<ContactMessage> {
        self.check_writable()?;
        let row = ContactMessage {
            id: Uuid::new_v4(),
            first_name: msg.first_name,
            last_name: msg.last_name,
            email: msg.email,
            phone: msg.phone,
            subject: msg.subject,
            message: msg.message,
            newsletter: msg.newsletter,
            created_at: self.clock.now(),
        };
        self.tables.lock().unwrap().contacts.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl VerificationCodeRepository for MemoryStore {
    async fn replace(
        &self,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<()> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        t.codes.retain(|c| c.email != email);
        t.codes.push(CodeRow {
            email: email.to_string(),
            code: code.to_string(),
            expires_at,
            used: false,
        });
        Ok(())
    }

    async fn consume(&self, email: &str, code: &str, now: OffsetDateTime) -> RepoResult<bool> {
        self.check_writable()?;
        let mut t = self.tables.lock().unwrap();
        match t
            .codes
            .iter_mut()
            .find(|c| c.email == email && c.code == code && !c.used && c.expires_at > now)
        {
            Some(c) => {
                c.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A full `AppState` over the in-memory doubles.
pub struct TestEnv {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<FixedClock>,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let clock = Arc::new(FixedClock::default());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let mailer = Arc::new(mailer);
        let config = Arc::new(test_config());
        let state = AppState {
            jwt: JwtKeys::new(&config.jwt, clock.clone()),
            clock: clock.clone(),
            users: store.clone(),
            sessions: store.clone(),
            progress: store.clone(),
            contacts: store.clone(),
            codes: store.clone(),
            mailer: mailer.clone(),
            config,
        };
        Self {
            state,
            store,
            mailer,
            clock,
        }
    }

    pub async fn seed_user(&self, email: &str, password: &str) -> User {
        self.store
            .create(NewUser {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: email.into(),
                phone: "".into(),
                country: "UK".into(),
                experience: "beginner".into(),
                password_hash: hash_password(password).unwrap(),
                newsletter: false,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state.jwt.issue(user.id, &user.email).unwrap().token
    }

    /// Sends one request through the real router.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = build_app(self.state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }
}
