//! In-memory stand-in for the hosted backend, for tests.
//!
//! Behaves like the real service where the store clients depend on it:
//! ids and timestamps are assigned on insert, `updated_at` is refreshed on
//! update unless the client sends its own value (which is stored as sent),
//! redirect codes are single use. Every call is counted so tests can
//! assert that a request never reached the wire.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use common_types::{AuthUser, Session};
use serde_json::{json, Map, Value};

use super::{
    AuthApi, BackendError, BackendResult, Connection, Filter, ObjectStorageApi, Query, TableApi,
};

type RowPredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

struct MockUser {
    id: String,
    password: String,
    confirmed: bool,
    app_metadata: Map<String, Value>,
}

impl MockUser {
    fn to_auth_user(&self, email: &str) -> AuthUser {
        AuthUser {
            id: self.id.clone(),
            email: Some(email.to_string()),
            app_metadata: self.app_metadata.clone(),
        }
    }
}

/// In-memory tables, objects and accounts
#[derive(Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    required_columns: Mutex<HashMap<String, Vec<String>>>,
    rejections: Mutex<Vec<(String, RowPredicate)>>,
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    users: Mutex<HashMap<String, MockUser>>,
    access_tokens: Mutex<HashMap<String, String>>,
    refresh_tokens: Mutex<HashMap<String, String>>,
    codes: Mutex<HashMap<String, String>>,
    last_code_verifier: Mutex<Option<String>>,
    last_bearer: Mutex<Option<String>>,
    last_patch: Mutex<Option<Value>>,
    last_tick: Mutex<Option<DateTime<Utc>>>,
    offline: AtomicBool,
    fail_sign_out: AtomicBool,
    table_calls: AtomicUsize,
    storage_calls: AtomicUsize,
    auth_calls: AtomicUsize,
}

impl InMemoryBackend {
    /// Creates an empty backend
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wires all three seams to this backend
    #[must_use]
    pub fn connection(self: &Arc<Self>, bucket: &str) -> Connection {
        Connection {
            tables: self.clone(),
            storage: self.clone(),
            auth: self.clone(),
            bucket: bucket.to_string(),
        }
    }

    /// Makes every subsequent call fail as if the network were down
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes remote sign out fail
    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Rejects inserts into `table` that lack any of `columns` (NOT NULL constraint)
    pub fn require_columns(&self, table: &str, columns: &[&str]) {
        lock(&self.required_columns).insert(
            table.to_string(),
            columns.iter().map(ToString::to_string).collect(),
        );
    }

    /// Rejects inserts into `table` whose row matches `predicate`
    pub fn reject_rows_where(
        &self,
        table: &str,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) {
        lock(&self.rejections).push((table.to_string(), Box::new(predicate)));
    }

    /// Stores a row verbatim, bypassing the table API and its counters
    pub fn seed_row(&self, table: &str, row: Value) {
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    /// Current rows of `table`, in insertion order
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// Bytes and content type of an uploaded object
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<(String, Vec<u8>)> {
        lock(&self.objects).get(&object_path(bucket, key)).cloned()
    }

    /// Keys of every uploaded object
    #[must_use]
    pub fn object_keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Registers a confirmed account and returns its id
    pub fn register_user(&self, email: &str, password: &str, role: Option<&str>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut app_metadata = Map::new();
        if let Some(role) = role {
            app_metadata.insert("role".to_string(), json!(role));
        }
        lock(&self.users).insert(
            email.to_string(),
            MockUser {
                id: id.clone(),
                password: password.to_string(),
                confirmed: true,
                app_metadata,
            },
        );
        id
    }

    /// Marks an account as confirmed, as the emailed link would
    pub fn confirm_user(&self, email: &str) {
        if let Some(user) = lock(&self.users).get_mut(email) {
            user.confirmed = true;
        }
    }

    /// Issues a one-time redirect code that signs in `email`
    #[must_use]
    pub fn issue_code(&self, email: &str) -> String {
        let code = uuid::Uuid::new_v4().simple().to_string();
        lock(&self.codes).insert(code.clone(), email.to_string());
        code
    }

    /// Verifier sent with the most recent code exchange
    #[must_use]
    pub fn last_code_verifier(&self) -> Option<String> {
        lock(&self.last_code_verifier).clone()
    }

    /// Bearer token of the most recent table or storage call
    #[must_use]
    pub fn last_bearer(&self) -> Option<String> {
        lock(&self.last_bearer).clone()
    }

    /// Body of the most recent update, exactly as the client sent it
    #[must_use]
    pub fn last_patch(&self) -> Option<Value> {
        lock(&self.last_patch).clone()
    }

    /// Whether `access_token` is still accepted
    #[must_use]
    pub fn is_token_live(&self, access_token: &str) -> bool {
        lock(&self.access_tokens).contains_key(access_token)
    }

    /// Number of table API calls made
    #[must_use]
    pub fn table_calls(&self) -> usize {
        self.table_calls.load(Ordering::SeqCst)
    }

    /// Number of object storage calls made
    #[must_use]
    pub fn storage_calls(&self) -> usize {
        self.storage_calls.load(Ordering::SeqCst)
    }

    /// Number of auth API calls made
    #[must_use]
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    fn reachable(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn record_bearer(&self, bearer: Option<&str>) {
        *lock(&self.last_bearer) = bearer.map(ToString::to_string);
    }

    /// Strictly increasing clock so rows inserted back to back never tie
    fn tick(&self) -> String {
        let mut last = lock(&self.last_tick);
        let mut now = Utc::now();
        if let Some(previous) = *last {
            if now <= previous {
                now = previous + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn issue_session(&self, email: &str, user: &MockUser) -> Session {
        let access_token = uuid::Uuid::new_v4().to_string();
        let refresh_token = uuid::Uuid::new_v4().to_string();
        lock(&self.access_tokens).insert(access_token.clone(), email.to_string());
        lock(&self.refresh_tokens).insert(refresh_token.clone(), email.to_string());

        Session {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::hours(1),
            user: user.to_auth_user(email),
        }
    }

    fn session_for_email(&self, email: &str) -> BackendResult<Session> {
        let users = lock(&self.users);
        let user = users.get(email).ok_or_else(|| http(404, "User not found"))?;
        Ok(self.issue_session(email, user))
    }

    fn check_insert(&self, table: &str, row: &Value) -> BackendResult<()> {
        if let Some(columns) = lock(&self.required_columns).get(table) {
            for column in columns {
                if row.get(column).map_or(true, Value::is_null) {
                    return Err(http(
                        400,
                        &format!("null value in column \"{column}\" violates not-null constraint"),
                    ));
                }
            }
        }

        let rejected = lock(&self.rejections)
            .iter()
            .any(|(rejected_table, predicate)| rejected_table == table && predicate(row));
        if rejected {
            return Err(http(400, "new row violates check constraint"));
        }

        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().expect("mock backend mutex poisoned")
}

fn http(status: u16, message: &str) -> BackendError {
    BackendError::Http {
        status,
        message: message.to_string(),
    }
}

fn object_path(bucket: &str, key: &str) -> String {
    format!("{bucket}/{key}")
}

fn column_matches(row: &Value, column: &str, expected: &str) -> bool {
    match row.get(column) {
        Some(Value::String(value)) => value == expected,
        Some(Value::Bool(value)) => value.to_string() == expected,
        Some(Value::Number(value)) => value.to_string() == expected,
        _ => false,
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(column, value) => column_matches(row, column, value),
    })
}

fn compare_column(a: &Value, b: &Value, column: &str) -> CmpOrdering {
    match (a.get(column), b.get(column)) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => CmpOrdering::Equal,
    }
}

#[async_trait::async_trait]
impl TableApi for InMemoryBackend {
    async fn select(
        &self,
        table: &str,
        query: &Query,
        bearer: Option<&str>,
    ) -> BackendResult<Vec<Value>> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        self.record_bearer(bearer);

        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches_all(row, &query.filters))
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_column(a, b, &order.column);
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value, bearer: Option<&str>) -> BackendResult<Value> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        self.record_bearer(bearer);

        let Value::Object(mut fields) = row else {
            return Err(http(400, "row must be a JSON object"));
        };
        self.check_insert(table, &Value::Object(fields.clone()))?;

        let now = self.tick();
        fields
            .entry("id")
            .or_insert_with(|| json!(uuid::Uuid::new_v4().to_string()));
        fields.entry("created_at").or_insert_with(|| json!(now));
        fields.entry("updated_at").or_insert_with(|| json!(now));

        let stored = Value::Object(fields);
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
        bearer: Option<&str>,
    ) -> BackendResult<Vec<Value>> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        self.record_bearer(bearer);

        let Value::Object(patch) = patch else {
            return Err(http(400, "patch must be a JSON object"));
        };

        *lock(&self.last_patch) = Some(Value::Object(patch.clone()));

        // Column default on update: only applies when the patch leaves it out
        let now = self.tick();
        let mut tables = lock(&self.tables);
        let mut updated = Vec::new();
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if !matches_all(row, filters) {
                continue;
            }
            if let Value::Object(fields) = row {
                fields.insert("updated_at".to_string(), json!(now));
                for (column, value) in &patch {
                    if column != "id" && column != "created_at" {
                        fields.insert(column.clone(), value.clone());
                    }
                }
            }
            updated.push(row.clone());
        }

        Ok(updated)
    }

    async fn delete(
        &self,
        table: &str,
        filters: &[Filter],
        bearer: Option<&str>,
    ) -> BackendResult<()> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        self.record_bearer(bearer);

        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .retain(|row| !matches_all(row, filters));
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStorageApi for InMemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
        bearer: Option<&str>,
    ) -> BackendResult<()> {
        self.storage_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        self.record_bearer(bearer);

        let mut objects = lock(&self.objects);
        let path = object_path(bucket, key);
        if objects.contains_key(&path) {
            return Err(http(409, "The resource already exists"));
        }
        objects.insert(path, (content_type.to_string(), bytes));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://storage.test/object/public/{bucket}/{key}")
    }
}

#[async_trait::async_trait]
impl AuthApi for InMemoryBackend {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<Session> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;

        let users = lock(&self.users);
        match users.get(email) {
            Some(user) if user.password == password && user.confirmed => {
                Ok(self.issue_session(email, user))
            }
            Some(user) if user.password == password => Err(http(400, "Email not confirmed")),
            _ => Err(http(400, "Invalid login credentials")),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;

        let mut users = lock(&self.users);
        if users.contains_key(email) {
            return Err(http(422, "User already registered"));
        }
        let user = MockUser {
            id: uuid::Uuid::new_v4().to_string(),
            password: password.to_string(),
            confirmed: false,
            app_metadata: Map::new(),
        };
        let auth_user = user.to_auth_user(email);
        users.insert(email.to_string(), user);
        Ok(auth_user)
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(http(503, "Service unavailable"));
        }

        lock(&self.access_tokens).remove(access_token);
        Ok(())
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> BackendResult<Session> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        *lock(&self.last_code_verifier) = code_verifier.map(ToString::to_string);

        let email = lock(&self.codes)
            .remove(code)
            .ok_or_else(|| http(404, "invalid flow state, no valid flow state found"))?;
        self.session_for_email(&email)
    }

    async fn refresh(&self, refresh_token: &str) -> BackendResult<Session> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;

        let email = lock(&self.refresh_tokens)
            .remove(refresh_token)
            .ok_or_else(|| http(400, "Invalid Refresh Token"))?;
        self.session_for_email(&email)
    }

    async fn user(&self, access_token: &str) -> BackendResult<AuthUser> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;

        let email = lock(&self.access_tokens)
            .get(access_token)
            .cloned()
            .ok_or_else(|| http(401, "invalid JWT"))?;
        let users = lock(&self.users);
        let user = users.get(&email).ok_or_else(|| http(404, "User not found"))?;
        Ok(user.to_auth_user(&email))
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str, code_challenge: &str) -> String {
        format!(
            "https://auth.test/authorize?provider={provider}&redirect_to={redirect_to}&code_challenge={code_challenge}&code_challenge_method=s256"
        )
    }
}
