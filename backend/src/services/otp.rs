//! Short-lived numeric codes for password resets.
//!
//! One record per email, held in process memory. A code is good for a fixed
//! TTL and a bounded number of wrong guesses; a background sweep reclaims
//! records nobody came back to verify.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::Config;

const CODE_MIN: u32 = 100_000;
const CODE_MAX: u32 = 999_999;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpVerification {
    Valid,
    Invalid(OtpRejection),
}

impl OtpVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, OtpVerification::Valid)
    }

    pub fn rejection(&self) -> Option<OtpRejection> {
        match self {
            OtpVerification::Valid => None,
            OtpVerification::Invalid(reason) => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    NotFound,
    Expired,
    TooManyAttempts,
    InvalidCode,
}

impl OtpRejection {
    pub fn message(&self) -> &'static str {
        match self {
            OtpRejection::NotFound => "OTP not found or expired",
            OtpRejection::Expired => "OTP has expired",
            OtpRejection::TooManyAttempts => "Too many failed attempts",
            OtpRejection::InvalidCode => "Invalid OTP",
        }
    }
}

impl fmt::Display for OtpRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OtpSettings {
    pub ttl: Duration,
    pub max_attempts: u32,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            max_attempts: 3,
        }
    }
}

impl From<&Config> for OtpSettings {
    fn from(config: &Config) -> Self {
        Self {
            ttl: Duration::minutes(config.otp_ttl_minutes),
            max_attempts: config.otp_max_attempts,
        }
    }
}

type Records = Arc<Mutex<HashMap<String, OtpRecord>>>;

/// Process-wide OTP state. Build one at startup and share it behind an
/// `Arc`; every operation takes the same lock, so concurrent calls for one
/// email observe the verification steps in order.
pub struct OtpStore {
    records: Records,
    clock: Arc<dyn Clock>,
    settings: OtpSettings,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl OtpStore {
    pub fn new(settings: OtpSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: OtpSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
            settings,
            sweeper: Mutex::new(None),
        }
    }

    /// Builds the store from config and starts the periodic sweep unless it
    /// is disabled. Must be called inside a tokio runtime when the sweep is
    /// enabled.
    pub fn from_config(config: &Config) -> Arc<Self> {
        let store = Arc::new(Self::new(OtpSettings::from(config)));
        if let Some(interval) = config.otp_sweep_interval() {
            store.spawn_sweeper(interval);
        }
        store
    }

    /// A uniformly random code in `100000..=999999`.
    pub fn generate_code() -> String {
        rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
    }

    /// Replaces any record for `email` with a fresh one.
    pub fn store(&self, email: &str, code: &str) {
        let record = OtpRecord {
            code: code.to_string(),
            expires_at: self.clock.now() + self.settings.ttl,
            attempts: 0,
        };
        self.lock().insert(normalize_email(email), record);
        tracing::debug!("Stored OTP");
    }

    /// Checks `code` against the stored record for `email`.
    ///
    /// Checks run in a fixed order: presence, expiry, attempt limit, code.
    /// Expired and exhausted records are removed. A match removes the record
    /// unless `delete_on_success` is false; a mismatch counts one attempt.
    pub fn verify(&self, email: &str, code: &str, delete_on_success: bool) -> OtpVerification {
        let key = normalize_email(email);
        let now = self.clock.now();
        let mut records = self.lock();

        let outcome = match records.get_mut(&key) {
            None => OtpVerification::Invalid(OtpRejection::NotFound),
            Some(record) => {
                let (outcome, remove) = if now > record.expires_at {
                    (OtpVerification::Invalid(OtpRejection::Expired), true)
                } else if record.attempts >= self.settings.max_attempts {
                    (OtpVerification::Invalid(OtpRejection::TooManyAttempts), true)
                } else if record.code == code {
                    (OtpVerification::Valid, delete_on_success)
                } else {
                    record.attempts += 1;
                    (OtpVerification::Invalid(OtpRejection::InvalidCode), false)
                };
                if remove {
                    records.remove(&key);
                }
                outcome
            }
        };
        drop(records);

        match outcome.rejection() {
            None => tracing::debug!(delete_on_success, "OTP verified"),
            Some(reason) => tracing::debug!(reason = %reason, "OTP rejected"),
        }
        outcome
    }

    pub fn delete(&self, email: &str) {
        self.lock().remove(&normalize_email(email));
    }

    /// Removes every expired record and returns how many were removed.
    pub fn sweep(&self) -> usize {
        sweep_expired(&self.records, self.clock.now())
    }

    /// Runs [`OtpStore::sweep`] every `interval` until the store is dropped.
    /// Replaces a sweeper started earlier.
    pub fn spawn_sweeper(&self, interval: std::time::Duration) {
        let records = Arc::clone(&self.records);
        let clock = Arc::clone(&self.clock);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sweep_expired(&records, clock.now());
            }
        });

        let previous = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the record for `email`.
    pub fn get(&self, email: &str) -> Option<OtpRecord> {
        self.lock().get(&normalize_email(email)).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, OtpRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for OtpStore {
    fn drop(&mut self) {
        let handle = self
            .sweeper
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

fn sweep_expired(records: &Records, now: DateTime<Utc>) -> usize {
    let mut records = records.lock().unwrap_or_else(|e| e.into_inner());
    let before = records.len();
    records.retain(|_, record| record.expires_at >= now);
    let removed = before - records.len();
    if removed > 0 {
        tracing::info!(removed, remaining = records.len(), "Swept expired OTP records");
    }
    removed
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
