//! 自訂網域的 DNS 驗證流程。
//!
//! 一輪驗證：立即查詢一次，失敗後每隔 `poll_interval` 再查，直到指向正確 IP、
//! 次數達到 `max_attempts`，或使用者取消。每輪有自己的 generation，
//! 取消或重新開始時遞增，晚到的查詢結果若 generation 不符就直接丟棄。

use crate::core::dns::check_dns;
use crate::domain::model::{DomainValidationState, ValidationStatus};
use crate::domain::ports::{ConfigProvider, DnsResolver};
use crate::utils::error::{CrmError, Result};
use crate::utils::validation::validate_subdomain;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

pub const DEFAULT_EXPECTED_IP: &str = "13.51.251.199";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSettings {
    pub expected_ip: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            expected_ip: DEFAULT_EXPECTED_IP.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ValidatorSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            expected_ip: config.expected_ip().to_string(),
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts(),
        }
    }
}

struct Shared<R> {
    resolver: R,
    settings: ValidatorSettings,
    state: watch::Sender<DomainValidationState>,
    generation: AtomicU64,
}

impl<R: DnsResolver> Shared<R> {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// 使前一輪失效並重設狀態，回傳新一輪的 generation
    fn begin_run(&self, reset: impl FnOnce(&mut DomainValidationState)) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            reset(state);
            state.status = ValidationStatus::Validating;
            state.verified_ip = None;
        });
        generation
    }

    /// 記錄一次查詢開始：attempts + 1 並更新 last_checked
    fn begin_attempt(&self, generation: u64) -> Option<(String, u32)> {
        let mut started = None;
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) || state.status != ValidationStatus::Validating {
                return false;
            }
            state.attempts += 1;
            state.last_checked = Some(Utc::now());
            started = Some((state.subdomain.clone(), state.attempts));
            true
        });
        started
    }

    /// 套用查詢結果；回傳這一輪是否仍在驗證中
    fn finish_attempt(&self, generation: u64, outcome: Result<String>) -> bool {
        let max_attempts = self.settings.max_attempts;
        let mut still_validating = false;
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) || state.status != ValidationStatus::Validating {
                tracing::debug!("Discarding stale DNS result for run {}", generation);
                return false;
            }
            match outcome {
                Ok(ip) => {
                    tracing::info!(
                        "✅ {} verified after {} attempt(s), points to {}",
                        state.subdomain,
                        state.attempts,
                        ip
                    );
                    state.status = ValidationStatus::Verified;
                    state.verified_ip = Some(ip);
                    state.error_message = None;
                    state.last_result = None;
                }
                Err(err) if state.attempts >= max_attempts => {
                    let timeout = CrmError::ValidationTimeout {
                        attempts: state.attempts,
                        last_result: err.to_string(),
                    };
                    tracing::error!("❌ {}: {}", state.subdomain, timeout);
                    state.status = ValidationStatus::Failed;
                    state.error_message = Some(timeout.to_string());
                    state.last_result = Some(err.to_string());
                }
                Err(err) => {
                    tracing::info!(
                        "⏳ {} not ready ({}/{}): {}",
                        state.subdomain,
                        state.attempts,
                        max_attempts,
                        err
                    );
                    state.error_message = Some(err.to_string());
                    state.last_result = Some(err.to_string());
                    still_validating = true;
                }
            }
            true
        });
        still_validating
    }

    /// 恢復時次數已用完：不再查詢，直接以逾時結束
    fn expire(&self, generation: u64) {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            if state.last_result.is_none() {
                state.last_result = state.error_message.clone();
            }
            let timeout = CrmError::ValidationTimeout {
                attempts: state.attempts,
                last_result: state
                    .last_result
                    .clone()
                    .unwrap_or_else(|| "no result recorded".to_string()),
            };
            state.status = ValidationStatus::Failed;
            state.error_message = Some(timeout.to_string());
            true
        });
    }

    async fn check(&self, subdomain: &str) -> Result<String> {
        check_dns(&self.resolver, subdomain, &self.settings.expected_ip).await
    }

    /// 每個 tick 依序執行，前一次查詢完成前不會發出下一次
    async fn poll(&self, generation: u64) {
        let period = self
            .settings
            .poll_interval
            .clamp(Duration::from_millis(1), MAX_POLL_INTERVAL);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some((subdomain, attempt)) = self.begin_attempt(generation) else {
                return;
            };
            tracing::debug!(
                "🔍 Checking {} ({}/{})",
                subdomain,
                attempt,
                self.settings.max_attempts
            );

            let outcome = self.check(&subdomain).await;
            if !self.finish_attempt(generation, outcome) {
                return;
            }
        }
    }
}

/// 一個網域狀態的驗證器，同時間只會有一輪在輪詢
pub struct DomainValidator<R: DnsResolver + 'static> {
    shared: Arc<Shared<R>>,
    poller: Option<JoinHandle<()>>,
}

impl<R: DnsResolver + 'static> DomainValidator<R> {
    pub fn new(resolver: R, settings: ValidatorSettings) -> Self {
        Self::with_state(resolver, settings, DomainValidationState::default())
    }

    /// 從外部儲存還原的狀態建立；若狀態為 Validating，需呼叫 `resume_validation` 才會繼續輪詢
    pub fn with_state(
        resolver: R,
        settings: ValidatorSettings,
        state: DomainValidationState,
    ) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            shared: Arc::new(Shared {
                resolver,
                settings,
                state: tx,
                generation: AtomicU64::new(0),
            }),
            poller: None,
        }
    }

    pub fn state(&self) -> DomainValidationState {
        self.shared.state.borrow().clone()
    }

    pub fn status(&self) -> ValidationStatus {
        self.shared.state.borrow().status
    }

    pub fn settings(&self) -> &ValidatorSettings {
        &self.shared.settings
    }

    /// 狀態變更通知，用於顯示進度或存檔
    pub fn subscribe(&self) -> watch::Receiver<DomainValidationState> {
        self.shared.state.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn start_validation(&mut self, subdomain: &str) -> Result<ValidationStatus> {
        let subdomain = validate_subdomain(subdomain)?;
        self.stop_poller();

        let generation = self.shared.begin_run(|state| {
            state.subdomain = subdomain.clone();
            state.attempts = 0;
            state.error_message = None;
            state.last_result = None;
            state.last_checked = Some(Utc::now());
        });
        tracing::info!(
            "🌐 Validating {} (expecting A record {})",
            subdomain,
            self.shared.settings.expected_ip
        );

        if self.shared.begin_attempt(generation).is_none() {
            return Ok(self.status());
        }
        let outcome = self.shared.check(&subdomain).await;
        if self.shared.finish_attempt(generation, outcome) {
            self.spawn_poller(generation);
        }

        Ok(self.status())
    }

    /// 從 `attempts_so_far` 繼續計數，不做立即查詢
    pub fn resume_validation(
        &mut self,
        subdomain: &str,
        attempts_so_far: u32,
    ) -> Result<ValidationStatus> {
        let subdomain = validate_subdomain(subdomain)?;
        self.stop_poller();

        let generation = self.shared.begin_run(|state| {
            state.subdomain = subdomain.clone();
            state.attempts = attempts_so_far;
        });

        if attempts_so_far >= self.shared.settings.max_attempts {
            tracing::warn!(
                "⚠️ {} already used {} attempts, not resuming",
                subdomain,
                attempts_so_far
            );
            self.shared.expire(generation);
        } else {
            tracing::info!(
                "🔁 Resuming validation of {} at attempt {}/{}",
                subdomain,
                attempts_so_far,
                self.shared.settings.max_attempts
            );
            self.spawn_poller(generation);
        }

        Ok(self.status())
    }

    /// 只在 Validating 時有效，其他狀態下呼叫不做任何事；回傳是否真的取消
    pub fn cancel_validation(&mut self) -> bool {
        let shared = &self.shared;
        let cancelled = shared.state.send_if_modified(|state| {
            if state.status != ValidationStatus::Validating {
                return false;
            }
            shared.generation.fetch_add(1, Ordering::SeqCst);
            let last_result = state.error_message.take();
            state.last_result = last_result.clone();
            let cancelled = CrmError::ValidationCancelled { last_result };
            state.status = ValidationStatus::Failed;
            state.error_message = Some(cancelled.to_string());
            true
        });
        self.stop_poller();

        if cancelled {
            tracing::info!("🛑 Validation cancelled by user");
        }
        cancelled
    }

    /// Verified -> NotSet，清除網域設定
    pub fn reset(&mut self) -> Result<()> {
        let status = self.status();
        if status == ValidationStatus::NotSet {
            return Ok(());
        }
        if !status.can_transition_to(ValidationStatus::NotSet) {
            return Err(CrmError::InvalidTransition {
                from: status.to_string(),
                to: ValidationStatus::NotSet.to_string(),
            });
        }

        self.stop_poller();
        let shared = &self.shared;
        shared.state.send_modify(|state| {
            shared.generation.fetch_add(1, Ordering::SeqCst);
            *state = DomainValidationState::default();
        });
        tracing::info!("♻️ Domain validation state reset");
        Ok(())
    }

    /// 等到這一輪結束（Verified 或 Failed）
    pub async fn wait_for_terminal(&self) -> DomainValidationState {
        let mut rx = self.subscribe();
        let finished = match rx.wait_for(|state| state.status.is_terminal()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        finished
    }

    fn spawn_poller(&mut self, generation: u64) {
        let shared = Arc::clone(&self.shared);
        self.poller = Some(tokio::spawn(async move {
            shared.poll(generation).await;
        }));
    }

    fn stop_poller(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}

/// 已結束且失敗的一輪轉成對應的錯誤；`cancelled` 由呼叫端決定是否為使用者取消
pub fn run_failure(state: &DomainValidationState, cancelled: bool) -> Option<CrmError> {
    if state.status != ValidationStatus::Failed {
        return None;
    }
    if cancelled {
        return Some(CrmError::ValidationCancelled {
            last_result: state.last_result.clone(),
        });
    }
    Some(CrmError::ValidationTimeout {
        attempts: state.attempts,
        last_result: state
            .last_result
            .clone()
            .unwrap_or_else(|| "no result recorded".to_string()),
    })
}

impl<R: DnsResolver + 'static> Drop for DomainValidator<R> {
    fn drop(&mut self) {
        self.stop_poller();
    }
}
