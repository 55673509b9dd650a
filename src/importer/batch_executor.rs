// ==========================================
// 商品批量导入 - 批量执行器
// ==========================================
// 状态机: Idle → Running ⇄ Paused → {Completed, Cancelled}
// 调度: 单工作者，逐行顺序提交（不并发）
// 控制: watch 通道承载 Running / Paused / Cancelled 信号
//   - 暂停: 行与行之间阻塞等待信号变化（暂停期间仍可取消）
//   - 取消: 每行提交前检查；未尝试的行不出现在结果中
// 重试: 仅传输层失败可重试；第 i 次失败后线性退避 step × i
// 红线: RunState 与结果列表仅由执行器写入，外部只能读快照
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::product::{ParsedRow, ProcessingResult, RunState};
use crate::domain::types::{ImportMode, RowAction, RunPhase};
use crate::i18n::t;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::product_repo::ProductRepository;
use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RunSignal / RunControl - 运行控制
// ==========================================

/// 控制信号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSignal {
    Running,
    Paused,
    Cancelled,
}

/// 暂停 / 恢复 / 取消句柄（可克隆，可跨任务传递）
///
/// 取消优先于暂停；取消后的暂停与恢复被忽略，直到下一次运行开始
#[derive(Debug, Clone)]
pub struct RunControl {
    tx: Arc<watch::Sender<RunSignal>>,
}

impl Default for RunControl {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(RunSignal::Running);
        Self { tx: Arc::new(tx) }
    }
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.tx.send_if_modified(|signal| {
            if *signal == RunSignal::Running {
                *signal = RunSignal::Paused;
                true
            } else {
                false
            }
        });
    }

    pub fn resume(&self) {
        self.tx.send_if_modified(|signal| {
            if *signal == RunSignal::Paused {
                *signal = RunSignal::Running;
                true
            } else {
                false
            }
        });
    }

    pub fn cancel(&self) {
        self.tx.send_if_modified(|signal| {
            if *signal != RunSignal::Cancelled {
                *signal = RunSignal::Cancelled;
                true
            } else {
                false
            }
        });
    }

    pub fn signal(&self) -> RunSignal {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<RunSignal> {
        self.tx.subscribe()
    }

    fn rearm(&self) {
        self.tx.send_replace(RunSignal::Running);
    }
}

/// 暂停期间等待信号变化
///
/// # 返回
/// - Running: 已恢复
/// - Cancelled: 已取消（含控制端被丢弃）
async fn wait_while_paused(rx: &mut watch::Receiver<RunSignal>) -> RunSignal {
    loop {
        let current = *rx.borrow_and_update();
        if current != RunSignal::Paused {
            return current;
        }
        if rx.changed().await.is_err() {
            return RunSignal::Cancelled;
        }
    }
}

// ==========================================
// RetryPolicy - 重试策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &dyn ImportConfigReader) -> Self {
        Self {
            max_attempts: config.get_max_attempts().max(1),
            backoff_step: config.get_backoff_step(),
        }
    }

    /// 第 attempt 次（0 起）失败后的等待时间
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step * (attempt + 1)
    }
}

// ==========================================
// RunGuard - 运行中途被丢弃时的状态收尾
// ==========================================
// run() 的 future 可能在任意 await 点被丢弃（超时、select!、任务中止）
// 未解除时: 活动态 → Cancelled，is_processing 清零
struct RunGuard<'a> {
    state: &'a RwLock<RunState>,
    control: &'a RunControl,
    armed: bool,
}

impl<'a> RunGuard<'a> {
    fn new(state: &'a RwLock<RunState>, control: &'a RunControl) -> Self {
        Self {
            state,
            control,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = write_lock(self.state);
        if state.phase.is_active() {
            warn!(
                run_id = state.run_id.as_deref().unwrap_or_default(),
                processing_index = state.processing_index,
                "运行被中途丢弃，记为已取消"
            );
            state.phase = RunPhase::Cancelled;
            state.is_processing = false;
            state.finished_at = Some(Utc::now());
            self.control.cancel();
        }
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

// ==========================================
// BatchExecutor - 批量执行器
// ==========================================
pub struct BatchExecutor {
    repo: Arc<dyn ProductRepository>,
    policy: RetryPolicy,
    control: RunControl,
    state: RwLock<RunState>,
    results: RwLock<Vec<ProcessingResult>>,
}

impl BatchExecutor {
    pub fn new(repo: Arc<dyn ProductRepository>, policy: RetryPolicy) -> Self {
        Self {
            repo,
            policy,
            control: RunControl::new(),
            state: RwLock::new(RunState::default()),
            results: RwLock::new(Vec::new()),
        }
    }

    /// 控制句柄
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 运行状态快照
    pub fn snapshot(&self) -> RunState {
        let mut state = read_lock(&self.state).clone();
        let signal = self.control.signal();
        state.is_paused = state.phase.is_active() && signal == RunSignal::Paused;
        state.is_cancelled = signal == RunSignal::Cancelled;
        state
    }

    /// 结果列表快照
    pub fn results_snapshot(&self) -> Vec<ProcessingResult> {
        read_lock(&self.results).clone()
    }

    /// 清空结果与运行状态（运行中拒绝）
    pub fn reset(&self) -> ImportResult<()> {
        let mut state = write_lock(&self.state);
        if state.phase.is_active() {
            return Err(ImportError::RunInProgress(state.run_id.clone().unwrap_or_default()));
        }
        *state = RunState::default();
        write_lock(&self.results).clear();
        self.control.rearm();
        Ok(())
    }

    /// 执行一次批量导入
    ///
    /// # 参数
    /// - mode: create / edit
    /// - rows: 全部解析行；无效行不提交，运行结束后以 skipped 追加
    ///
    /// # 返回
    /// - Ok(Vec<ProcessingResult>): 本次运行的全部结果
    /// - Err(RunInProgress): 已有运行未结束
    #[instrument(skip(self, rows), fields(run_id = tracing::field::Empty, mode = %mode))]
    pub async fn run(&self, mode: ImportMode, rows: &[ParsedRow]) -> ImportResult<Vec<ProcessingResult>> {
        let valid: Vec<&ParsedRow> = rows.iter().filter(|r| r.is_valid).collect();
        let run_id = Uuid::new_v4().to_string();

        {
            let mut state = write_lock(&self.state);
            if state.phase.is_active() {
                let active = state.run_id.clone().unwrap_or_default();
                warn!(active_run_id = %active, "拒绝启动: 已有导入任务在运行");
                return Err(ImportError::RunInProgress(active));
            }
            *state = RunState {
                run_id: Some(run_id.clone()),
                mode: Some(mode),
                phase: RunPhase::Running,
                is_processing: true,
                valid_row_count: valid.len(),
                started_at: Some(Utc::now()),
                ..RunState::default()
            };
            write_lock(&self.results).clear();
            self.control.rearm();
        }
        let mut guard = RunGuard::new(&self.state, &self.control);

        tracing::Span::current().record("run_id", run_id.as_str());
        info!(valid = valid.len(), invalid = rows.len() - valid.len(), "开始批量导入");

        let mut rx = self.control.subscribe();
        let mut cancelled = false;

        for (idx, row) in valid.iter().enumerate() {
            if self.control.signal() == RunSignal::Paused {
                self.set_phase(RunPhase::Paused);
                info!(processing_index = idx, "已暂停");
                if wait_while_paused(&mut rx).await == RunSignal::Running {
                    self.set_phase(RunPhase::Running);
                    info!(processing_index = idx, "已恢复");
                }
            }

            if self.control.signal() == RunSignal::Cancelled {
                cancelled = true;
                info!(processed = idx, remaining = valid.len() - idx, "已取消");
                break;
            }

            write_lock(&self.state).processing_index = idx + 1;
            let result = self.process_row(mode, row).await;
            write_lock(&self.results).push(result);
        }

        // 无效行直接记为跳过（取消时同样追加）
        {
            let mut results = write_lock(&self.results);
            for row in rows.iter().filter(|r| !r.is_valid) {
                results.push(ProcessingResult::skipped(row, row.errors.join("; ")));
            }
        }

        let phase = if cancelled {
            RunPhase::Cancelled
        } else {
            RunPhase::Completed
        };
        {
            let mut state = write_lock(&self.state);
            state.phase = phase;
            state.is_processing = false;
            state.finished_at = Some(Utc::now());
        }
        guard.disarm();

        let results = self.results_snapshot();
        info!(
            phase = %phase,
            results = results.len(),
            failures = results.iter().filter(|r| !r.success).count(),
            "批量导入结束"
        );
        Ok(results)
    }

    fn set_phase(&self, phase: RunPhase) {
        write_lock(&self.state).phase = phase;
    }

    /// 提交单行（含重试）
    async fn process_row(&self, mode: ImportMode, row: &ParsedRow) -> ProcessingResult {
        let action = RowAction::for_mode(mode);
        let payload = &row.mapped;

        let edit_id = match mode {
            ImportMode::Edit => match payload.id {
                Some(id) => Some(id),
                None => {
                    debug!(row_number = row.row_number, "缺少 id，跳过");
                    return ProcessingResult::skipped(row, t("run.missing_id"));
                }
            },
            ImportMode::Create => None,
        };

        let mut last_error = String::new();
        for attempt in 0..self.policy.max_attempts {
            let outcome = match edit_id {
                Some(id) => self.repo.update_product(id, payload).await,
                None => self.repo.create_product(payload).await,
            };

            match outcome {
                Ok(ack) => {
                    let product_id = ack.id.or(edit_id);
                    debug!(row_number = row.row_number, attempt = attempt + 1, product_id = ?product_id, "提交成功");
                    return ProcessingResult::succeeded(row, action, product_id);
                }
                Err(err) => {
                    last_error = err.message().to_string();
                    let can_retry = err.is_retryable() && attempt + 1 < self.policy.max_attempts;
                    warn!(
                        row_number = row.row_number,
                        attempt = attempt + 1,
                        retryable = err.is_retryable(),
                        error = %err,
                        "提交失败"
                    );
                    if !can_retry {
                        break;
                    }
                    tokio::time::sleep(self.policy.delay_after(attempt)).await;
                }
            }
        }

        if last_error.is_empty() {
            last_error = t("run.unknown_error");
        }
        ProcessingResult::failed(row, action, last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_linear_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(2000));
    }

    #[test]
    fn test_cancel_overrides_pause() {
        let control = RunControl::new();
        control.pause();
        assert_eq!(control.signal(), RunSignal::Paused);

        control.cancel();
        control.resume();
        control.pause();
        assert_eq!(control.signal(), RunSignal::Cancelled);

        control.rearm();
        assert_eq!(control.signal(), RunSignal::Running);
    }

    #[tokio::test]
    async fn test_wait_while_paused_observes_cancel() {
        let control = RunControl::new();
        control.pause();
        let mut rx = control.subscribe();

        let waiter = tokio::spawn(async move { wait_while_paused(&mut rx).await });
        tokio::task::yield_now().await;
        control.cancel();

        assert_eq!(waiter.await.unwrap(), RunSignal::Cancelled);
    }

    #[tokio::test]
    async fn test_wait_while_paused_returns_on_resume() {
        let control = RunControl::new();
        control.pause();
        let mut rx = control.subscribe();

        let waiter = tokio::spawn(async move { wait_while_paused(&mut rx).await });
        tokio::task::yield_now().await;
        control.resume();

        assert_eq!(waiter.await.unwrap(), RunSignal::Running);
    }
}
