//! 可取消的延时任务
//!
//! 帧驱动：调用方每帧用 [`Scheduler::advance`] 推进内部时钟，再用
//! [`Scheduler::pop_due`] 取出到期任务。每个任务由 [`TaskToken`] 标识，
//! 取消后该令牌永远不会再触发。

use gametime::TimeSpan;

use crate::time::saturating_add;

/// 延时任务令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

/// 已到期的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    /// 任务令牌
    pub token: TaskToken,
    /// 计划到期时刻（调度器时钟）
    pub due: TimeSpan,
    /// 任务负载
    pub payload: T,
}

struct Task<T> {
    token: TaskToken,
    due: TimeSpan,
    payload: T,
}

/// 延时任务调度器
pub struct Scheduler<T> {
    /// 调度器自身的时钟
    now: TimeSpan,
    /// 下一个令牌编号
    next_token: u64,
    /// 等待中的任务
    tasks: Vec<Task<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// 创建空调度器，时钟从零开始
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: TimeSpan::ZERO,
            next_token: 0,
            tasks: Vec::new(),
        }
    }

    /// 调度器当前时刻
    #[must_use]
    pub const fn now(&self) -> TimeSpan {
        self.now
    }

    /// 在 `delay` 之后触发
    pub fn schedule_after(&mut self, delay: TimeSpan, payload: T) -> TaskToken {
        let due = saturating_add(self.now, delay);
        self.schedule_at(due, payload)
    }

    /// 在调度器时刻 `due` 触发；早于当前时刻的任务在下一次 `pop_due` 时立即到期
    pub fn schedule_at(&mut self, due: TimeSpan, payload: T) -> TaskToken {
        let token = TaskToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.tasks.push(Task {
            token,
            due,
            payload,
        });
        token
    }

    /// 取消任务，返回其负载；令牌已触发或已取消时返回 `None`
    pub fn cancel(&mut self, token: TaskToken) -> Option<T> {
        let pos = self.tasks.iter().position(|t| t.token == token)?;
        Some(self.tasks.swap_remove(pos).payload)
    }

    /// 任务是否仍在等待
    #[must_use]
    pub fn is_pending(&self, token: TaskToken) -> bool {
        self.tasks.iter().any(|t| t.token == token)
    }

    /// 推进调度器时钟
    pub fn advance(&mut self, delta: TimeSpan) {
        self.now = saturating_add(self.now, delta);
    }

    /// 取出最早到期的任务；同一时刻按调度先后顺序
    pub fn pop_due(&mut self) -> Option<Fired<T>> {
        let now = self.now;
        let pos = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.token.0))
            .map(|(i, _)| i)?;
        let task = self.tasks.swap_remove(pos);
        Some(Fired {
            token: task.token,
            due: task.due,
            payload: task.payload,
        })
    }

    /// 取消全部任务（时钟保持不变）
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// 等待中的任务数
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// 是否没有等待中的任务
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
