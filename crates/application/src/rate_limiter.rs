//! 消息发送限流器（滑动窗口）
//!
//! 按 (用户, 房间) 键维护窗口内已接受发送的时间戳序列：任意长度为
//! `window` 的尾随时间窗内最多接受 `max_messages` 条，是精确的硬上限
//! 而不是令牌桶式的平滑平均。被拒绝的发送在协议层静默丢弃，
//! 不向发送方回传错误帧。

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use domain::{RoomId, Timestamp, UserId};

/// 限流参数
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    /// 窗口内最大消息数
    pub max_messages: u32,
    /// 窗口长度（毫秒）
    pub window_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        // 每 10 秒 5 条
        Self {
            max_messages: 5,
            window_ms: 10_000,
        }
    }
}

/// 进程级滑动窗口限流器。
///
/// 每个键最多保留 `max_messages` 个时间戳（超过窗口的条目在每次
/// 检查时惰性剪除），内存占用有界。
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    settings: RateLimitSettings,
    windows: Mutex<HashMap<(UserId, RoomId), VecDeque<i64>>>,
}

impl SlidingWindowLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// 判定一次发送是否放行。
    ///
    /// 剪除窗口外的时间戳后，若剩余条数已达上限则拒绝（保留剪除后的
    /// 序列，不追加新条目）；否则记录 `now` 并放行。
    pub fn allow(&self, user_id: UserId, room_id: RoomId, now: Timestamp) -> bool {
        let now_ms = now.timestamp_millis();
        let cutoff = now_ms - self.settings.window_ms as i64;

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows
            .entry((user_id, room_id))
            .or_insert_with(|| VecDeque::with_capacity(self.settings.max_messages as usize));

        // 时间戳按接受顺序排列，从队首剪除过期条目
        while window.front().is_some_and(|&t| t <= cutoff) {
            window.pop_front();
        }

        if window.len() >= self.settings.max_messages as usize {
            return false;
        }

        window.push_back(now_ms);
        true
    }
}
