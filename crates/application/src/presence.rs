//! 在线状态追踪器
//!
//! 按用户引用计数的在线状态：一个用户可能同时有多个连接
//! （多标签页/多设备），对外只在 0↔1 的边沿上报一次上线/下线，
//! 把 N 次 connect/disconnect 折叠成一对边沿事件，避免广播风暴。
//!
//! 状态仅存在于进程内存中，进程重启即清零——在线状态本来就由
//! 活跃连接派生，这是可接受的。

use std::collections::HashMap;
use std::sync::Mutex;

use domain::UserId;

/// 进程级在线状态追踪器。
///
/// 单锁保护整张计数表，同一用户的并发 connect/disconnect
/// 互相之间是原子的。
#[derive(Debug, Default)]
pub struct PresenceTracker {
    counts: Mutex<HashMap<UserId, u32>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条新连接。返回 true 当且仅当计数从 0 变为 1，
    /// 即用户刚刚上线。
    pub fn connect(&self, user_id: UserId) -> bool {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(user_id).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// 记录一条连接断开。计数归零时移除条目并返回 true，
    /// 表示用户已完全离线；否则保留减少后的计数并返回 false。
    pub fn disconnect(&self, user_id: UserId) -> bool {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        match counts.get_mut(&user_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(&user_id);
                    true
                } else {
                    false
                }
            }
            // 没有计数条目的用户本来就是离线的
            None => true,
        }
    }

    /// 用户是否在线（存在计数大于 0 的条目）。
    pub fn is_online(&self, user_id: UserId) -> bool {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.get(&user_id).copied().unwrap_or(0) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_connect_reports_online_edge() {
        let tracker = PresenceTracker::new();
        let user = UserId::new(1);

        assert!(tracker.connect(user));
        assert!(tracker.is_online(user));
    }

    #[test]
    fn multiple_connections_report_single_edge_pair() {
        let tracker = PresenceTracker::new();
        let user = UserId::new(7);

        // 三个并发连接：只有第一个产生上线边沿
        assert!(tracker.connect(user));
        assert!(!tracker.connect(user));
        assert!(!tracker.connect(user));

        // 只有最后一个断开产生下线边沿
        assert!(!tracker.disconnect(user));
        assert!(!tracker.disconnect(user));
        assert!(tracker.disconnect(user));
        assert!(!tracker.is_online(user));
    }

    #[test]
    fn entry_removed_when_fully_offline() {
        let tracker = PresenceTracker::new();
        let user = UserId::new(3);

        tracker.connect(user);
        tracker.disconnect(user);

        // 完全离线后条目被移除，重新上线再次产生边沿
        assert!(tracker.connect(user));
    }

    #[test]
    fn users_are_tracked_independently() {
        let tracker = PresenceTracker::new();
        let a = UserId::new(1);
        let b = UserId::new(2);

        tracker.connect(a);
        assert!(tracker.is_online(a));
        assert!(!tracker.is_online(b));
    }
}
