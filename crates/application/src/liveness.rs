//! 心跳检测
//!
//! 按固定间隔调用 [`Hub::sweep`]。与应用层的 `ping`/`pong` 消息无关，
//! 只用于发现不会产生关闭事件的半开连接，最长检测延迟约为两个间隔。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use config::HubConfig;
use tokio::time::{interval, MissedTickBehavior};

use crate::hub::Hub;

pub struct LivenessMonitor {
    hub: Arc<Hub>,
    period: Duration,
}

impl LivenessMonitor {
    pub fn new(hub: Arc<Hub>, period: Duration) -> Self {
        Self { hub, period }
    }

    pub fn from_config(hub: Arc<Hub>, config: &HubConfig) -> Self {
        Self::new(hub, config.heartbeat_interval())
    }

    /// 运行直到 `shutdown` 完成
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 跳过立即触发的第一次
        ticker.tick().await;

        tokio::pin!(shutdown);
        tracing::info!(period_secs = self.period.as_secs(), "Liveness monitor started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let report = self.hub.sweep().await;
                    if !report.terminated.is_empty() {
                        tracing::info!(
                            terminated = report.terminated.len(),
                            "Reaped unresponsive connections"
                        );
                    }
                }
            }
        }

        tracing::info!("Liveness monitor stopped");
    }
}
