#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    Reconnect,
    Restart,
}

/// Connection-lifecycle bookkeeping for the single broker session: the
/// connected flag, the mandatory reconnect deadline, and the consecutive
/// fault counter with its one-shot restart latch.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    reconnect_secs: i64,
    fault_threshold: u32,
    connected: bool,
    fault_count: u32,
    reconnect_deadline_epoch: Option<i64>,
    restart_latched: bool,
}

impl SessionPolicy {
    pub fn new(reconnect_secs: i64, fault_threshold: u32) -> Self {
        Self {
            reconnect_secs,
            fault_threshold,
            connected: false,
            fault_count: 0,
            reconnect_deadline_epoch: None,
            restart_latched: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn fault_count(&self) -> u32 {
        self.fault_count
    }

    pub fn on_connected(&mut self, now_epoch: i64) {
        self.connected = true;
        self.fault_count = 0;
        self.reconnect_deadline_epoch = Some(now_epoch + self.reconnect_secs);
    }

    /// A transport-reported disconnect. Counts toward the fault threshold;
    /// the restart outcome is produced exactly once.
    pub fn on_disconnected(&mut self) -> DisconnectOutcome {
        self.connected = false;
        self.fault_count = self.fault_count.saturating_add(1);

        if self.fault_count >= self.fault_threshold && !self.restart_latched {
            self.restart_latched = true;
            DisconnectOutcome::Restart
        } else {
            DisconnectOutcome::Reconnect
        }
    }

    /// Deliberate teardown (credential renewal). Does not count as a fault.
    pub fn mark_closed(&mut self) {
        self.connected = false;
        self.reconnect_deadline_epoch = None;
    }

    pub fn reconnect_due(&self, now_epoch: i64) -> bool {
        if !self.connected {
            return true;
        }
        match self.reconnect_deadline_epoch {
            Some(deadline) => now_epoch > deadline,
            None => true,
        }
    }
}
