use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetIoStats {
    pub records_received: u64,
    pub decode_errors: u64,
    pub own_federate_ignored: u64,
    pub unmatched_incoming: u64,
    pub out_of_range: u64,
    pub capacity_drops: u64,
    pub stale_updates: u64,
    pub proxies_created: u64,
    pub proxies_retired: u64,
    pub records_sent: u64,
    pub heartbeats: u64,
    pub unmatched_outgoing: u64,
    pub filtered_outgoing: u64,
    pub encode_errors: u64,
    pub queue_drops: u64,
}

impl fmt::Display for NetIoStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rx {} (decode err {}, own {}, unmatched {}, out of range {}, full {}, stale {}, queue drops {}) \
             proxies +{}/-{} tx {} (heartbeat {}, unmatched {}, filtered {}, encode err {})",
            self.records_received,
            self.decode_errors,
            self.own_federate_ignored,
            self.unmatched_incoming,
            self.out_of_range,
            self.capacity_drops,
            self.stale_updates,
            self.queue_drops,
            self.proxies_created,
            self.proxies_retired,
            self.records_sent,
            self.heartbeats,
            self.unmatched_outgoing,
            self.filtered_outgoing,
            self.encode_errors,
        )
    }
}
