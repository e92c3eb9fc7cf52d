use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Today's rounds per status
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RondaCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Headline numbers of the home screen, scoped to the caller's contracts
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    pub contracts: i64,
    pub assets: i64,
    /// Reports expiring within the alert window, not yet expired
    pub reports_expiring: i64,
    pub reports_expired: i64,
    pub rondas_today: RondaCounts,
    pub open_relevant_items: i64,
    pub devices: i64,
}
