use serde::Serialize;

use crate::codec::encode_quantity;
use crate::near::SyncInfo;

/// `eth_syncing` result while the node is catching up.
///
/// NEAR status only reports the latest height, so current and highest block
/// are both that height and the state counters stay zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub starting_block: String,
    pub current_block: String,
    pub highest_block: String,
    pub known_states: String,
    pub pulled_states: String,
}

pub fn map_sync_status(info: &SyncInfo) -> SyncStatus {
    let latest = encode_quantity(info.latest_block_height);
    SyncStatus {
        starting_block: "0x0".to_string(),
        current_block: latest.clone(),
        highest_block: latest,
        known_states: "0x0".to_string(),
        pulled_states: "0x0".to_string(),
    }
}
