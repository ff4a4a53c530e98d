use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}
