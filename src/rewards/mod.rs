mod shaper;
mod shaping;

pub use shaper::RewardConfig;
pub use shaper::RewardShaper;
