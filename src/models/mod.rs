pub mod bead;
pub mod timestamp;

// 重新导出核心类型
pub use bead::{Bead, BeadIdentity, InputSpec};
pub use timestamp::{
    format_timestamp, time_from_timestamp, time_from_user, timestamp, Timestamp,
};
