//! 中继核心领域模型
//!
//! 包含标识符、会话身份、在线用户记录以及线上协议。

pub mod errors;
pub mod protocol;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use protocol::*;
pub use user::*;
pub use value_objects::*;
