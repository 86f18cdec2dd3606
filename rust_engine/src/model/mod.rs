//! 角色运行时管理

mod runtime;

pub use runtime::RiggedCharacter;
