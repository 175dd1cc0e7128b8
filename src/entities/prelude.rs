#![allow(unused_imports)]

pub use super::admin_log::Entity as AdminLog;
pub use super::airdrop::Entity as Airdrop;
pub use super::airdrop_task::Entity as AirdropTask;
pub use super::setting::Entity as Setting;
pub use super::task_completion::Entity as TaskCompletion;
pub use super::user::Entity as User;
pub use super::withdrawal::Entity as Withdrawal;
