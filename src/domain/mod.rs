pub mod billing;
pub mod customer;
pub mod error;
pub mod event;
pub mod gateway;
pub mod id;
pub mod ledger;
pub mod money;
pub mod object_ref;
pub mod plan;
pub mod status;
pub mod system_log;
