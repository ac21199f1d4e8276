pub mod admin;
pub mod dispatcher;
pub mod ledger;
pub mod notifier;
pub mod state_machine;
