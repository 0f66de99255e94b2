//! Backup lifecycle: status polling, waiting, upload retries and the run state machine

pub mod api;
pub mod fsm;
pub mod orchestrator;
pub mod retry;
pub mod status;
pub mod wait;
