pub mod blocklist;
pub mod suggest;
