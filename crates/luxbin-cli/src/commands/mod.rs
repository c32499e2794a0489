pub mod admin;
pub mod agent;
pub mod anchor;
pub mod issuer;
pub mod ledger;
pub mod status;
