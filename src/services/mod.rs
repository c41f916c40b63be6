pub mod client_repository;
pub mod naming;
pub mod provisioner;
pub mod token_cache;
