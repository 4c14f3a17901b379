pub mod script_repo;

pub use script_repo::ScriptRepo;
