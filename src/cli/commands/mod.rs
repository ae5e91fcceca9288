pub mod add;
pub mod backup;
pub mod completions;
pub mod del;
pub mod list;
pub mod pla;
pub mod query;
pub mod restore;
pub mod update;
