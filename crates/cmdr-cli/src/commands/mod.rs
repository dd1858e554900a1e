pub mod history;
pub mod list;
pub mod maintenance;
pub mod run;
