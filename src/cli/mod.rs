pub mod add;
pub mod list;
pub mod rate;
pub mod setup;
pub mod taxonomy;
pub mod ui;
