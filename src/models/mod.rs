pub mod cards;
pub mod daily_log;
pub mod reflection;
