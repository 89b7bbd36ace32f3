pub mod cards;
pub mod chat;
pub mod daily_logs;
pub mod health;
