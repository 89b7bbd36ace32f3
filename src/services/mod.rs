pub mod cards;
pub mod chat;
pub mod extraction;
pub mod fallback;
pub mod intent;
pub mod reflection;
