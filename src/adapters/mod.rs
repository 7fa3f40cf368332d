pub mod chat;
pub mod storage;
