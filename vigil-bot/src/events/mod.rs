pub mod mention_chat;
pub mod moderation;
