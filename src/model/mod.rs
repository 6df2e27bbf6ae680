pub mod comment;
pub mod enums;
pub mod pool;
pub mod post;
