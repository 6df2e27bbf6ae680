pub mod cache;
pub mod encoding;
pub mod fanout;
pub mod key;
pub mod link;
pub mod object;
pub mod s3;
