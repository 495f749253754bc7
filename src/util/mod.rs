pub mod datetime;
pub mod http;
pub mod pacer;
pub mod text;
