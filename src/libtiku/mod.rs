pub mod parser;
pub mod question;
pub mod session;
pub mod source;
