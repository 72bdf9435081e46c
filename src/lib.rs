pub mod sqlite_pragma;
pub mod stat;
