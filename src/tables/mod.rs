//! Static lookup tables: literal names the lexer recognises and the
//! protocol codes the generated stream refers to.
pub mod codes;
pub mod colours;
pub mod device_states;
