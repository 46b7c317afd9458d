mod format;
mod parse;
mod spec;
mod specials;

pub use format::{emit_copyright_c, make_call_string, make_declaration_string};
pub use parse::{load_spec, parse_spec};
pub use spec::*;
pub use specials::{load_specials, parse_specials};
