mod apiutil;
mod generate;

pub use apiutil::ApiUtil;
pub use generate::*;
