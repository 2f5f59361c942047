//! Template text: `<<name>>` tokens, field order and value substitution

mod fields;
mod tokenizer;

pub use fields::{FieldOrder, fill_placeholders};
pub use tokenizer::{Segment, placeholder, placeholder_names, tokenize};
