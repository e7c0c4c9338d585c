//! Scientific-name parsing and the string normalisation around it.

pub mod grammar;
pub mod normalize;
pub mod parsed_name;
pub mod soundex;

pub use grammar::ScientificNameParser;
pub use parsed_name::{NameParser, NameParts, NameType, ParsedName, PhraseName};
pub use soundex::{treat_word, WordType};
