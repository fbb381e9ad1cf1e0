pub mod extractor;
pub mod validator;

pub use extractor::{Extraction, extract_signal};
pub use validator::{check_margin_limit, validate};
