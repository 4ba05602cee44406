mod input_sanitizer;
mod key_sanitizer;

pub use input_sanitizer::InputSanitizer;
pub use key_sanitizer::KeySanitizer;
