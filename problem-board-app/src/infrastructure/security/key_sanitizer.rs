use crate::domain::UserKey;

/// Characters the tree store refuses in a key, with their escape names.
/// `/` is the path separator.
const ESCAPES: &[(char, &str)] = &[
    ('.', "dot"),
    ('#', "hash"),
    ('$', "dollar"),
    ('[', "lbracket"),
    (']', "rbracket"),
    ('/', "slash"),
];

/// Maps user identifiers (emails) to store keys.
///
/// A literal `_` becomes `__`, so every `_` in an encoded key starts either
/// an escaped underscore or an `_name_` escape. That keeps the mapping
/// injective: `a.b` and `a_dot_b` encode differently.
pub struct KeySanitizer;

impl KeySanitizer {
    pub fn sanitize(identifier: &str) -> String {
        let mut out = String::with_capacity(identifier.len() + 8);
        for c in identifier.chars() {
            if c == '_' {
                out.push_str("__");
            } else if let Some((_, name)) = ESCAPES.iter().find(|(ch, _)| *ch == c) {
                out.push('_');
                out.push_str(name);
                out.push('_');
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Reverses [`KeySanitizer::sanitize`]. Returns `None` for strings that
    /// `sanitize` can never produce.
    pub fn unsanitize(key: &str) -> Option<String> {
        let mut out = String::with_capacity(key.len());
        let mut rest = key;
        while let Some(pos) = rest.find('_') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            if let Some(after) = rest.strip_prefix('_') {
                out.push('_');
                rest = after;
                continue;
            }
            let end = rest.find('_')?;
            let (c, _) = ESCAPES.iter().find(|(_, name)| *name == &rest[..end])?;
            out.push(*c);
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Some(out)
    }

    /// Whether `key` can be used as a single path segment as-is.
    pub fn is_valid_key(key: &str) -> bool {
        !key.is_empty() && !key.chars().any(|c| ESCAPES.iter().any(|(ch, _)| *ch == c))
    }

    pub fn user_key(email: &str) -> UserKey {
        UserKey::from_sanitized(Self::sanitize(email.trim()))
    }
}
