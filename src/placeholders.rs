//! Literal placeholder substitution
//!
//! Templates carry `${NAME}`-style tokens. Substitution is a plain
//! substring replacement applied token by token in the declared order;
//! there is no templating language and no recursion.

use crate::identity::AppIdentity;
use crate::{Result, SproutError};
use rand::Rng;

/// Short application name (the generated directory name)
pub const APP_NAME: &str = "${APP_NAME}";
/// Fully-qualified module identifier
pub const MODULE_PATH: &str = "${MODULE_PATH}";
/// Freshly generated secret key
pub const KEY: &str = "${KEY}";

const SECRET_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0987654321_+";

/// Ordered token/value table for one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    entries: Vec<(String, String)>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard table: `APP_NAME`, `MODULE_PATH`, then `KEY`
    pub fn for_identity(identity: &AppIdentity, secret: String) -> Result<Self> {
        Self::new()
            .with(APP_NAME, identity.short_name.clone())?
            .with(MODULE_PATH, identity.module_id.clone())?
            .with(KEY, secret)
    }

    /// Append a token, keeping declaration order
    ///
    /// Fails if the token is already declared, or if any value in the table
    /// would contain a declared token.
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let value = value.into();

        if token.is_empty() {
            return Err(SproutError::Configuration("placeholder token is empty".into()));
        }
        if self.entries.iter().any(|(t, _)| *t == token) {
            return Err(SproutError::Configuration(format!(
                "placeholder {token} declared twice"
            )));
        }
        if let Some(t) = self
            .tokens()
            .chain(std::iter::once(token.as_str()))
            .find(|t| value.contains(t))
        {
            return Err(SproutError::Configuration(format!(
                "value for {token} contains placeholder {t}"
            )));
        }
        if let Some((t, _)) = self.entries.iter().find(|(_, v)| v.contains(token.as_str())) {
            return Err(SproutError::Configuration(format!(
                "value for {t} contains placeholder {token}"
            )));
        }

        self.entries.push((token, value));
        Ok(self)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace every declared token in `template`, in declaration order
///
/// Tokens that are not declared are left verbatim.
pub fn render(template: &str, placeholders: &Placeholders) -> String {
    let mut out = template.to_string();
    for (token, value) in placeholders.iter() {
        if out.contains(token) {
            out = out.replace(token, value);
        }
    }
    out
}

/// [`render`] over raw bytes, failing on malformed UTF-8
pub fn render_bytes(template: &[u8], placeholders: &Placeholders) -> Result<String> {
    let text = std::str::from_utf8(template).map_err(|e| {
        SproutError::Encoding(format!(
            "template is not valid UTF-8 (invalid byte at offset {})",
            e.valid_up_to()
        ))
    })?;
    Ok(render(text, placeholders))
}

/// Random secret drawn from a thread-local CSPRNG
pub fn random_secret(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| SECRET_ALPHABET[rng.gen_range(0..SECRET_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Placeholders {
        let id = AppIdentity::sanitize("github.com/foo/bar");
        Placeholders::for_identity(&id, "s3cr3t".to_string()).unwrap()
    }

    #[test]
    fn test_declared_order() {
        let tokens: Vec<_> = sample().tokens().map(str::to_string).collect();
        assert_eq!(tokens, vec![APP_NAME, MODULE_PATH, KEY]);
    }

    #[test]
    fn test_render_without_tokens_is_identity() {
        let template = "APP_URL=http://localhost:4000\nDEBUG=true\n";
        assert_eq!(render(template, &sample()), template);
    }

    #[test]
    fn test_render_every_token_once() {
        let template = "name=${APP_NAME}\nmodule ${MODULE_PATH}\nKEY=${KEY}\n";
        let out = render(template, &sample());

        assert_eq!(out, "name=bar\nmodule github.com/foo/bar\nKEY=s3cr3t\n");
        for token in sample().tokens() {
            assert!(!out.contains(token));
        }
    }

    #[test]
    fn test_render_replaces_all_occurrences() {
        let out = render("${APP_NAME}-${APP_NAME}", &sample());
        assert_eq!(out, "bar-bar");
    }

    #[test]
    fn test_unknown_tokens_left_verbatim() {
        let template = "PATH=${HOME}/bin:${APP_NAME}";
        assert_eq!(render(template, &sample()), "PATH=${HOME}/bin:bar");
    }

    #[test]
    fn test_render_does_not_touch_input() {
        let template = String::from("${KEY}");
        let out = render(&template, &sample());
        assert_eq!(template, "${KEY}");
        assert_eq!(out, "s3cr3t");
    }

    #[test]
    fn test_render_bytes_rejects_invalid_utf8() {
        let result = render_bytes(&[b'o', b'k', 0xff, 0xfe], &sample());
        assert!(matches!(result, Err(SproutError::Encoding(_))));
    }

    #[test]
    fn test_render_bytes_valid() {
        let out = render_bytes(b"module ${MODULE_PATH}", &sample()).unwrap();
        assert_eq!(out, "module github.com/foo/bar");
    }

    #[test]
    fn test_value_containing_token_rejected() {
        let result = Placeholders::new()
            .with(APP_NAME, "bar")
            .and_then(|p| p.with(KEY, "prefix-${APP_NAME}"));
        assert!(matches!(result, Err(SproutError::Configuration(_))));

        let result = Placeholders::new()
            .with(APP_NAME, "uses ${KEY}")
            .and_then(|p| p.with(KEY, "value"));
        assert!(matches!(result, Err(SproutError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let result = Placeholders::new()
            .with(APP_NAME, "a")
            .and_then(|p| p.with(APP_NAME, "b"));
        assert!(matches!(result, Err(SproutError::Configuration(_))));
    }

    #[test]
    fn test_random_secret() {
        let a = random_secret(32);
        let b = random_secret(32);

        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.bytes().all(|c| SECRET_ALPHABET.contains(&c)));
    }
}
