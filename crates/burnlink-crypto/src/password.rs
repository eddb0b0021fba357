//! Random password generation for password-protected secrets
//!
//! Defaults match the share form's "enable password" toggle: 16 characters,
//! numbers and symbols included, and strict mode (at least one character
//! from every enabled class).

use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::random::{random_below, SecureRandomSource};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()+_-=}{[]|:;\"/?.><,`~";

#[derive(Debug, Clone)]
pub struct PasswordRules {
    pub length: usize,
    pub numbers: bool,
    pub symbols: bool,
    /// Require at least one character from each enabled class
    pub strict: bool,
}

impl Default for PasswordRules {
    fn default() -> Self {
        Self {
            length: 16,
            numbers: true,
            symbols: true,
            strict: true,
        }
    }
}

impl PasswordRules {
    fn classes(&self) -> Vec<&'static [u8]> {
        let mut classes = vec![LOWERCASE, UPPERCASE];
        if self.numbers {
            classes.push(NUMBERS);
        }
        if self.symbols {
            classes.push(SYMBOLS);
        }
        classes
    }
}

/// Generate a password under `rules`.
pub fn generate_password<R: SecureRandomSource + ?Sized>(
    rng: &mut R,
    rules: &PasswordRules,
) -> Result<SecretString, CryptoError> {
    let classes = rules.classes();
    if rules.length == 0 {
        return Err(CryptoError::PasswordRules("length must be at least 1".into()));
    }
    if rules.strict && rules.length < classes.len() {
        return Err(CryptoError::PasswordRules(format!(
            "strict mode needs length >= {} (got {})",
            classes.len(),
            rules.length
        )));
    }

    let alphabet: Vec<u8> = classes.iter().flat_map(|c| c.iter().copied()).collect();
    let mut chars = Zeroizing::new(Vec::with_capacity(rules.length));

    if rules.strict {
        for class in &classes {
            chars.push(class[random_below(rng, class.len())?]);
        }
    }
    while chars.len() < rules.length {
        chars.push(alphabet[random_below(rng, alphabet.len())?]);
    }

    // Fisher-Yates, so the guaranteed characters are not always up front.
    for i in (1..chars.len()).rev() {
        let j = random_below(rng, i + 1)?;
        chars.swap(i, j);
    }

    let password: String = chars.iter().map(|&b| b as char).collect();
    Ok(SecretString::from(password))
}
