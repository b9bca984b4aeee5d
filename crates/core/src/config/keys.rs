//! Reversible monoalphabetic obfuscation for private keys at rest.
//!
//! Not a security boundary — anyone who knows the charset can reverse it
//! trivially. It exists only so a key doesn't sit in a config file or
//! environment dump as an obviously-a-private-key hex string.

const CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SHUFFLED_CHARSET: &str = "WSRQLbOkn7iJCyoPMgYw04VhBaj8dcl2xez5E3mrqHpftuNGFADK9sUTv6ZX1I";

fn translate(input: &str, from: &str, to: &str) -> String {
    input
        .chars()
        .map(|c| match from.find(c) {
            Some(idx) => to.chars().nth(idx).unwrap_or(c),
            None => c,
        })
        .collect()
}

pub fn obfuscate(key: &str) -> String {
    translate(key, CHARSET, SHUFFLED_CHARSET)
}

pub fn deobfuscate(key: &str) -> String {
    translate(key, SHUFFLED_CHARSET, CHARSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff8";
        let obfuscated = obfuscate(key);
        assert_ne!(obfuscated, key);
        assert_eq!(deobfuscate(&obfuscated), key);
    }

    #[test]
    fn passes_through_unknown_characters() {
        let with_prefix = "0xABCdef123";
        let round_tripped = deobfuscate(&obfuscate(with_prefix));
        assert_eq!(round_tripped, with_prefix);
    }
}
