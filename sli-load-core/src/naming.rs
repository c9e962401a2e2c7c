use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Default length of remote directory names.
pub const TOKEN_LENGTH: usize = 6;

/// A short lowercase alphanumeric token. Not guaranteed unique; it only makes
/// collisions between concurrent uploads unlikely.
pub fn random_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_has_requested_length_and_alphabet() {
        let token = random_token(12);
        assert_eq!(token.len(), 12);
        assert!(token.bytes().all(|b| ALPHABET.contains(&b)));
    }
}
