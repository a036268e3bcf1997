#[cfg(test)]
mod utilities_test;

pub(crate) mod gate;

use rand::Rng;

pub(crate) const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// generate_crypto_random_string generates a random string of the requested length
/// drawn from `runes`, using the thread-local CSPRNG.
pub(crate) fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rand::rng();

    let rand_string: String = (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect();

    rand_string
}
