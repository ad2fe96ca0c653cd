use rand::{rngs::OsRng, Rng};

/// Fixed-length numeric one-time code from the OS CSPRNG. Pure generation;
/// the caller persists and expires it.
pub fn generate(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Opaque alphanumeric token for the verified-reset step. Longer than the
/// OTP since it is carried in a request body rather than typed by a human.
pub fn generate_token(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| char::from(TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())]))
        .collect()
}
