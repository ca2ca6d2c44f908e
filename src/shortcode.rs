use crate::error::AppError;
use rand::Rng;
use std::future::Future;

/// Length of every generated short code.
pub const CODE_LENGTH: usize = 6;

/// Consecutive collisions tolerated before allocation gives up.
pub const MAX_ATTEMPTS: u32 = 5;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random alphanumeric string of the given length.
///
/// Each character is an independent uniform draw from the 62-symbol alphabet.
/// Not suitable for anything that needs to be unguessable.
pub fn generate(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Draw codes until `exists` reports one as free.
///
/// Gives up with [`AppError::CodeExhaustion`] after `max_attempts`
/// consecutive collisions; `exists` is never called more than
/// `max_attempts` times. Errors from `exists` abort immediately.
pub async fn allocate_unique_code<F, Fut>(mut exists: F, max_attempts: u32) -> Result<String, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    for attempt in 1..=max_attempts {
        let code = generate(CODE_LENGTH);
        if !exists(code.clone()).await? {
            return Ok(code);
        }
        tracing::debug!("Short code collision on attempt {}/{}", attempt, max_attempts);
    }

    tracing::warn!("Gave up after {} short code collisions", max_attempts);
    Err(AppError::CodeExhaustion)
}
