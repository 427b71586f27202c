use rand::Rng;

pub const BOOKING_REFERENCE_LENGTH: usize = 6;

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random 6-character reference code. Uniqueness comes from the database
/// index; callers regenerate and retry on a collision.
pub fn generate_booking_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..BOOKING_REFERENCE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..REFERENCE_ALPHABET.len());
            REFERENCE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        for _ in 0..50 {
            let reference = generate_booking_reference();
            assert_eq!(reference.len(), BOOKING_REFERENCE_LENGTH);
            assert!(reference
                .bytes()
                .all(|b| REFERENCE_ALPHABET.contains(&b)));
        }
    }
}
