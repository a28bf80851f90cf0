use nanoid::nanoid;
use uuid::Uuid;

/// Alphabet for row identifiers (no ambiguous glyphs).
const ROW_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const ROW_ID_LENGTH: usize = 20;

/// New identifier for relationship, post, like and comment rows.
pub fn generate_row_id() -> String {
    nanoid!(ROW_ID_LENGTH, ROW_ID_ALPHABET)
}

/// New identifier for a user account. Profiles and credentials share it.
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}
