// ISBN-10 / ISBN-13 checksum validation.

/// Strip hyphens and spaces and uppercase a trailing `x`.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Whether `raw` is a valid ISBN-10 or ISBN-13 after normalisation.
pub fn is_valid_isbn(raw: &str) -> bool {
    let isbn = normalize_isbn(raw);
    match isbn.len() {
        10 => is_valid_isbn10(&isbn),
        13 => is_valid_isbn13(&isbn),
        _ => false,
    }
}

fn is_valid_isbn10(isbn: &str) -> bool {
    let mut sum = 0;
    // Weights run 10 down to 1; only the check digit may be `X`.
    for (c, weight) in isbn.chars().zip((1..=10u32).rev()) {
        let value = match (weight, c) {
            (1, 'X') => 10,
            (_, c) => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += value * weight;
    }
    sum % 11 == 0
}

fn is_valid_isbn13(isbn: &str) -> bool {
    let mut sum = 0;
    for (i, c) in isbn.chars().enumerate() {
        let Some(d) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 0 { d } else { d * 3 };
    }
    sum % 10 == 0
}
