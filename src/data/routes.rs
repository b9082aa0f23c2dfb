//! Fixed route lists tracked by farewatch
//!
//! Fares are tracked from both Tokyo airports to Singapore and Manila. The
//! lists are ordered; origins are tried in this order and the first origin
//! with the lowest price wins a tie.

/// Origin airports, in the order they are queried
pub static ORIGINS: [&str; 2] = ["HND", "NRT"];

/// Destination airports, in the order they appear in query results
pub static DESTINATIONS: [&str; 2] = ["SIN", "MNL"];

/// Normalizes an airport code to trimmed uppercase IATA form
pub fn normalize_airport(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_airport() {
        assert_eq!(normalize_airport("hnd"), "HND");
        assert_eq!(normalize_airport(" Sin "), "SIN");
        assert_eq!(normalize_airport("MNL"), "MNL");
    }

    #[test]
    fn test_route_lists_are_normalized() {
        for code in ORIGINS.iter().chain(DESTINATIONS.iter()) {
            assert_eq!(normalize_airport(code), *code);
            assert_eq!(code.len(), 3);
        }
    }
}
