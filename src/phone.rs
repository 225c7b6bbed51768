/// Country code assumed for numbers entered without one.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

const MIN_DIGITS: usize = 9;
const MAX_DIGITS: usize = 15;

/// Links to the services the bot knows about, for one normalized number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSet {
    /// WhatsApp chat deep link
    pub chat: String,
    /// Truecaller search page
    pub lookup: String,
    pub sms: String,
    pub call: String,
}

fn digits_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when the digits in `input` form a number of 9 to 15 digits.
/// Any other characters (spaces, dashes, a leading `+`) are ignored.
pub fn is_valid_phone_number(input: &str) -> bool {
    let digits = digits_only(input);
    (MIN_DIGITS..=MAX_DIGITS).contains(&digits.len())
}

/// Strip everything but digits and prepend the default country code
/// to numbers that look local (10 digits or fewer).
pub fn format_phone_number(input: &str) -> String {
    let digits = digits_only(input);
    if digits.len() <= 10 {
        format!("{}{}", DEFAULT_COUNTRY_CODE, digits)
    } else {
        digits
    }
}

/// Build the service links for an already formatted number.
pub fn generate_links(phone_number: &str) -> LinkSet {
    LinkSet {
        chat: format!("https://wa.me/{}", phone_number),
        lookup: format!("https://www.truecaller.com/search/in/{}", phone_number),
        sms: format!("sms:{}", phone_number),
        call: format!("tel:{}", phone_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_lengths_accepted() {
        assert!(is_valid_phone_number("123456789"));
        assert!(is_valid_phone_number("1234567890"));
        assert!(is_valid_phone_number("123456789012345"));
    }

    #[test]
    fn test_invalid_lengths_rejected() {
        assert!(!is_valid_phone_number(""));
        assert!(!is_valid_phone_number("12345678"));
        assert!(!is_valid_phone_number("1234567890123456"));
    }

    #[test]
    fn test_validation_ignores_punctuation() {
        assert!(is_valid_phone_number("+91 98765-43210"));
        assert!(is_valid_phone_number("(123) 456 7890"));
        assert!(!is_valid_phone_number("abc"));
        assert!(!is_valid_phone_number("call me at 12"));
    }

    #[test]
    fn test_validation_ignores_non_ascii_digits() {
        // Devanagari digits are not counted
        assert!(!is_valid_phone_number("१२३४५६७८९०"));
    }

    #[test]
    fn test_local_number_gets_country_code() {
        assert_eq!(format_phone_number("1234567890"), "911234567890");
        assert_eq!(format_phone_number("123456789"), "91123456789");
        assert_eq!(format_phone_number("98765 43210"), "919876543210");
    }

    #[test]
    fn test_number_with_country_code_unchanged() {
        assert_eq!(format_phone_number("919876543210"), "919876543210");
        assert_eq!(format_phone_number("+1 415 555 0100 1"), "141555501001");
    }

    #[test]
    fn test_format_is_idempotent_for_long_numbers() {
        let once = format_phone_number("+91 98765 43210");
        assert_eq!(format_phone_number(&once), once);
    }

    #[test]
    fn test_generate_links() {
        let links = generate_links("919876543210");
        assert_eq!(links.chat, "https://wa.me/919876543210");
        assert_eq!(
            links.lookup,
            "https://www.truecaller.com/search/in/919876543210"
        );
        assert_eq!(links.sms, "sms:919876543210");
        assert_eq!(links.call, "tel:919876543210");
    }
}
