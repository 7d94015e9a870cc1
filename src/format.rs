use serde::{Deserialize, Serialize};

/// Width of the zero-padded taxpayer code.
pub const TAXPAYER_CODE_WIDTH: usize = 10;
/// Width of the zero-padded property sequence number.
pub const PROPERTY_SEQUENCE_WIDTH: usize = 3;

/// The separators used when printing amounts. The default matches the `es-PE` locale,
/// which groups thousands with a comma and separates decimals with a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberLocale {
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Default for NumberLocale {
    fn default() -> Self {
        NumberLocale {
            thousands_separator: ',',
            decimal_separator: '.',
        }
    }
}

impl NumberLocale {
    /// Formats an amount with exactly two decimal places, rounding half away from zero.
    pub fn format_amount(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return amount.to_string();
        }

        let cents = (amount.abs() * 100.0).round() as u128;
        let (units, fraction) = (cents / 100, cents % 100);

        let digits = units.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
        for (index, digit) in digits.chars().enumerate() {
            if index > 0 && (digits.len() - index) % 3 == 0 {
                grouped.push(self.thousands_separator);
            }
            grouped.push(digit);
        }

        let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
        format!("{sign}{grouped}{}{fraction:02}", self.decimal_separator)
    }

    /// Parses back an amount printed by `format_amount`.
    pub fn parse_amount(&self, text: &str) -> Option<f64> {
        let normalized: String = text
            .trim()
            .chars()
            .filter(|character| *character != self.thousands_separator)
            .map(|character| {
                if character == self.decimal_separator {
                    '.'
                } else {
                    character
                }
            })
            .collect();
        normalized.parse().ok()
    }
}

/// Pads `text` on the left with `fill` until it is at least `width` characters long.
pub fn pad_left(text: &str, width: usize, fill: char) -> String {
    let length = text.chars().count();
    if length >= width {
        return text.to_string();
    }
    std::iter::repeat(fill)
        .take(width - length)
        .chain(text.chars())
        .collect()
}

/// Joins the address components with single spaces, skipping the empty ones.
pub fn compose_address<'a, I>(components: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    components
        .into_iter()
        .map(str::trim)
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_have_two_decimals_and_grouped_thousands() {
        let locale = NumberLocale::default();
        assert_eq!(locale.format_amount(0.0), "0.00");
        assert_eq!(locale.format_amount(5.5), "5.50");
        assert_eq!(locale.format_amount(999.999), "1,000.00");
        assert_eq!(locale.format_amount(1234567.891), "1,234,567.89");
        assert_eq!(locale.format_amount(-2500.0), "-2,500.00");
        assert_eq!(locale.format_amount(-0.001), "0.00");
    }

    #[test]
    fn amounts_follow_custom_separators() {
        let locale = NumberLocale {
            thousands_separator: '.',
            decimal_separator: ',',
        };
        assert_eq!(locale.format_amount(48210.4), "48.210,40");
        assert_eq!(locale.parse_amount("48.210,40"), Some(48210.4));
    }

    #[test]
    fn identifiers_are_zero_padded() {
        assert_eq!(pad_left("123", TAXPAYER_CODE_WIDTH, '0'), "0000000123");
        assert_eq!(pad_left("7", PROPERTY_SEQUENCE_WIDTH, '0'), "007");
        assert_eq!(pad_left("12345678901", TAXPAYER_CODE_WIDTH, '0'), "12345678901");
    }

    #[test]
    fn empty_address_components_collapse() {
        assert_eq!(
            compose_address(["SECTOR 2", "", " URB ", "LAS FLORES", "AV", "  ", "MZ B LT 4"]),
            "SECTOR 2 URB LAS FLORES AV MZ B LT 4"
        );
        assert_eq!(compose_address(["", " ", ""]), "");
    }
}
