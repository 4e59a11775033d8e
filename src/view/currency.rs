//! Locale-aware currency formatting.

use crate::config::DisplayConfig;

/// Where the currency symbol sits relative to the number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolPlacement {
    /// `$19.99`, `-$19.99`
    Prefix,
    /// `€ 19,99`, `€ -19,99`
    PrefixSpaced,
    /// `19,99 €`, `-19,99 €`
    Suffix,
}

#[derive(Debug, Clone, Copy)]
struct LocaleRules {
    decimal: char,
    group: char,
    placement: SymbolPlacement,
}

const NBSP: char = '\u{a0}';
const NARROW_NBSP: char = '\u{202f}';

const EN: LocaleRules = LocaleRules {
    decimal: '.',
    group: ',',
    placement: SymbolPlacement::Prefix,
};

fn rules_for(locale: &str) -> Option<LocaleRules> {
    let language = locale.split(['-', '_']).next().unwrap_or(locale);
    let rules = match locale {
        "nl-NL" | "nl_NL" | "nl-BE" => LocaleRules {
            decimal: ',',
            group: '.',
            placement: SymbolPlacement::PrefixSpaced,
        },
        "de-CH" => LocaleRules {
            decimal: '.',
            group: '\'',
            placement: SymbolPlacement::PrefixSpaced,
        },
        _ => match language {
            "en" => EN,
            "de" | "es" | "it" | "pt" => LocaleRules {
                decimal: ',',
                group: '.',
                placement: SymbolPlacement::Suffix,
            },
            "fr" => LocaleRules {
                decimal: ',',
                group: NARROW_NBSP,
                placement: SymbolPlacement::Suffix,
            },
            "nl" => LocaleRules {
                decimal: ',',
                group: '.',
                placement: SymbolPlacement::PrefixSpaced,
            },
            _ => return None,
        },
    };
    Some(rules)
}

fn symbol_for(currency_code: &str) -> &str {
    match currency_code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        other => other,
    }
}

fn fraction_digits(currency_code: &str) -> usize {
    match currency_code {
        "JPY" | "KRW" | "ISK" | "CLP" | "VND" => 0,
        _ => 2,
    }
}

/// Locale and currency used to render prices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub locale: String,
    pub currency_code: String,
}

impl CurrencyFormat {
    pub fn new(locale: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            currency_code: currency_code.into().to_ascii_uppercase(),
        }
    }

    pub fn format(&self, amount: f64) -> String {
        format_currency(amount, self)
    }
}

impl From<&DisplayConfig> for CurrencyFormat {
    fn from(config: &DisplayConfig) -> Self {
        Self::new(config.locale.clone(), config.currency_code.clone())
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::new("en-US", "USD")
    }
}

/// Group the integer digits of `digits` with `separator` every three places.
fn group_digits(digits: &str, separator: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Format `amount` as a price, e.g. `$19.99` for en-US/USD or `19,99 €` for
/// de-DE/EUR. Unknown locales fall back to English conventions.
pub fn format_currency(amount: f64, format: &CurrencyFormat) -> String {
    let rules = rules_for(&format.locale).unwrap_or(EN);
    let symbol = symbol_for(&format.currency_code);
    let digits = fraction_digits(&format.currency_code);

    if !amount.is_finite() {
        return format!("{}{}", symbol, amount);
    }

    let fixed = format!("{:.*}", digits, amount.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut number = group_digits(integer, rules.group);
    if let Some(fraction) = fraction {
        number.push(rules.decimal);
        number.push_str(fraction);
    }

    let negative = amount < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };

    match rules.placement {
        SymbolPlacement::Prefix => format!("{}{}{}", sign, symbol, number),
        SymbolPlacement::PrefixSpaced => format!("{}{}{}{}", symbol, NBSP, sign, number),
        SymbolPlacement::Suffix => format!("{}{}{}{}", sign, number, NBSP, symbol),
    }
}

/// Tax contained in a tax-inclusive `price` at `rate_percent`.
pub fn included_tax(price: f64, rate_percent: f64) -> f64 {
    price * rate_percent / (100.0 + rate_percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_en_us_dollars() {
        let usd = CurrencyFormat::default();
        assert_eq!(format_currency(19.99, &usd), "$19.99");
        assert_eq!(format_currency(0.0, &usd), "$0.00");
        assert_eq!(format_currency(1234567.5, &usd), "$1,234,567.50");
        assert_eq!(format_currency(-5.0, &usd), "-$5.00");
    }

    #[test]
    fn test_european_locales() {
        let de = CurrencyFormat::new("de-DE", "EUR");
        assert_eq!(format_currency(19.99, &de), "19,99\u{a0}€");
        assert_eq!(format_currency(1234.5, &de), "1.234,50\u{a0}€");

        let fr = CurrencyFormat::new("fr-FR", "EUR");
        assert_eq!(format_currency(1234.5, &fr), "1\u{202f}234,50\u{a0}€");

        let nl = CurrencyFormat::new("nl-NL", "EUR");
        assert_eq!(format_currency(19.99, &nl), "€\u{a0}19,99");
        assert_eq!(format_currency(-19.99, &nl), "€\u{a0}-19,99");
    }

    #[test]
    fn test_pounds_and_yen() {
        assert_eq!(format_currency(19.99, &CurrencyFormat::new("en-GB", "GBP")), "£19.99");
        assert_eq!(format_currency(1999.6, &CurrencyFormat::new("en-US", "jpy")), "¥2,000");
    }

    #[test]
    fn test_unknown_locale_and_currency_fall_back() {
        let format = CurrencyFormat::new("xx-YY", "CHF");
        assert_eq!(format_currency(10.0, &format), "CHF10.00");
    }

    #[test]
    fn test_rounding_to_zero_drops_sign() {
        assert_eq!(format_currency(-0.001, &CurrencyFormat::default()), "$0.00");
    }

    #[test]
    fn test_included_tax() {
        assert!((included_tax(120.0, 20.0) - 20.0).abs() < 1e-9);
        assert!((included_tax(19.99, 20.0) - 3.331_666).abs() < 1e-5);
        assert_eq!(included_tax(50.0, 0.0), 0.0);
    }
}
