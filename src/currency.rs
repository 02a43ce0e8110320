//! Money formatting with an explicit currency code and locale.

use color_eyre::eyre::eyre;
use color_eyre::Result;

pub const DEFAULT_CURRENCY: &str = "AUD";
pub const DEFAULT_LOCALE: &str = "es_CO";

/// Number and symbol conventions of a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LocaleFormat {
    name: &'static str,
    group: char,
    decimal: char,
    /// Symbol before the number ("$1.00") or after it ("1,00 €").
    symbol_first: bool,
    /// Space between symbol and number.
    spaced: bool,
    /// Currency that uses the bare local symbol in this locale.
    home_currency: &'static str,
}

const LOCALES: [LocaleFormat; 6] = [
    LocaleFormat {
        name: "es_CO",
        group: '.',
        decimal: ',',
        symbol_first: true,
        spaced: true,
        home_currency: "COP",
    },
    LocaleFormat {
        name: "en_US",
        group: ',',
        decimal: '.',
        symbol_first: true,
        spaced: false,
        home_currency: "USD",
    },
    LocaleFormat {
        name: "en_AU",
        group: ',',
        decimal: '.',
        symbol_first: true,
        spaced: false,
        home_currency: "AUD",
    },
    LocaleFormat {
        name: "pt_BR",
        group: '.',
        decimal: ',',
        symbol_first: true,
        spaced: true,
        home_currency: "BRL",
    },
    LocaleFormat {
        name: "id_ID",
        group: '.',
        decimal: ',',
        symbol_first: true,
        spaced: false,
        home_currency: "IDR",
    },
    LocaleFormat {
        name: "de_DE",
        group: '.',
        decimal: ',',
        symbol_first: false,
        spaced: true,
        home_currency: "EUR",
    },
];

/// Names of the supported locales.
pub fn supported_locales() -> impl Iterator<Item = &'static str> {
    LOCALES.iter().map(|l| l.name)
}

fn lookup_locale(name: &str) -> Option<LocaleFormat> {
    let normalized = name.replace('-', "_");
    LOCALES
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(&normalized))
        .copied()
}

/// Symbol for `code` as written in `locale`.
fn currency_symbol(code: &str, locale: &LocaleFormat) -> String {
    let home = code == locale.home_currency;
    let english = locale.name.starts_with("en");
    match code {
        "USD" if home => "$".to_string(),
        "USD" if english => "US$".to_string(),
        "USD" => "US$".to_string(),
        "AUD" if home => "$".to_string(),
        "AUD" if english => "A$".to_string(),
        "AUD" => "AU$".to_string(),
        "COP" if home => "$".to_string(),
        "BRL" => "R$".to_string(),
        "IDR" if home => "Rp".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" if english => "¥".to_string(),
        _ => code.to_string(),
    }
}

/// Formats amounts for one configured currency and locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormatter {
    code: String,
    symbol: String,
    locale: LocaleFormat,
}

impl CurrencyFormatter {
    pub fn new(code: &str, locale: &str) -> Result<Self> {
        let code = code.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(eyre!(
                "Invalid currency code '{}': expected three letters, e.g. AUD",
                code
            ));
        }
        let locale_format = lookup_locale(locale).ok_or_else(|| {
            eyre!(
                "Unsupported locale '{}'. Supported: {}",
                locale,
                supported_locales().collect::<Vec<_>>().join(", ")
            )
        })?;
        let symbol = currency_symbol(&code, &locale_format);
        Ok(Self {
            code,
            symbol,
            locale: locale_format,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn locale(&self) -> &str {
        self.locale.name
    }

    /// Two decimals, locale separators and symbol; "N/A" for NaN or infinity.
    pub fn format(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return "N/A".to_string();
        }
        let number = self.format_number(amount.abs());
        let sep = if self.locale.spaced { " " } else { "" };
        let body = if self.locale.symbol_first {
            format!("{}{}{}", self.symbol, sep, number)
        } else {
            format!("{}{}{}", number, sep, self.symbol)
        };
        // Rounds to zero at two decimals: no sign.
        if amount < 0.0 && (amount.abs() * 100.0).round() > 0.0 {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// Grouped number with two decimals, no symbol.
    pub fn format_number(&self, amount: f64) -> String {
        let fixed = format!("{:.2}", amount);
        let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
        let digits: Vec<char> = int_part.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 3);
        for (i, ch) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(self.locale.group);
            }
            grouped.push(*ch);
        }
        grouped.push(self.locale.decimal);
        grouped.push_str(frac_part);
        grouped
    }
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        let locale = LOCALES[0];
        Self {
            code: DEFAULT_CURRENCY.to_string(),
            symbol: currency_symbol(DEFAULT_CURRENCY, &locale),
            locale,
        }
    }
}
