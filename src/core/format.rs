const CURRENCY_SYMBOL: &str = "$";
const CURRENCY_SUFFIX: &str = "MN";

/// Two decimals, comma thousands separators, currency suffix: `$3,350.00 MN`.
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{amount:.2}");
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, cents) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    format!(
        "{CURRENCY_SYMBOL}{sign}{}.{cents} {CURRENCY_SUFFIX}",
        group_thousands(whole)
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_duration(months: u32) -> String {
    if months > 12 {
        format!("{} years and {} months", months / 12, months % 12)
    } else {
        format!("{months} months")
    }
}

pub fn describe_projection(contribution: f64, months: u32, total: f64) -> String {
    format!(
        "If you had invested {} {} ago, contributing the same amount every month, \
         the total with earnings would be {}",
        format_money(contribution),
        format_duration(months),
        format_money(total)
    )
}
