//! Signal tables for the heuristic firewall.
//!
//! Each table is an ordered list of `(label, pattern)` pairs. Labels are
//! what ends up in decision reasons and reports, so keep them short.
//! All patterns are case-insensitive unless noted.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // WEALTH MANAGER SIGNALS (stage 1, reject)
    // =========================================================================

    /// Language of firms that manage *other people's* money for a fee.
    pub static ref WEALTH_MANAGER_SIGNALS: Vec<(&'static str, Regex)> = vec![
        ("wealth management", Regex::new(r"(?i)\bwealth\s+management\b").unwrap()),
        ("financial planning", Regex::new(r"(?i)\bfinancial\s+planning\b").unwrap()),
        ("financial advisor", Regex::new(r"(?i)\bfinancial\s+advis[oe]rs?\b").unwrap()),
        ("wealth advisor", Regex::new(r"(?i)\bwealth\s+advis[oe]rs?\b").unwrap()),
        ("our clients", Regex::new(r"(?i)\bour\s+clients\b").unwrap()),
        ("RIA", Regex::new(r"(?i)\bRIA\b").unwrap()),
        ("registered investment adviser", Regex::new(r"(?i)\bregistered\s+investment\s+advis[oe]r").unwrap()),
        ("fiduciary", Regex::new(r"(?i)\bfiduciary\b").unwrap()),
        ("become a client", Regex::new(r"(?i)\bbecome\s+a\s+client\b").unwrap()),
        ("schedule a consultation", Regex::new(r"(?i)\b(?:schedule|book)\s+a\s+(?:free\s+)?consultation\b").unwrap()),
        ("retirement planning", Regex::new(r"(?i)\bretirement\s+planning\b").unwrap()),
        ("client portal", Regex::new(r"(?i)\bclient\s+(?:portal|login)\b").unwrap()),
    ];

    // =========================================================================
    // INVESTMENT FUND SIGNALS (stage 2, reject unless family capital)
    // =========================================================================

    /// Pooled vehicles and managers raising outside capital.
    pub static ref INVESTMENT_FUND_SIGNALS: Vec<(&'static str, Regex)> = vec![
        ("mutual fund", Regex::new(r"(?i)\bmutual\s+funds?\b").unwrap()),
        ("ETF", Regex::new(r"(?i)\bETFs?\b").unwrap()),
        ("exchange-traded fund", Regex::new(r"(?i)\bexchange[\s-]traded\s+funds?\b").unwrap()),
        ("asset management company", Regex::new(r"(?i)\basset\s+management\s+(?:company|firm)\b").unwrap()),
        ("hedge fund", Regex::new(r"(?i)\bhedge\s+funds?\b").unwrap()),
        ("index fund", Regex::new(r"(?i)\bindex\s+funds?\b").unwrap()),
        ("venture capital fund", Regex::new(r"(?i)\bventure\s+capital\s+funds?\b").unwrap()),
        ("limited partners", Regex::new(r"(?i)\bour\s+limited\s+partners\b").unwrap()),
        // Roman numerals stay case-sensitive so "fund is" never matches.
        ("numbered fund", Regex::new(r"\b[Ff]und\s+(?:I|II|III|IV|V|VI|VII|VIII|IX|X)\b").unwrap()),
    ];

    /// A fund-like vehicle owned by a family is not rejected at stage 2.
    pub static ref FAMILY_CAPITAL_OVERRIDE: Regex = Regex::new(r"(?i)family\s+capital").unwrap();

    // =========================================================================
    // FAMILY OFFICE SIGNALS (stage 3, pass)
    // =========================================================================

    /// Evidence of a family deploying its own capital.
    pub static ref FAMILY_OFFICE_SIGNALS: Vec<(&'static str, Regex)> = vec![
        ("family office", Regex::new(r"(?i)\bfamily\s+offices?\b").unwrap()),
        ("single-family office", Regex::new(r"(?i)\bsingle[\s-]family\s+offices?\b").unwrap()),
        ("multi-family office", Regex::new(r"(?i)\bmulti[\s-]family\s+offices?\b").unwrap()),
        ("proprietary capital", Regex::new(r"(?i)\bproprietary\s+capital\b").unwrap()),
        ("principal investments", Regex::new(r"(?i)\bprincipal\s+investments?\b").unwrap()),
        ("family capital", Regex::new(r"(?i)\bfamily\s+capital\b").unwrap()),
        ("own capital", Regex::new(r"(?i)\b(?:our|its|their)\s+own\s+capital\b").unwrap()),
        ("family holding company", Regex::new(r"(?i)\bfamily\s+holding\s+compan(?:y|ies)\b").unwrap()),
        ("private investment office", Regex::new(r"(?i)\bprivate\s+investment\s+office\b").unwrap()),
        ("multi-generational", Regex::new(r"(?i)\bmulti[\s-]?generational\b").unwrap()),
        ("patient capital", Regex::new(r"(?i)\bpatient\s+capital\b").unwrap()),
        ("evergreen capital", Regex::new(r"(?i)\bevergreen\s+(?:capital|investments?)\b").unwrap()),
    ];
}

/// Labels of every pattern in `table` that matches `content`, in table order.
pub fn matching_signals(
    table: &[(&'static str, Regex)],
    content: &str,
) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(_, regex)| regex.is_match(content))
        .map(|(label, _)| *label)
        .collect()
}

/// First matching label in `table`, if any.
pub fn first_signal(table: &[(&'static str, Regex)], content: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, regex)| regex.is_match(content))
        .map(|(label, _)| *label)
}

/// Check if content mentions family capital.
pub fn mentions_family_capital(content: &str) -> bool {
    FAMILY_CAPITAL_OVERRIDE.is_match(content)
}
