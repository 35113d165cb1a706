use colored::Colorize;
use std::fmt;

use crate::{currency::Currency, ledger::TransactionState};

/// Message categories used by the shell output helpers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
}

fn apply_style(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    match kind {
        MessageKind::Info => text,
        MessageKind::Success => format!("[ok] {text}").bright_green().to_string(),
        MessageKind::Warning => format!("[!] {text}").bright_yellow().to_string(),
        MessageKind::Error => format!("[x] {text}").bright_red().to_string(),
        MessageKind::Section => format!("=== {} ===", text.trim()).bold().to_string(),
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = apply_style(kind, message);
    match kind {
        MessageKind::Section => println!("\n{}", formatted),
        _ => println!("{}", formatted),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Colors `text` by the sign of the amount it describes.
pub fn paint(text: &str, state: TransactionState) -> String {
    match state {
        TransactionState::Positive => text.green().to_string(),
        TransactionState::Negative => text.red().to_string(),
        TransactionState::Neutral => text.bright_black().to_string(),
    }
}

/// Renders `amount` as `-AR$1,234.50`.
pub fn format_money(amount: f64, currency: Currency) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}{}", sign, currency.symbol(), format_number(amount.abs(), 2))
}

/// Renders `amount` with an explicit sign and no currency symbol.
pub fn format_signed(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "+" };
    format!("{}{}", sign, format_number(amount.abs(), 2))
}

pub fn format_number(value: f64, precision: usize) -> String {
    let body = format!("{:.*}", precision, value);
    let (int_part, frac_part) = match body.find('.') {
        Some(pos) => body.split_at(pos),
        None => (body.as_str(), ""),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int_part),
    };
    format!("{}{}{}", sign, group_digits(digits, ','), frac_part)
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}
