//! Turns chat text into a [`TradeSignal`].
//!
//! Expected shape (line order after the header is free, labels are case-insensitive):
//!
//! ```text
//! 🟢 LONG SIGNAL - SOLUSDT
//! Entry: 87.50000
//! TP: 88.37500 (+1.0%)
//! SL: 87.06250 (-0.5%)
//! Leverage: 3x
//! Margin: $5
//! ```

use std::str::FromStr;

use common::models::{Direction, SignalError, TradeSignal};
use rust_decimal::Decimal;

const LONG_GLYPH: char = '🟢';
const SHORT_GLYPH: char = '🔴';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Signal(TradeSignal),
    /// Ordinary chat traffic, or a message missing part of the template.
    NotASignal,
    /// Has the full template but the values contradict each other.
    Malformed { symbol: String, reason: SignalError },
}

enum Header {
    Found(Direction, String),
    Ambiguous,
    Absent,
}

pub fn extract_signal(text: &str) -> Extraction {
    let lines: Vec<&str> = text.lines().collect();

    let mut found: Option<(usize, Direction, String)> = None;
    for (idx, line) in lines.iter().enumerate() {
        match parse_header(line) {
            Header::Found(direction, symbol) => match &found {
                None => found = Some((idx, direction, symbol)),
                Some((_, first, _)) if *first != direction => return Extraction::NotASignal,
                Some(_) => {}
            },
            Header::Ambiguous => return Extraction::NotASignal,
            Header::Absent => {}
        }
    }

    let Some((header_idx, direction, symbol)) = found else {
        return Extraction::NotASignal;
    };
    let body = &lines[header_idx + 1..];

    let fields = (
        decimal_field(body, "Entry"),
        decimal_field(body, "TP"),
        decimal_field(body, "SL"),
        leverage_field(body),
        decimal_field(body, "Margin"),
    );
    let (Some(entry), Some(tp), Some(sl), Some(leverage), Some(margin)) = fields else {
        return Extraction::NotASignal;
    };

    match TradeSignal::new(direction, symbol.clone(), entry, tp, sl, leverage, margin) {
        Ok(signal) => Extraction::Signal(signal),
        Err(reason) => Extraction::Malformed { symbol, reason },
    }
}

fn parse_header(line: &str) -> Header {
    let normalized = line.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();

    let long = normalized.find("LONG SIGNAL");
    let short = normalized.find("SHORT SIGNAL");

    let (direction, keyword_end) = match (long, short) {
        (Some(_), Some(_)) => return Header::Ambiguous,
        (Some(pos), None) => (Direction::Long, pos + "LONG SIGNAL".len()),
        (None, Some(pos)) => (Direction::Short, pos + "SHORT SIGNAL".len()),
        (None, None) => return Header::Absent,
    };

    let contradicting_glyph = match direction {
        Direction::Long => SHORT_GLYPH,
        Direction::Short => LONG_GLYPH,
    };
    if normalized.contains(contradicting_glyph) {
        return Header::Ambiguous;
    }

    let rest = normalized[keyword_end..].trim_start();
    let Some(rest) = rest.strip_prefix(['-', '–', ':']) else {
        return Header::Absent;
    };

    let symbol: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();

    if symbol.chars().any(|c| c.is_ascii_alphabetic()) {
        Header::Found(direction, symbol)
    } else {
        Header::Absent
    }
}

/// Returns the raw text after `Label:` on the first line carrying that label.
fn labeled_value<'a>(lines: &[&'a str], label: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let trimmed = line.trim_start_matches(|c: char| !c.is_alphanumeric());
        let head = trimmed.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        trimmed[label.len()..].trim_start().strip_prefix(':')
    })
}

/// Strips currency signs, parenthetical annotations and trailing unit words.
fn numeric_token(raw: &str) -> &str {
    let value = raw.trim().trim_start_matches('$').trim_start();
    let end = value
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(value.len());
    value[..end].trim_end_matches('$')
}

fn decimal_field(lines: &[&str], label: &str) -> Option<Decimal> {
    let raw = labeled_value(lines, label)?;
    Decimal::from_str(numeric_token(raw)).ok()
}

fn leverage_field(lines: &[&str]) -> Option<u32> {
    let raw = labeled_value(lines, "Leverage")?;
    numeric_token(raw)
        .trim_end_matches(['x', 'X'])
        .parse::<u32>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SOL_LONG: &str = "🟢 LONG SIGNAL - SOLUSDT\nEntry: 87.50000\nTP: 88.37500\nSL: 87.06250\nLeverage: 3x\nMargin: $5";

    fn signal(text: &str) -> TradeSignal {
        match extract_signal(text) {
            Extraction::Signal(s) => s,
            other => panic!("expected a signal, got {:?}", other),
        }
    }

    #[test]
    fn parses_reference_long_message() {
        let s = signal(SOL_LONG);

        assert_eq!(s.direction, Direction::Long);
        assert_eq!(s.symbol, "SOLUSDT");
        assert_eq!(s.entry_price, dec!(87.5));
        assert_eq!(s.take_profit_price, dec!(88.375));
        assert_eq!(s.stop_loss_price, dec!(87.0625));
        assert_eq!(s.leverage, 3);
        assert_eq!(s.margin_usd, dec!(5));
    }

    #[test]
    fn parses_short_with_annotations_and_shuffled_lines() {
        let text = "🔴 short signal - btcusdt\n\
                    💰 Margin: 12.5$\n\
                    🎯 TP: 61000 (-1.6%)\n\
                    Leverage: 10X\n\
                    🛑 SL: 62500.5 (+0.8%)\n\
                    📍 Entry: 62000";
        let s = signal(text);

        assert_eq!(s.direction, Direction::Short);
        assert_eq!(s.symbol, "BTCUSDT");
        assert_eq!(s.entry_price, dec!(62000));
        assert_eq!(s.take_profit_price, dec!(61000));
        assert_eq!(s.stop_loss_price, dec!(62500.5));
        assert_eq!(s.leverage, 10);
        assert_eq!(s.margin_usd, dec!(12.5));
    }

    #[test]
    fn allows_space_after_dollar_and_unit_suffix() {
        let text = SOL_LONG.replace("Margin: $5", "Margin: $ 5 USDT");
        assert_eq!(signal(&text).margin_usd, dec!(5));
    }

    #[test]
    fn chat_noise_is_not_a_signal() {
        assert_eq!(extract_signal(""), Extraction::NotASignal);
        assert_eq!(extract_signal("gm everyone, SOL looking strong"), Extraction::NotASignal);
        assert_eq!(
            extract_signal("Entry: 1\nTP: 2\nSL: 0.5\nLeverage: 2x\nMargin: $1"),
            Extraction::NotASignal
        );
    }

    #[test]
    fn each_missing_field_is_not_a_signal() {
        for label in ["Entry:", "TP:", "SL:", "Leverage:", "Margin:"] {
            let text: String = SOL_LONG
                .lines()
                .filter(|l| !l.starts_with(label))
                .collect::<Vec<_>>()
                .join("\n");
            assert_eq!(extract_signal(&text), Extraction::NotASignal, "without {}", label);
        }
    }

    #[test]
    fn non_numeric_value_is_not_a_signal() {
        let text = SOL_LONG.replace("TP: 88.37500", "TP: soon");
        assert_eq!(extract_signal(&text), Extraction::NotASignal);

        let text = SOL_LONG.replace("Leverage: 3x", "Leverage: 2.5x");
        assert_eq!(extract_signal(&text), Extraction::NotASignal);
    }

    #[test]
    fn both_directions_is_ambiguous() {
        let text = format!("{}\n🔴 SHORT SIGNAL - SOLUSDT", SOL_LONG);
        assert_eq!(extract_signal(&text), Extraction::NotASignal);

        let text = SOL_LONG.replace("🟢", "🔴");
        assert_eq!(extract_signal(&text), Extraction::NotASignal);
    }

    #[test]
    fn fields_before_header_are_ignored() {
        let text = "Entry: 87.5\nTP: 88.375\nSL: 87.0625\nLeverage: 3x\nMargin: $5\n🟢 LONG SIGNAL - SOLUSDT";
        assert_eq!(extract_signal(text), Extraction::NotASignal);
    }

    #[test]
    fn similar_labels_do_not_match() {
        let text = SOL_LONG.replace("TP: 88.37500", "TP1: 88.37500");
        assert_eq!(extract_signal(&text), Extraction::NotASignal);
    }

    #[test]
    fn inverted_prices_are_malformed() {
        let text = SOL_LONG.replace("TP: 88.37500", "TP: 86.00000");
        match extract_signal(&text) {
            Extraction::Malformed { symbol, reason } => {
                assert_eq!(symbol, "SOLUSDT");
                assert!(matches!(reason, SignalError::TakeProfitWrongSide { .. }));
            }
            other => panic!("expected malformed, got {:?}", other),
        }

        let text = SOL_LONG.replace("Leverage: 3x", "Leverage: 200x");
        assert!(matches!(
            extract_signal(&text),
            Extraction::Malformed {
                reason: SignalError::LeverageOutOfRange(200),
                ..
            }
        ));
    }

    #[test]
    fn every_extracted_signal_respects_price_ordering() {
        let prices = ["90", "100", "110"];
        for direction in ["🟢 LONG", "🔴 SHORT"] {
            for tp in prices {
                for sl in prices {
                    let text = format!(
                        "{} SIGNAL - ETHUSDT\nEntry: 100\nTP: {}\nSL: {}\nLeverage: 5x\nMargin: $10",
                        direction, tp, sl
                    );
                    if let Extraction::Signal(s) = extract_signal(&text) {
                        match s.direction {
                            Direction::Long => {
                                assert!(s.take_profit_price > s.entry_price);
                                assert!(s.entry_price > s.stop_loss_price);
                            }
                            Direction::Short => {
                                assert!(s.take_profit_price < s.entry_price);
                                assert!(s.entry_price < s.stop_loss_price);
                            }
                        }
                    }
                }
            }
        }
    }
}
