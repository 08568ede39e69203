//! Fixed-width plain-text layout of a receipt, as printed on a till slip.

use rust_decimal::Decimal;
use time::{OffsetDateTime, UtcOffset};

use crate::receipts::repo_types::Receipt;

const TOTAL_LABEL: &str = "Загальна сума";
const CHANGE_LABEL: &str = "Решта";

pub fn render_text(receipt: &Receipt, merchant: &str, line_width: usize) -> String {
    let price_width = (line_width / 4).clamp(8, 10);
    let label_width = line_width - price_width - 1;
    let row = |label: &str, amount: Decimal| {
        format!(
            "{:<label_width$} {:>price_width$}",
            truncate(label, label_width),
            format_amount(amount)
        )
    };

    let mut lines = Vec::with_capacity(receipt.items.len() * 2 + 8);
    lines.push(center(merchant, line_width));
    lines.push("=".repeat(line_width));

    for item in &receipt.items {
        lines.push(format!("{} x {}", item.quantity, format_amount(item.price)));
        lines.push(row(&item.name, item.total));
    }

    lines.push("-".repeat(line_width));
    lines.push(row(TOTAL_LABEL, receipt.total_cost));
    lines.push(row(receipt.payment_type.display_label(), receipt.payment_amount));
    lines.push(row(CHANGE_LABEL, receipt.rest()));

    lines.push("=".repeat(line_width));
    lines.push(center(&slip_timestamp(receipt.created_at), line_width));

    lines.join("\n")
}

/// `DD.MM.YYYY HH:MM` in UTC.
fn slip_timestamp(at: OffsetDateTime) -> String {
    let at = at.to_offset(UtcOffset::UTC);
    format!(
        "{:02}.{:02}.{:04} {:02}:{:02}",
        at.day(),
        u8::from(at.month()),
        at.year(),
        at.hour(),
        at.minute()
    )
}

/// Cuts to `width` characters, ending in `...` when anything was dropped.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Pads both sides; an odd remainder goes to the right unless the width is odd too.
fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = width - len;
    let left = pad / 2 + (pad & width & 1);
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(pad - left))
}

/// Two decimals (half-even) with `,` thousands separators.
fn format_amount(value: Decimal) -> String {
    let mut v = value.round_dp(2);
    v.rescale(2);
    let s = v.abs().to_string();
    let (int_part, frac) = s.split_once('.').unwrap_or((&s, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v.is_sign_negative() && !v.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}
