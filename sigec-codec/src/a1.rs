//! A1 notation for the spreadsheet transport.

/// Column letters for a 1-based position (`1 → A`, `27 → AA`).
///
/// Returns `None` for position 0.
pub fn column_letter(position: usize) -> Option<String> {
    if position == 0 {
        return None;
    }
    let mut letters = Vec::new();
    let mut n = position;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    Some(letters.into_iter().rev().collect())
}

/// Range covering columns `1..=width` of one row, e.g. `Clientes!A5:CN5`.
///
/// Sheet names with characters outside `[A-Za-z0-9_]` are quoted.
pub fn row_range(sheet: &str, row: usize, width: usize) -> Option<String> {
    if row == 0 {
        return None;
    }
    let last = column_letter(width)?;
    Some(format!("{}!A{row}:{last}{row}", quote_sheet(sheet)))
}

fn quote_sheet(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn letters() {
        assert_eq!(column_letter(1).as_deref(), Some("A"));
        assert_eq!(column_letter(26).as_deref(), Some("Z"));
        assert_eq!(column_letter(27).as_deref(), Some("AA"));
        assert_eq!(column_letter(92).as_deref(), Some("CN"));
        assert_eq!(column_letter(104).as_deref(), Some("CZ"));
        assert_eq!(column_letter(703).as_deref(), Some("AAA"));
        assert_eq!(column_letter(0), None);
    }

    #[test]
    fn full_width_row_range() {
        assert_eq!(
            row_range("Clientes", 5, 92).as_deref(),
            Some("Clientes!A5:CN5")
        );
        assert_eq!(
            row_range("Base de Clientes", 2, 3).as_deref(),
            Some("'Base de Clientes'!A2:C2")
        );
        assert_eq!(row_range("Clientes", 0, 3), None);
        assert_eq!(row_range("Clientes", 1, 0), None);
    }
}
