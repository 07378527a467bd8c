/// Independently imported product catalogue, addressed by position only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceList {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Which reference cells seed a primary product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceColumns {
    pub name: usize,
    pub old_price: usize,
    pub cny_price: usize,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            name: 0,
            old_price: 1,
            cny_price: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSeed {
    pub name: String,
    pub old_price: String,
    pub cny_price: String,
}

fn row_value(row: &[String], idx: usize) -> String {
    row.get(idx).map(|v| v.trim().to_string()).unwrap_or_default()
}

impl ReferenceList {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Rows whose first cell contains `term`, ignoring case, with their
    /// positions in `rows`.
    pub fn filter(&self, term: &str) -> Vec<(usize, &[String])> {
        let needle = term.trim().to_lowercase();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                needle.is_empty()
                    || row
                        .first()
                        .is_some_and(|cell| cell.to_lowercase().contains(&needle))
            })
            .map(|(idx, row)| (idx, row.as_slice()))
            .collect()
    }

    pub fn seed(&self, row_idx: usize, columns: ReferenceColumns) -> Option<ReferenceSeed> {
        let row = self.rows.get(row_idx)?;
        let name = row_value(row, columns.name);
        if name.is_empty() {
            return None;
        }
        Some(ReferenceSeed {
            name,
            old_price: row_value(row, columns.old_price),
            cny_price: row_value(row, columns.cny_price),
        })
    }

    /// Builds the list from a parsed sheet: first row is the header row.
    pub fn from_sheet(sheet: Vec<Vec<String>>) -> Option<Self> {
        let mut rows = sheet.into_iter();
        let headers: Vec<String> = rows.next()?.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows: Vec<Vec<String>> = rows
            .map(|row| {
                let mut cells: Vec<String> = row.into_iter().map(|c| c.trim().to_string()).collect();
                if cells.len() < width {
                    cells.resize(width, String::new());
                }
                cells
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        if rows.is_empty() {
            return None;
        }
        Some(Self { headers, rows })
    }

    pub fn to_sheet(&self) -> Vec<Vec<String>> {
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn from_sheet_trims_and_pads_rows() {
        let list = ReferenceList::from_sheet(sheet(&[
            &["Name", "RM", "CNY"],
            &[" Lotion ", "9.00"],
            &["", "", ""],
        ]))
        .expect("list should be built");

        assert_eq!(list.headers, vec!["Name", "RM", "CNY"]);
        assert_eq!(list.rows, vec![vec!["Lotion", "9.00", ""]]);
    }

    #[test]
    fn from_sheet_without_data_rows_is_none() {
        assert!(ReferenceList::from_sheet(sheet(&[&["Name"]])).is_none());
        assert!(ReferenceList::from_sheet(Vec::new()).is_none());
    }

    #[test]
    fn filter_matches_first_cell_case_insensitively() {
        let list = ReferenceList {
            headers: vec!["Name".into()],
            rows: sheet(&[&["Rose Oil"], &["Clay Mask"], &["rosehip"]]),
        };
        let hits = list.filter("ROSE");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].0, 2);
        assert_eq!(list.filter("").len(), 3);
    }

    #[test]
    fn seed_reads_configured_positions() {
        let list = ReferenceList {
            headers: vec!["Code".into(), "Name".into(), "CNY".into(), "RM".into()],
            rows: sheet(&[&["A1", "Rose Oil", "30.00", "17.00"]]),
        };
        let seed = list
            .seed(
                0,
                ReferenceColumns {
                    name: 1,
                    old_price: 3,
                    cny_price: 2,
                },
            )
            .expect("seed should be found");
        assert_eq!(seed.name, "Rose Oil");
        assert_eq!(seed.old_price, "17.00");
        assert_eq!(seed.cny_price, "30.00");
        assert!(list.seed(5, ReferenceColumns::default()).is_none());
    }
}
