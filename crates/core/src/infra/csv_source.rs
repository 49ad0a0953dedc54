use std::path::Path;

use crate::domain::error::AppError;

/// ヘッダー付き CSV をメモリに読み込んだもの
#[derive(Debug, Clone)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl CsvTable {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Err(AppError::validation(format!(
                "CSV file not found: {}",
                path.display()
            )));
        }
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| AppError::csv(format!("{} を開けません: {e}", path.display())))?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, AppError> {
        let headers = reader
            .headers()
            .map_err(|e| AppError::csv(format!("CSV ヘッダーの読み込みに失敗: {e}")))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::csv(format!("CSV 行の読み込みに失敗: {e}")))?;
        log::debug!("CSV 読み込み: {} 行", rows.len());
        Ok(Self { headers, rows })
    }

    /// データ行数（ヘッダーを除く）
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// セル値（前後トリム）。列・セルがなければ空文字。
    pub fn value(&self, row: usize, column: Option<usize>) -> &str {
        column
            .and_then(|c| self.rows.get(row).and_then(|r| r.get(c)))
            .map(str::trim)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(data: &str) -> CsvTable {
        CsvTable::from_reader(
            csv::ReaderBuilder::new()
                .flexible(true)
                .from_reader(data.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_values_by_header() {
        let t = table("Email address,Country\nluca.rossi@x.it, Italy \n");
        assert_eq!(t.len(), 1);
        let email = t.column("Email address");
        let country = t.column("Country");
        assert_eq!(t.value(0, email), "luca.rossi@x.it");
        assert_eq!(t.value(0, country), "Italy");
    }

    #[test]
    fn test_missing_column_and_short_rows() {
        let t = table("Email address,Country\nonly@x.it\n");
        assert_eq!(t.value(0, t.column("Country")), "");
        assert_eq!(t.value(0, t.column("Nope")), "");
        assert_eq!(t.value(5, t.column("Email address")), "");
    }

    #[test]
    fn test_bom_stripped_from_header() {
        let t = table("\u{feff}Lead Email,Lead Country\na@b.c,France\n");
        assert_eq!(t.column("Lead Email"), Some(0));
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let err = CsvTable::open(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.code, crate::domain::error::ErrorCode::Validation);
    }
}
