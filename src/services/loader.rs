use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{RawCreditsRow, RawMovieRow},
};

/// Loads the raw movies table from a CSV file
pub fn load_movies(path: &Path) -> AppResult<Vec<RawMovieRow>> {
    let rows = read_table(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Movies table loaded");
    Ok(rows)
}

/// Loads the raw credits table from a CSV file
pub fn load_credits(path: &Path) -> AppResult<Vec<RawCreditsRow>> {
    let rows = read_table(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Credits table loaded");
    Ok(rows)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    let bytes = std::fs::read(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read table");
        e
    })?;
    parse_table(&decode_text(bytes))
}

/// Parses CSV text with a header row. Unknown columns are ignored and
/// empty cells become `None`.
pub fn parse_table<T: DeserializeOwned>(text: &str) -> AppResult<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.map_err(AppError::from)?);
    }
    Ok(rows)
}

/// Decodes file contents as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps each byte to the code point of the same value, so the
/// fallback never fails.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Table is not valid UTF-8, decoding as Latin-1");
            e.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movies_ignores_extra_columns() {
        let csv = "budget,genres,id,keywords,original_language,overview,title\n\
                   237000000,\"[{\"\"id\"\": 28, \"\"name\"\": \"\"Action\"\"}]\",19995,[],en,A marine on Pandora,Avatar\n";

        let rows: Vec<RawMovieRow> = parse_table(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.as_deref(), Some("19995"));
        assert_eq!(rows[0].title.as_deref(), Some("Avatar"));
        assert_eq!(
            rows[0].genres.as_deref(),
            Some(r#"[{"id": 28, "name": "Action"}]"#)
        );
    }

    #[test]
    fn test_parse_empty_cells_are_none() {
        let csv = "id,title,overview,genres,keywords,original_language\n5,Alpha,,[],[],en\n";
        let rows: Vec<RawMovieRow> = parse_table(csv).unwrap();
        assert_eq!(rows[0].overview, None);
        assert_eq!(rows[0].genres.as_deref(), Some("[]"));
    }

    #[test]
    fn test_parse_credits() {
        let csv = "movie_id,title,cast,crew\n19995,Avatar,[],[]\n,Broken,[],[]\n";
        let rows: Vec<RawCreditsRow> = parse_table(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].movie_id.as_deref(), Some("19995"));
        assert_eq!(rows[1].movie_id, None);
    }

    #[test]
    fn test_decode_text_latin1_fallback() {
        // "Amélie" in Latin-1
        let bytes = vec![0x41, 0x6d, 0xe9, 0x6c, 0x69, 0x65];
        assert_eq!(decode_text(bytes), "Amélie");
    }

    #[test]
    fn test_decode_text_utf8() {
        assert_eq!(decode_text("Amélie".as_bytes().to_vec()), "Amélie");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = load_movies(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
