//! CSV downloads for the dashboards.
//!
//! Rows are any `Serialize` struct; field names (or their serde renames)
//! become the header line. Values are quoted and escaped per RFC 4180.

use axum::{
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug)]
pub struct CsvExport {
    pub filename: String,
    pub body: Vec<u8>,
}

impl CsvExport {
    /// Builds the download, or `AppError::NoData` for an empty collection so
    /// that nothing is written.
    pub fn from_rows<T: Serialize>(filename: &str, rows: &[T]) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::NoData);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let body = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("failed to flush csv: {}", e)))?;

        Ok(Self {
            filename: filename.to_string(),
            body,
        })
    }
}

impl IntoResponse for CsvExport {
    fn into_response(self) -> Response {
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            self.filename.replace('"', "")
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

        (
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/csv; charset=utf-8"),
                ),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Zugewiesen_an")]
        assigned_to: String,
        #[serde(rename = "Datum")]
        date: Option<String>,
    }

    #[test]
    fn empty_collection_signals_no_data() {
        let rows: Vec<Row> = Vec::new();
        assert!(matches!(
            CsvExport::from_rows("leer.csv", &rows),
            Err(AppError::NoData)
        ));
    }

    #[test]
    fn header_comes_from_field_names() {
        let rows = vec![Row {
            assigned_to: "9a".into(),
            date: None,
        }];
        let export = CsvExport::from_rows("zuweisungen.csv", &rows).unwrap();
        let text = String::from_utf8(export.body).unwrap();
        assert_eq!(text, "Zugewiesen_an,Datum\n9a,\n");
    }

    #[test]
    fn embedded_quotes_and_newlines_are_escaped() {
        let rows = vec![Row {
            assigned_to: "Frau \"M\" Müller\nKlasse 7".into(),
            date: Some("2025-01-01".into()),
        }];
        let export = CsvExport::from_rows("x.csv", &rows).unwrap();
        let text = String::from_utf8(export.body).unwrap();
        assert_eq!(
            text,
            "Zugewiesen_an,Datum\n\"Frau \"\"M\"\" Müller\nKlasse 7\",2025-01-01\n"
        );

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], "Frau \"M\" Müller\nKlasse 7");
    }

    #[test]
    fn response_is_an_attachment() {
        let export = CsvExport {
            filename: "admin-nutzer.csv".into(),
            body: b"EMail\n".to_vec(),
        };
        let response = export.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"admin-nutzer.csv\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
    }
}
