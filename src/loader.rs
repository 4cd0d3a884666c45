use crate::errors::{AppError, AppResult};
use crate::models::{TextEncoding, Table};
use csv::ReaderBuilder;
use encoding_rs::{EUC_KR, UTF_8};
use std::borrow::Cow;
use std::fs;
use std::path::Path;

/// Attempt order for capture exports. BOM-aware UTF-8 must precede CP949.
pub const ENCODING_PRIORITY: [TextEncoding; 3] = [TextEncoding::Utf8Sig, TextEncoding::Cp949, TextEncoding::Utf8];

pub fn load_table(path: &Path) -> AppResult<Table> {
    let bytes = fs::read(path)
        .map_err(|error| AppError::Io(format!("{}: {}", path.to_string_lossy(), error)))?;
    decode_table(&bytes).map_err(|error| match error {
        AppError::Decode(detail) => AppError::Decode(format!("{}: {}", path.to_string_lossy(), detail)),
        other => other,
    })
}

pub fn decode_table(bytes: &[u8]) -> AppResult<Table> {
    for encoding in ENCODING_PRIORITY {
        if let Some(text) = decode_as(bytes, encoding) {
            tracing::trace!(encoding = encoding.as_str(), "decoded capture");
            return parse_csv(&text, encoding);
        }
    }

    let text = std::str::from_utf8(bytes).map_err(|error| {
        AppError::Decode(format!("no configured encoding could decode the file: {}", error))
    })?;
    parse_csv(text, TextEncoding::PlatformDefault)
}

fn decode_as(bytes: &[u8], encoding: TextEncoding) -> Option<Cow<'_, str>> {
    match encoding {
        TextEncoding::Utf8Sig => {
            let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
            (!had_errors).then_some(text)
        }
        TextEncoding::Cp949 => EUC_KR.decode_without_bom_handling_and_without_replacement(bytes),
        TextEncoding::Utf8 => UTF_8.decode_without_bom_handling_and_without_replacement(bytes),
        TextEncoding::PlatformDefault => std::str::from_utf8(bytes).ok().map(Cow::Borrowed),
    }
}

fn parse_csv(text: &str, encoding: TextEncoding) -> AppResult<Table> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(ToString::to_string).collect::<Vec<_>>());
    }

    Ok(Table {
        headers,
        rows,
        encoding,
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_table, load_table};
    use crate::models::TextEncoding;

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("TMSSR,Potential\nEliciting,High\n".as_bytes());
        let table = decode_table(&bytes).expect("decodes");
        assert_eq!(table.encoding, TextEncoding::Utf8Sig);
        assert_eq!(table.headers, vec!["TMSSR", "Potential"]);
        assert_eq!(table.cell(0, 0), Some("Eliciting"));
    }

    #[test]
    fn falls_back_to_cp949_for_legacy_exports() {
        let (bytes, _, unmappable) = encoding_rs::EUC_KR.encode("사용자,TMSSR\n문지원,Responding\n");
        assert!(!unmappable);
        let table = decode_table(&bytes).expect("decodes");
        assert_eq!(table.encoding, TextEncoding::Cp949);
        assert_eq!(table.headers[0], "사용자");
        assert_eq!(table.cell(0, 0), Some("문지원"));
    }

    #[test]
    fn keeps_ragged_rows() {
        let table = decode_table(b"a,b,c\n1\n1,2,3,4\n\n5,6\n").expect("decodes");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["1"]);
        assert_eq!(table.rows[1].len(), 4);
        assert_eq!(table.cell(2, 2), None);
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        // 0xFF is invalid in UTF-8 and is not a CP949 lead byte.
        let error = decode_table(&[b'a', b',', 0xFF, 0xFF, b'\n']).expect_err("must fail");
        assert!(error.to_string().starts_with("DECODE_FAILURE"));
    }

    #[test]
    fn missing_file_is_io_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load_table(&dir.path().join("absent.csv")).expect_err("must fail");
        assert!(error.to_string().starts_with("IO_FAILURE"));
    }
}
