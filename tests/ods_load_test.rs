use signalement::classifier::{ClassifierConfig, KeywordClassifier};
use signalement::pipeline::LoadPipeline;
use signalement::record::Subcategory;
use signalement::schema::ColumnAliases;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
 <manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.spreadsheet"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;

fn string_cell(value: &str) -> String {
    format!(
        r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#,
        value
    )
}

fn date_cell(iso: &str, shown: &str) -> String {
    format!(
        r#"<table:table-cell office:value-type="date" office:date-value="{}"><text:p>{}</text:p></table:table-cell>"#,
        iso, shown
    )
}

fn time_cell(duration: &str, shown: &str) -> String {
    format!(
        r#"<table:table-cell office:value-type="time" office:time-value="{}"><text:p>{}</text:p></table:table-cell>"#,
        duration, shown
    )
}

fn row(cells: &[String]) -> String {
    format!("<table:table-row>{}</table:table-row>", cells.concat())
}

/// Minimal single-sheet ODS document
fn ods(rows: &[String]) -> Vec<u8> {
    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2">
<office:body><office:spreadsheet><table:table table:name="Signalements">{}</table:table></office:spreadsheet></office:body>
</office:document-content>"#,
        rows.concat()
    );

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut cursor);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file("mimetype", stored).unwrap();
        writer.write_all(MIMETYPE.as_bytes()).unwrap();
        writer.start_file("META-INF/manifest.xml", deflated).unwrap();
        writer.write_all(MANIFEST.as_bytes()).unwrap();
        writer.start_file("content.xml", deflated).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

fn pipeline() -> LoadPipeline {
    let classifier = KeywordClassifier::new(&ClassifierConfig::default()).unwrap();
    LoadPipeline::new(ColumnAliases::default(), classifier).with_diagnostic_log(None)
}

#[test]
fn test_ods_with_native_date_and_time_cells() {
    let header = ["Date", "Heure", "Nature", "Message"].map(string_cell);
    let rows = vec![
        row(&header),
        row(&[
            date_cell("2024-01-05", "05/01/2024"),
            time_cell("PT08H15M00S", "08:15:00"),
            string_cell("Sécurité"),
            string_cell("Un individu a frappé un voyageur"),
        ]),
        row(&[
            date_cell("2024-01-06", "06/01/2024"),
            time_cell("PT19H40M00S", "19:40:00"),
            string_cell("Propreté"),
            string_cell("tag sur la vitre"),
        ]),
    ];

    let outcome = pipeline().load("signalements.ods", &ods(&rows), 0).unwrap();
    let records = &outcome.dataset.records;
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].weekday_name, "Friday");
    assert_eq!(records[0].hour, 8);
    assert_eq!(
        records[0].subcategory,
        Subcategory::Classified("Agression / Violence".to_string())
    );
    assert_eq!(records[1].hour, 19);
    assert_eq!(records[1].subcategory, Subcategory::NotConcerned);
}

#[test]
fn test_ods_skips_banner_rows() {
    let rows = vec![
        row(&[string_cell("Export des signalements")]),
        row(&[string_cell("Réseau urbain")]),
        row(&["Date", "Heure"].map(string_cell)),
        row(&[
            date_cell("2024-01-07", "07/01/2024"),
            time_cell("PT23H05M00S", "23:05:00"),
        ]),
    ];

    let outcome = pipeline().load("SIGNALEMENTS.ODS", &ods(&rows), 2).unwrap();
    let record = &outcome.dataset.records[0];
    assert_eq!(record.weekday_name, "Sunday");
    assert_eq!(record.hour, 23);
    assert_eq!(record.nature, "Non défini");
}
