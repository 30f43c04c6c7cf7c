use csv::Writer;

use crate::aggregation::FilteredView;
use crate::errors::ExportResult;

/// Derived columns appended after the raw ones
pub const DERIVED_HEADERS: [&str; 8] = [
    "Nature",
    "Périmètre",
    "DateTime",
    "Heure_Jour",
    "Jour_Semaine_Num",
    "Jour_Semaine_Nom",
    "Date_Seule",
    "Sous_Categorie",
];

/// Writes the records of `view` with their raw cells, minus the nature and
/// perimeter source columns which are replaced by their cleaned values.
pub fn render(view: &FilteredView) -> ExportResult<String> {
    let dataset = view.dataset();
    let consumed = [dataset.resolved.nature, dataset.resolved.perimeter];
    let raw_columns: Vec<usize> = (0..dataset.columns.len())
        .filter(|idx| !consumed.contains(&Some(*idx)))
        .collect();

    let mut wtr = Writer::from_writer(vec![]);

    let mut header: Vec<&str> = raw_columns
        .iter()
        .map(|idx| dataset.columns[*idx].as_str())
        .collect();
    header.extend(DERIVED_HEADERS);
    wtr.write_record(&header)?;

    for record in view.records() {
        let mut row: Vec<String> = raw_columns
            .iter()
            .map(|idx| record.values[*idx].to_text())
            .collect();
        row.extend([
            record.nature.clone(),
            record.perimeter.clone(),
            record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.hour.to_string(),
            record.weekday_index.to_string(),
            record.weekday_name.to_string(),
            record.date.format("%Y-%m-%d").to_string(),
            record.subcategory.label().to_string(),
        ]);
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner()?;
    let csv_string = String::from_utf8(data)?;

    Ok(csv_string)
}
