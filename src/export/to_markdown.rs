use serde_json::json;

use crate::aggregation::Report;
use crate::errors::ExportResult;
use crate::plan::Meta;

pub fn render(report: &Report, meta: Option<&Meta>) -> ExportResult<String> {
    let handlebars = crate::common::get_handlebars();
    let res = handlebars.render_template(
        &get_template(),
        &json!({
            "report": report,
            "meta": meta,
        }),
    )?;
    Ok(res)
}

pub fn get_template() -> String {
    let template = r##"# {{#if (exists meta.name)}}{{meta.name}}{{else}}Signalements{{/if}}

Période : {{report.range.start}} → {{report.range.end}}

| Indicateur | Valeur |
|---|---|
| Signalements | {{report.total}} |
| Nature principale | {{#if (exists report.dominant_nature)}}{{report.dominant_nature}}{{else}}-{{/if}} |
| Périmètre principal | {{#if (exists report.dominant_perimeter)}}{{report.dominant_perimeter}}{{else}}-{{/if}} |

## Natures

| Nature | Signalements | Part |
|---|---|---|
{{#each report.top_natures as |c|}}
| {{c.label}} | {{c.count}} | {{percent c.count @root.report.total}} |
{{/each}}

## Périmètres

| Périmètre | Signalements |
|---|---|
{{#each report.perimeters as |c|}}
| {{c.label}} | {{c.count}} |
{{/each}}

## Nature × Périmètre

| Nature | Périmètre | Signalements |
|---|---|---|
{{#each report.nature_perimeter as |c|}}
| {{c.nature}} | {{c.perimeter}} | {{c.count}} |
{{/each}}

## Sous-catégories sécurité

{{#if (is_empty report.subcategories)}}
Aucun signalement de sécurité classé sur la période.
{{else}}
| Sous-catégorie | Signalements | Part |
|---|---|---|
{{#each report.subcategories as |c|}}
| {{c.label}} | {{c.count}} | {{percent c.count @root.report.classified_total}} |
{{/each}}
{{/if}}

## Par jour

| Date | Signalements |
|---|---|
{{#each report.daily as |d|}}
| {{d.date}} | {{d.count}} |
{{/each}}

## Par jour de la semaine

| Jour | Signalements |
|---|---|
{{#each report.weekdays as |d|}}
| {{d.name}} | {{d.count}} |
{{/each}}

## Par heure

| Heure | Signalements |
|---|---|
{{#each report.hours as |h|}}
| {{h.hour}} | {{h.count}} |
{{/each}}
"##;
    template.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{Count, DateRange, DailyCount, HourlyCount, WeekdayCount};
    use chrono::NaiveDate;

    fn report() -> Report {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        Report {
            range: DateRange::single_day(day),
            total: 4,
            dominant_nature: Some("Sécurité".to_string()),
            dominant_perimeter: Some("Gare Nord".to_string()),
            top_natures: vec![
                Count { label: "Sécurité".to_string(), count: 3 },
                Count { label: "Propreté".to_string(), count: 1 },
            ],
            perimeters: vec![Count { label: "Gare Nord".to_string(), count: 2 }],
            nature_perimeter: vec![],
            classified_total: 3,
            subcategories: vec![Count { label: "Agression / Violence".to_string(), count: 3 }],
            daily: vec![DailyCount { date: day, count: 4 }],
            weekdays: vec![WeekdayCount { index: 4, name: "Friday", count: 4 }],
            hours: vec![HourlyCount { hour: 8, count: 4 }],
        }
    }

    #[test]
    fn test_markdown_report() {
        let meta = Meta { name: Some("Ligne A".to_string()) };
        let output = render(&report(), Some(&meta)).unwrap();
        assert!(output.starts_with("# Ligne A\n"));
        assert!(output.contains("| Signalements | 4 |"));
        assert!(output.contains("| Sécurité | 3 | 75.0% |"));
        assert!(output.contains("| Agression / Violence | 3 | 100.0% |"));
        assert!(output.contains("| Friday | 4 |"));
        assert!(output.contains("| 2024-01-05 | 4 |"));
    }

    #[test]
    fn test_markdown_without_meta_or_classified_records() {
        let mut report = report();
        report.subcategories.clear();
        report.classified_total = 0;
        let output = render(&report, None).unwrap();
        assert!(output.starts_with("# Signalements\n"));
        assert!(output.contains("Aucun signalement de sécurité classé"));
    }
}
