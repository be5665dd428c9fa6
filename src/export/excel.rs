use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use scraper::{Html, Selector};
use tracing::{info, warn};

use super::{output_path, ExportError};
use crate::parser::frontmatter;
use crate::render::markdown;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());
static HEADER_CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());

const MAX_COLUMN_WIDTH: usize = 50;
const HEADER_FILL: u32 = 0x366092;

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<String>,
    /// Row holds at least one `th`.
    pub is_header: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    pub rows: Vec<TableRow>,
}

impl TableGrid {
    /// Longest cell text (in chars) plus two, capped at 50, per column.
    pub fn column_widths(&self) -> Vec<usize> {
        let columns = self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        (0..columns)
            .map(|col| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|r| r.cells.get(col))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0);
                (longest + 2).min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }
}

/// Every `table` element of `html` in document order.
pub fn extract_tables(html: &str) -> Vec<TableGrid> {
    let document = Html::parse_fragment(html);
    document
        .select(&TABLE_SEL)
        .map(|table| TableGrid {
            rows: table
                .select(&ROW_SEL)
                .map(|row| TableRow {
                    cells: row.select(&CELL_SEL).map(|c| cell_text(&c)).collect(),
                    is_header: row.select(&HEADER_CELL_SEL).next().is_some(),
                })
                .collect(),
        })
        .collect()
}

fn cell_text(cell: &scraper::ElementRef) -> String {
    cell.text().map(str::trim).collect()
}

/// Sink for extracted tables.
pub trait SheetWriter {
    fn write(&self, tables: &[TableGrid], output: &Path) -> Result<(), ExportError>;
}

/// One `Table_<n>` worksheet per table, header rows bold white on blue.
pub struct XlsxSheetWriter;

impl SheetWriter for XlsxSheetWriter {
    fn write(&self, tables: &[TableGrid], output: &Path) -> Result<(), ExportError> {
        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        let mut workbook = Workbook::new();
        for (idx, table) in tables.iter().enumerate() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(format!("Table_{}", idx + 1))?;

            for (r, row) in table.rows.iter().enumerate() {
                for (c, value) in row.cells.iter().enumerate() {
                    let (r, c) = (cell_row(r)?, cell_column(c)?);
                    if row.is_header {
                        sheet.write_string_with_format(r, c, value, &header)?;
                    } else {
                        sheet.write_string(r, c, value)?;
                    }
                }
            }

            for (c, width) in table.column_widths().into_iter().enumerate() {
                sheet.set_column_width(cell_column(c)?, width as f64)?;
            }
        }
        workbook.save(output)?;
        Ok(())
    }
}

fn cell_row(r: usize) -> Result<u32, ExportError> {
    u32::try_from(r).map_err(|_| ExportError::TableTooLarge(format!("row {}", r + 1)))
}

fn cell_column(c: usize) -> Result<u16, ExportError> {
    u16::try_from(c).map_err(|_| ExportError::TableTooLarge(format!("column {}", c + 1)))
}

/// Extract the tables of `markdown_file` into a workbook. `Ok(None)` when the
/// document has no tables.
pub fn export(markdown_file: &Path, output: Option<&Path>) -> Result<Option<PathBuf>, ExportError> {
    export_with(&XlsxSheetWriter, markdown_file, output)
}

pub fn export_with(
    writer: &dyn SheetWriter,
    markdown_file: &Path,
    output: Option<&Path>,
) -> Result<Option<PathBuf>, ExportError> {
    let raw = std::fs::read_to_string(markdown_file)?;
    let (_, body) = frontmatter::extract(&raw);
    let tables = extract_tables(&markdown::to_html_tables_only(&body));

    if tables.is_empty() {
        warn!("No tables found in {}", markdown_file.display());
        return Ok(None);
    }

    let output = output_path(markdown_file, output, "xlsx");
    writer.write(&tables, &output)?;
    info!("Wrote {} tables to {}", tables.len(), output.display());
    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};

    const TWO_BY_TWO: &str = "# Costs\n\n| Item | Fee |\n|------|-----|\n| 인지대 | 5000 |\n";

    fn row(cells: &[&str], is_header: bool) -> TableRow {
        TableRow {
            cells: cells.iter().map(|s| s.to_string()).collect(),
            is_header,
        }
    }

    #[test]
    fn extracts_rows_and_header_flags() {
        let tables = extract_tables(&markdown::to_html_tables_only(TWO_BY_TWO));
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0].rows,
            vec![row(&["Item", "Fee"], true), row(&["인지대", "5000"], false)]
        );
    }

    #[test]
    fn cell_text_trimmed_and_joined() {
        let html = "<table><tr><td>  <b>a</b>  b </td></tr></table>";
        let tables = extract_tables(html);
        assert_eq!(tables[0].rows[0].cells, vec!["ab".to_string()]);
    }

    #[test]
    fn any_th_marks_header_row() {
        let html = "<table><tr><th>k</th><td>v</td></tr><tr><td>x</td><td>y</td></tr></table>";
        let tables = extract_tables(html);
        assert!(tables[0].rows[0].is_header);
        assert!(!tables[0].rows[1].is_header);
    }

    #[test]
    fn column_width_rules() {
        let long = "x".repeat(80);
        let grid = TableGrid {
            rows: vec![
                row(&["판례", "ab", ""], true),
                row(&["1", &long], false),
            ],
        };
        assert_eq!(grid.column_widths(), vec![4, 50, 2]);
    }

    #[test]
    fn fixture_tables_in_order() {
        let md = std::fs::read_to_string("tests/fixtures/report.md").unwrap();
        let (_, body) = frontmatter::extract(&md);
        let tables = extract_tables(&markdown::to_html_tables_only(&body));
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0].cells, vec!["사건번호", "쟁점"]);
        assert_eq!(tables[1].rows.len(), 4);
    }

    #[test]
    fn no_tables_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        std::fs::write(&input, "# Notes\n\nNo tables.").unwrap();
        assert!(export(&input, None).unwrap().is_none());
        assert!(!dir.path().join("notes.xlsx").exists());
    }

    #[test]
    fn writes_one_sheet_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fees.md");
        std::fs::write(&input, TWO_BY_TWO).unwrap();

        let out = export(&input, None).unwrap().unwrap();
        assert_eq!(out, dir.path().join("fees.xlsx"));

        let mut wb: Xlsx<_> = open_workbook(&out).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Table_1".to_string()]);
        let range = wb.worksheet_range("Table_1").unwrap();
        assert_eq!(range.get_size(), (2, 2));
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Item".into())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("인지대".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("5000".into())));
    }

    fn archive_entry(path: &Path, name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut xml = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    fn cell_attrs<'a>(sheet: &'a str, cell: &str) -> &'a str {
        let re = regex::Regex::new(&format!(r#"<c r="{}"([^>]*)>"#, cell)).unwrap();
        re.captures(sheet).unwrap().get(1).unwrap().as_str()
    }

    #[test]
    fn header_row_styled_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fees.md");
        std::fs::write(&input, TWO_BY_TWO).unwrap();
        let out = export(&input, None).unwrap().unwrap();

        let sheet = archive_entry(&out, "xl/worksheets/sheet1.xml");
        for cell in ["A1", "B1"] {
            let attrs = cell_attrs(&sheet, cell);
            assert!(attrs.contains(" s=\"") && !attrs.contains(" s=\"0\""), "{}: {}", cell, attrs);
        }
        for cell in ["A2", "B2"] {
            assert!(!cell_attrs(&sheet, cell).contains(" s=\""));
        }

        let styles = archive_entry(&out, "xl/styles.xml");
        assert!(styles.contains("366092"));
        assert!(styles.contains("<b/>"));
    }

    #[test]
    fn oversized_column_index_rejected() {
        assert_eq!(cell_column(3).unwrap(), 3);
        assert!(matches!(
            cell_column(usize::from(u16::MAX) + 1),
            Err(ExportError::TableTooLarge(_))
        ));
    }

    #[test]
    fn explicit_output_and_multiple_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("extract.xlsx");
        let written = export(Path::new("tests/fixtures/report.md"), Some(&out))
            .unwrap()
            .unwrap();
        assert_eq!(written, out);
        let wb: Xlsx<_> = open_workbook(&out).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Table_1".to_string(), "Table_2".to_string()]);
    }
}
