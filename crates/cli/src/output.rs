//! Output formatting for the CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain `key: value` lines
    Plain,
}

/// Items that can be rendered as a table row
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table<T: TableDisplay>(rows: impl IntoIterator<Item = Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(T::headers());
    for row in rows {
        table.add_row(row);
    }
    table
}

fn print_serialized<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> bool {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => return false,
    };
    match rendered {
        Ok(text) => println!("{}", text),
        Err(e) => print_error(&format!("Could not serialize output: {}", e)),
    }
    true
}

fn print_plain<T: TableDisplay>(item: &T) {
    for (header, value) in T::headers().iter().zip(item.row()) {
        println!("{}: {}", header, value);
    }
}

/// Print a single item
pub fn print_item<T: Serialize + TableDisplay>(item: &T, format: OutputFormat) {
    if print_serialized(item, format) {
        return;
    }
    match format {
        OutputFormat::Plain => print_plain(item),
        _ => println!("{}", table::<T>([item.row()])),
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if print_serialized(items, format) {
        return;
    }
    if items.is_empty() {
        println!("No items found.");
        return;
    }
    match format {
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                print_plain(item);
            }
        }
        _ => println!("{}", table::<T>(items.iter().map(TableDisplay::row))),
    }
}

/// Print a heading line
pub fn print_header(title: &str) {
    println!("{}", "━".repeat(60).dimmed());
    println!(" {}", title.bold());
    println!("{}", "━".repeat(60).dimmed());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".cyan(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: String,
        present: bool,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name", "Present"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.clone(), self.present.to_string()]
        }
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let rows = [
            Row { name: "ADMIN_EMAIL".into(), present: true },
            Row { name: "ADMIN_PASSWORD".into(), present: false },
        ];
        let rendered = table::<Row>(rows.iter().map(TableDisplay::row)).to_string();
        assert!(rendered.contains("Present"));
        assert!(rendered.contains("ADMIN_PASSWORD"));
        assert!(rendered.contains("false"));
    }

    #[test]
    fn test_table_format_is_not_serialized() {
        let row = Row { name: "x".into(), present: true };
        assert!(!print_serialized(&row, OutputFormat::Table));
        assert!(!print_serialized(&row, OutputFormat::Plain));
        assert!(print_serialized(&row, OutputFormat::Json));
    }
}
