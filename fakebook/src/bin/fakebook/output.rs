use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table, presets};
use serde::Serialize;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// One line per item
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table or a compact line.
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// One row of a listing.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;

    fn compact(&self) -> String {
        self.cells().join("  ")
    }
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay + ?Sized,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => println!("{}", data.to_table(&self.options)),
            OutputFormat::Compact => println!("{}", data.to_compact()),
        }
        Ok(())
    }

    /// Human-facing messages are suppressed in JSON mode so stdout stays parseable.
    fn chatty(&self) -> bool {
        !self.options.quiet && self.options.output_format != OutputFormat::Json
    }

    pub fn success(&self, message: &str) {
        if self.chatty() {
            if self.options.no_color {
                println!("{} {message}", ICONS.success);
            } else {
                println!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success));
            }
        }
    }

    pub fn error(&self, message: &str) {
        if self.options.no_color {
            eprintln!("{} {message}", ICONS.error);
        } else {
            eprintln!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error));
        }
    }

    pub fn warning(&self, message: &str) {
        if self.chatty() {
            if self.options.no_color {
                println!("{} {message}", ICONS.warning);
            } else {
                println!("{} {}", ICONS.warning.color(THEME.warning), message.color(THEME.warning));
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.chatty() {
            if self.options.no_color {
                println!("{} {message}", ICONS.info);
            } else {
                println!("{} {}", ICONS.info.color(THEME.info), message.color(THEME.info));
            }
        }
    }

    /// Only shown with `--verbose`.
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            if self.options.no_color {
                eprintln!("{} {message}", ICONS.arrow);
            } else {
                eprintln!("{} {}", ICONS.arrow.color(THEME.muted), message.color(THEME.muted));
            }
        }
    }

    pub fn heading(&self, text: &str) {
        if self.chatty() {
            if self.options.no_color {
                println!("\n{text}\n{}", "=".repeat(text.chars().count()));
            } else {
                println!("\n{}", text.color(THEME.primary).bold());
            }
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if self.chatty() {
            if self.options.no_color {
                println!("{key}: {value}");
            } else {
                println!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value));
            }
        }
    }

    pub fn bullet(&self, text: &str) {
        if self.chatty() {
            if self.options.no_color {
                println!("  {} {text}", ICONS.bullet);
            } else {
                println!("  {} {text}", ICONS.bullet.color(THEME.muted));
            }
        }
    }
}

/// Table with the preset and header styling shared by every listing.
pub fn themed_table(options: &GlobalOptions, headers: &[&str]) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(presets::ASCII_FULL);
    } else {
        table.load_preset(presets::UTF8_FULL_CONDENSED);
    }

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect();
    table.set_header(header_cells);
    table
}

impl<T: TableRow> TableDisplay for Vec<T> {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = themed_table(options, T::HEADERS);
        if self.is_empty() {
            table.add_row(vec![Cell::new("No items found")]);
            return table;
        }
        for item in self {
            table.add_row(item.cells());
        }
        table
    }

    fn to_compact(&self) -> String {
        self.iter().map(TableRow::compact).collect::<Vec<_>>().join("\n")
    }
}
