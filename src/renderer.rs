// src/renderer.rs

use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::error::RenderError;
use crate::model::{FileSort, KeywordSort, SkippedFile};
use crate::stats::EssenceStats;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use tracing::info;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

#[derive(Debug, Serialize)]
struct KeywordColumn<'a> {
    name: &'a str,
    total_usages: usize,
    avg_usages: f64,
    min_usages: Option<usize>,
    max_usages: Option<usize>,
    n_files: usize,
}

#[derive(Debug, Serialize)]
struct Cell {
    uses: usize,
    colour: String,
}

#[derive(Debug, Serialize)]
struct FileRow<'a> {
    path: String,
    repo: &'a str,
    n_lines: usize,
    cells: Vec<Cell>,
}

#[derive(Debug, Serialize)]
struct HtmlReport<'a> {
    timestamp: String,
    conjure_release: Option<&'a str>,
    n_files: usize,
    n_keywords: usize,
    keywords: Vec<KeywordColumn<'a>>,
    rows: Vec<FileRow<'a>>,
    skipped: &'a [SkippedFile],
}

/// Render the heat-map table: the top keywords (by `report.keyword_sort`) as
/// columns and files with the most lines first as rows.
pub fn render_html(stats: &EssenceStats, report: &ReportConfig) -> Result<String, RenderError> {
    let all_keywords = stats.essence_keywords(Some(report.keyword_sort), true);
    let all_files = stats.essence_files(Some(FileSort::MostLines), true);

    let keywords: Vec<_> = all_keywords.iter().take(report.max_n_keywords).copied().collect();
    let files = all_files.iter().take(report.max_n_display_files.unwrap_or(usize::MAX));

    let view = HtmlReport {
        timestamp: chrono::Local::now().format("%d.%m.%Y - %H:%M").to_string(),
        conjure_release: stats.oracle_version().and_then(|v| v.release.as_deref()),
        n_files: all_files.len(),
        n_keywords: all_keywords.len(),
        keywords: keywords
            .iter()
            .map(|k| KeywordColumn {
                name: k.name(),
                total_usages: k.total_usages(),
                avg_usages: k.average_usage().unwrap_or(0.0),
                min_usages: k.min_usages(),
                max_usages: k.max_usages(),
                n_files: k.num_files_using_keyword(),
            })
            .collect(),
        rows: files
            .map(|f| FileRow {
                path: f.str_path(report.path_depth),
                repo: f.repo_name().unwrap_or(""),
                n_lines: f.n_lines(),
                cells: keywords
                    .iter()
                    .map(|k| {
                        let uses = k.usages_in_file(f);
                        Cell { uses, colour: k.get_colour(uses).as_hex() }
                    })
                    .collect(),
            })
            .collect(),
        skipped: stats.skipped(),
    };

    let mut tera = Tera::default();
    tera.add_raw_template("index.html", INDEX_TEMPLATE)?;
    Ok(tera.render("index.html", &Context::from_serialize(&view)?)?)
}

/// Table rows: a header of `EssenceFile, LOC, Repo` and the most used keywords,
/// then one row per file (fewest lines first) with its uses of each keyword.
pub fn make_table_data(stats: &EssenceStats, path_depth: usize, max_n_keywords: usize) -> Vec<Vec<String>> {
    let keywords: Vec<_> = stats
        .essence_keywords(Some(KeywordSort::MostUsed), true)
        .into_iter()
        .take(max_n_keywords)
        .collect();

    let mut header = vec!["EssenceFile".to_string(), "LOC".to_string(), "Repo".to_string()];
    header.extend(keywords.iter().map(|k| k.name().to_string()));

    let mut rows = vec![header];
    for file in stats.essence_files(Some(FileSort::MostLines), false) {
        let mut row = vec![
            file.str_path(path_depth),
            file.n_lines().to_string(),
            file.repo_name().unwrap_or("").to_string(),
        ];
        row.extend(keywords.iter().map(|k| file.uses(k.name()).to_string()));
        rows.push(row);
    }
    rows
}

/// Join `fields` into one delimited line, quoting fields that need it.
pub fn csv_line(fields: &[String], delimiter: char) -> String {
    let mut line = fields
        .iter()
        .map(|field| {
            if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(&delimiter.to_string());
    line.push('\n');
    line
}

pub fn render_csv(stats: &EssenceStats, report: &ReportConfig, delimiter: char) -> String {
    make_table_data(stats, report.path_depth, report.max_n_keywords)
        .iter()
        .map(|row| csv_line(row, delimiter))
        .collect()
}

pub fn render_json(stats: &EssenceStats, report: &ReportConfig) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(&stats.as_json(report.path_depth))?)
}

/// Render in the configured format and write to `report.output`.
pub fn write_report(stats: &EssenceStats, report: &ReportConfig) -> Result<(), RenderError> {
    let output = &report.output;
    if output.exists() && !output.is_file() {
        return Err(RenderError::NotAFile(output.clone()));
    }

    let content = match report.format {
        OutputFormat::Html => render_html(stats, report)?,
        OutputFormat::Csv => render_csv(stats, report, ','),
        OutputFormat::Json => render_json(stats, report)?,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, content)?;
    info!(output = %display_path(output), format = ?report.format, "report written");
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf()).display().to_string()
}
