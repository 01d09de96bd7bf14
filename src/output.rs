//! Terminal rendering of query views, index runs and the store report

use crate::index::build::BuildReport;
use crate::index::info::StoreReport;
use crate::index::oracle::OracleCoverage;
use crate::index::types::{RootRecord, is_sentinel};
use crate::query::Resolved;
use crate::utils::format::{format_size, format_system_time, format_timestamp};
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Color choice for stdout
pub fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Open stdout with the given color preference
pub fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(color_choice(color))
}

/// Print a resolved view: one line per label, optionally followed by its entries
pub fn print_view<W: WriteColor>(out: &mut W, resolved: &Resolved, long: bool) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    write!(out, "{}", resolved.query)?;
    out.reset()?;
    if !resolved.is_exact() {
        write!(out, " (indexed under {})", resolved.root)?;
    }
    writeln!(out)?;

    if resolved.view.is_empty() {
        writeln!(out, "  no indexed entries")?;
        return Ok(());
    }

    print_record(out, &resolved.view, long)
}

/// Print a record's label summary table
pub fn print_record<W: WriteColor>(out: &mut W, record: &RootRecord, long: bool) -> io::Result<()> {
    let width = record.labels().map(str::len).max().unwrap_or(0);

    for row in record.summary() {
        let color = if is_sentinel(&row.label) {
            Color::Yellow
        } else {
            Color::Cyan
        };
        write!(out, "  ")?;
        out.set_color(ColorSpec::new().set_fg(Some(color)))?;
        write!(out, "{:width$}", row.label, width = width)?;
        out.reset()?;
        write!(out, "  {:>8} ", row.count)?;
        if is_sentinel(&row.label) {
            writeln!(out)?;
        } else {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            writeln!(out, "{:>12}", format_size(row.total_size))?;
            out.reset()?;
        }

        if long {
            for entry in record.get(&row.label).unwrap_or_default() {
                writeln!(out, "    {:>12}  {}", entry.size, entry.path)?;
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct JsonView<'a> {
    query: &'a str,
    root: &'a str,
    backoff_steps: usize,
    labels: &'a RootRecord,
}

/// Print views as one JSON document keyed by query path
pub fn print_views_json<W: Write>(out: &mut W, views: &[Resolved]) -> io::Result<()> {
    let docs: Vec<JsonView<'_>> = views
        .iter()
        .map(|r| JsonView {
            query: &r.query,
            root: &r.root,
            backoff_steps: r.backoff_steps,
            labels: &r.view,
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &docs)?;
    writeln!(out)
}

/// Print the outcome of one index run
pub fn print_build_report<W: WriteColor>(out: &mut W, report: &BuildReport) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    write!(out, "{}", report.root)?;
    out.reset()?;

    if !report.persisted {
        writeln!(out, ": nothing indexed")?;
        return Ok(());
    }

    writeln!(
        out,
        ": {} entries, {} labels ({} below threshold, {} unreadable){}",
        report.record.entry_count(),
        report.record.label_count(),
        report.unwanted,
        report.unreadable,
        if report.replaced { ", replaced previous" } else { "" }
    )
}

/// Print the store report and, when available, the oracle's own coverage
pub fn print_info<W: WriteColor>(
    out: &mut W,
    report: &StoreReport,
    coverage: Result<&[OracleCoverage], &str>,
) -> io::Result<()> {
    writeln!(out, "Index Store")?;
    writeln!(out, "===========")?;
    writeln!(out)?;
    writeln!(out, "Location:         {}", report.path.display())?;

    match &report.metadata {
        Some(meta) => {
            writeln!(out, "Modified:         {}", format_system_time(meta.modified))?;
            writeln!(out, "Size:             {}", format_size(meta.size))?;
        }
        None => writeln!(out, "Modified:         never written")?,
    }
    if let Some(saved_at) = report.saved_at {
        writeln!(out, "Saved at:         {}", format_timestamp(saved_at))?;
    }

    writeln!(out)?;
    writeln!(out, "Indexed roots:    {}", report.roots.len())?;
    for root in &report.roots {
        write!(out, "  ")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", root.root)?;
        out.reset()?;
        writeln!(
            out,
            "  {} entries, {} labels, {}",
            root.entries,
            root.labels,
            format_size(root.total_size)
        )?;
    }

    writeln!(out)?;
    match coverage {
        Ok(rows) => {
            writeln!(out, "Oracle coverage:  {}", rows.len())?;
            for row in rows {
                writeln!(
                    out,
                    "  {}  {} {}  {} files, {} dirs, {}",
                    row.path, row.date, row.time, row.files, row.dirs, row.size
                )?;
            }
        }
        Err(reason) => writeln!(out, "Oracle coverage:  unavailable ({})", reason)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::IndexEntry;
    use termcolor::Buffer;

    fn resolved() -> Resolved {
        let mut view = RootRecord::new();
        view.push("text/plain", IndexEntry::new("/data/sub/a.txt", 2048));
        view.push("Dir", IndexEntry::new("/data/sub/x", 0));
        Resolved {
            query: "/data/sub".into(),
            root: "/data".into(),
            backoff_steps: 1,
            view,
        }
    }

    fn render(f: impl FnOnce(&mut Buffer) -> io::Result<()>) -> String {
        let mut buf = Buffer::no_color();
        f(&mut buf).unwrap();
        String::from_utf8(buf.into_inner()).unwrap()
    }

    #[test]
    fn test_print_view_summary() {
        let text = render(|b| print_view(b, &resolved(), false));
        assert!(text.starts_with("/data/sub (indexed under /data)\n"));
        assert!(text.contains("text/plain"));
        assert!(text.contains("2.00 KB"));
        assert!(!text.contains("/data/sub/a.txt"));
    }

    #[test]
    fn test_print_view_long_lists_entries() {
        let text = render(|b| print_view(b, &resolved(), true));
        assert!(text.contains("/data/sub/a.txt"));
        assert!(text.contains("/data/sub/x"));
    }

    #[test]
    fn test_print_views_json() {
        let mut out = Vec::new();
        print_views_json(&mut out, &[resolved()]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value[0]["root"], "/data");
        assert_eq!(value[0]["labels"]["text/plain"][0]["size"], 2048);
    }
}
