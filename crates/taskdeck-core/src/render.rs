use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::filter::Counts;
use crate::remote::Post;
use crate::task::Task;

const BODY_EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(anyhow!("invalid theme setting: {other}")),
        }
    }
}

/// Presentation context, built once at startup from config. Theme is plain
/// renderer state with a single mutator rather than process-wide state.
#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    theme: Theme,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        let theme_cfg = cfg.get("theme").unwrap_or_else(|| "light".to_string());
        let theme = Theme::parse(&theme_cfg)?;

        Ok(Self { color, theme })
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&self, tasks: &[&Task]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if tasks.is_empty() {
            writeln!(out, "No tasks to show.")?;
            return Ok(());
        }

        let headers = vec!["ID".to_string(), "Done".to_string(), "Title".to_string()];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id.to_string(), self.accent());
            let marker = if task.completed { "[x]" } else { "[ ]" };
            let title = if task.completed {
                // Dim stands in for the strike-through of the web rendition.
                self.paint(&task.title, "90")
            } else {
                task.title.clone()
            };

            rows.push(vec![id, marker.to_string(), title]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_counts(&self, counts: &Counts) {
        println!("{} / {} completed", counts.completed, counts.total);
    }

    #[tracing::instrument(skip(self, posts))]
    pub fn print_post_table(
        &self,
        posts: &[&Post],
        page: usize,
        total_pages: usize,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec!["ID".to_string(), "Title".to_string(), "Body".to_string()];

        let mut rows = Vec::with_capacity(posts.len());
        for post in posts {
            rows.push(vec![
                self.paint(&post.id.to_string(), self.accent()),
                post.title.clone(),
                excerpt(&post.body, BODY_EXCERPT_CHARS),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        writeln!(out, "Page {page} / {total_pages}")?;
        Ok(())
    }

    pub fn print_error(&self, message: &str) {
        println!("{}", self.paint(&format!("Error: {message}"), "31"));
    }

    fn accent(&self) -> &'static str {
        match self.theme {
            Theme::Light => "34",
            Theme::Dark => "36",
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Single-line body preview, capped by character count.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flattened = text.replace(['\n', '\r'], " ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let cut: String = flattened.chars().take(max_chars).collect();
    format!("{cut}...")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_comes_from_config_and_has_one_mutator() {
        let mut file = tempfile::NamedTempFile::new().expect("temp rc");
        writeln!(file, "theme = dark").expect("write");
        writeln!(file, "color = off").expect("write");
        file.flush().expect("flush");

        let cfg = Config::load(Some(file.path())).expect("load config");
        let mut renderer = Renderer::new(&cfg).expect("renderer");
        assert_eq!(renderer.theme(), Theme::Dark);

        renderer.set_theme(Theme::Light);
        assert_eq!(renderer.theme(), Theme::Light);
    }

    #[test]
    fn excerpt_caps_length_and_flattens_newlines() {
        let short = excerpt("two\nlines", 120);
        assert_eq!(short, "two lines");

        let long_body = "x".repeat(200);
        let long = excerpt(&long_body, 120);
        assert_eq!(long.chars().count(), 123);
        assert!(long.ends_with("..."));
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        let painted = "\x1b[34m42\x1b[0m";
        assert_eq!(strip_ansi(painted), "42");
    }

    #[test]
    fn table_columns_align_to_widest_cell() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["ID".to_string(), "Title".to_string()],
            vec![
                vec!["1".to_string(), "short".to_string()],
                vec!["1000".to_string(), "longer title".to_string()],
            ],
        )
        .expect("write table");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("ID   "));
        assert!(lines[2].starts_with("1    "));
        assert!(lines[3].starts_with("1000 "));
    }
}
