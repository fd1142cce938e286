//! HTML rendering of a [`DashboardView`].

use std::fmt::Write;

use crate::core::DayRange;
use crate::dashboard::DashboardView;

pub const PAGE_TITLE: &str = "Snow Chart";

const VEGA_SCRIPTS: [&str; 3] = [
    "https://cdn.jsdelivr.net/npm/vega@5",
    "https://cdn.jsdelivr.net/npm/vega-lite@5",
    "https://cdn.jsdelivr.net/npm/vega-embed@6",
];

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;max-width:none}\
table{border-collapse:collapse;margin:1rem 0}\
th,td{border:1px solid #ddd;padding:.3rem .6rem;text-align:left}\
th{background:#f4f4f4}\
.info{background:#e8f1fb;padding:.8rem;border-radius:4px}\
.error{background:#fdecea;padding:.8rem;border-radius:4px;white-space:pre-wrap}\
.trace{color:#555;list-style:none;padding:0}\
#chart{width:100%}";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn selector(out: &mut String, selection: &str) {
    out.push_str("<form method=\"get\" action=\"/\">\n<label for=\"days\">Date Range (days):</label>\n");
    out.push_str("<select id=\"days\" name=\"days\" onchange=\"this.form.submit()\">\n");

    let options = std::iter::once(String::new()).chain(DayRange::ALL.iter().map(|r| r.to_string()));
    for value in options {
        let selected = if value == selection { " selected" } else { "" };
        let _ = writeln!(
            out,
            "<option value=\"{v}\"{selected}>{v}</option>",
            v = escape_html(&value),
            selected = selected
        );
    }
    out.push_str("</select>\n</form>\n");
}

/// Render the whole page for one view
pub fn render_page(view: &DashboardView) -> String {
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", PAGE_TITLE);
    let _ = writeln!(out, "<style>{}</style>", STYLE);
    for src in VEGA_SCRIPTS {
        let _ = writeln!(out, "<script src=\"{}\"></script>", src);
    }
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", PAGE_TITLE);

    selector(&mut out, &view.selection);

    if let Some(prompt) = &view.prompt {
        let _ = writeln!(out, "<p class=\"info\">&#128070; {}</p>", escape_html(prompt));
    }

    if !view.trace.is_empty() {
        out.push_str("<ul class=\"trace\">\n");
        for line in &view.trace {
            let _ = writeln!(out, "<li>{}</li>", escape_html(line));
        }
        out.push_str("</ul>\n");
    }

    if let Some(error) = &view.error {
        let _ = writeln!(out, "<div class=\"error\">{}</div>", escape_html(error));
    }

    if let Some(table) = &view.table {
        out.push_str("<table>\n<thead><tr>");
        for header in &table.headers {
            let _ = write!(out, "<th>{}</th>", escape_html(header));
        }
        out.push_str("</tr></thead>\n<tbody>\n");
        for row in &table.rows {
            out.push_str("<tr>");
            for cell in row {
                let _ = write!(out, "<td>{}</td>", escape_html(cell));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
    }

    if let Some(chart) = &view.chart {
        match chart.to_json_string() {
            Ok(spec) => {
                out.push_str("<div id=\"chart\"></div>\n<script>\n");
                // Keep "</script>" inside string data from closing the block
                let _ = writeln!(
                    out,
                    "vegaEmbed('#chart', {}, {{actions: false}});",
                    spec.replace("</", "<\\/")
                );
                out.push_str("</script>\n");
            }
            Err(e) => tracing::warn!("Failed to serialize chart: {}", e),
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}
