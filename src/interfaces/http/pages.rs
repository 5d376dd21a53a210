//! HTML pages for the browser.
//!
//! Handlers only hand view models to a [`PageRenderer`]; [`HtmlRenderer`] is
//! the built-in one and keeps the markup deliberately plain.

use actix_web::http::header::ACCEPT;
use actix_web::HttpRequest;
use std::fmt::Write;

use crate::application::IndexView;
use crate::domain::estimate::{Estimate, EstimateColumn, GeneralConstruction};
use crate::domain::filter::{
    FormFields, FIELD_CATEGORY, FIELD_GEOGRAPHY, FIELD_INDICATOR, FIELD_YEAR,
};

pub const NO_INDICATORS_MESSAGE: &str = "No indicators match the current selection.";

pub trait PageRenderer: Send + Sync {
    /// Options the user already chose in `form` are marked as selected.
    fn index(&self, view: &IndexView, form: &FormFields) -> String;
    fn login(&self) -> String;
    /// `form` is echoed back so the page can offer the same selection as CSV.
    fn results(&self, rows: &[Estimate], form: &FormFields) -> String;
    fn no_indicators(&self) -> String;
    fn about_data(&self, decisions: &[GeneralConstruction]) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for HtmlRenderer {
    fn index(&self, view: &IndexView, form: &FormFields) -> String {
        let mut body = String::new();
        body.push_str("<form method=\"post\" action=\"/\">\n");
        push_select(&mut body, FIELD_CATEGORY, &view.indicator_category, form);
        push_select(&mut body, FIELD_GEOGRAPHY, &view.geography, form);
        push_select(&mut body, FIELD_INDICATOR, &view.indicators, form);
        push_select(&mut body, FIELD_YEAR, &view.years, form);

        let disabled = if view.go_disabled { " disabled" } else { "" };
        body.push_str("<button type=\"submit\">Update</button>\n");
        let _ = writeln!(
            body,
            "<button type=\"submit\" formaction=\"/results\"{}>Go</button>",
            disabled
        );
        let _ = writeln!(
            body,
            "<button type=\"submit\" formaction=\"/get-csv\"{}>Download CSV</button>",
            disabled
        );
        body.push_str("</form>\n");

        layout("Indicator estimates", &body)
    }

    fn login(&self) -> String {
        layout("Login", "<p>Sign-in is not available for this site.</p>\n")
    }

    fn results(&self, rows: &[Estimate], form: &FormFields) -> String {
        let columns = EstimateColumn::exported();
        let mut body = String::new();

        let _ = writeln!(body, "<p>{} estimates</p>", rows.len());
        body.push_str("<table>\n<thead><tr>");
        for column in columns {
            let _ = write!(body, "<th>{}</th>", escape_html(column.name()));
        }
        body.push_str("</tr></thead>\n<tbody>\n");
        for row in rows {
            body.push_str("<tr>");
            for value in row.text_values(columns) {
                let _ = write!(body, "<td>{}</td>", escape_html(&value));
            }
            body.push_str("</tr>\n");
        }
        body.push_str("</tbody>\n</table>\n");

        body.push_str("<form method=\"post\" action=\"/get-csv\">\n");
        for (name, value) in form.pairs() {
            let _ = writeln!(
                body,
                "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
                escape_html(name),
                escape_html(value)
            );
        }
        body.push_str("<button type=\"submit\">Download CSV</button>\n</form>\n");

        layout("Results", &body)
    }

    fn no_indicators(&self) -> String {
        let body = format!(
            "<p>{}</p>\n<p><a href=\"/\">Back to the filters</a></p>\n",
            NO_INDICATORS_MESSAGE
        );
        layout("No indicators", &body)
    }

    fn about_data(&self, decisions: &[GeneralConstruction]) -> String {
        let mut body = String::from("<dl>\n");
        for decision in decisions {
            let _ = writeln!(body, "<dt>{}</dt>", escape_html(&decision.topic));
            let _ = writeln!(body, "<dd>{}</dd>", escape_html(&decision.decision));
            if let Some(rationale) = &decision.rationale {
                let _ = writeln!(body, "<dd><em>{}</em></dd>", escape_html(rationale));
            }
        }
        body.push_str("</dl>\n");

        layout("About the data", &body)
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n<html>\n",
            "<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n",
            "<nav><a href=\"/\">Home</a> | <a href=\"/about-data/\">About the data</a> | ",
            "<a href=\"/login\">Login</a></nav>\n",
            "<h1>{title}</h1>\n{body}</body>\n</html>\n"
        ),
        title = escape_html(title),
        body = body
    )
}

fn push_select(out: &mut String, name: &str, options: &[String], form: &FormFields) {
    let (label, multiple) = match name {
        FIELD_CATEGORY => ("Indicator category", true),
        FIELD_GEOGRAPHY => ("Geography", true),
        FIELD_INDICATOR => ("Indicator", true),
        _ => ("Year", false),
    };
    let multiple = if multiple { " multiple" } else { "" };
    let _ = writeln!(
        out,
        "<label>{}<select name=\"{}\"{}>",
        escape_html(label),
        escape_html(name),
        multiple
    );
    let chosen = form.get_list(name);
    for option in options {
        let is_chosen = chosen.iter().any(|value| value.trim() == option.as_str());
        let selected = if is_chosen { " selected" } else { "" };
        let option = escape_html(option);
        let _ = writeln!(
            out,
            "<option value=\"{option}\"{selected}>{option}</option>"
        );
    }
    out.push_str("</select></label>\n");
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// True when the highest-ranked media type in `Accept` is `application/json`.
/// Ties keep the earlier entry.
pub fn wants_json(req: &HttpRequest) -> bool {
    let Some(accept) = req.headers().get(ACCEPT) else {
        return false;
    };
    let Ok(accept) = accept.to_str() else {
        return false;
    };

    let mut best: Option<(f32, &str)> = None;
    for item in accept.split(',') {
        let mut parts = item.split(';');
        let media = parts.next().unwrap_or("").trim();
        if media.is_empty() {
            continue;
        }
        let quality = parts
            .filter_map(|param| param.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);

        let ranks_higher = match best {
            Some((best_quality, _)) => quality > best_quality,
            None => true,
        };
        if ranks_higher {
            best = Some((quality, media));
        }
    }

    match best {
        Some((quality, media)) => quality > 0.0 && media.eq_ignore_ascii_case("application/json"),
        None => false,
    }
}
