use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::activity_log::format::TIMESTAMP_FORMAT;
use crate::history::{RowLabel, WindowRow};
use crate::network::NetworkStatus;

/// Everything the status page shows, gathered before rendering.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub now: NaiveDateTime,
    pub last_motion: Option<NaiveDateTime>,
    pub network: Option<NetworkStatus>,
    pub rows: Vec<WindowRow>,
    pub refresh_seconds: u32,
}

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2rem; }
.card { border: 1px solid #ccc; border-radius: 8px; padding: 1.5rem; max-width: 480px; margin-bottom: 1rem; }
.label { color: #555; margin-bottom: 0.5rem; }
.time { font-size: 1.5rem; font-weight: bold; }
table { border-collapse: collapse; }
td, th { padding: 0.15rem 0.75rem; text-align: left; }
tr.active td { font-weight: bold; }
td.unknown { color: #999; }";

pub fn render_page(view: &StatusView) -> String {
    let last_motion = match view.last_motion {
        Some(at) => at.format(TIMESTAMP_FORMAT).to_string(),
        None => "No motion detected yet.".to_string(),
    };

    let mut html = String::with_capacity(16 * 1024);
    let _ = write!(
        html,
        "<html>\n<head>\n<title>Motion Sensor</title>\n\
         <meta http-equiv=\"refresh\" content=\"{}\">\n<style>\n{}\n</style>\n</head>\n<body>\n",
        view.refresh_seconds, STYLE
    );
    let _ = write!(
        html,
        "<div class=\"card\"><div class=\"label\">Last motion detected:</div>\
         <div class=\"time\">{}</div></div>\n",
        escape_html(&last_motion)
    );

    if let Some(status) = view.network {
        let _ = write!(
            html,
            "<div class=\"card\"><div class=\"label\">Network:</div><div>{}</div></div>\n",
            escape_html(status.describe())
        );
    }

    let _ = write!(
        html,
        "<div class=\"label\">Activity, last 24 hours (as of {})</div>\n\
         <table>\n<tr><th>Date</th><th>Time</th><th>Events</th></tr>\n",
        view.now.format(TIMESTAMP_FORMAT)
    );
    for row in &view.rows {
        let _ = write!(
            html,
            "<tr{}><td{}>{}</td><td>{} - {}</td><td>{}</td></tr>\n",
            if row.count > 0 { " class=\"active\"" } else { "" },
            if row.label == RowLabel::Unknown { " class=\"unknown\"" } else { "" },
            escape_html(&row.label.to_string()),
            row.start.format("%H:%M"),
            row.end.format("%H:%M"),
            row.count
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
