//! View-models and HTML rendering for the hub and the three calculators.

use crate::errors::{HoursError, TipError};
use crate::hours::ShiftHours;
use crate::ledger::{Breakdown, Ledger};
use crate::models::{AppId, Entry, EntryKind, LargeParty, TipPreset};
use crate::tips::TipBreakdown;
use serde::Deserialize;
use std::fmt::Write;

/// One-shot status line carried across a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Sent,
    CalculateFirst,
    Saved,
    Cleared,
    InvalidPercent,
}

impl Notice {
    pub fn as_str(self) -> &'static str {
        match self {
            Notice::Sent => "sent",
            Notice::CalculateFirst => "calculate_first",
            Notice::Saved => "saved",
            Notice::Cleared => "cleared",
            Notice::InvalidPercent => "invalid_percent",
        }
    }

    fn message(self, what: &str) -> String {
        match self {
            Notice::Sent => "✓ Sent to End of Day!".to_string(),
            Notice::CalculateFirst => format!("⚠️ Calculate {what} first"),
            Notice::Saved => "✓ Saved".to_string(),
            Notice::Cleared => "Cleared".to_string(),
            Notice::InvalidPercent => "⚠️ Please enter valid percentages (0 or greater)".to_string(),
        }
    }

    fn status(self) -> &'static str {
        match self {
            Notice::CalculateFirst | Notice::InvalidPercent => "error",
            _ => "ok",
        }
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn usd(value: f64) -> String {
    let value = crate::ledger::round_cents(value);
    if value < 0.0 {
        format!("-${:.2}", -value)
    } else {
        format!("${value:.2}")
    }
}

fn notice_html(notice: Option<Notice>, what: &str) -> String {
    match notice {
        Some(notice) => format!(
            r#"<p class="status" data-type="{}">{}</p>"#,
            notice.status(),
            escape(&notice.message(what))
        ),
        None => String::new(),
    }
}

fn error_html(message: Option<&str>) -> String {
    match message {
        Some(message) => format!(r#"<p class="status" data-type="error">{}</p>"#, escape(message)),
        None => String::new(),
    }
}

fn hidden(name: &str, value: &str) -> String {
    format!(
        r#"<input type="hidden" name="{name}" value="{}" />"#,
        escape(value)
    )
}

fn button_form(action: &str, label: &str, class: &str, fields: &str) -> String {
    format!(
        r#"<form method="post" action="{action}" class="inline">{fields}<button class="{class}" type="submit">{label}</button></form>"#
    )
}

fn page(title: &str, app: Option<AppId>, body: &str) -> String {
    let back = match app {
        Some(_) => button_form("/hub", "← Hub", "btn-back", ""),
        None => String::new(),
    };
    PAGE_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{BACK}}", &back)
        .replace("{{BODY}}", body)
}

pub struct HubView {
    pub stale_message: Option<String>,
}

pub fn render_hub(view: &HubView) -> String {
    let mut body = String::new();
    if let Some(message) = &view.stale_message {
        let _ = write!(
            body,
            r#"<section class="alert"><p>{}</p><div class="actions">{}{}</div></section>"#,
            escape(message),
            button_form("/stale/keep", "Keep", "btn-secondary", ""),
            button_form("/stale/clear", "Clear", "btn-danger", ""),
        );
    }
    body.push_str(r#"<nav class="cards">"#);
    for app in [AppId::TipCalc, AppId::HoursCalc, AppId::EndOfDay] {
        let _ = write!(
            body,
            r#"<a class="card" href="{}">{}</a>"#,
            app.path(),
            app.title()
        );
    }
    body.push_str("</nav>");
    page("Calculator Hub", None, &body)
}

pub struct TipView {
    pub owed: String,
    pub sales: String,
    pub cash: String,
    pub preset: TipPreset,
    pub parties: Vec<LargeParty>,
    pub result: Result<TipBreakdown, TipError>,
    pub pending_prompt: Option<String>,
    pub notice: Option<Notice>,
}

impl TipView {
    fn carried_fields(&self) -> String {
        [
            hidden("owed", &self.owed),
            hidden("sales", &self.sales),
            hidden("cash", &self.cash),
        ]
        .concat()
    }
}

pub fn render_tip_calc(view: &TipView) -> String {
    let carried = view.carried_fields();
    let mut body = String::new();

    let _ = write!(
        body,
        r#"<form method="get" action="/app/tipcalc" class="grid">
  <label>Owed <input name="owed" type="number" step="0.01" inputmode="decimal" value="{}" /></label>
  <label>Total Net Sales <input name="sales" type="number" step="0.01" inputmode="decimal" value="{}" /></label>
  <label>Cash <input name="cash" type="number" step="0.01" inputmode="decimal" value="{}" /></label>
  <button class="btn-primary" type="submit">Calculate</button>
</form>"#,
        escape(&view.owed),
        escape(&view.sales),
        escape(&view.cash),
    );

    body.push_str(r#"<section class="panel"><h2>Large parties</h2><ul class="rows">"#);
    for (index, party) in view.parties.iter().enumerate() {
        let _ = write!(
            body,
            r#"<li><form method="post" action="/app/tipcalc/parties/{index}" class="inline">{carried}
  <input name="headcount" type="number" inputmode="numeric" value="{}" /> × $<input name="cost_per_head" type="number" step="0.01" value="{}" /> × 1% = {}
  <button class="btn-icon" type="submit" title="Update">✓</button></form>{}</li>"#,
            party.headcount,
            party.cost_per_head,
            usd(party.deduction()),
            button_form(
                &format!("/app/tipcalc/parties/{index}/remove"),
                "×",
                "btn-icon",
                &carried
            ),
        );
    }
    let _ = write!(
        body,
        r#"</ul><form method="post" action="/app/tipcalc/parties" class="grid">{carried}
  <label>Headcount <input name="headcount" type="number" inputmode="numeric" /></label>
  <label>$/Head <input name="cost_per_head" type="number" step="0.01" placeholder="65" /></label>
  <button class="btn-secondary" type="submit">+ Add Party</button>
</form></section>"#
    );

    let _ = write!(
        body,
        r#"<section class="panel"><h2>Tip shares</h2><p>BoH {}% · FoH {}%</p>
<form method="post" action="/app/tipcalc/preset" class="grid">{carried}
  <label>Back of House % <input name="boh" type="number" step="0.01" value="{}" /></label>
  <label>Front of House Support % <input name="foh" type="number" step="0.01" value="{}" /></label>
  <button class="btn-secondary" type="submit">Save Changes</button>
</form>{}"#,
        view.preset.boh,
        view.preset.foh,
        view.preset.boh,
        view.preset.foh,
        button_form("/app/tipcalc/preset/reset", "Reset to Defaults", "btn-secondary", &carried),
    );
    if let Some(prompt) = &view.pending_prompt {
        let _ = write!(
            body,
            r#"<div class="alert"><p>{}</p><div class="actions">{}{}</div></div>"#,
            escape(prompt),
            button_form("/app/tipcalc/preset/confirm", "Confirm", "btn-primary", &carried),
            button_form("/app/tipcalc/preset/cancel", "Cancel", "btn-secondary", &carried),
        );
    }
    body.push_str("</section>");

    match &view.result {
        Ok(result) => {
            if result.negative {
                body.push_str(r#"<p class="status" data-type="error">⚠️ Final tips are negative!</p>"#);
            }
            let _ = write!(
                body,
                r#"<section class="panel totals">
  <div class="stat"><span class="label">Large Party</span><span class="value">{}</span></div>
  <div class="stat"><span class="label">BoH</span><span class="value">{}</span></div>
  <div class="stat"><span class="label">FoH</span><span class="value">{}</span></div>
  <div class="stat{}"><span class="label">Tips</span><span class="value">{}</span></div>
</section>"#,
                usd(result.large_party),
                usd(result.boh),
                usd(result.foh),
                if result.negative { " negative" } else { "" },
                usd(result.tips),
            );
        }
        Err(err) => body.push_str(&error_html(Some(&err.to_string()))),
    }

    body.push_str(&notice_html(view.notice, "tips"));
    let _ = write!(
        body,
        r#"<div class="actions">{}{}</div>"#,
        button_form("/app/tipcalc/send", "→ Send to End of Day", "btn-primary", &carried),
        button_form("/app/tipcalc/clear", "🗑️ Clear All", "btn-secondary", ""),
    );

    page(AppId::TipCalc.title(), Some(AppId::TipCalc), &body)
}

pub struct HoursView {
    pub start: String,
    pub end: String,
    pub break_minutes: String,
    pub result: Result<ShiftHours, HoursError>,
    pub notice: Option<Notice>,
}

pub fn render_hours_calc(view: &HoursView) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<form method="get" action="/app/hourscalc" class="grid">
  <label>Start <input name="start" type="time" value="{}" /></label>
  <label>End <input name="end" type="time" value="{}" /></label>
  <label>Break (min) <input name="break" type="number" inputmode="numeric" value="{}" /></label>
  <button class="btn-primary" type="submit">Calculate</button>
</form>"#,
        escape(&view.start),
        escape(&view.end),
        escape(&view.break_minutes),
    );

    match &view.result {
        Ok(result) => {
            let _ = write!(
                body,
                r#"<section class="panel totals">
  <div class="stat"><span class="label">Total</span><span class="value">{}</span></div>
  <div class="stat"><span class="label">After break</span><span class="value">{}</span></div>
  <div class="stat"><span class="label">Rounded</span><span class="value">{}</span></div>
</section>"#,
                result.elapsed.label(),
                result.after_break.label(),
                result.rounded_label(),
            );
        }
        Err(err) => body.push_str(&error_html(Some(&err.to_string()))),
    }

    body.push_str(&notice_html(view.notice, "hours"));
    let carried = [
        hidden("start", &view.start),
        hidden("end", &view.end),
        hidden("break", &view.break_minutes),
    ]
    .concat();
    body.push_str(&button_form(
        "/app/hourscalc/send",
        "→ Send to End of Day",
        "btn-primary",
        &carried,
    ));

    page(AppId::HoursCalc.title(), Some(AppId::HoursCalc), &body)
}

pub struct EndOfDayRow {
    pub index: usize,
    pub hours: Option<Entry>,
    pub tips: Option<Entry>,
}

pub struct EndOfDayView {
    pub total_hours: f64,
    pub total_tips: f64,
    pub hourly_rate: f64,
    pub rows: Vec<EndOfDayRow>,
    pub can_undo: bool,
    pub breakdown_available: bool,
    pub breakdown: Option<Breakdown>,
    pub error: Option<String>,
}

impl EndOfDayView {
    pub fn from_ledger(ledger: &Ledger, show_breakdown: bool, error: Option<String>) -> Self {
        let hours = ledger.entries(EntryKind::Hours);
        let tips = ledger.entries(EntryKind::Tips);
        let rows = (0..ledger.row_count())
            .map(|index| EndOfDayRow {
                index,
                hours: hours.get(index).copied(),
                tips: tips.get(index).copied(),
            })
            .collect();
        let breakdown = ledger.breakdown();

        Self {
            total_hours: ledger.total_hours(),
            total_tips: ledger.total_tips(),
            hourly_rate: ledger.hourly_rate(),
            rows,
            can_undo: ledger.can_undo(),
            breakdown_available: breakdown.is_some(),
            breakdown: breakdown.filter(|_| show_breakdown),
            error,
        }
    }

    pub fn entry_count_label(&self) -> String {
        match self.rows.len() {
            1 => "1 entry".to_string(),
            count => format!("{count} entries"),
        }
    }
}

fn entry_cell(kind: EntryKind, index: usize, entry: Option<Entry>) -> String {
    let Some(entry) = entry else {
        return r#"<td class="empty">—</td>"#.to_string();
    };
    let shown = match kind {
        EntryKind::Hours => entry.value.to_string(),
        EntryKind::Tips => format!("{:.2}", entry.value),
    };
    let badge = if entry.auto { r#" <span class="badge">auto</span>"# } else { "" };
    format!(
        r#"<td><form method="post" action="/app/endofday/entries/{kind}/{index}/edit" class="inline">
  <input name="value" type="number" step="0.01" value="{shown}" />{badge}
  <button class="btn-icon" type="submit" title="Save">✓</button></form>{}</td>"#,
        button_form(
            &format!("/app/endofday/entries/{kind}/{index}/delete"),
            "🗑️",
            "btn-icon",
            ""
        ),
    )
}

fn reorder_button(index: usize, direction: &str, label: &str) -> String {
    let fields = [hidden("index", &index.to_string()), hidden("direction", direction)].concat();
    button_form("/app/endofday/reorder", label, "btn-icon", &fields)
}

pub fn render_end_of_day(view: &EndOfDayView) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        r#"<section class="panel totals">
  <div class="stat"><span class="label">Hours</span><span class="value">{:.2}</span></div>
  <div class="stat"><span class="label">Tips</span><span class="value">{}</span></div>
  <div class="stat"><span class="label">Hourly</span><span class="value">{}</span></div>
</section>"#,
        view.total_hours,
        usd(view.total_tips),
        usd(view.hourly_rate),
    );

    body.push_str(&error_html(view.error.as_deref()));
    for (kind, label, step) in [(EntryKind::Hours, "Add hours", "0.25"), (EntryKind::Tips, "Add tips", "0.01")] {
        let _ = write!(
            body,
            r#"<form method="post" action="/app/endofday/entries" class="grid">{}
  <input name="value" type="number" step="{step}" inputmode="decimal" />
  <button class="btn-primary" type="submit">{label}</button>
</form>"#,
            hidden("kind", kind.as_str()),
        );
    }

    let _ = write!(
        body,
        r#"<section class="panel"><h2>{}</h2>"#,
        view.entry_count_label()
    );
    if view.rows.is_empty() {
        body.push_str(r#"<p class="empty">No entries added yet</p>"#);
    } else {
        body.push_str("<table><thead><tr><th></th><th>Hours</th><th>Tips</th></tr></thead><tbody>");
        let last = view.rows.len() - 1;
        for row in &view.rows {
            let mut moves = String::new();
            if row.index > 0 {
                moves.push_str(&reorder_button(row.index, "up", "▲"));
            }
            if row.index < last {
                moves.push_str(&reorder_button(row.index, "down", "▼"));
            }
            let _ = write!(
                body,
                "<tr><td>{moves}</td>{}{}</tr>",
                entry_cell(EntryKind::Hours, row.index, row.hours),
                entry_cell(EntryKind::Tips, row.index, row.tips),
            );
        }
        body.push_str("</tbody></table>");
    }
    body.push_str("</section>");

    body.push_str(r#"<div class="actions">"#);
    if view.can_undo {
        body.push_str(&button_form("/app/endofday/undo", "↶ Undo Last Delete", "btn-secondary", ""));
    }
    if view.breakdown_available {
        body.push_str(r#"<a class="btn-secondary" href="/app/endofday?breakdown=true">📊 View Tips Breakdown by Entry</a>"#);
    }
    body.push_str("</div>");

    if let Some(breakdown) = &view.breakdown {
        let _ = write!(
            body,
            r#"<section class="panel"><h2>Breakdown at {}/h</h2><ol>"#,
            usd(breakdown.hourly_rate)
        );
        for item in &breakdown.items {
            let _ = write!(body, "<li>{:.2}h → {}</li>", item.entry.value, usd(item.tips));
        }
        let _ = write!(body, "</ol><p>Total {}</p></section>", usd(breakdown.total));
    }

    body.push_str(
        r#"<form method="post" action="/app/endofday/reset" class="inline">
  <label><input type="checkbox" name="confirm" value="true" /> Clear all hours and tips data? This cannot be undone.</label>
  <button class="btn-danger" type="submit">Clear All Data</button>
</form>"#,
    );

    page(AppId::EndOfDay.title(), Some(AppId::EndOfDay), &body)
}

pub const MANIFEST_JSON: &str = r##"{
  "name": "Calculator Hub",
  "short_name": "Hub",
  "start_url": "./",
  "display": "standalone",
  "background_color": "#f8f3e6",
  "theme_color": "#ff6b4a"
}
"##;

pub const STYLE_CSS: &str = r#":root {
  --bg: #f8f3e6;
  --ink: #2b2a28;
  --accent: #ff6b4a;
  --accent-2: #2f4858;
  --card: rgba(255, 255, 255, 0.9);
}

* { box-sizing: border-box; }

body {
  margin: 0;
  min-height: 100vh;
  background: var(--bg);
  color: var(--ink);
  font-family: "Trebuchet MS", sans-serif;
  display: grid;
  place-items: start center;
  padding: 24px 16px;
}

.app { width: min(720px, 100%); background: var(--card); border-radius: 24px; padding: 28px; display: grid; gap: 20px; }
header { display: flex; align-items: center; gap: 12px; }
h1 { margin: 0; font-size: 1.8rem; }
h2 { margin: 0 0 8px; font-size: 1.1rem; }
.cards { display: grid; gap: 12px; }
.card { display: block; padding: 20px; border-radius: 16px; background: white; color: var(--accent-2); font-weight: 600; text-decoration: none; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 12px; align-items: end; }
.panel { background: white; border-radius: 16px; padding: 16px; }
.totals { display: grid; grid-template-columns: repeat(auto-fit, minmax(120px, 1fr)); gap: 12px; }
.stat .label { display: block; font-size: 0.8rem; text-transform: uppercase; color: #8b857d; }
.stat .value { display: block; font-size: 1.4rem; font-weight: 600; color: var(--accent-2); }
.stat.negative .value { color: #c63b2b; }
.actions { display: flex; flex-wrap: wrap; gap: 8px; }
.inline { display: inline-flex; gap: 6px; align-items: center; }
.alert { background: #fff4e5; border-radius: 12px; padding: 12px 16px; }
.status[data-type="error"] { color: #c63b2b; }
.status[data-type="ok"] { color: #2d7a4b; }
.badge { font-size: 0.7rem; background: var(--accent-2); color: white; border-radius: 999px; padding: 2px 6px; }
.empty { color: #8b857d; }
table { width: 100%; border-collapse: collapse; }
td, th { padding: 6px; text-align: left; }
input { padding: 8px; border-radius: 8px; border: 1px solid #d9d2c5; width: 100%; }
button, .btn-secondary { border: none; border-radius: 999px; padding: 10px 16px; font-weight: 600; cursor: pointer; text-decoration: none; }
.btn-primary { background: var(--accent); color: white; }
.btn-secondary { background: rgba(47, 72, 88, 0.1); color: var(--accent-2); }
.btn-danger { background: #c63b2b; color: white; }
.btn-back, .btn-icon { background: transparent; padding: 4px 8px; }
"#;

const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <link rel="manifest" href="/manifest.json" />
  <link rel="stylesheet" href="/style.css" />
</head>
<body>
  <main class="app">
    <header>{{BACK}}<h1>{{TITLE}}</h1></header>
    {{BODY}}
  </main>
  <script>
    if ('serviceWorker' in navigator) {
      window.addEventListener('load', () => {
        navigator.serviceWorker.register('/service-worker.js')
          .then((registration) => {
            registration.addEventListener('updatefound', () => {
              const worker = registration.installing;
              worker.addEventListener('statechange', () => {
                if (worker.state === 'installed' && navigator.serviceWorker.controller) {
                  console.log('New version available! Refresh to update.');
                }
              });
            });
          })
          .catch((err) => console.error('Service worker registration failed:', err));
      });
    }
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<b a="1">&'"#), "&lt;b a=&quot;1&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn formats_currency() {
        assert_eq!(usd(377.0), "$377.00");
        assert_eq!(usd(-70.004), "-$70.00");
        assert_eq!(usd(0.005), "$0.01");
    }

    #[test]
    fn end_of_day_view_pairs_rows() {
        let mut ledger = Ledger::new();
        ledger.add(EntryKind::Hours, 4.0).unwrap();
        ledger.add(EntryKind::Hours, 6.0).unwrap();
        ledger.push_auto(EntryKind::Tips, 250.0).unwrap();

        let view = EndOfDayView::from_ledger(&ledger, true, None);
        assert_eq!(view.entry_count_label(), "2 entries");
        assert_eq!(view.rows[1].tips, None);
        assert!(view.breakdown.is_some());

        let html = render_end_of_day(&view);
        assert!(html.contains("$25.00"));
        assert!(html.contains("4.00h → $100.00"));
        assert!(html.contains(r#"<span class="badge">auto</span>"#));
        assert!(html.contains("/app/endofday/entries/hours/1/delete"));
    }

    #[test]
    fn empty_end_of_day_hides_breakdown() {
        let view = EndOfDayView::from_ledger(&Ledger::new(), true, None);
        assert!(view.breakdown.is_none());
        let html = render_end_of_day(&view);
        assert!(html.contains("No entries added yet"));
        assert!(!html.contains("View Tips Breakdown"));
        assert!(!html.contains("Undo Last Delete"));
    }

    #[test]
    fn hub_shows_stale_prompt() {
        let html = render_hub(&HubView {
            stale_message: Some("Data from 3 hours ago is still saved".to_string()),
        });
        assert!(html.contains("Data from 3 hours ago is still saved"));
        assert!(html.contains(r#"action="/stale/clear""#));
        assert!(html.contains(r#"href="/app/hourscalc""#));
        assert!(html.contains("registration.addEventListener('updatefound'"));
        assert!(html.contains("New version available! Refresh to update."));
    }

    #[test]
    fn tip_view_renders_editable_parties_and_notices() {
        let view = TipView {
            owed: "500".to_string(),
            sales: "abc".to_string(),
            cash: String::new(),
            preset: TipPreset::default(),
            parties: vec![LargeParty {
                headcount: 20.0,
                cost_per_head: 65.0,
            }],
            result: Err(TipError::InvalidInput { fields: vec!["sales"] }),
            pending_prompt: None,
            notice: Some(Notice::InvalidPercent),
        };

        let html = render_tip_calc(&view);
        assert!(html.contains(r#"action="/app/tipcalc/parties/0""#));
        assert!(html.contains(r#"name="cost_per_head" type="number" step="0.01" value="65""#));
        assert!(html.contains("$13.00"));
        assert!(html.contains(r#"value="abc""#));
        assert!(html.contains("invalid sales"));
        assert!(html.contains("Please enter valid percentages (0 or greater)"));
    }
}
