//! Dashboard HTML page handler for the dish duty service.

use crate::routes::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

pub async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = render(&state);
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
}

fn render(state: &AppState) -> String {
    let stats = state.store.stats();
    let history = state.store.recent_history(state.history_limit);
    let users = state.store.users();
    let uptime = state.start_time.elapsed().as_secs();

    let stats_html = format!(
        r#"<div class="stats">
                <div class="stat"><span class="val">{}</span><span class="lbl">Users</span></div>
                <div class="stat green"><span class="val">{}</span><span class="lbl">Washes Today</span></div>
                <div class="stat yellow"><span class="val">{}</span><span class="lbl">Washes Logged</span></div>
            </div>"#,
        stats.total_users, stats.entries_today, stats.total_entries
    );

    // Newest first reads better on a live page
    let mut history_rows = String::new();
    for line in history.iter().rev() {
        history_rows.push_str(&format!(
            "<tr><td class=\"mono\">{}</td><td>{}</td></tr>\n",
            line.date,
            escape_html(&line.name),
        ));
    }
    if history_rows.is_empty() {
        history_rows = "<tr><td colspan=\"2\">History is empty so far.</td></tr>".to_string();
    }

    let mut user_chips = String::new();
    for u in &users {
        user_chips.push_str(&format!(
            "<span class=\"chip\" title=\"{}\">{}</span>\n",
            u.id,
            escape_html(&u.name)
        ));
    }

    let uptime_str = format_uptime(uptime);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Dish Duty Dashboard</title>
<style>
  :root {{ --bg: #10141a; --panel: #181e27; --line: #2a323e; --muted: #8a94a3; --accent: #4fb3d9; }}
  body {{ margin: 0; padding: 24px; font-family: system-ui, sans-serif; background: var(--bg); color: #dde3ea; }}
  h1 {{ margin: 0 0 6px; color: var(--accent); }}
  h2 {{ margin: 0 0 10px; font-size: 1.05em; }}
  .meta, .stat .lbl, th {{ color: var(--muted); font-size: 0.85em; }}
  .meta, .section, .stats {{ margin-bottom: 24px; }}
  .stats {{ display: flex; flex-wrap: wrap; gap: 14px; }}
  .stat, .chip {{ background: var(--panel); border: 1px solid var(--line); }}
  .stat {{ min-width: 130px; padding: 14px 22px; border-radius: 8px; text-align: center; }}
  .stat .val {{ display: block; font-size: 2em; font-weight: bold; color: var(--accent); }}
  .stat .lbl {{ display: block; margin-top: 4px; }}
  .stat.green .val {{ color: #46c266; }}
  .stat.yellow .val {{ color: #d9a53a; }}
  table {{ width: 100%; border-collapse: collapse; }}
  th, td {{ padding: 7px 12px; text-align: left; border-bottom: 1px solid var(--line); }}
  tr:hover {{ background: var(--panel); }}
  .mono {{ font-family: ui-monospace, monospace; }}
  .chip {{ display: inline-block; margin: 3px; padding: 3px 10px; border-radius: 12px; font-size: 0.8em; }}
</style>
</head>
<body>
  <h1>Dish Duty</h1>
  <p class="meta">Uptime: {uptime_str} &middot; Snapshot: {snapshot_path}</p>

  {stats_html}

  <div class="section">
    <h2>Recent Washes</h2>
    <table>
      <thead><tr><th>Date (UTC)</th><th>Washed By</th></tr></thead>
      <tbody>{history_rows}</tbody>
    </table>
  </div>

  {users_section}

  <script>setTimeout(() => location.reload(), 30000);</script>
</body>
</html>"#,
        uptime_str = uptime_str,
        snapshot_path = escape_html(&state.store.path().display().to_string()),
        stats_html = stats_html,
        history_rows = history_rows,
        users_section = if !user_chips.is_empty() {
            format!(
                r#"<div class="section"><h2>Registered Users</h2><div>{}</div></div>"#,
                user_chips
            )
        } else {
            String::new()
        },
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;
    use crate::store::Store;
    use std::time::Instant;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> Store {
        let clock = Arc::new(ManualClock::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        Store::open(dir.path().join("data.json"), clock).unwrap()
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(125), "2m 5s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_render_escapes_names() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.register(1, "<script>alert(1)</script>").unwrap();
        store.log_action(1).unwrap();

        let state = AppState {
            store: Arc::new(store),
            start_time: Instant::now(),
            history_limit: 10,
        };
        let html = render(&state);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("History is empty so far."));
    }

    #[test]
    fn test_stylesheet_covers_markup_classes() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.register(1, "Anna").unwrap();
        store.log_action(1).unwrap();
        let state = AppState {
            store: Arc::new(store),
            start_time: Instant::now(),
            history_limit: 10,
        };
        let html = render(&state);
        let (head, body) = html.split_once("</style>").unwrap();

        for class in ["stats", "stat", "val", "lbl", "green", "yellow", "mono", "section", "chip", "meta"] {
            assert!(body.contains(class), "markup no longer uses .{}", class);
            assert!(head.contains(&format!(".{}", class)), "no rule for .{}", class);
        }
    }

    #[test]
    fn test_render_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let state = AppState {
            store: Arc::new(store),
            start_time: Instant::now(),
            history_limit: 10,
        };
        let html = render(&state);
        assert!(html.contains("History is empty so far."));
        assert!(!html.contains("Registered Users"));
    }
}
