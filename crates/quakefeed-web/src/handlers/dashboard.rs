//! Dashboard handler — latest prediction, model performance and recent predictions.

use axum::{extract::State, response::Html};
use quakefeed_feed::FeedSnapshot;

use crate::state::SharedState;

pub async fn dashboard(State(state): State<SharedState>) -> Html<String> {
    Html(render_dashboard(&state.feed.snapshot()))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| format!("{:.*}", decimals, v)).unwrap_or_else(|| "—".to_string())
}

pub fn render_dashboard(snap: &FeedSnapshot) -> String {
    let rows: String = if snap.recent.is_empty() {
        r#"<tr><td colspan="4" class="text-muted">No predictions received yet.</td></tr>"#.to_string()
    } else {
        snap.recent.iter().map(|p| format!(r#"
            <tr>
                <td>{}</td>
                <td>{:.2}</td>
                <td>{:.2}</td>
                <td>{:.4}</td>
            </tr>"#, escape(&p.time_step.to_string()), p.predicted, p.actual, p.absolute_error)
        ).collect()
    };

    let error_banner = match &snap.last_error {
        Some(err) => format!(
            "Last poll failed at {}: {}",
            err.occurred_at.format("%H:%M:%S"),
            escape(&err.message)
        ),
        None => String::new(),
    };
    let banner_style = if snap.last_error.is_some() { "" } else { " style=\"display:none\"" };

    let button_class = if snap.running { "btn-danger" } else { "btn-success" };

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Real-time Earthquake Prediction</title>
</head>
<body>
<main class="main-content">
    <div class="page-header">
        <div>
            <h1 class="page-title">Real-time Earthquake Prediction</h1>
            <p class="text-muted">ML-powered earthquake magnitude predictions for the Himalayan region</p>
        </div>
        <form method="post" action="/feed/toggle">
            <button class="btn {}" id="toggle" type="submit">{}</button>
        </form>
    </div>
    <div class="alert alert-warning" id="last-error"{}>{}</div>
    <div class="stats-grid">
        <div class="stat-card">
            <div class="stat-label">Predicted Magnitude</div>
            <div class="stat-value" id="prediction">{}</div>
        </div>
        <div class="stat-card">
            <div class="stat-label">Actual Magnitude</div>
            <div class="stat-value" id="actual">{}</div>
        </div>
        <div class="stat-card">
            <div class="stat-label">Mean Absolute Error</div>
            <div class="stat-value" id="mae">{}</div>
        </div>
    </div>

    <div class="card">
        <div class="card-header">Recent Predictions</div>
        <table class="table">
            <thead>
                <tr><th>Time</th><th>Pred.</th><th>Act.</th><th>Error</th></tr>
            </thead>
            <tbody id="recent">
                {}
            </tbody>
        </table>
    </div>
</main>
<script>
    const fmt = (v, d) => (v === null || v === undefined) ? '—' : Number(v).toFixed(d);

    function render(snap) {{
        document.getElementById('prediction').textContent = fmt(snap.current_prediction, 2);
        document.getElementById('actual').textContent = fmt(snap.current_actual, 2);
        document.getElementById('mae').textContent = fmt(snap.mean_absolute_error, 4);

        const toggle = document.getElementById('toggle');
        toggle.textContent = snap.toggle_label;
        toggle.className = 'btn ' + (snap.running ? 'btn-danger' : 'btn-success');

        const banner = document.getElementById('last-error');
        if (snap.last_error) {{
            const at = new Date(snap.last_error.occurred_at).toLocaleTimeString();
            banner.textContent = 'Last poll failed at ' + at + ': ' + snap.last_error.message;
            banner.style.display = '';
        }} else {{
            banner.style.display = 'none';
        }}

        const body = document.getElementById('recent');
        body.replaceChildren();
        if (snap.recent.length === 0) {{
            const cell = body.insertRow().insertCell();
            cell.colSpan = 4;
            cell.className = 'text-muted';
            cell.textContent = 'No predictions received yet.';
        }}
        for (const p of snap.recent) {{
            const row = body.insertRow();
            [String(p.time_step), fmt(p.predicted, 2), fmt(p.actual, 2), fmt(p.absolute_error, 4)]
                .forEach(text => {{ row.insertCell().textContent = text; }});
        }}
    }}

    function refresh() {{
        fetch('/api/feed').then(r => r.json()).then(render).catch(() => {{}});
    }}

    const evtSource = new EventSource('/api/events');
    ['batch_applied', 'poll_failed', 'running_changed', 'resync']
        .forEach(name => evtSource.addEventListener(name, refresh));
    evtSource.onopen = refresh;
</script>
</body>
</html>"#,
    button_class, snap.toggle_label,
    banner_style, error_banner,
    fmt_opt(snap.current_prediction, 2),
    fmt_opt(snap.current_actual, 2),
    fmt_opt(snap.mean_absolute_error, 4),
    rows
    )
}
