use crate::model::ReportData;

/// Render a self-contained HTML report (data embedded as JSON).
///
/// Important: we avoid `format!()` because the HTML contains many `{}` from JS
/// template literals (e.g., `${x}`), which would conflict with Rust formatting.
pub fn render_html_report(data: &ReportData) -> anyhow::Result<String> {
    // Category names come straight from the CSV; keep them from closing the
    // script element.
    let json = serde_json::to_string(data)?.replace("</", "<\\/");

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Survey Dashboard</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  h1 { font-size: 20px; margin: 0 0 8px 0; }
  main { padding: 12px 16px; max-width: 1100px; }
  section { margin-bottom: 24px; }
  h2 { font-size: 16px; margin: 16px 0 4px 0; }

  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }
  .muted { color: #777; font-size: 12px; }

  table { border-collapse: collapse; width: 100%; margin-top: 8px; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  .bar { display: inline-block; height: 10px; background: #66c2a5; border-radius: 2px; }
</style>
</head>
<body>
<header>
  <h1 id="title"></h1>
  <div class="summary" id="summary"></div>
  <div class="muted" id="filters"></div>
</header>

<main>
  <section id="distSection">
    <h2>Distribution by group</h2>
    <table><thead><tr>
      <th>group</th><th class="num">n</th><th class="num">min</th><th class="num">q1</th>
      <th class="num">median</th><th class="num">q3</th><th class="num">max</th>
    </tr></thead><tbody id="distBody"></tbody></table>
  </section>

  <div id="breakdowns"></div>

  <section id="trendSection">
    <h2 id="trendTitle">Trend</h2>
    <table><thead><tr>
      <th>group</th><th class="num">points</th><th class="num">slope</th><th class="num">intercept</th>
    </tr></thead><tbody id="trendBody"></tbody></table>
  </section>

  <section id="locSection">
    <h2>By location</h2>
    <input id="search" placeholder="Search location..." style="padding: 6px 8px; border: 1px solid #ddd; border-radius: 6px;">
    <table><thead><tr>
      <th>location</th><th class="num">n</th><th class="num">mean</th><th></th>
      <th class="num">lat</th><th class="num">lon</th>
    </tr></thead><tbody id="locBody"></tbody></table>
  </section>
</main>

<script>
// Embedded report data (JSON object literal)
const DATA = __DATA__;

const state = { search: "" };

function fmt(x, digits) {
  if (x === null || x === undefined) return "N/A";
  return x.toLocaleString(undefined, { maximumFractionDigits: digits === undefined ? 2 : digits });
}

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  document.getElementById("title").textContent = DATA.title;
  const t = DATA.totals;
  let html = `
    <span class="pill">rows: <b>${t.rows_filtered}</b> / ${t.rows_loaded}</span>
    <span class="pill">with ${escapeHtml(DATA.value_column)}: <b>${t.rows_with_value}</b></span>
    <span class="pill">mean: <b>${fmt(t.mean)}</b></span>
  `;
  const c = DATA.compare;
  if (c) {
    html += `
      <span class="pill">${escapeHtml(c.a)}: <b>${fmt(c.mean_a, 0)}</b></span>
      <span class="pill">${escapeHtml(c.b)}: <b>${fmt(c.mean_b, 0)}</b></span>
      <span class="pill">gap: <b>${c.gap_pct === null ? "N/A" : fmt(c.gap_pct) + "%"}</b></span>
    `;
  }
  document.getElementById("summary").innerHTML = html;

  const parts = Object.entries(DATA.filters).map(([k, v]) => `${k} in [${v.join(", ")}]`);
  document.getElementById("filters").textContent = parts.length ? "filters: " + parts.join("; ") : "";
}

function renderDistribution() {
  const body = document.getElementById("distBody");
  if (!DATA.distribution.length) {
    document.getElementById("distSection").style.display = "none";
    return;
  }
  for (const d of DATA.distribution) {
    const tr = document.createElement("tr");
    tr.innerHTML = `
      <td>${escapeHtml(d.category)}</td>
      <td class="num">${d.count}</td>
      <td class="num">${fmt(d.min)}</td>
      <td class="num">${fmt(d.q1)}</td>
      <td class="num">${fmt(d.median)}</td>
      <td class="num">${fmt(d.q3)}</td>
      <td class="num">${fmt(d.max)}</td>
    `;
    body.appendChild(tr);
  }
}

function renderBreakdowns() {
  const root = document.getElementById("breakdowns");
  for (const b of DATA.breakdowns) {
    const max = Math.max(...b.rows.map((r) => r.mean), 0);
    const sec = document.createElement("section");
    sec.innerHTML = `
      <h2>Average ${escapeHtml(DATA.value_column)} by ${escapeHtml(b.column)}</h2>
      <table><thead><tr>
        <th>${escapeHtml(b.column)}</th><th>group</th><th class="num">n</th><th class="num">mean</th><th></th>
      </tr></thead><tbody></tbody></table>
    `;
    const body = sec.querySelector("tbody");
    for (const r of b.rows) {
      const w = max > 0 ? Math.round((r.mean / max) * 200) : 0;
      const tr = document.createElement("tr");
      tr.innerHTML = `
        <td>${escapeHtml(r.category)}</td>
        <td>${escapeHtml(r.group)}</td>
        <td class="num">${r.count}</td>
        <td class="num">${fmt(r.mean)}</td>
        <td><span class="bar" style="width:${w}px"></span></td>
      `;
      body.appendChild(tr);
    }
    root.appendChild(sec);
  }
}

function renderTrends() {
  if (!DATA.x_column || !DATA.trends.length) {
    document.getElementById("trendSection").style.display = "none";
    return;
  }
  document.getElementById("trendTitle").textContent =
    `${DATA.value_column} vs ${DATA.x_column} (least squares)`;
  const body = document.getElementById("trendBody");
  for (const t of DATA.trends) {
    const tr = document.createElement("tr");
    tr.innerHTML = `
      <td>${escapeHtml(t.group)}</td>
      <td class="num">${t.points}</td>
      <td class="num">${fmt(t.slope, 4)}</td>
      <td class="num">${fmt(t.intercept, 4)}</td>
    `;
    body.appendChild(tr);
  }
}

function renderLocations() {
  if (!DATA.locations.length) {
    document.getElementById("locSection").style.display = "none";
    return;
  }
  const body = document.getElementById("locBody");
  body.innerHTML = "";
  const max = Math.max(...DATA.locations.map((l) => l.mean), 0);
  const s = state.search.toLowerCase();
  for (const l of DATA.locations) {
    if (s && !l.name.toLowerCase().includes(s)) continue;
    const w = max > 0 ? Math.round((l.mean / max) * 200) : 0;
    const tr = document.createElement("tr");
    tr.innerHTML = `
      <td>${escapeHtml(l.name)}</td>
      <td class="num">${l.count}</td>
      <td class="num">${fmt(l.mean)}</td>
      <td><span class="bar" style="width:${w}px"></span></td>
      <td class="num">${fmt(l.lat, 4)}</td>
      <td class="num">${fmt(l.lon, 4)}</td>
    `;
    body.appendChild(tr);
  }
}

document.getElementById("search").addEventListener("input", (e) => {
  state.search = e.target.value || "";
  renderLocations();
});

renderSummary();
renderDistribution();
renderBreakdowns();
renderTrends();
renderLocations();
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}
