use crate::model::ReportRow;

/// Placeholder replaced by the report rows (a JSON array) in any template.
pub const TABLE_PLACEHOLDER: &str = "$table_json";

/// Render report rows into `template` by substituting [`TABLE_PLACEHOLDER`].
///
/// Templates are plain text with a single marker, so a user-supplied page full
/// of JS braces or other `$name` tokens passes through untouched.
pub fn render_html_report(template: &str, rows: &[ReportRow]) -> anyhow::Result<String> {
    // URLs come straight from the log; keep them from closing the <script> block.
    let json = serde_json::to_string(rows)?.replace("</", "<\\/");
    Ok(template.replace(TABLE_PLACEHOLDER, &json))
}

/// Self-contained report page used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Access log report</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }
  .main { padding: 12px 16px; }

  table { border-collapse: collapse; width: 100%; margin-top: 8px; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; cursor: pointer; user-select: none; }
  th.sorted::after { content: " \25BE"; color: #666; }
  th.sorted.asc::after { content: " \25B4"; }
  td.url { word-break: break-all; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  code { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 13px; }
</style>
</head>
<body>
<header>
  <div class="summary" id="summary"></div>
</header>

<div class="main">
  <input id="search" placeholder="Filter url..." style="width: 360px; padding: 6px 8px; border: 1px solid #ddd; border-radius: 6px;">
  <table>
    <thead>
      <tr id="head"></tr>
    </thead>
    <tbody id="body"></tbody>
  </table>
</div>

<script>
// Report rows (JSON array), ranked by time_sum.
const ROWS = $table_json;

const COLUMNS = [
  { key: "url", label: "url", num: false },
  { key: "count", label: "count", num: true },
  { key: "count_perc", label: "count_perc", num: true },
  { key: "time_sum", label: "time_sum", num: true },
  { key: "time_perc", label: "time_perc", num: true },
  { key: "time_avg", label: "time_avg", num: true },
  { key: "time_max", label: "time_max", num: true },
  { key: "time_med", label: "time_med", num: true },
];

const state = {
  sortKey: "time_sum",
  ascending: false,
  search: ""
};

function fmt(x) {
  return (Math.round(x * 1000) / 1000).toFixed(3);
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
  const requests = ROWS.reduce((acc, r) => acc + r.count, 0);
  const seconds = ROWS.reduce((acc, r) => acc + r.time_sum, 0);
  document.getElementById("summary").innerHTML = `
    <span class="pill">urls: <b>${ROWS.length}</b></span>
    <span class="pill">requests: <b>${requests}</b></span>
    <span class="pill">time_sum: <b>${fmt(seconds)}</b> s</span>
  `;
}

function renderHead() {
  const head = document.getElementById("head");
  head.innerHTML = "";
  for (const col of COLUMNS) {
    const th = document.createElement("th");
    th.textContent = col.label;
    if (col.num) th.classList.add("num");
    if (state.sortKey === col.key) {
      th.classList.add("sorted");
      if (state.ascending) th.classList.add("asc");
    }
    th.onclick = () => {
      if (state.sortKey === col.key) state.ascending = !state.ascending;
      else { state.sortKey = col.key; state.ascending = !col.num; }
      render();
    };
    head.appendChild(th);
  }
}

function renderBody() {
  const body = document.getElementById("body");
  body.innerHTML = "";

  const s = state.search.toLowerCase();
  const rows = ROWS.filter(r => !s || r.url.toLowerCase().includes(s));
  const dir = state.ascending ? 1 : -1;
  rows.sort((a, b) => {
    const x = a[state.sortKey], y = b[state.sortKey];
    return x < y ? -dir : x > y ? dir : 0;
  });

  for (const r of rows) {
    const tr = document.createElement("tr");
    tr.innerHTML = `
      <td class="url"><code>${escapeHtml(r.url)}</code></td>
      <td class="num">${r.count}</td>
      <td class="num">${fmt(r.count_perc)}</td>
      <td class="num">${fmt(r.time_sum)}</td>
      <td class="num">${fmt(r.time_perc)}</td>
      <td class="num">${fmt(r.time_avg)}</td>
      <td class="num">${fmt(r.time_max)}</td>
      <td class="num">${fmt(r.time_med)}</td>
    `;
    body.appendChild(tr);
  }
}

function render() {
  renderHead();
  renderBody();
}

document.getElementById("search").addEventListener("input", (e) => {
  state.search = e.target.value || "";
  renderBody();
});

renderSummary();
render();
</script>
</body>
</html>
"#;
