use crate::model::GraphView;

/// Render a self-contained HTML viewer (data embedded as JSON).
///
/// Important: we avoid `format!()` because the HTML contains many `{}` from JS
/// template literals (e.g., `${x}`), which would conflict with Rust formatting.
pub fn render_html_viewer(view: &GraphView) -> anyhow::Result<String> {
    // Short values are arbitrary text; keep them from closing the script tag.
    let json = serde_json::to_string(view)?.replace("</", "<\\/");

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Heap Graph</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  .container { display: flex; height: calc(100vh - 58px); }
  .sidebar { width: 380px; border-right: 1px solid #ddd; padding: 12px; overflow: auto; }
  .main { flex: 1; padding: 12px; overflow: auto; }

  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }

  .node-row { cursor: pointer; user-select: none; padding: 2px 4px; border-radius: 4px; display: flex; gap: 6px; }
  .node-row:hover { background: #f3f3f3; }
  .node-row.selected { background: #e9f2ff; border: 1px solid #cfe3ff; }
  .swatch { display: inline-block; width: 12px; height: 12px; border: 1px solid #999; border-radius: 2px; }
  .muted { color: #777; font-size: 12px; }

  table { border-collapse: collapse; width: 100%; margin-top: 8px; }
  th, td { border-bottom: 1px solid #eee; padding: 6px 8px; text-align: left; font-size: 14px; }
  th { position: sticky; top: 0; background: white; border-bottom: 1px solid #ddd; }
  tbody tr { cursor: pointer; }
  .num { text-align: right; font-variant-numeric: tabular-nums; }
  code, pre { font-family: ui-monospace, SFMono-Regular, Menlo, Consolas, monospace; font-size: 13px; }
  pre { background: #fafafa; border: 1px solid #eee; padding: 8px; overflow: auto; }
</style>
</head>
<body>
<header>
  <div class="summary" id="summary"></div>
</header>

<div class="container">
  <div class="sidebar">
    <div style="display:flex; gap: 8px; margin-bottom: 8px;">
      <input id="search" placeholder="Search type, address, value..." style="flex:1; padding: 6px 8px; border: 1px solid #ddd; border-radius: 6px;">
    </div>
    <div id="list"></div>
  </div>

  <div class="main">
    <h2 id="title">Select a node</h2>
    <div id="meta" class="muted"></div>

    <table id="childTable" style="display:none;">
      <thead>
        <tr>
          <th>node</th>
          <th>type</th>
          <th class="num">alloc</th>
          <th class="num">children</th>
        </tr>
      </thead>
      <tbody id="childBody"></tbody>
    </table>

    <h3>Record</h3>
    <pre id="record"></pre>
  </div>
</div>

<script>
// Embedded graph data (JSON object literal)
const DATA = __DATA__;
const LIST_LIMIT = 1000;

const state = {
  selected: null,
  search: ""
};

const ORDER = Object.keys(DATA.nodes).sort((a, b) => DATA.nodes[b].alloc - DATA.nodes[a].alloc);

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  const t = DATA.totals;
  const el = document.getElementById("summary");
  el.innerHTML = `
    <span class="pill">nodes: <b>${t.nodes}</b></span>
    <span class="pill">edges: <b>${t.edges}</b></span>
    <span class="pill">allocated: <b>${t.total_alloc}</b></span>
    <span class="pill">anomalies: <b>${t.anomalies}</b></span>
  `;
}

function nodeMatches(node) {
  if (!state.search) return true;
  const s = state.search.toLowerCase();
  return node.name.toLowerCase().includes(s)
    || node.kind.toLowerCase().includes(s)
    || (node.value || "").toLowerCase().includes(s);
}

function renderList() {
  const root = document.getElementById("list");
  root.innerHTML = "";

  let shown = 0;
  for (const id of ORDER) {
    const node = DATA.nodes[id];
    if (!nodeMatches(node)) continue;
    if (shown++ >= LIST_LIMIT) break;

    const row = document.createElement("div");
    row.className = "node-row" + (state.selected === id ? " selected" : "");
    row.onclick = () => selectNode(id);

    const value = node.value ? ` <code>${escapeHtml(node.value)}</code>` : "";
    row.innerHTML = `<span class="swatch" style="background:${node.css_color}"></span>
      <span>${escapeHtml(node.kind)} <span class="muted">${escapeHtml(node.name)} (${node.alloc}, ${node.child_count} children)</span>${value}</span>`;
    root.appendChild(row);
  }
}

function selectNode(id) {
  const node = DATA.nodes[id];
  if (!node) return;
  state.selected = id;

  document.getElementById("title").textContent = `${node.kind} ${node.name}`;
  document.getElementById("meta").textContent =
    `address: ${node.address} | alloc: ${node.alloc} | children: ${node.child_count}`
    + (node.value ? ` | value: ${node.value}` : "")
    + (node.synthetic ? " | anonymous" : "");

  const tbl = document.getElementById("childTable");
  const body = document.getElementById("childBody");
  body.innerHTML = "";

  if (!node.children.length) {
    tbl.style.display = "none";
  } else {
    tbl.style.display = "table";
    for (const c of node.children) {
      const child = DATA.nodes[c];
      if (!child) continue;
      const tr = document.createElement("tr");
      tr.onclick = () => selectNode(c);
      tr.innerHTML = `
        <td><code>${escapeHtml(child.name)}</code></td>
        <td>${escapeHtml(child.kind)}</td>
        <td class="num">${child.alloc}</td>
        <td class="num">${child.child_count}</td>
      `;
      body.appendChild(tr);
    }
  }

  document.getElementById("record").textContent = JSON.stringify(node.record, null, 2);
  renderList();
}

document.getElementById("search").addEventListener("input", (e) => {
  state.search = e.target.value || "";
  renderList();
});

renderSummary();
renderList();
if (ORDER.length) selectNode(ORDER[0]);
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}
