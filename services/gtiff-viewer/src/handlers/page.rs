//! Session entry point and the viewer page.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{Html, Redirect},
};
use tracing::info;

use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

/// Viewer page; the session id is read from the URL by the script.
const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>GeoTIFF Layers Viewer</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>
        body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 960px; padding: 16px; }
        h1 { font-size: 1.8rem; }
        .field { margin-bottom: 10px; }
        .field label { display: block; font-weight: 600; }
        .field input[type=text] { width: 100%; padding: 6px; box-sizing: border-box; }
        .field small { color: #666; }
        .message { padding: 10px; border-radius: 4px; margin: 10px 0; display: none; }
        .message.success { background: #e6f4ea; display: block; }
        .message.warning { background: #fff4e5; display: block; }
        .message.error { background: #fdecea; display: block; }
        #map { height: 520px; margin-top: 12px; display: none; }
        #selector { display: none; margin-top: 12px; }
        #selector input { width: 100%; }
        button { padding: 8px 14px; margin-right: 6px; }
    </style>
</head>
<body>
    <h1>GeoTIFF Layers Viewer</h1>
    <form id="form"></form>
    <button id="run">Run meteohub_request</button>
    <button id="cancel" disabled>Cancel</button>
    <div id="status" class="message"></div>
    <div id="result" class="message"></div>
    <div id="selector">
        <label for="layer">Select Layer: <span id="layer-value">1</span></label>
        <input id="layer" type="range" min="1" max="1" value="1" step="1">
    </div>
    <div id="map"></div>
    <script>
        const sessionPath = window.location.pathname.replace(/\/$/, '');
        const api = sessionPath + '/api';
        let map = null;
        let overlay = null;
        let poller = null;

        function show(el, kind, text) {
            el.className = 'message ' + kind;
            el.textContent = text;
        }

        function hide(el) {
            el.className = 'message';
            el.textContent = '';
        }

        function formValues() {
            const values = {};
            document.querySelectorAll('#form input').forEach((input) => {
                values[input.name] = input.type === 'checkbox' ? input.checked : input.value;
            });
            return values;
        }

        function formQuery(extra) {
            const params = new URLSearchParams();
            Object.entries(formValues()).forEach(([key, value]) => params.set(key, String(value)));
            Object.entries(extra || {}).forEach(([key, value]) => params.set(key, String(value)));
            return params.toString();
        }

        async function loadForm() {
            const response = await fetch(api + '/form');
            const body = await response.json();
            const form = document.getElementById('form');
            body.fields.forEach((field) => {
                const wrapper = document.createElement('div');
                wrapper.className = 'field';
                const label = document.createElement('label');
                label.textContent = field.label;
                const input = document.createElement('input');
                input.name = field.name;
                if (field.kind === 'toggle') {
                    input.type = 'checkbox';
                    input.checked = field.value === 'true';
                    label.prepend(input);
                    wrapper.appendChild(label);
                } else {
                    input.type = 'text';
                    input.value = field.value;
                    wrapper.appendChild(label);
                    wrapper.appendChild(input);
                }
                input.addEventListener('change', () => renderLayers(1));
                const help = document.createElement('small');
                help.textContent = field.help;
                wrapper.appendChild(help);
                form.appendChild(wrapper);
            });
        }

        async function pollStatus() {
            const response = await fetch(api + '/status');
            if (!response.ok) return;
            const body = await response.json();
            if (body.retrieval.state === 'running') {
                show(document.getElementById('status'), 'warning',
                    'Retrieval running for ' + Math.round(body.elapsed_secs) + ' s');
            } else {
                hide(document.getElementById('status'));
            }
        }

        async function runRetrieval() {
            const result = document.getElementById('result');
            hide(result);
            document.getElementById('run').disabled = true;
            document.getElementById('cancel').disabled = false;
            poller = setInterval(pollStatus, 1000);
            try {
                const response = await fetch(api + '/retrieve', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify(formValues()),
                });
                const body = await response.json();
                if (body.success) {
                    show(result, 'success', body.message);
                } else {
                    show(result, 'error', body.error);
                }
            } catch (err) {
                show(result, 'error', String(err));
            } finally {
                clearInterval(poller);
                hide(document.getElementById('status'));
                document.getElementById('run').disabled = false;
                document.getElementById('cancel').disabled = true;
            }
            await renderLayers(1);
        }

        async function renderLayers(position) {
            const response = await fetch(api + '/layers?' + formQuery({ position }));
            const body = await response.json();
            const result = document.getElementById('result');
            const mapEl = document.getElementById('map');
            const selector = document.getElementById('selector');

            if (!response.ok) {
                show(result, 'error', body.error);
                return;
            }
            if (body.status === 'empty') {
                mapEl.style.display = 'none';
                selector.style.display = 'none';
                show(result, 'warning', body.warning);
                return;
            }

            mapEl.style.display = 'block';
            if (!map) {
                map = L.map('map');
                L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
                    attribution: '&copy; OpenStreetMap contributors',
                }).addTo(map);
            }
            if (body.map) {
                map.setView(body.map.center, body.map.zoom);
            }

            const slider = document.getElementById('layer');
            slider.min = body.selector.min;
            slider.max = body.selector.max;
            slider.value = body.selector.value;
            slider.disabled = body.selector.min === body.selector.max;
            document.getElementById('layer-value').textContent = body.selector.value;
            selector.style.display = 'block';

            if (overlay) {
                map.removeLayer(overlay);
                overlay = null;
            }
            if (body.layer) {
                overlay = L.imageOverlay(body.layer.image_url, body.layer.bounds, {
                    opacity: body.layer.opacity,
                    interactive: body.layer.interactive,
                    crossOrigin: body.layer.cross_origin,
                    zIndex: body.layer.z_index,
                }).addTo(map);
            } else if (body.error) {
                show(result, 'error', body.error.message);
            }
        }

        document.getElementById('run').addEventListener('click', runRetrieval);
        document.getElementById('cancel').addEventListener('click', () => {
            fetch(api + '/cancel', { method: 'POST' });
        });
        document.getElementById('layer').addEventListener('change', (event) => {
            renderLayers(Number(event.target.value));
        });

        loadForm().then(() => renderLayers(1));
    </script>
</body>
</html>"#;

/// GET / - Create a session and send the browser to it
pub async fn root_handler(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Redirect> {
    let session = state.sessions.create().await?;
    metrics::record_sessions(state.sessions.len().await);
    info!(session_id = %session.id, "New viewer session");
    Ok(Redirect::to(&format!("/sessions/{}", session.id)))
}

/// GET /sessions/:id - The viewer page
pub async fn page_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Html<&'static str>> {
    state.sessions.get(&id).await?;
    Ok(Html(PAGE_HTML))
}
