//! Turns a [`Snapshot`] into an embeddable Leaflet map fragment, and wraps a
//! fragment into the auto-refreshing page served at `/`.
//!
//! The fragment is an `<iframe srcdoc>` so that its scripts still run after a
//! client swaps it into the page with `innerHTML`.

use serde::Serialize;
use tracing::debug;

use crate::error::RenderError;
use crate::models::{ScheduleBucket, Snapshot, VehiclePosition};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const AWESOME_MARKERS_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css";
const AWESOME_MARKERS_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js";
const FONT_AWESOME_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.2.0/css/all.min.css";
const POLYLINE_ENCODED_JS: &str =
    "https://cdn.jsdelivr.net/npm/polyline-encoded@0.0.9/Polyline.encoded.js";

const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const TILE_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// Marker color per schedule bucket, as Leaflet.awesome-markers color names.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub late: String,
    pub early: String,
    pub on_time: String,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            late: "red".to_string(),
            early: "green".to_string(),
            on_time: "blue".to_string(),
        }
    }
}

impl MarkerStyle {
    pub fn color(&self, bucket: ScheduleBucket) -> &str {
        match bucket {
            ScheduleBucket::Late => &self.late,
            ScheduleBucket::Early => &self.early,
            ScheduleBucket::OnTime => &self.on_time,
        }
    }
}

/// Static inputs to rendering. Route ids are deliberately absent: the
/// renderer only sees already-resolved data.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub center: (f64, f64),
    pub zoom: u8,
    /// Seconds between client-side refreshes of the full page.
    pub refresh_interval: u64,
    pub style: MarkerStyle,
}

/// Per-marker data handed to the map script.
#[derive(Debug, Serialize)]
struct Marker<'a> {
    lat: f64,
    lon: f64,
    color: &'a str,
    tooltip: String,
    popup: String,
}

#[derive(Debug, Clone)]
pub struct MapRenderer {
    config: RenderConfig,
}

impl MapRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Popup body for one vehicle. Every source-supplied value is escaped.
    pub fn popup_html(vehicle: &VehiclePosition) -> String {
        format!(
            "<div style=\"font-family: Arial; font-size: 12px;\">\
             <b>Vehicle ID:</b> {}<br>\
             <b>Status:</b> {}<br>\
             <b>Phase:</b> {}<br>\
             <b>Schedule:</b> {}<br>\
             <b>Last Update:</b> {}\
             </div>",
            escape_html(&vehicle.vehicle_id),
            escape_html(&vehicle.status),
            escape_html(&vehicle.phase),
            vehicle.schedule_status(),
            vehicle.last_update_time(),
        )
    }

    /// Renders `snapshot` into a self-contained map fragment.
    ///
    /// Output is a pure function of the snapshot and the static config.
    ///
    /// # Errors
    ///
    /// [`RenderError`] for a vehicle with an unusable coordinate or an empty
    /// route path.
    pub fn render(&self, snapshot: &Snapshot) -> Result<String, RenderError> {
        validate(snapshot)?;

        let markers: Vec<Marker<'_>> = snapshot
            .vehicles
            .iter()
            .map(|v| Marker {
                lat: v.lat,
                lon: v.lon,
                color: self.config.style.color(v.schedule_status().bucket()),
                tooltip: format!("Train {}", escape_html(&v.vehicle_id)),
                popup: Self::popup_html(v),
            })
            .collect();
        let paths: Vec<&str> = snapshot.paths.iter().map(|p| p.encoded()).collect();

        let map_doc = self.map_document(&script_json(&paths), &script_json(&markers));

        debug!(
            vehicles = markers.len(),
            paths = paths.len(),
            bytes = map_doc.len(),
            "Map rendered"
        );

        Ok(format!(
            "<div style=\"width:100%;height:0;padding-bottom:60%;\">\
             <iframe srcdoc=\"{}\" style=\"position:absolute;width:100%;height:100%;left:0;top:0;border:none !important;\" allowfullscreen></iframe>\
             </div>",
            escape_html(&map_doc)
        ))
    }

    fn map_document(&self, paths_json: &str, markers_json: &str) -> String {
        let (lat, lon) = self.config.center;
        let mut doc = String::with_capacity(2048 + paths_json.len() + markers_json.len());

        doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        for css in [LEAFLET_CSS, AWESOME_MARKERS_CSS, FONT_AWESOME_CSS] {
            doc.push_str(&format!("<link rel=\"stylesheet\" href=\"{css}\"/>\n"));
        }
        for js in [LEAFLET_JS, AWESOME_MARKERS_JS, POLYLINE_ENCODED_JS] {
            doc.push_str(&format!("<script src=\"{js}\"></script>\n"));
        }
        doc.push_str(
            "<style>html, body, #map { width: 100%; height: 100%; margin: 0; padding: 0; }</style>\n\
             </head>\n<body>\n<div id=\"map\"></div>\n<script>\n",
        );
        doc.push_str(&format!(
            "const map = L.map(\"map\").setView([{lat}, {lon}], {});\n",
            self.config.zoom
        ));
        doc.push_str(&format!(
            "L.tileLayer({}, {{ attribution: {} }}).addTo(map);\n",
            script_json(&TILE_URL),
            script_json(&TILE_ATTRIBUTION)
        ));
        doc.push_str("const paths = ");
        doc.push_str(paths_json);
        doc.push_str(";\nconst markers = ");
        doc.push_str(markers_json);
        doc.push_str(
            ";\n\
             paths.forEach((p) => L.Polyline.fromEncoded(p).addTo(map));\n\
             markers.forEach((m) => {\n\
             \x20 L.marker([m.lat, m.lon], {\n\
             \x20   icon: L.AwesomeMarkers.icon({ icon: \"train\", prefix: \"fa\", markerColor: m.color }),\n\
             \x20 })\n\
             \x20   .bindTooltip(m.tooltip)\n\
             \x20   .bindPopup(m.popup, { maxWidth: 300 })\n\
             \x20   .addTo(map);\n\
             });\n\
             </script>\n</body>\n</html>\n",
        );

        doc
    }

    /// Embeds `fragment` in the full page with the refresh countdown.
    pub fn wrap(&self, fragment: &str) -> String {
        let interval = self.config.refresh_interval;
        let mut page = String::with_capacity(PAGE_HEAD.len() + PAGE_TAIL.len() + fragment.len() + 128);

        page.push_str(PAGE_HEAD);
        page.push_str(&format!(
            "<div id=\"countdown\" data-interval=\"{interval}\">Next update in: {interval} seconds</div>\n\
             <div id=\"map-container\">\n"
        ));
        page.push_str(fragment);
        page.push_str(PAGE_TAIL);

        page
    }
}

fn validate(snapshot: &Snapshot) -> Result<(), RenderError> {
    for v in &snapshot.vehicles {
        let valid = v.lat.is_finite()
            && v.lon.is_finite()
            && (-90.0..=90.0).contains(&v.lat)
            && (-180.0..=180.0).contains(&v.lon);
        if !valid {
            return Err(RenderError::InvalidCoordinate {
                vehicle_id: v.vehicle_id.clone(),
                lat: v.lat,
                lon: v.lon,
            });
        }
    }
    if let Some(index) = snapshot.paths.iter().position(|p| p.encoded().is_empty()) {
        return Err(RenderError::EmptyPath { index });
    }
    Ok(())
}

/// JSON for inline `<script>` use; `</` is escaped so data cannot close the tag.
fn script_json<T: Serialize + ?Sized>(value: &T) -> String {
    // Serializing these plain structs and strings cannot fail.
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Sound Transit Train Tracker</title>
    <script>
        let updating = false;

        async function updateMap() {
            if (updating) return;
            updating = true;

            try {
                const response = await fetch('/map-data');
                if (response.ok) {
                    const mapHtml = await response.text();
                    document.getElementById('map-container').innerHTML = mapHtml;
                }
            } catch (error) {
                console.error('Error updating map:', error);
            } finally {
                updating = false;
            }
        }

        function startCountdown(duration) {
            let timer = duration;
            const countdownElement = document.getElementById('countdown');

            function updateCounter() {
                if (timer <= 0) {
                    updateMap();
                    timer = duration;
                }
                countdownElement.innerHTML = 'Next update in: ' + timer + ' seconds';
                timer--;
                setTimeout(updateCounter, 1000);
            }

            updateCounter();
        }

        document.addEventListener('DOMContentLoaded', function() {
            const el = document.getElementById('countdown');
            startCountdown(Number(el.dataset.interval));
        });
    </script>
    <style>
        #countdown {
            position: fixed;
            bottom: 20px;
            right: 20px;
            background: white;
            padding: 10px;
            border: 1px solid black;
            border-radius: 5px;
            z-index: 1000;
            font-family: Arial, sans-serif;
        }
        #map-container {
            width: 100%;
            height: 100%;
        }
    </style>
</head>
<body>
"#;

const PAGE_TAIL: &str = "\n</div>\n</body>\n</html>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoutePath;

    fn renderer() -> MapRenderer {
        MapRenderer::new(RenderConfig {
            center: (47.609941, -122.257517),
            zoom: 12,
            refresh_interval: 60,
            style: MarkerStyle::default(),
        })
    }

    fn vehicle(id: &str, deviation: i64) -> VehiclePosition {
        VehiclePosition {
            vehicle_id: id.to_string(),
            lat: 47.6,
            lon: -122.3,
            timestamp: 1_700_000_000_000,
            status: "SCHEDULED".to_string(),
            phase: "in_progress".to_string(),
            schedule_deviation: deviation,
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            vehicles: vec![vehicle("late", 125), vehicle("early", -60), vehicle("ontime", 0)],
            paths: vec![RoutePath("_p~iF~ps|U_ulLnnqC".to_string())],
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let r = renderer();
        assert_eq!(r.render(&snapshot()).unwrap(), r.render(&snapshot()).unwrap());
    }

    #[test]
    fn test_colors_follow_bucket() {
        let html = renderer().render(&snapshot()).unwrap();
        for color in ["red", "green", "blue"] {
            let needle = format!("&quot;color&quot;:&quot;{color}&quot;");
            assert_eq!(html.matches(&needle).count(), 1, "color {color}");
        }
    }

    #[test]
    fn test_color_is_independent_of_magnitude() {
        let style = MarkerStyle::default();
        let a = vehicle("a", 1).schedule_status().bucket();
        let b = vehicle("b", 7200).schedule_status().bucket();
        assert_eq!(style.color(a), style.color(b));
    }

    #[test]
    fn test_popup_contains_label_fields() {
        let popup = MapRenderer::popup_html(&vehicle("40_11", 125));
        assert!(popup.contains("<b>Vehicle ID:</b> 40_11"));
        assert!(popup.contains("<b>Status:</b> SCHEDULED"));
        assert!(popup.contains("<b>Phase:</b> in_progress"));
        assert!(popup.contains("<b>Schedule:</b> 2 mins late"));
        assert!(popup.contains("<b>Last Update:</b> "));
    }

    #[test]
    fn test_source_strings_are_escaped() {
        let mut v = vehicle("<script>alert(1)</script>", 0);
        v.status = "a&b".to_string();
        let html = renderer()
            .render(&Snapshot {
                vehicles: vec![v],
                paths: vec![],
            })
            .unwrap();
        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("</script>alert"));
        assert!(!html.contains("a&b"));
    }

    #[test]
    fn test_fragment_embeds_center_zoom_and_paths() {
        let html = renderer().render(&snapshot()).unwrap();
        assert!(html.starts_with("<div style=\"width:100%;height:0;padding-bottom:60%;\">"));
        assert!(html.contains("setView([47.609941, -122.257517], 12)"));
        assert!(html.contains("_p~iF~ps|U_ulLnnqC"));
    }

    #[test]
    fn test_empty_snapshot_renders() {
        let html = renderer().render(&Snapshot::default()).unwrap();
        assert!(html.contains("const paths = []"));
        assert!(html.contains("const markers = []"));
    }

    #[test]
    fn test_invalid_coordinate_fails() {
        let mut v = vehicle("bad", 0);
        v.lat = f64::NAN;
        let err = renderer()
            .render(&Snapshot {
                vehicles: vec![v],
                paths: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_empty_path_fails() {
        let err = renderer()
            .render(&Snapshot {
                vehicles: vec![],
                paths: vec![RoutePath("abc".into()), RoutePath(String::new())],
            })
            .unwrap_err();
        assert_eq!(err, RenderError::EmptyPath { index: 1 });
    }

    #[test]
    fn test_wrap_embeds_fragment_and_interval() {
        let page = renderer().wrap("<p>FRAGMENT</p>");
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Sound Transit Train Tracker</title>"));
        assert!(page.contains("data-interval=\"60\">Next update in: 60 seconds</div>"));
        assert!(page.contains("<div id=\"map-container\">\n<p>FRAGMENT</p>\n</div>"));
        assert!(page.contains("fetch('/map-data')"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    }
}
