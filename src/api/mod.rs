use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::Config;
use crate::geo::LatLng;

/// Max cell ids per /s2info call
const ID_CHUNK_SIZE: usize = 75;
/// Token the service returns for ids it could not resolve
const UNRESOLVED_TOKEN: &str = "X";
const USER_AGENT: &str = "s2scope/0.1";

/// A lat/lng pair as the geometry service encodes it
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct CellPoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<CellPoint> for LatLng {
    fn from(p: CellPoint) -> Self {
        LatLng::new(p.lat, p.lng)
    }
}

/// S2 cell descriptor as returned by /s2info and /s2cover. Opaque to us
/// beyond the fields rendered; ids tolerate string and number encodings.
#[derive(Clone, Debug, Deserialize)]
pub struct CellInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id_signed: String,
    pub token: String,
    #[serde(default)]
    pub face: Option<i64>,
    pub level: u8,
    pub ll: CellPoint,
    #[serde(default)]
    pub shape: Vec<CellPoint>,
}

impl CellInfo {
    /// Unresolvable ids come back as sentinel descriptors; skip those
    pub fn is_resolved(&self) -> bool {
        self.token != UNRESOLVED_TOKEN
    }

    pub fn center(&self) -> LatLng {
        self.ll.into()
    }

    pub fn outline(&self) -> Vec<LatLng> {
        self.shape.iter().map(|&p| p.into()).collect()
    }

    /// Info-panel description block built from the descriptor's fields
    pub fn description(&self) -> Vec<String> {
        vec![
            format!("cell id (unsigned): {}", self.id),
            format!("cell id (signed): {}", self.id_signed),
            format!("cell token: {}", self.token),
            format!("level: {}", self.level),
            format!("center: {},{}", self.ll.lat, self.ll.lng),
        ]
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Optional covering parameters; only set values are sent
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoverParams {
    pub min_level: Option<u8>,
    pub max_level: Option<u8>,
    pub max_cells: Option<u32>,
    pub level_mod: Option<u8>,
}

impl CoverParams {
    fn query(&self, points: &[LatLng]) -> Vec<(String, String)> {
        let joined = points
            .iter()
            .map(|ll| format!("{},{}", ll.lat, ll.lng))
            .collect::<Vec<_>>()
            .join(",");

        let mut pairs = vec![("points".to_string(), joined)];
        if let Some(v) = self.min_level {
            pairs.push(("min_level".to_string(), v.to_string()));
        }
        if let Some(v) = self.max_level {
            pairs.push(("max_level".to_string(), v.to_string()));
        }
        if let Some(v) = self.max_cells {
            pairs.push(("max_cells".to_string(), v.to_string()));
        }
        if let Some(v) = self.level_mod {
            pairs.push(("level_mod".to_string(), v.to_string()));
        }
        pairs
    }
}

/// Per-cell color/description overrides from a heatmap file
#[derive(Clone, Debug, Default)]
pub struct CellStyles {
    colors: HashMap<String, String>,
    descriptions: HashMap<String, String>,
}

impl CellStyles {
    /// Color lookup tries token, then unsigned id, then signed id
    pub fn color_for(&self, cell: &CellInfo) -> Option<String> {
        self.lookup(&self.colors, cell).map(|hex| format!("#{hex}"))
    }

    pub fn description_for(&self, cell: &CellInfo) -> Option<&str> {
        self.lookup(&self.descriptions, cell)
    }

    fn lookup<'a>(&self, map: &'a HashMap<String, String>, cell: &CellInfo) -> Option<&'a str> {
        map.get(&cell.token)
            .or_else(|| map.get(&cell.id))
            .or_else(|| map.get(&cell.id_signed))
            .map(String::as_str)
    }
}

/// Parse heatmap text: one `cell,color[,description]` line per cell
pub fn parse_heatmap(data: &str) -> (Vec<String>, CellStyles) {
    let mut cells = Vec::new();
    let mut styles = CellStyles::default();

    for line in data.lines() {
        let mut parts = line.splitn(3, ',');
        let Some(cell) = parts.next().filter(|c| !c.is_empty()) else {
            continue;
        };
        cells.push(cell.to_string());
        if let Some(color) = parts.next() {
            styles.colors.insert(cell.to_string(), color.to_string());
        }
        if let Some(desc) = parts.next().filter(|d| !d.is_empty()) {
            styles.descriptions.insert(cell.to_string(), desc.to_string());
        }
    }

    (cells, styles)
}

/// A fetch the UI wants performed
#[derive(Clone, Debug)]
pub enum ApiRequest {
    /// Resolve cell identifiers via /s2info
    CellInfo { ids: Vec<String> },
    /// Compute a covering for a point set via /s2cover
    Cover {
        points: Vec<LatLng>,
        params: CoverParams,
    },
    /// Fetch a heatmap file through the /fetch proxy, then resolve its cells
    Heatmap { url: String },
}

/// What the worker sends back; drained by the event loop each frame
#[derive(Clone, Debug)]
pub enum ApiEvent {
    Cells {
        cells: Vec<CellInfo>,
        styles: Option<CellStyles>,
    },
    Failed { what: String },
}

/// Handle to the background fetch thread. Fire-and-forget: requests go in,
/// events come out, a dropped handle lets the worker wind down.
pub struct ApiHandle {
    tx: Sender<ApiRequest>,
    rx: Receiver<ApiEvent>,
}

impl ApiHandle {
    pub fn spawn(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build reqwest client")?;
        let base = cfg.api_url.trim_end_matches('/').to_string();

        let (req_tx, req_rx) = mpsc::channel();
        let (ev_tx, ev_rx) = mpsc::channel();
        thread::spawn(move || worker(client, base, req_rx, ev_tx));

        Ok(Self {
            tx: req_tx,
            rx: ev_rx,
        })
    }

    pub fn request(&self, request: ApiRequest) {
        // Worker gone means we are shutting down; nothing to do
        let _ = self.tx.send(request);
    }

    pub fn poll(&self) -> Option<ApiEvent> {
        self.rx.try_recv().ok()
    }
}

fn worker(client: Client, base: String, rx: Receiver<ApiRequest>, tx: Sender<ApiEvent>) {
    while let Ok(request) = rx.recv() {
        for event in handle_request(&client, &base, request) {
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

fn handle_request(client: &Client, base: &str, request: ApiRequest) -> Vec<ApiEvent> {
    match request {
        ApiRequest::CellInfo { ids } => resolve_cells(client, base, &ids, None),
        ApiRequest::Cover { points, params } => {
            debug!("covering {} points", points.len());
            match fetch_cover(client, base, &points, &params) {
                Ok(cells) => vec![ApiEvent::Cells {
                    cells,
                    styles: None,
                }],
                Err(error) => failed("s2cover", error),
            }
        }
        ApiRequest::Heatmap { url } => match fetch_heatmap_text(client, base, &url) {
            Ok(data) => {
                let (ids, styles) = parse_heatmap(&data);
                debug!("heatmap {} listed {} cells", url, ids.len());
                resolve_cells(client, base, &ids, Some(styles))
            }
            Err(error) => failed("heatmap fetch", error),
        },
    }
}

/// Split ids into /s2info-sized request batches
fn id_chunks(ids: &[String]) -> impl Iterator<Item = &[String]> {
    ids.chunks(ID_CHUNK_SIZE)
}

/// Resolve ids in chunks; each chunk becomes its own event so partial
/// results still render
fn resolve_cells(
    client: &Client,
    base: &str,
    ids: &[String],
    styles: Option<CellStyles>,
) -> Vec<ApiEvent> {
    let mut events = Vec::new();
    for chunk in id_chunks(ids) {
        match fetch_cells(client, base, chunk) {
            Ok(cells) => {
                debug!("resolved {} of {} ids", cells.len(), chunk.len());
                events.push(ApiEvent::Cells {
                    cells,
                    styles: styles.clone(),
                });
            }
            Err(error) => events.extend(failed("s2info", error)),
        }
    }
    events
}

fn fetch_cells(client: &Client, base: &str, ids: &[String]) -> Result<Vec<CellInfo>> {
    let url = format!("{base}/s2info");
    let response = client
        .get(&url)
        .query(&[("id", ids.join(","))])
        .send()
        .with_context(|| format!("Request failed for {url}"))?;

    if !response.status().is_success() {
        bail!("Request failed ({}) for {url}", response.status());
    }

    response
        .json()
        .with_context(|| format!("Failed to decode body for {url}"))
}

fn fetch_cover(
    client: &Client,
    base: &str,
    points: &[LatLng],
    params: &CoverParams,
) -> Result<Vec<CellInfo>> {
    let url = format!("{base}/s2cover");
    let response = client
        .get(&url)
        .query(&params.query(points))
        .send()
        .with_context(|| format!("Request failed for {url}"))?;

    if !response.status().is_success() {
        bail!("Request failed ({}) for {url}", response.status());
    }

    response
        .json()
        .with_context(|| format!("Failed to decode body for {url}"))
}

fn fetch_heatmap_text(client: &Client, base: &str, heatmap_url: &str) -> Result<String> {
    let url = format!("{base}/fetch");
    let response = client
        .get(&url)
        .query(&[("url", heatmap_url)])
        .send()
        .with_context(|| format!("Request failed for {url}"))?;

    if !response.status().is_success() {
        bail!("Request failed ({}) for {url}", response.status());
    }

    response
        .text()
        .with_context(|| format!("Failed to read text body for {url}"))
}

/// Failures are warnings: the overlay simply does not update
fn failed(what: &str, error: anyhow::Error) -> Vec<ApiEvent> {
    warn!("{what} failed: {error:#}");
    vec![ApiEvent::Failed {
        what: format!("{what} failed: {error:#}"),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cell(token: &str) -> CellInfo {
        CellInfo {
            id: "9263007499635197952".to_string(),
            id_signed: "-9183736574074353664".to_string(),
            token: token.to_string(),
            face: Some(4),
            level: 12,
            ll: CellPoint {
                lat: 40.74,
                lng: -74.0,
            },
            shape: vec![],
        }
    }

    #[test]
    fn test_deserialize_string_and_number_ids() {
        let json = r#"[
            {"id": "9263007499635197952", "id_signed": "-9183736574074353664",
             "token": "808f7ed4", "face": 4, "level": 12,
             "ll": {"lat": 40.74, "lng": -74.0},
             "shape": [{"lat": 40.7, "lng": -74.1}, {"lat": 40.8, "lng": -74.1},
                       {"lat": 40.8, "lng": -73.9}, {"lat": 40.7, "lng": -73.9}]},
            {"id": 3383782026652942336, "id_signed": 3383782026652942336,
             "token": "2ef59bd3", "level": 30,
             "ll": {"lat": 1.0, "lng": 2.0}}
        ]"#;
        let cells: Vec<CellInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].id, "9263007499635197952");
        assert_eq!(cells[0].outline().len(), 4);
        assert_eq!(cells[1].id, "3383782026652942336");
        assert_eq!(cells[1].id_signed, "3383782026652942336");
        assert!(cells[1].shape.is_empty());
    }

    #[test]
    fn test_unresolved_sentinel() {
        assert!(!sample_cell("X").is_resolved());
        assert!(sample_cell("808f7ed4").is_resolved());
    }

    #[test]
    fn test_description_lines() {
        let cell = sample_cell("808f7ed4");
        let desc = cell.description();
        assert_eq!(desc[0], "cell id (unsigned): 9263007499635197952");
        assert_eq!(desc[2], "cell token: 808f7ed4");
        assert_eq!(desc[3], "level: 12");
        assert_eq!(desc[4], "center: 40.74,-74");
    }

    #[test]
    fn test_cover_query_includes_only_set_params() {
        let params = CoverParams {
            min_level: Some(4),
            max_cells: Some(50),
            ..CoverParams::default()
        };
        let points = vec![LatLng::new(40.74, -74.0), LatLng::new(40.75, -74.1)];
        let query = params.query(&points);
        assert_eq!(query[0].0, "points");
        assert_eq!(query[0].1, "40.74,-74,40.75,-74.1");
        assert!(query.iter().any(|(k, v)| k == "min_level" && v == "4"));
        assert!(query.iter().any(|(k, v)| k == "max_cells" && v == "50"));
        assert!(!query.iter().any(|(k, _)| k == "max_level"));
        assert!(!query.iter().any(|(k, _)| k == "level_mod"));
    }

    #[test]
    fn test_ids_chunked_for_s2info() {
        let ids: Vec<String> = (0..160).map(|i| format!("{i:x}")).collect();
        let sizes: Vec<usize> = id_chunks(&ids).map(<[String]>::len).collect();
        assert_eq!(sizes, vec![75, 75, 10]);

        let few: Vec<String> = vec!["808f7ed4".to_string()];
        assert_eq!(id_chunks(&few).count(), 1);
    }

    #[test]
    fn test_parse_heatmap() {
        let data = "808f7ed4,ff0000,downtown\n808f7ed6,00ff00\n\n";
        let (cells, styles) = parse_heatmap(data);
        assert_eq!(cells, vec!["808f7ed4", "808f7ed6"]);

        let mut cell = sample_cell("808f7ed4");
        assert_eq!(styles.color_for(&cell).as_deref(), Some("#ff0000"));
        assert_eq!(styles.description_for(&cell), Some("downtown"));

        cell.token = "808f7ed6".to_string();
        assert_eq!(styles.color_for(&cell).as_deref(), Some("#00ff00"));
        assert_eq!(styles.description_for(&cell), None);
    }

    #[test]
    fn test_heatmap_lookup_falls_back_to_ids() {
        let data = "9263007499635197952,0000ff\n";
        let (_, styles) = parse_heatmap(data);
        let cell = sample_cell("808f7ed4");
        assert_eq!(styles.color_for(&cell).as_deref(), Some("#0000ff"));
    }
}
