#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::Object;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use predial::pdf::{PageSettings, PdfDocument};
use predial::transport::{Fetched, Freshness, Transport, TransportError};
use predial::{
    format::NumberLocale, DocumentAssembler, MissPolicy, ResourceCache, TaxpayerRecord,
};

pub const JURISDICTION: &str = "MDSM";
pub const PERIOD: &str = "2025";

/// A transport over files kept in memory, which counts the retrievals of every path.
#[derive(Default)]
pub struct MemoryTransport {
    files: parking_lot::Mutex<HashMap<String, Vec<u8>>>,
    unreachable: parking_lot::Mutex<HashSet<String>>,
    fetches: parking_lot::Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    most_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every retrieval waits for the delay, so that concurrent callers overlap.
    pub fn with_delay(delay: Duration) -> Self {
        MemoryTransport {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.files.lock().insert(path.to_string(), bytes);
    }

    /// Makes the retrievals of the path fail as if the source could not be reached.
    pub fn make_unreachable(&self, path: &str) {
        self.unreachable.lock().insert(path.to_string());
    }

    pub fn make_reachable(&self, path: &str) {
        self.unreachable.lock().remove(path);
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_fetch_count(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    /// The largest number of retrievals that were running at the same time.
    pub fn most_in_flight(&self) -> usize {
        self.most_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, path: &str, _freshness: Freshness) -> Result<Fetched, TransportError> {
        *self.fetches.lock().entry(path.to_string()).or_default() += 1;
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.most_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.unreachable.lock().contains(path) {
            return Err(TransportError::Io {
                path: path.into(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
            });
        }
        Ok(match self.files.lock().get(path) {
            Some(bytes) => Fetched::Found(bytes.clone()),
            None => Fetched::Missing,
        })
    }
}

pub fn template_document_path(form: &str) -> String {
    format!("formato/{JURISDICTION}/{PERIOD}/formatos/{form}.pdf")
}

pub fn template_image_path(form: &str) -> String {
    format!("formato/{JURISDICTION}/{PERIOD}/imagenes/{form}.png")
}

/// A one page PDF usable as a template, with a marker text on it.
pub fn template_pdf(marker: &str) -> Vec<u8> {
    let mut pdf_document = PdfDocument::new("template".into(), PageSettings::default());
    pdf_document.rect(5.0, 5.0, 200.0, 138.0).unwrap();
    pdf_document.text(marker, 100.0, 10.0).unwrap();
    pdf_document.save_to_bytes().unwrap()
}

pub fn template_png() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(4, 3, image::Rgba([240, 240, 255, 128]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub const SAMPLE_RECORD: &str = r#"{
    "CODIGO": "123",
    "RAZON_SOCIAL": "PEÑA SALAZAR MARÍA",
    "DISTRITO_DOMICILIO_FISCAL": "SAN MARTIN DE PORRES",
    "DOMICILIO_FISCAL": "AV. PERU 1520",
    "adicional": { "documento": "40123456", "nautova": 154320.5 },
    "valorafectototal": "100000.25",
    "hlp_npre": { "nro_predios": 3 },
    "hr_predios": {
        "P-010": {
            "pred": 1, "codpredio": "P-010", "sectorpredio": "S1", "tipogrupohab": "URB",
            "grupourbano": "PALAO", "tipovia": "JR", "nombrevia": "LAS ORQUIDEAS", "direccion": "245",
            "nvalpre": 60000, "nporcen": "100.00", "afecto": 45000.5,
            "pu_predio": { "tipopredio": "CASA HABITACION", "usogen": "VIVIENDA", "estadocons": "TERMINADO", "condicion": "PROPIETARIO UNICO" },
            "pu_predio2": { "nterren": 32000, "narecom": 26500.75, "narance": 150 },
            "hla_tasas": { "nfrente": 12.5 },
            "hla_cuotas": { "bc": 125.3 }
        },
        "P-002": {
            "pred": "2", "codpredio": "P-002", "sectorpredio": "", "tipogrupohab": " ",
            "grupourbano": "", "tipovia": "AV", "nombrevia": "TOMAS VALLE", "direccion": "1100",
            "nvalpre": 54320.5, "nporcen": "50.00", "afecto": 30000,
            "pu_predio": { "tipopredio": "TIENDA", "usogen": "COMERCIO", "estadocons": "TERMINADO", "condicion": "CONDOMINO" },
            "pu_predio2": { "nterren": 20000, "narecom": 34320.5, "narance": 98 },
            "hla_tasas": { "nfrente": 6 },
            "hla_cuotas": { "bc": 80 }
        },
        "P-031": {
            "pred": 3, "codpredio": "P-031", "tipovia": "CA", "nombrevia": "LOS ALAMOS", "direccion": "77",
            "nvalpre": 40000, "nporcen": "100.00", "afecto": 24999.75,
            "pu_predio": { "tipopredio": "TERRENO", "usogen": "SIN USO", "estadocons": "", "condicion": "PROPIETARIO UNICO" },
            "pu_predio2": { "nterren": 40000, "narecom": 0, "narance": 120 },
            "hla_tasas": { "nfrente": 9.25 },
            "hla_cuotas": { "bc": 60.5 }
        }
    }
}"#;

pub fn sample_record() -> TaxpayerRecord {
    serde_json::from_str(SAMPLE_RECORD).unwrap()
}

pub fn assembler_over(transport: Arc<MemoryTransport>, miss_policy: MissPolicy) -> DocumentAssembler {
    DocumentAssembler::new(
        Arc::new(ResourceCache::new(transport, miss_policy)),
        PageSettings::default(),
        NumberLocale::default(),
    )
}

/// The operators of a page content stream along with their decoded text, in order.
pub struct PageContent {
    pub operators: Vec<String>,
    pub texts: Vec<String>,
}

impl PageContent {
    pub fn contains(&self, text: &str) -> bool {
        self.texts.iter().any(|shown| shown == text)
    }
}

/// Parses the document and returns the content of every page, in page order.
pub fn page_contents(bytes: &[u8]) -> Vec<PageContent> {
    let document = lopdf::Document::load_mem(bytes).unwrap();
    document
        .get_pages()
        .into_values()
        .map(|page_id| {
            let content = document.get_page_content(page_id).unwrap();
            let operations = lopdf::content::Content::decode(&content).unwrap().operations;
            PageContent {
                operators: operations
                    .iter()
                    .map(|operation| operation.operator.clone())
                    .collect(),
                texts: operations
                    .iter()
                    .filter(|operation| operation.operator == "Tj")
                    .filter_map(|operation| match operation.operands.first() {
                        Some(Object::String(bytes, _)) => Some(decode_win_ansi(bytes)),
                        _ => None,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Good enough for the ASCII and Latin-1 text the fixtures use.
pub fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}
