//! Assembly of the requested forms into a single PDF document, one page per rendered form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ContextError, FormError, GenerationError};
use crate::format::NumberLocale;
use crate::forms::FormCode;
use crate::pdf::{PageSettings, PdfDocument, Rgb};
use crate::record::TaxpayerRecord;
use crate::resource::{Resource, ResourceCache, TemplateKey};

pub const ERROR_MARKER_FONT_SIZE: f32 = 10.0;
pub const ERROR_MARKER_COLOR: Rgb = [255, 0, 0];
/// Position of the error marker, in millimeters from the top-left corner of the page.
pub const ERROR_MARKER_POSITION: (f32, f32) = (10.0, 10.0);

const DATA_URI_PREFIX: &str = "data:application/pdf;filename=generated.pdf;base64,";

/// Which properties the per-property forms are rendered for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PropertySelection {
    /// Every property of the record, in the order they are stored.
    #[default]
    All,
    /// The listed property codes, in the given order. Codes the record does not have
    /// produce a page carrying the error.
    Only(Vec<String>),
}

impl PropertySelection {
    fn property_codes(&self, record: &TaxpayerRecord) -> Vec<String> {
        match self {
            PropertySelection::All => record.properties.keys().cloned().collect(),
            PropertySelection::Only(property_codes) => property_codes.clone(),
        }
    }
}

/// The forms to render, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    pub forms: Vec<FormCode>,
    pub properties: PropertySelection,
}

impl FormRequest {
    pub fn new(forms: impl Into<Vec<FormCode>>) -> Self {
        FormRequest {
            forms: forms.into(),
            properties: PropertySelection::All,
        }
    }

    pub fn with_properties(mut self, properties: PropertySelection) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Idle,
    Generating,
}

/// Where a generated document should end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    DataUri,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutput {
    DataUri(String),
    File(PathBuf),
}

/// A finished PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl GeneratedDocument {
    /// The document as a data URI, which browsers open directly.
    pub fn to_data_uri(&self) -> String {
        format!("{DATA_URI_PREFIX}{}", BASE64.encode(&self.bytes))
    }

    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), GenerationError> {
        let path = path.as_ref();
        tokio::fs::write(path, &self.bytes)
            .await
            .map_err(|source| GenerationError::Output {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("Saved the generated document to the path: {:?}", path);

        Ok(())
    }
}

/// The document under construction, owned by a single generation.
struct DocumentBuilder {
    pdf_document: PdfDocument,
    current_page_used: bool,
}

impl DocumentBuilder {
    fn new(identifier: String, settings: PageSettings) -> Self {
        DocumentBuilder {
            pdf_document: PdfDocument::new(identifier, settings),
            current_page_used: false,
        }
    }

    /// Renders one form on a page of its own. A failing form gets an error marker on its page
    /// and does not stop the batch.
    fn render(
        &mut self,
        form: FormCode,
        background: Option<&Resource>,
        record: &TaxpayerRecord,
        property_code: Option<&str>,
        locale: &NumberLocale,
    ) -> Result<(), ContextError> {
        if self.current_page_used {
            self.pdf_document.add_page();
        }
        self.current_page_used = true;

        log::debug!(
            "Rendering {} on page {}{}",
            form,
            self.pdf_document.page_count(),
            property_code
                .map(|property_code| format!(" for the property {property_code}"))
                .unwrap_or_default()
        );
        match form.render(&mut self.pdf_document, background, record, property_code, locale) {
            Ok(()) => Ok(()),
            Err(error) => {
                log::error!("Failed to render {}: {}", form, error);
                self.mark_error(&error)
            }
        }
    }

    fn mark_error(&mut self, error: &FormError) -> Result<(), ContextError> {
        let previous_font_size = self.pdf_document.font_size();

        self.pdf_document.set_font_size(ERROR_MARKER_FONT_SIZE);
        self.pdf_document.set_text_color(ERROR_MARKER_COLOR);
        let (x, y) = ERROR_MARKER_POSITION;
        let result = self.pdf_document.text(&format!("Error: {error}"), x, y);

        self.pdf_document.set_text_color([0, 0, 0]);
        self.pdf_document.set_font_size(previous_font_size);

        result
    }

    fn finish(self) -> Result<GeneratedDocument, ContextError> {
        let page_count = self.pdf_document.page_count();
        let bytes = self.pdf_document.save_to_bytes()?;
        Ok(GeneratedDocument { bytes, page_count })
    }
}

/// Puts the assembler back to `Idle` however the generation ends, dropped futures included.
struct GeneratingGuard<'a> {
    state: &'a parking_lot::Mutex<AssemblerState>,
}

impl<'a> GeneratingGuard<'a> {
    fn enter(state: &'a parking_lot::Mutex<AssemblerState>) -> Self {
        *state.lock() = AssemblerState::Generating;
        GeneratingGuard { state }
    }
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = AssemblerState::Idle;
    }
}

/// Generates the documents of a taxpayer. Concurrent generations on the same assembler
/// run one after the other.
pub struct DocumentAssembler {
    resources: Arc<ResourceCache>,
    settings: PageSettings,
    locale: NumberLocale,
    state: parking_lot::Mutex<AssemblerState>,
    generation_lock: tokio::sync::Mutex<()>,
}

impl DocumentAssembler {
    pub fn new(resources: Arc<ResourceCache>, settings: PageSettings, locale: NumberLocale) -> Self {
        DocumentAssembler {
            resources,
            settings,
            locale,
            state: parking_lot::Mutex::new(AssemblerState::Idle),
            generation_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> AssemblerState {
        *self.state.lock()
    }

    /// Renders the requested forms for the taxpayer over the templates of the jurisdiction
    /// and fiscal period, and returns the finished document.
    pub async fn generate_complete(
        &self,
        request: &FormRequest,
        record: &TaxpayerRecord,
        jurisdiction: &str,
        period: &str,
    ) -> Result<GeneratedDocument, GenerationError> {
        let _generation = self.generation_lock.lock().await;
        let _guard = GeneratingGuard::enter(&self.state);

        log::info!(
            "Generating {:?} for the taxpayer {} ({}/{})",
            request.forms,
            record.code,
            jurisdiction,
            period
        );
        let mut builder = DocumentBuilder::new(
            format!("predial-{}-{}-{}", jurisdiction, period, record.padded_code()),
            self.settings.clone(),
        );

        for form in &request.forms {
            let background = self
                .resources
                .resolve(&TemplateKey::new(jurisdiction, period, *form))
                .await;

            if form.is_per_property() {
                for property_code in request.properties.property_codes(record) {
                    builder.render(
                        *form,
                        background.as_ref(),
                        record,
                        Some(&property_code),
                        &self.locale,
                    )?;
                }
            } else {
                builder.render(*form, background.as_ref(), record, None, &self.locale)?;
            }
        }

        let generated_document = builder.finish()?;
        log::info!(
            "Generated {} pages for the taxpayer {}",
            generated_document.page_count,
            record.code
        );

        Ok(generated_document)
    }

    /// Generates the document and delivers it to the target.
    pub async fn generate_to(
        &self,
        request: &FormRequest,
        record: &TaxpayerRecord,
        jurisdiction: &str,
        period: &str,
        target: OutputTarget,
    ) -> Result<GenerationOutput, GenerationError> {
        let generated_document = self
            .generate_complete(request, record, jurisdiction, period)
            .await?;

        match target {
            OutputTarget::DataUri => Ok(GenerationOutput::DataUri(generated_document.to_data_uri())),
            OutputTarget::File(path) => {
                generated_document.save_to(&path).await?;
                Ok(GenerationOutput::File(path))
            }
        }
    }
}
