use lopdf::content::Operation;
use lopdf::{Object, ObjectId, StringFormat};
use nalgebra_glm as glm;
use std::{
    collections::{BTreeMap, HashMap},
    io::BufWriter,
    mem,
};
use time::OffsetDateTime;

use crate::error::ContextError;
use crate::helvetica;

/// Converts millimeters to points. This function is used in order to present the data
/// in the format required by the PDF specification, while the forms are described in
/// millimeters which are easier to reason about.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// An RGB color with components in the range 0 to 255, as the forms are described.
pub type Rgb = [u8; 3];

fn color_operands(color: Rgb) -> Vec<Object> {
    color
        .into_iter()
        .map(|component| Object::Real(component as f32 / 255.0))
        .collect()
}

/// The drawing state that carries over from one drawing call to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingState {
    pub font_size: f32,
    pub text_color: Rgb,
    pub draw_color: Rgb,
    /// Line width in millimeters.
    pub line_width: f32,
}

impl Default for DrawingState {
    fn default() -> Self {
        DrawingState {
            font_size: 7.0,
            text_color: [0, 0, 0],
            draw_color: [0, 0, 0],
            line_width: 0.1,
        }
    }
}

/// The low-level image representation for a PDF document.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Width of the image in pixels.
    pub width: u32,
    /// Height of the image in pixels.
    pub height: u32,
    /// The RGB samples of the image, 8 bits per component.
    pub image_data: Vec<u8>,
    /// The alpha samples of the image, if it has transparency.
    pub alpha_data: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Decodes a PNG image into its samples.
    pub fn from_png(bytes: &[u8]) -> Result<Self, ContextError> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(|error| ContextError::with_error("Failed to decode the PNG image", &error))?;
        let alpha_data = image.color().has_alpha().then(|| {
            image
                .to_rgba8()
                .pixels()
                .map(|pixel| pixel.0[3])
                .collect::<Vec<u8>>()
        });
        let rgb_image = image.to_rgb8();

        Ok(ImageXObject {
            width: rgb_image.width(),
            height: rgb_image.height(),
            image_data: rgb_image.into_raw(),
            alpha_data,
        })
    }

    /// Inserts the image and its soft mask into the document, returning the image object.
    fn insert_into_document(self, inner_document: &mut lopdf::Document) -> ObjectId {
        use lopdf::Object::*;

        let mut image_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("XObject".into())),
            ("Subtype", Name("Image".into())),
            ("Width", Integer(self.width as i64)),
            ("Height", Integer(self.height as i64)),
            ("ColorSpace", Name("DeviceRGB".into())),
            ("BitsPerComponent", Integer(8)),
        ]);

        // The transparency goes into a separate grayscale image, the soft mask
        if let Some(alpha_data) = self.alpha_data {
            let soft_mask = lopdf::Stream::new(
                lopdf::Dictionary::from_iter(vec![
                    ("Type", Name("XObject".into())),
                    ("Subtype", Name("Image".into())),
                    ("Width", Integer(self.width as i64)),
                    ("Height", Integer(self.height as i64)),
                    ("ColorSpace", Name("DeviceGray".into())),
                    ("BitsPerComponent", Integer(8)),
                ]),
                alpha_data,
            );
            image_dictionary.set("SMask", Reference(inner_document.add_object(soft_mask)));
        }

        inner_document.add_object(lopdf::Stream::new(image_dictionary, self.image_data))
    }
}

/// The `XObject`s a page can draw. Both kinds are inserted into the document as soon as they
/// are added, so that a background shared by many pages is stored only once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XObject {
    /// A raster image covering the area it is drawn onto.
    Image(ObjectId),
    /// The first page of a template PDF, wrapped as a form, together with its bounding box.
    Form { id: ObjectId, bounding_box: [f32; 4] },
}

impl XObject {
    fn object_id(&self) -> ObjectId {
        match self {
            XObject::Image(id) | XObject::Form { id, .. } => *id,
        }
    }
}

/// Named reference to an `XObject`.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct XObjectReference(String);

impl XObjectReference {
    /// Creates a new reference for an `XObject` from a number.
    pub fn new(index: usize) -> Self {
        Self(format!("X{index}"))
    }
}

/// The association between the names used in a page and the `XObject`s themselves.
#[derive(Default, Debug, Clone)]
pub struct XObjectMap(BTreeMap<String, XObject>);

impl XObjectMap {
    fn to_dictionary(&self) -> lopdf::Dictionary {
        self.0
            .iter()
            .map(|(name, object)| (name.clone(), Object::Reference(object.object_id())))
            .collect()
    }
}

/// The representation of a PDF page, the operations are collected in a single content stream.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// The number of the page in the document, starting at 1.
    pub(crate) number: usize,
    /// Page width in points.
    pub width: f32,
    /// Page height in points.
    pub height: f32,
    /// Content operations of the page.
    pub(crate) operations: Vec<Operation>,
    /// External graphics objects used by the page.
    pub(crate) xobjects: XObjectMap,
}

/// The settings every new document starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    /// Page width in millimeters.
    pub width: f32,
    /// Page height in millimeters.
    pub height: f32,
    pub drawing_state: DrawingState,
}

impl Default for PageSettings {
    /// A landscape A5 sheet, which is what every form is printed on.
    fn default() -> Self {
        PageSettings {
            width: 210.0,
            height: 148.0,
            drawing_state: DrawingState::default(),
        }
    }
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the actual underlying
/// `lopdf::Document` with the addition of the pages and the drawing state carried between calls.
///
/// Coordinates given to the drawing functions are in millimeters measured from the top-left corner
/// of the page, and text is positioned by its baseline.
pub struct PdfDocument {
    /// The underlying PDF document: this is a low-level interface and shouldn't be directly interacted with
    /// unless strictly necessary, anyway this is why it is exposed to the user.
    pub inner_document: lopdf::Document,
    /// The identifier of the document, it is used to in order to set the PDF `ID` tag.
    pub identifier: String,
    /// The pages of the PDF document.
    pub(crate) pages: Vec<PdfPage>,
    settings: PageSettings,
    state: DrawingState,
    /// The `XObject`s already inserted, by the key of the resource they were built from.
    imported: HashMap<String, XObject>,
    creation_date: OffsetDateTime,
}

impl PdfDocument {
    /// Create a new `PdfDocument` with a single blank page, by defaulting the underlying PDF document
    /// to version 1.5 of the PDF specification.
    pub fn new(pdf_document_identifier: String, settings: PageSettings) -> Self {
        let mut pdf_document = PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier: pdf_document_identifier,
            pages: Vec::new(),
            state: settings.drawing_state,
            settings,
            imported: HashMap::new(),
            creation_date: OffsetDateTime::now_utc(),
        };
        pdf_document.add_page();

        pdf_document
    }

    /// Overrides the creation date written in the document information.
    pub fn with_creation_date(mut self, creation_date: OffsetDateTime) -> Self {
        self.creation_date = creation_date;
        self
    }

    /// Appends a new page, which becomes the one every drawing call writes to. Returns its index.
    pub fn add_page(&mut self) -> usize {
        self.pages.push(PdfPage {
            number: self.pages.len() + 1,
            width: millimeters_to_points(self.settings.width),
            height: millimeters_to_points(self.settings.height),
            operations: Vec::new(),
            xobjects: XObjectMap::default(),
        });

        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page width in millimeters.
    pub fn page_width(&self) -> f32 {
        self.settings.width
    }

    /// Page height in millimeters.
    pub fn page_height(&self) -> f32 {
        self.settings.height
    }

    pub fn drawing_state(&self) -> DrawingState {
        self.state
    }

    pub fn font_size(&self) -> f32 {
        self.state.font_size
    }

    pub fn set_font_size(&mut self, font_size: f32) {
        self.state.font_size = font_size;
    }

    pub fn text_color(&self) -> Rgb {
        self.state.text_color
    }

    pub fn set_text_color(&mut self, color: Rgb) {
        self.state.text_color = color;
    }

    /// Width in millimeters of the text when written with the given font size.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        helvetica::string_unit_width(text) * font_size / millimeters_to_points(1.0)
    }

    /// Writes the text at the given position with the current font size and text color.
    pub fn text(&mut self, text: &str, x: f32, y: f32) -> Result<(), ContextError> {
        let position = self.to_page_space(x, y);
        let operations = self.text_operations(
            text,
            Operation::new("Td", vec![position[0].into(), position[1].into()]),
        );
        self.add_operations(operations)
    }

    /// Writes the text with its baseline starting at the given position, rotated counter-clockwise
    /// around that same position by the given angle in degrees.
    pub fn rotated_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        angle_degrees: f32,
    ) -> Result<(), ContextError> {
        let [x, y] = self.to_page_space(x, y);
        // The text matrix is the rotation composed onto the translation to the anchor
        let transform = glm::rotate2d(
            &glm::translate2d(&glm::Mat3::identity(), &glm::vec2(x, y)),
            angle_degrees.to_radians(),
        );
        let matrix = vec![
            transform[(0, 0)],
            transform[(1, 0)],
            transform[(0, 1)],
            transform[(1, 1)],
            transform[(0, 2)],
            transform[(1, 2)],
        ];
        let operations = self.text_operations(
            text,
            Operation::new("Tm", matrix.into_iter().map(Object::Real).collect()),
        );
        self.add_operations(operations)
    }

    fn text_operations(&self, text: &str, positioning: Operation) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]), // Begin text section
            Operation::new(
                "Tf",
                vec![
                    Object::Name(helvetica::RESOURCE_NAME.into()),
                    self.state.font_size.into(),
                ],
            ), // Set the font and the font size
            positioning, // Set the position where the text begins to be written
            Operation::new("rg", color_operands(self.state.text_color)), // Set the filling color of the text
            Operation::new(
                "Tj",
                vec![Object::String(
                    helvetica::encode(text),
                    StringFormat::Hexadecimal,
                )],
            ),
            Operation::new("ET", vec![]),
        ]
    }

    /// Strokes the outline of a rectangle with the current draw color and line width.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), ContextError> {
        let [left, bottom] = self.to_page_space(x, y + height);
        let operations = vec![
            Operation::new("w", vec![millimeters_to_points(self.state.line_width).into()]),
            Operation::new("RG", color_operands(self.state.draw_color)),
            Operation::new(
                "re",
                vec![
                    left.into(),
                    bottom.into(),
                    millimeters_to_points(width).into(),
                    millimeters_to_points(height).into(),
                ],
            ),
            Operation::new("S", vec![]),
        ];
        self.add_operations(operations)
    }

    /// Isolates the drawing that follows until the matching `restore_graphics_state`.
    pub fn save_graphics_state(&mut self) -> Result<(), ContextError> {
        self.add_operations(vec![Operation::new("q", vec![])])
    }

    pub fn restore_graphics_state(&mut self) -> Result<(), ContextError> {
        self.add_operations(vec![Operation::new("Q", vec![])])
    }

    /// Draws a PNG image stretched over the whole page. The image is decoded and inserted only
    /// the first time the given key is seen.
    pub fn draw_page_image(&mut self, key: &str, png_bytes: &[u8]) -> Result<(), ContextError> {
        let xobject = match self.imported.get(key) {
            Some(xobject) => *xobject,
            None => {
                let image = ImageXObject::from_png(png_bytes)?;
                let xobject = XObject::Image(image.insert_into_document(&mut self.inner_document));
                self.imported.insert(key.to_string(), xobject);
                xobject
            }
        };
        self.draw_xobject(xobject)
    }

    /// Draws the first page of a template PDF scaled over the whole page. The template is
    /// imported only the first time the given key is seen.
    pub fn draw_page_template(&mut self, key: &str, pdf_bytes: &[u8]) -> Result<(), ContextError> {
        let xobject = match self.imported.get(key) {
            Some(xobject) => *xobject,
            None => {
                let xobject = self.import_template_page(pdf_bytes)?;
                self.imported.insert(key.to_string(), xobject);
                xobject
            }
        };
        self.draw_xobject(xobject)
    }

    fn draw_xobject(&mut self, xobject: XObject) -> Result<(), ContextError> {
        let page_index = self.current_page_index()?;
        let page = &mut self.pages[page_index];
        let (page_width, page_height) = (page.width, page.height);

        let name = XObjectReference::new(page.xobjects.0.len());
        page.xobjects.0.insert(name.0.clone(), xobject);

        // Images live in the unit square while forms live in their bounding box
        let matrix = match xobject {
            XObject::Image(_) => [page_width, 0.0, 0.0, page_height, 0.0, 0.0],
            XObject::Form { bounding_box, .. } => {
                let [left, bottom, right, top] = bounding_box;
                let scale_x = page_width / (right - left);
                let scale_y = page_height / (top - bottom);
                [
                    scale_x,
                    0.0,
                    0.0,
                    scale_y,
                    -left * scale_x,
                    -bottom * scale_y,
                ]
            }
        };

        self.add_operations(vec![
            Operation::new("q", vec![]),
            Operation::new("cm", matrix.into_iter().map(Object::Real).collect()),
            Operation::new("Do", vec![Object::Name(name.0.into_bytes())]),
            Operation::new("Q", vec![]),
        ])
    }

    /// Wraps the first page of another PDF document into a form `XObject` of this document,
    /// copying the resources it depends on.
    fn import_template_page(&mut self, pdf_bytes: &[u8]) -> Result<XObject, ContextError> {
        let source = lopdf::Document::load_mem(pdf_bytes)
            .map_err(|error| ContextError::with_error("Failed to parse the template PDF", &error))?;
        let (_, page_id) = source
            .get_pages()
            .into_iter()
            .next()
            .ok_or(ContextError::with_context("The template PDF has no pages"))?;
        let page_dictionary = source.get_dictionary(page_id).map_err(|error| {
            ContextError::with_error("Failed to read the template page", &error)
        })?;

        let bounding_box = match inherited_attribute(&source, page_dictionary, b"MediaBox")
            .and_then(|media_box| media_box.as_array().ok())
            .map(|media_box| {
                media_box
                    .iter()
                    .filter_map(|value| value.as_float().ok())
                    .collect::<Vec<f32>>()
            }) {
            Some(values) if values.len() == 4 && values[2] > values[0] && values[3] > values[1] => {
                [values[0], values[1], values[2], values[3]]
            }
            _ => {
                log::warn!("The template page has no usable media box, assuming the page size");
                [
                    0.0,
                    0.0,
                    millimeters_to_points(self.settings.width),
                    millimeters_to_points(self.settings.height),
                ]
            }
        };

        let content = source.get_page_content(page_id).map_err(|error| {
            ContextError::with_error("Failed to read the template page content", &error)
        })?;

        let mut form_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Object::Name("XObject".into())),
            ("Subtype", Object::Name("Form".into())),
            ("FormType", Object::Integer(1)),
            (
                "BBox",
                Object::Array(bounding_box.iter().map(|value| Object::Real(*value)).collect()),
            ),
        ]);

        // Copy the resources, using a map to avoid duplicating objects referenced more than once
        if let Some(resources) = inherited_attribute(&source, page_dictionary, b"Resources") {
            let mut copied = HashMap::new();
            let resources = copy_object_deep(&mut self.inner_document, &source, resources, &mut copied)?;
            form_dictionary.set("Resources", resources);
        }

        let id = self
            .inner_document
            .add_object(lopdf::Stream::new(form_dictionary, content));

        Ok(XObject::Form { id, bounding_box })
    }

    fn current_page_index(&self) -> Result<usize, ContextError> {
        self.pages
            .len()
            .checked_sub(1)
            .ok_or(ContextError::with_context("The document has no pages"))
    }

    fn to_page_space(&self, x: f32, y: f32) -> [f32; 2] {
        [
            millimeters_to_points(x),
            millimeters_to_points(self.settings.height - y),
        ]
    }

    /// This function is responsible for adding the given operations to the current page.
    fn add_operations(&mut self, operations: Vec<Operation>) -> Result<(), ContextError> {
        let page_index = self.current_page_index()?;
        self.pages[page_index].operations.extend(operations);

        Ok(())
    }

    /// Write the pages so far drawn to the underlying PDF document and finalize it.
    fn write_all(&mut self) -> Result<(), ContextError> {
        use lopdf::Object::*;
        use lopdf::StringFormat::*;

        let creation_date = to_pdf_timestamp_format(&self.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", String(self.identifier.clone().into_bytes(), Literal)),
            ("Producer", String(b"predial".to_vec(), Literal)),
            ("CreationDate", String(creation_date.clone().into_bytes(), Literal)),
            ("ModDate", String(creation_date.clone().into_bytes(), Literal)),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let font_dictionary = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type1".into())),
            ("BaseFont", Name(helvetica::BASE_FONT.into())),
            ("Encoding", Name("WinAnsiEncoding".into())),
        ]);
        let font_id = self.inner_document.add_object(font_dictionary);
        let fonts_dictionary_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(
            vec![(helvetica::RESOURCE_NAME, Reference(font_id))],
        ));

        let pages_id = self.inner_document.new_object_id();
        let mut page_ids = Vec::<Object>::new();

        for page in mem::take(&mut self.pages) {
            let mut resource_dictionary =
                lopdf::Dictionary::from_iter(vec![("Font", Reference(fonts_dictionary_id))]);
            let xobjects_dictionary = page.xobjects.to_dictionary();
            if !xobjects_dictionary.is_empty() {
                resource_dictionary.set("XObject", Dictionary(xobjects_dictionary));
            }

            let content = lopdf::content::Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|error| {
                ContextError::with_error(
                    format!("Failed to encode the content of page {}", page.number),
                    &error,
                )
            })?;
            // Page contents are not compressed
            let content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), content).with_compression(false));

            let media_box: Object = vec![0.into(), 0.into(), page.width.into(), page.height.into()].into();
            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Parent", Reference(pages_id)),
                ("MediaBox", media_box.clone()),
                ("CropBox", media_box),
                ("Resources", Dictionary(resource_dictionary)),
                ("Contents", Reference(content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", "Pages".into()),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        let catalog = lopdf::Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("PageLayout", "OneColumn".into()),
            ("Pages", Reference(pages_id)),
        ]);
        let catalog_id = self.inner_document.add_object(catalog);

        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), Literal),
                String(creation_date.into_bytes(), Literal),
            ]),
        );

        Ok(())
    }

    /// Finalizes the document and serializes it to bytes.
    pub fn save_to_bytes(mut self) -> Result<Vec<u8>, ContextError> {
        self.write_all()?;

        let mut pdf_document_bytes = Vec::new();
        let mut writer = BufWriter::new(&mut pdf_document_bytes);
        self.inner_document.save_to(&mut writer).map_err(|error| {
            ContextError::with_error("Error while saving the PDF document to bytes", &error)
        })?;
        mem::drop(writer);

        Ok(pdf_document_bytes)
    }
}

/// Looks up an attribute of a page, following the page tree upwards for the inheritable ones.
fn inherited_attribute<'a>(
    document: &'a lopdf::Document,
    page_dictionary: &'a lopdf::Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut dictionary = page_dictionary;
    // The depth is bounded so that a malformed cyclic tree cannot hang the import
    for _ in 0..32 {
        if let Ok(value) = dictionary.get(key) {
            return match value {
                Object::Reference(id) => document.get_object(*id).ok(),
                value => Some(value),
            };
        }
        let parent_id = dictionary.get(b"Parent").ok()?.as_reference().ok()?;
        dictionary = document.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Deep copy an object from the source into the output document, following references.
/// The map of already copied objects avoids copying the same object twice.
fn copy_object_deep(
    output: &mut lopdf::Document,
    source: &lopdf::Document,
    object: &Object,
    copied: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object, ContextError> {
    match object {
        Object::Reference(id) => {
            if let Some(new_id) = copied.get(id) {
                return Ok(Object::Reference(*new_id));
            }

            // Reserve the identifier first so that cycles resolve onto it
            let new_id = output.new_object_id();
            copied.insert(*id, new_id);
            let referenced = source.get_object(*id).map_err(|error| {
                ContextError::with_error("Failed to follow a template reference", &error)
            })?;
            let copy = copy_object_deep(output, source, referenced, copied)?;
            output.objects.insert(new_id, copy);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dictionary) => Ok(Object::Dictionary(copy_dictionary_deep(
            output, source, dictionary, copied,
        )?)),
        Object::Array(array) => Ok(Object::Array(
            array
                .iter()
                .map(|item| copy_object_deep(output, source, item, copied))
                .collect::<Result<_, _>>()?,
        )),
        Object::Stream(stream) => {
            let dictionary = copy_dictionary_deep(output, source, &stream.dict, copied)?;
            let mut copy = lopdf::Stream::new(dictionary, stream.content.clone());
            copy.allows_compression = stream.allows_compression;
            Ok(Object::Stream(copy))
        }
        other => Ok(other.clone()),
    }
}

fn copy_dictionary_deep(
    output: &mut lopdf::Document,
    source: &lopdf::Document,
    dictionary: &lopdf::Dictionary,
    copied: &mut HashMap<ObjectId, ObjectId>,
) -> Result<lopdf::Dictionary, ContextError> {
    let mut copy = lopdf::Dictionary::new();
    for (key, value) in dictionary.iter() {
        // Never pull the page tree of the template along
        if key.as_slice() == b"Parent" {
            continue;
        }
        copy.set(key.clone(), copy_object_deep(output, source, value, copied)?);
    }
    Ok(copy)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown_text(document: &lopdf::Document, page_id: ObjectId) -> Vec<Vec<u8>> {
        let content = document.get_page_content(page_id).unwrap();
        lopdf::content::Content::decode(&content)
            .unwrap()
            .operations
            .into_iter()
            .filter(|operation| operation.operator == "Tj")
            .filter_map(|operation| match operation.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn pages_and_text_survive_serialization() {
        let mut pdf_document = PdfDocument::new("test".into(), PageSettings::default())
            .with_creation_date(OffsetDateTime::UNIX_EPOCH);
        pdf_document.text("Año 2025", 10.0, 20.0).unwrap();
        pdf_document.add_page();
        pdf_document.rotated_text("HR", 50.0, 74.0, 45.0).unwrap();

        let bytes = pdf_document.save_to_bytes().unwrap();
        let document = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = document.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(shown_text(&document, pages[&1]), vec![b"A\xF1o 2025".to_vec()]);
        assert_eq!(shown_text(&document, pages[&2]), vec![b"HR".to_vec()]);
    }

    #[test]
    fn rotation_matrix_turns_counter_clockwise() {
        let mut pdf_document = PdfDocument::new("test".into(), PageSettings::default());
        pdf_document.rotated_text("X", 0.0, 148.0, 45.0).unwrap();
        let matrix = pdf_document.pages[0]
            .operations
            .iter()
            .find(|operation| operation.operator == "Tm")
            .unwrap()
            .operands
            .iter()
            .map(|operand| operand.as_float().unwrap())
            .collect::<Vec<f32>>();

        let half_square_root = std::f32::consts::FRAC_1_SQRT_2;
        let expected = [half_square_root, half_square_root, -half_square_root, half_square_root, 0.0, 0.0];
        for (value, expected) in matrix.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-5, "{:?}", matrix);
        }
    }

    #[test]
    fn timestamps_follow_the_pdf_date_format() {
        assert_eq!(
            to_pdf_timestamp_format(&OffsetDateTime::UNIX_EPOCH),
            "D:19700101000000+00'00'"
        );
    }
}
