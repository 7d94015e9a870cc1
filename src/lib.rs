//! Predial renders the municipal property tax forms of a taxpayer (HR, PU, HAD, HLP and HLA)
//! into a single multi-page PDF document, writing the fields of the taxpayer record over the
//! form templates published for each jurisdiction and fiscal period.
//!
//! The entry point is the `DocumentAssembler`, which takes a `FormRequest` and a `TaxpayerRecord`
//! and returns a `GeneratedDocument`. Templates are retrieved through a `ResourceCache`, and records
//! through a `TaxpayerDataLoader`; both share their retrievals between concurrent callers and read
//! from a `Transport`, which is either an HTTP server or a local directory tree.
//!
//! A form without template is still rendered, with a diagonal watermark in place of the background,
//! and a form which cannot be filled carries the error on its own page while the rest of the
//! document is generated as usual.

/// The module were the `DocumentAssembler` is presented, which owns the page ordering and the
/// output of the generated documents.
pub mod assembler;

/// The `Configuration` of the generator, read either from a JSON file or from the environment.
pub mod config;

/// This module contains the `ContextError` type which is the error type used for the low-level
/// operations on the PDF document, along with the error taxonomy of the forms and of the generation.
///
/// A `ContextError` always carries an explanation of what was being done, and the message of the
/// propagated error if there is one. It implements `std::fmt::Display` and can be serialized.
pub mod error;

/// Formatting of amounts, identifiers and addresses as they are printed on the forms.
pub mod format;

/// The forms and their layouts.
///
/// # Layouts
///
/// Every form is described by a `FormLayout`, a table of `FieldSlot`s which place each field at a
/// fixed position in millimeters from the top-left corner of the page. Filling a form computes the
/// text of every slot from the record, so the same record always produces the same text.
pub mod forms;

/// Metrics and encoding of the Helvetica font, which every form is written with.
pub mod helvetica;

/// Loading of the taxpayer records.
pub mod loader;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// The document is built on top of `lopdf::Document`: pages are kept as lists of content operations
/// until the document is saved, and the backgrounds of the forms are inserted as `XObject`s, either
/// images or the first page of a template PDF, drawn once per page that uses them.
pub mod pdf;

/// The taxpayer record as published by the data export.
pub mod record;

/// The `ResourceCache` of form templates.
pub mod resource;

pub mod transport;

/// The fallback drawn on forms without template.
pub mod watermark;

pub use assembler::{
    AssemblerState, DocumentAssembler, FormRequest, GeneratedDocument, GenerationOutput,
    OutputTarget, PropertySelection,
};
pub use config::Configuration;
pub use error::{ContextError, FormError, GenerationError};
pub use forms::FormCode;
pub use loader::{LoaderError, TaxpayerDataLoader};
pub use record::TaxpayerRecord;
pub use resource::{MissPolicy, ResourceCache, TemplateKey};
