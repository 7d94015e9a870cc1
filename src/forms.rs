use serde::{Deserialize, Serialize};

use crate::error::{ContextError, FormError};
use crate::format::NumberLocale;
use crate::pdf::PdfDocument;
use crate::record::{PropertyRecord, TaxpayerRecord};
use crate::resource::{Resource, ResourceKind};
use crate::watermark;

/// The forms the generator knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormCode {
    /// Hoja de actualización de datos: the taxpayer and its fiscal domicile.
    Had,
    /// Hoja resumen: the taxpayer and the list of its properties.
    Hr,
    /// Predio urbano: one sheet per property.
    Pu,
    /// Hoja de liquidación predial: the totals of the property tax.
    Hlp,
    /// Hoja de liquidación de arbitrios: the municipal fees, one sheet per property.
    Hla,
}

impl FormCode {
    pub const ALL: [FormCode; 5] = [
        FormCode::Had,
        FormCode::Hr,
        FormCode::Pu,
        FormCode::Hlp,
        FormCode::Hla,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormCode::Had => "HAD",
            FormCode::Hr => "HR",
            FormCode::Pu => "PU",
            FormCode::Hlp => "HLP",
            FormCode::Hla => "HLA",
        }
    }

    /// Whether the form is repeated once per property of the taxpayer.
    pub fn is_per_property(&self) -> bool {
        match self {
            FormCode::Pu | FormCode::Hla => true,
            FormCode::Had | FormCode::Hr | FormCode::Hlp => false,
        }
    }

    pub fn layout(&self) -> &'static FormLayout {
        match self {
            FormCode::Had => &HAD_LAYOUT,
            FormCode::Hr => &HR_LAYOUT,
            FormCode::Pu => &PU_LAYOUT,
            FormCode::Hlp => &HLP_LAYOUT,
            FormCode::Hla => &HLA_LAYOUT,
        }
    }

    /// Computes the text of every field of the form, with the position it is written at.
    pub fn fill(
        &self,
        record: &TaxpayerRecord,
        property_code: Option<&str>,
        locale: &NumberLocale,
    ) -> Result<FilledForm, FormError> {
        let property = if self.is_per_property() {
            let property_code = property_code.ok_or(FormError::MissingPropertyCode {
                form: self.as_str(),
            })?;
            Some(
                record
                    .property(property_code)
                    .ok_or_else(|| FormError::PropertyNotFound {
                        property_code: property_code.to_string(),
                    })?,
            )
        } else {
            None
        };

        let layout = self.layout();
        let context = FieldContext {
            record,
            property,
            locale,
        };
        let mut fields = layout
            .slots
            .iter()
            .map(|slot| -> Result<FilledField, FormError> {
                Ok(FilledField {
                    field: slot.field,
                    x: slot.x,
                    y: slot.y,
                    text: context.text(slot.field)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(rows) = &layout.rows {
            fields.extend(rows.fill(record, locale)?);
        }

        Ok(FilledForm {
            form: *self,
            font_size: layout.font_size,
            frame: layout.frame,
            fields,
        })
    }

    /// Renders the form onto the current page: the background, or the watermark when there
    /// is none, and then the fields.
    pub fn render(
        &self,
        pdf_document: &mut PdfDocument,
        background: Option<&Resource>,
        record: &TaxpayerRecord,
        property_code: Option<&str>,
        locale: &NumberLocale,
    ) -> Result<(), FormError> {
        match background {
            Some(resource) => match resource.kind {
                ResourceKind::BackgroundDocument => {
                    pdf_document.draw_page_template(&resource.path, &resource.bytes)?
                }
                ResourceKind::BackgroundImage => {
                    pdf_document.draw_page_image(&resource.path, &resource.bytes)?
                }
            },
            None => watermark::stamp(pdf_document, self.as_str())?,
        }

        let filled_form = self.fill(record, property_code, locale)?;
        filled_form.draw(pdf_document)?;

        Ok(())
    }
}

impl std::fmt::Display for FormCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl std::str::FromStr for FormCode {
    type Err = ContextError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FormCode::ALL
            .into_iter()
            .find(|form| form.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                ContextError::with_context(format!("The form code {:?} is not supported", value))
            })
    }
}

/// Every value a form can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TaxpayerCode,
    TaxpayerName,
    FiscalDistrict,
    FiscalAddress,
    DocumentNumber,
    DeclaredPropertyCount,
    AssessedValue,
    /// The part of the assessed value which is not taxable.
    ExemptValue,
    TotalTaxableValue,
    PropertySequence,
    PropertyCode,
    PropertyAddress,
    PropertyAssessedValue,
    PropertyPercentage,
    PropertyTaxableValue,
    PropertyType,
    GeneralUse,
    ConstructionState,
    Condition,
    LandValue,
    BuiltAreaValue,
    TariffValue,
    Frontage,
    /// Half of the base fee, the fee is paid in two installments.
    FeeInstallment,
    /// The count of properties left out of a list which ran out of rows.
    OverflowNote,
}

/// A field at a fixed position, in millimeters from the top-left corner of the page
/// with the text baseline at `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSlot {
    pub field: Field,
    pub x: f32,
    pub y: f32,
}

const fn slot(field: Field, x: f32, y: f32) -> FieldSlot {
    FieldSlot { field, x, y }
}

/// A column of a property list, at a horizontal offset from the start of the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowColumn {
    pub field: Field,
    pub offset: f32,
}

const fn column(field: Field, offset: f32) -> RowColumn {
    RowColumn { field, offset }
}

/// A list with one row per property of the taxpayer.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    pub x: f32,
    pub first_row_y: f32,
    pub row_height: f32,
    pub max_rows: usize,
    pub columns: &'static [RowColumn],
}

impl RowLayout {
    fn fill(
        &self,
        record: &TaxpayerRecord,
        locale: &NumberLocale,
    ) -> Result<Vec<FilledField>, FormError> {
        let mut fields = Vec::new();

        for (row, property) in record.properties.values().take(self.max_rows).enumerate() {
            let context = FieldContext {
                record,
                property: Some(property),
                locale,
            };
            let y = self.first_row_y + row as f32 * self.row_height;
            for column in self.columns {
                fields.push(FilledField {
                    field: column.field,
                    x: self.x + column.offset,
                    y,
                    text: context.text(column.field)?,
                });
            }
        }

        let left_out = record.properties.len().saturating_sub(self.max_rows);
        if left_out > 0 {
            fields.push(FilledField {
                field: Field::OverflowNote,
                x: self.x,
                y: self.first_row_y + self.max_rows as f32 * self.row_height,
                text: format!("... y {left_out} predios más"),
            });
        }

        Ok(fields)
    }
}

/// The fixed layout of a form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormLayout {
    pub font_size: f32,
    /// A rectangle drawn around the content, as `[x, y, width, height]`.
    pub frame: Option<[f32; 4]>,
    pub slots: &'static [FieldSlot],
    pub rows: Option<RowLayout>,
}

pub static HAD_LAYOUT: FormLayout = FormLayout {
    font_size: 8.5,
    frame: None,
    slots: &[
        slot(Field::TaxpayerCode, 55.0, 13.0),
        slot(Field::TaxpayerName, 55.0, 18.0),
        slot(Field::FiscalDistrict, 55.0, 22.0),
        slot(Field::FiscalAddress, 55.0, 26.0),
    ],
    rows: None,
};

pub static HR_LAYOUT: FormLayout = FormLayout {
    font_size: 7.0,
    frame: Some([5.0, 5.0, 200.0, 138.0]),
    slots: &[
        slot(Field::TaxpayerName, 8.0, 31.0),
        slot(Field::TaxpayerCode, 179.0, 31.0),
        slot(Field::FiscalDistrict, 8.0, 36.0),
        slot(Field::FiscalAddress, 8.0, 41.0),
    ],
    rows: Some(RowLayout {
        x: 6.0,
        first_row_y: 58.0,
        row_height: 5.0,
        max_rows: 16,
        columns: &[
            column(Field::PropertySequence, 0.0),
            column(Field::PropertyCode, 9.0),
            column(Field::PropertyAddress, 24.0),
            column(Field::PropertyAssessedValue, 142.0),
            column(Field::PropertyPercentage, 162.0),
            column(Field::PropertyTaxableValue, 172.0),
        ],
    }),
};

pub static PU_LAYOUT: FormLayout = FormLayout {
    font_size: 7.0,
    frame: None,
    slots: &[
        slot(Field::TaxpayerName, 8.0, 31.0),
        slot(Field::TaxpayerCode, 179.0, 31.0),
        slot(Field::PropertyAddress, 8.0, 44.0),
        slot(Field::PropertyCode, 179.0, 44.0),
        slot(Field::PropertyType, 8.0, 55.0),
        slot(Field::GeneralUse, 78.0, 55.0),
        slot(Field::ConstructionState, 127.0, 55.0),
        slot(Field::PropertyPercentage, 179.0, 55.0),
        slot(Field::LandValue, 8.0, 130.5),
        slot(Field::BuiltAreaValue, 49.0, 130.5),
        slot(Field::TariffValue, 93.0, 130.5),
    ],
    rows: None,
};

pub static HLP_LAYOUT: FormLayout = FormLayout {
    font_size: 7.0,
    frame: None,
    slots: &[
        slot(Field::DocumentNumber, 8.0, 36.0),
        slot(Field::TaxpayerName, 46.0, 36.0),
        slot(Field::TaxpayerCode, 172.0, 36.0),
        slot(Field::DeclaredPropertyCount, 8.0, 46.0),
        slot(Field::DeclaredPropertyCount, 38.0, 46.0),
        slot(Field::AssessedValue, 66.0, 46.0),
        slot(Field::ExemptValue, 119.0, 46.0),
        slot(Field::TotalTaxableValue, 160.0, 46.0),
    ],
    rows: None,
};

pub static HLA_LAYOUT: FormLayout = FormLayout {
    font_size: 7.0,
    frame: None,
    slots: &[
        slot(Field::TaxpayerCode, 7.5, 36.7),
        slot(Field::TaxpayerName, 28.5, 36.7),
        slot(Field::DocumentNumber, 130.5, 36.7),
        slot(Field::Condition, 161.0, 36.7),
        slot(Field::PropertyPercentage, 19.5, 36.7),
        slot(Field::PropertyAddress, 31.0, 49.1),
        slot(Field::Frontage, 15.4, 60.7),
        slot(Field::FeeInstallment, 27.9, 60.7),
        slot(Field::FeeInstallment, 43.3, 60.7),
    ],
    rows: None,
};

/// A field with its text computed from the record.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledField {
    pub field: Field,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// A form with every field computed, ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledForm {
    pub form: FormCode,
    pub font_size: f32,
    pub frame: Option<[f32; 4]>,
    pub fields: Vec<FilledField>,
}

impl FilledForm {
    pub fn draw(&self, pdf_document: &mut PdfDocument) -> Result<(), ContextError> {
        if let Some([x, y, width, height]) = self.frame {
            pdf_document.rect(x, y, width, height)?;
        }

        pdf_document.set_font_size(self.font_size);
        for field in &self.fields {
            pdf_document.text(&field.text, field.x, field.y)?;
        }

        Ok(())
    }
}

struct FieldContext<'a> {
    record: &'a TaxpayerRecord,
    property: Option<&'a PropertyRecord>,
    locale: &'a NumberLocale,
}

impl FieldContext<'_> {
    fn property(&self) -> Result<&PropertyRecord, FormError> {
        self.property.ok_or(FormError::MissingData { block: "hr_predios" })
    }

    fn text(&self, field: Field) -> Result<String, FormError> {
        let record = self.record;
        let amount = |value: f64| self.locale.format_amount(value);

        Ok(match field {
            Field::TaxpayerCode => record.padded_code(),
            Field::TaxpayerName => record.name.clone(),
            Field::FiscalDistrict => record.fiscal_district.clone(),
            Field::FiscalAddress => record.fiscal_address.clone(),
            Field::DocumentNumber => record.supplementary.document_number.clone(),
            Field::DeclaredPropertyCount => record.declared_property_count().to_string(),
            Field::AssessedValue => amount(record.supplementary.assessed_value),
            Field::ExemptValue => {
                amount(record.supplementary.assessed_value - record.total_taxable_value)
            }
            Field::TotalTaxableValue => amount(record.total_taxable_value),
            Field::PropertySequence => self.property()?.padded_sequence(),
            Field::PropertyCode => self.property()?.code.clone(),
            Field::PropertyAddress => self.property()?.full_address(),
            Field::PropertyAssessedValue => amount(self.property()?.assessed_value),
            Field::PropertyPercentage => self.property()?.percentage.clone(),
            Field::PropertyTaxableValue => amount(self.property()?.taxable_value),
            Field::PropertyType => self.classification()?.property_type.clone(),
            Field::GeneralUse => self.classification()?.general_use.clone(),
            Field::ConstructionState => self.classification()?.construction_state.clone(),
            Field::Condition => self.classification()?.condition.clone(),
            Field::LandValue => amount(self.valuation()?.land_value),
            Field::BuiltAreaValue => amount(self.valuation()?.built_area_value),
            Field::TariffValue => amount(self.valuation()?.tariff_value),
            Field::Frontage => amount(
                self.property()?
                    .rates
                    .as_ref()
                    .ok_or(FormError::MissingData { block: "hla_tasas" })?
                    .frontage,
            ),
            Field::FeeInstallment => amount(
                self.property()?
                    .fees
                    .as_ref()
                    .ok_or(FormError::MissingData { block: "hla_cuotas" })?
                    .base_fee
                    / 2.0,
            ),
            Field::OverflowNote => String::new(),
        })
    }

    fn classification(&self) -> Result<&crate::record::Classification, FormError> {
        self.property()?
            .classification
            .as_ref()
            .ok_or(FormError::MissingData { block: "pu_predio" })
    }

    fn valuation(&self) -> Result<&crate::record::Valuation, FormError> {
        self.property()?
            .valuation
            .as_ref()
            .ok_or(FormError::MissingData { block: "pu_predio2" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ArbitrationFees, ArbitrationRates, Classification, Valuation};

    fn record() -> TaxpayerRecord {
        let mut record = TaxpayerRecord {
            code: "123".into(),
            name: "HUAMAN TORRES JORGE".into(),
            total_taxable_value: 30000.0,
            ..Default::default()
        };
        record.supplementary.assessed_value = 45250.75;
        record.supplementary.document_number = "09876543".into();
        for index in 1..=18 {
            let code = format!("P{index:02}");
            record.properties.insert(
                code.clone(),
                PropertyRecord {
                    sequence: index.to_string(),
                    code,
                    road_type: "AV".into(),
                    road_name: "GRAU".into(),
                    address: format!("{}", 100 + index),
                    assessed_value: 1000.0 * index as f64,
                    percentage: "100".into(),
                    taxable_value: 500.0,
                    classification: Some(Classification {
                        property_type: "CASA".into(),
                        general_use: "VIVIENDA".into(),
                        construction_state: "TERMINADO".into(),
                        condition: "PROPIETARIO".into(),
                    }),
                    valuation: Some(Valuation {
                        land_value: 1.0,
                        built_area_value: 2.0,
                        tariff_value: 3.0,
                    }),
                    rates: Some(ArbitrationRates { frontage: 12.5 }),
                    fees: Some(ArbitrationFees { base_fee: 85.0 }),
                    ..Default::default()
                },
            );
        }
        record
    }

    fn text_of(filled_form: &FilledForm, field: Field) -> Vec<&str> {
        filled_form
            .fields
            .iter()
            .filter(|filled| filled.field == field)
            .map(|filled| filled.text.as_str())
            .collect()
    }

    #[test]
    fn form_codes_parse_case_insensitively() {
        assert_eq!(" hla ".parse::<FormCode>().unwrap(), FormCode::Hla);
        assert!("CLAVE".parse::<FormCode>().is_err());
    }

    #[test]
    fn hlp_derives_the_exempt_value() {
        let filled_form = FormCode::Hlp
            .fill(&record(), None, &NumberLocale::default())
            .unwrap();
        assert_eq!(text_of(&filled_form, Field::ExemptValue), vec!["15,250.75"]);
        assert_eq!(text_of(&filled_form, Field::DeclaredPropertyCount), vec!["18", "18"]);
        assert_eq!(text_of(&filled_form, Field::TaxpayerCode), vec!["0000000123"]);
    }

    #[test]
    fn hla_splits_the_fee_in_two_installments() {
        let filled_form = FormCode::Hla
            .fill(&record(), Some("P02"), &NumberLocale::default())
            .unwrap();
        assert_eq!(text_of(&filled_form, Field::FeeInstallment), vec!["42.50", "42.50"]);
        assert_eq!(text_of(&filled_form, Field::PropertyAddress), vec!["AV GRAU 102"]);
    }

    #[test]
    fn per_property_forms_require_an_existing_property() {
        let error = FormCode::Pu
            .fill(&record(), Some("P99"), &NumberLocale::default())
            .unwrap_err();
        assert!(matches!(error, FormError::PropertyNotFound { property_code } if property_code == "P99"));
    }

    #[test]
    fn missing_blocks_are_reported() {
        let mut record = record();
        record.properties["P01"].valuation = None;
        let error = FormCode::Pu
            .fill(&record, Some("P01"), &NumberLocale::default())
            .unwrap_err();
        assert_eq!(error.to_string(), "the record has no pu_predio2 data");
    }

    #[test]
    fn hr_lists_the_properties_up_to_its_capacity() {
        let filled_form = FormCode::Hr
            .fill(&record(), None, &NumberLocale::default())
            .unwrap();
        let sequences = text_of(&filled_form, Field::PropertySequence);
        assert_eq!(sequences.len(), 16);
        assert_eq!(sequences[0], "001");
        assert_eq!(text_of(&filled_form, Field::OverflowNote), vec!["... y 2 predios más"]);

        let last_row = filled_form
            .fields
            .iter()
            .filter(|filled| filled.field == Field::PropertyTaxableValue)
            .last()
            .unwrap();
        assert_eq!((last_row.x, last_row.y), (178.0, 133.0));
    }
}
